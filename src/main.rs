use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use notepress::{
    CoverReport, ExportConfig, ExportReport, Vault, acquire_covers, export_books, export_notes,
    export_series, export_timeline, rename_covers, repair_covers,
};

#[derive(Debug, Parser)]
#[command(
    name = "notepress",
    version,
    about = "Markdown knowledge-base to website JSON exporter"
)]
struct Cli {
    /// Path to the note corpus.
    #[arg(long, env = "NOTEPRESS_VAULT", global = true)]
    vault: Option<PathBuf>,

    /// Directory the JSON documents are written to.
    #[arg(long, env = "NOTEPRESS_OUTPUT", global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export one or all collections to JSON.
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
    /// Cover asset maintenance passes.
    Covers {
        #[command(subcommand)]
        command: CoversCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ExportCommand {
    /// Run every exporter; one failure does not block the others.
    All,
    Books,
    Series,
    Timeline,
    Notes,
}

#[derive(Debug, Subcommand)]
enum CoversCommand {
    /// Download pending cover URLs and optimize them.
    Fetch,
    /// Move cover files to their canonical title-author names.
    Rename,
    /// Clear dangling cover references and normalize cover fields.
    Repair,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli
        .vault
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .context("no vault path given and no working directory")?;

    let mut cfg = ExportConfig::default();
    if let Some(output) = &cli.output {
        cfg.output_dir = output.clone();
        cfg.publish_dir = output.join("covers");
    }
    let vault = Vault::with_config(&root, cfg)?;

    match cli.command {
        Command::Export { command } => run_export(&vault, command),
        Command::Covers { command } => {
            let (pass, report) = match command {
                CoversCommand::Fetch => ("fetch", acquire_covers(&vault)),
                CoversCommand::Rename => ("rename", rename_covers(&vault)),
                CoversCommand::Repair => ("repair", repair_covers(&vault)),
            };
            print_cover_summary(pass, &report);
            Ok(())
        }
    }
}

type Exporter = fn(&Vault) -> notepress::Result<ExportReport>;

const EXPORTERS: [(&str, Exporter); 4] = [
    ("books", export_books),
    ("series", export_series),
    ("timeline", export_timeline),
    ("notes", export_notes),
];

fn run_export(vault: &Vault, command: ExportCommand) -> anyhow::Result<()> {
    let selected: Vec<&(&str, Exporter)> = match command {
        ExportCommand::All => EXPORTERS.iter().collect(),
        ExportCommand::Books => EXPORTERS.iter().filter(|(n, _)| *n == "books").collect(),
        ExportCommand::Series => EXPORTERS.iter().filter(|(n, _)| *n == "series").collect(),
        ExportCommand::Timeline => EXPORTERS.iter().filter(|(n, _)| *n == "timeline").collect(),
        ExportCommand::Notes => EXPORTERS.iter().filter(|(n, _)| *n == "notes").collect(),
    };
    let run_all = selected.len() > 1;

    let mut failures = 0usize;
    for (name, exporter) in selected {
        match exporter(vault) {
            Ok(report) => print_export_summary(&report),
            Err(err) => {
                failures += 1;
                eprintln!("export {name} failed: {err}");
                // A single exporter failure never blocks its siblings.
                if !run_all {
                    return Err(err.into());
                }
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} exporter(s) failed");
    }
    Ok(())
}

fn print_export_summary(report: &ExportReport) {
    println!(
        "{}: {} items -> {} (skipped {}, lastUpdated {})",
        report.collection,
        report.count,
        report.output_path.display(),
        report.skipped,
        report.last_updated
    );
    for (bucket, n) in &report.buckets {
        println!("  {bucket}: {n}");
    }
}

fn print_cover_summary(pass: &str, report: &CoverReport) {
    println!(
        "covers {pass}: processed {}, updated {}, skipped {}, conflicts {}",
        report.processed, report.updated, report.skipped, report.conflicts
    );
}
