use std::path::Path;

use notepress::{ExportConfig, Vault, export_books, export_notes, export_series, export_timeline};
use serde_json::Value;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn vault_with_output(root: &Path, output: &Path) -> Vault {
    let cfg = ExportConfig {
        output_dir: output.to_path_buf(),
        publish_dir: output.join("covers"),
        ..ExportConfig::default()
    };
    Vault::with_config(root, cfg).unwrap()
}

fn read_doc(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn books_export_groups_by_status_and_year() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    let output = temp.path().join("out");
    std::fs::create_dir_all(&root)?;

    write(
        &root.join("Dune.md"),
        "---\nTitel: \"[[Dune]]\"\nAutor: \"[[Frank Herbert]]\"\nKategorie: \"[[Bücher]]\"\nStatus: Abgeschlossen\nSeiten: \"412\"\nBewertung: \"4.5\"\nBeendet: 2023-05-01\n---\nbody\n",
    );
    write(
        &root.join("Hyperion.md"),
        "---\nTitel: Hyperion\nAutor: Dan Simmons\nKategorie: \"[[Bücher]]\"\nStatus: Abgeschlossen\nBeendet: 2024-01-10\n---\nbody\n",
    );
    write(
        &root.join("Ringwelt.md"),
        "---\nTitel: Ringwelt\nAutor: Larry Niven\nKategorie: \"[[Bücher]]\"\nStatus: Lesen\nSeiten: three hundred\n---\nbody\n",
    );
    // Template instances and broken frontmatter never abort the pass.
    write(&root.join("Vorlagen/Buch.md"), "---\nKategorie: \"[[Bücher]]\"\n---\n");
    write(&root.join("kaputt.md"), "---\nTitel: [unclosed\n");
    // Different category, must not leak into books.
    write(
        &root.join("Dark.md"),
        "---\nTitel: Dark\nKategorie: \"[[Serien]]\"\nStatus: Geplant\n---\n",
    );

    let vault = vault_with_output(&root, &output);
    let report = export_books(&vault)?;
    assert_eq!(report.count, 3);
    assert_eq!(report.skipped, 1);

    let doc = read_doc(&output.join("books.json"));
    assert_eq!(doc["count"], 3);
    assert!(doc["lastUpdated"].is_string());

    let years: Vec<_> = doc["abgeschlossen"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(years, vec!["2024", "2023"]);

    let dune = &doc["abgeschlossen"]["2023"][0];
    assert_eq!(dune["title"], "Dune");
    assert_eq!(dune["author"], serde_json::json!(["Frank Herbert"]));
    assert_eq!(dune["pages"], 412);
    assert_eq!(dune["rating"], 4.5);
    assert_eq!(dune["finished"], "2023-05-01T00:00:00.000Z");
    assert_eq!(dune["status"], serde_json::json!(["Abgeschlossen"]));

    let lesen = doc["lesen"].as_array().unwrap();
    assert_eq!(lesen.len(), 1);
    assert_eq!(lesen[0]["pages"], "three hundred");

    Ok(())
}

#[test]
fn reexport_keeps_timestamp_until_data_changes() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    let output = temp.path().join("out");
    std::fs::create_dir_all(&root)?;
    let note = root.join("Dune.md");
    write(
        &note,
        "---\nTitel: Dune\nAutor: Frank Herbert\nKategorie: \"[[Bücher]]\"\nStatus: Abgeschlossen\nBewertung: \"4.0\"\nBeendet: 2023-05-01\n---\n",
    );

    let vault = vault_with_output(&root, &output);
    let first = export_books(&vault)?;
    let second = export_books(&vault)?;
    assert_eq!(first.last_updated, second.last_updated);

    std::thread::sleep(std::time::Duration::from_millis(10));
    write(
        &note,
        "---\nTitel: Dune\nAutor: Frank Herbert\nKategorie: \"[[Bücher]]\"\nStatus: Abgeschlossen\nBewertung: \"5.0\"\nBeendet: 2023-05-01\n---\n",
    );
    let third = export_books(&vault)?;
    assert_ne!(second.last_updated, third.last_updated);

    Ok(())
}

#[test]
fn books_export_publishes_covers_and_nulls_missing_ones() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    let output = temp.path().join("out");
    std::fs::create_dir_all(root.join("Cover"))?;
    std::fs::write(root.join("Cover/dune-frank-herbert.jpg"), b"jpegbytes")?;

    write(
        &root.join("Dune.md"),
        "---\nTitel: Dune\nAutor: Frank Herbert\nKategorie: \"[[Bücher]]\"\nStatus: Lesen\ncover: Cover/dune-frank-herbert.jpg\n---\n",
    );
    write(
        &root.join("Lost.md"),
        "---\nTitel: Lost\nAutor: Nobody\nKategorie: \"[[Bücher]]\"\nStatus: Lesen\ncover: Cover/does-not-exist.jpg\n---\n",
    );

    let vault = vault_with_output(&root, &output);
    export_books(&vault)?;

    assert!(output.join("covers/dune-frank-herbert.jpg").exists());

    let doc = read_doc(&output.join("books.json"));
    let lesen = doc["lesen"].as_array().unwrap();
    let dune = lesen.iter().find(|i| i["title"] == "Dune").unwrap();
    assert_eq!(
        dune["cover"],
        "https://assets.example.org/covers/dune-frank-herbert.jpg"
    );
    let lost = lesen.iter().find(|i| i["title"] == "Lost").unwrap();
    assert!(lost["cover"].is_null());

    Ok(())
}

#[test]
fn series_export_uses_same_status_buckets() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    let output = temp.path().join("out");
    std::fs::create_dir_all(&root)?;
    write(
        &root.join("Dark.md"),
        "---\nTitel: Dark\nKategorie: \"[[Serien]]\"\nStatus: Abgeschlossen\nBesetzung: \"[[Louis Hofmann]]\"\nStaffeln: \"3\"\nBeendet: 2021-08-14\n---\n",
    );

    let vault = vault_with_output(&root, &output);
    let report = export_series(&vault)?;
    assert_eq!(report.count, 1);

    let doc = read_doc(&output.join("series.json"));
    let dark = &doc["abgeschlossen"]["2021"][0];
    assert_eq!(dark["cast"], serde_json::json!(["Louis Hofmann"]));
    assert_eq!(dark["seasons"], 3);

    Ok(())
}

#[test]
fn timeline_export_sorts_chronologically_and_groups_by_type() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    let output = temp.path().join("out");
    std::fs::create_dir_all(&root)?;

    write(
        &root.join("Rom.md"),
        "---\nTitel: Gründung Roms\nKategorie: \"[[Timeline]]\"\nDatum: \"-0753-04-21\"\nTyp: Ereignis\n---\n",
    );
    write(
        &root.join("Mond.md"),
        "---\nTitel: Mondlandung\nKategorie: \"[[Timeline]]\"\nDatum: 1969-07-20\n---\n",
    );

    let vault = vault_with_output(&root, &output);
    let report = export_timeline(&vault)?;
    assert_eq!(report.count, 2);

    let doc = read_doc(&output.join("timeline.json"));
    let entries = doc["entries"].as_array().unwrap();
    assert_eq!(entries[0]["title"], "Gründung Roms");
    assert_eq!(entries[0]["date"], "-0753-04-21T00:00:00.000Z");
    assert_eq!(entries[1]["title"], "Mondlandung");

    assert_eq!(doc["byType"]["Ereignis"].as_array().unwrap().len(), 1);
    assert_eq!(doc["byType"]["unknown"].as_array().unwrap().len(), 1);

    Ok(())
}

#[test]
fn notes_export_derives_titles_and_groups_by_topic() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    let output = temp.path().join("out");
    std::fs::create_dir_all(&root)?;

    write(
        &root.join("Über Kaffee & Tee.md"),
        "---\nKategorie: \"[[Notizen]]\"\nThema: Alltag\nDatum: 2024-03-01\nTags: Genuss\n---\n",
    );
    write(
        &root.join("Lose Gedanken.md"),
        "---\nKategorie: \"[[Notizen]]\"\nDatum: 2024-05-01\n---\n",
    );

    let vault = vault_with_output(&root, &output);
    let report = export_notes(&vault)?;
    assert_eq!(report.count, 2);

    let doc = read_doc(&output.join("notes.json"));
    let topics: Vec<_> = doc["topics"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(topics, vec!["Alltag", "Uncategorized"]);

    let kaffee = &doc["topics"]["Alltag"][0];
    assert_eq!(kaffee["title"], "Über Kaffee & Tee");
    assert_eq!(kaffee["slug"], "ber-kaffee-tee");
    assert_eq!(kaffee["tags"], serde_json::json!(["Genuss"]));

    let lose = &doc["topics"]["Uncategorized"][0];
    assert_eq!(lose["slug"], "lose-gedanken");

    Ok(())
}
