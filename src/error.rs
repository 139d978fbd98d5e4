use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vault root does not exist: {0}")]
    VaultNotFound(PathBuf),

    #[error("invalid vault path: {0}")]
    InvalidVaultPath(String),

    #[error("path is outside vault: {0}")]
    PathOutsideVault(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no frontmatter block in {path}: {reason}")]
    Frontmatter { path: PathBuf, reason: String },

    #[error("frontmatter yaml error: {0}")]
    FrontmatterYaml(#[from] serde_yaml::Error),

    #[error("cover fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("cover payload too large: {bytes} bytes from {url}")]
    OversizedPayload { url: String, bytes: u64 },

    #[error("rename target already occupied: {target} (wanted by {from})")]
    RenameConflict { from: PathBuf, target: PathBuf },

    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
