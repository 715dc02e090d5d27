//! Error types for the per-file stages and the output writers.
//!
//! Command-level glue (config, ledger I/O, CLI) uses `anyhow`; these typed
//! errors exist where callers branch on the failure kind.

use std::path::PathBuf;

/// A file whose text could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no extractor for extension '{0}'")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
}

/// Metadata extraction failed for one file. The service call and the
/// response parsing fail the same way: the file is skipped for this run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("service call failed: {0}")]
    Service(#[source] anyhow::Error),

    #[error("service returned no text content")]
    EmptyResponse,

    #[error("response is not valid analysis JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Writing a report or export failed.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The target is held open by another program.
    #[error("{} is locked by another program", .0.display())]
    FileLocked(PathBuf),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl OutputError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
