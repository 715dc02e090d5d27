//! Run progress reporting.
//!
//! The pipeline emits one [`ProgressEvent`] per step so users can follow a
//! long run file by file. Progress goes to **stderr** so stdout stays free
//! for command output.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Discovery finished.
    Discovered {
        new_files: usize,
        already_processed: usize,
    },
    /// File `n` of `total` is being analyzed.
    Analyzing { n: usize, total: usize, file: String },
    /// The file was analyzed and written to the ledger.
    Recorded {
        file: String,
        author: String,
        title: String,
    },
    /// The file had no usable text; it stays out of the ledger.
    Skipped { file: String, reason: String },
    /// Analysis failed; it stays out of the ledger.
    Failed { file: String, error: String },
    /// All files have been handled.
    Finished {
        recorded: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Receives pipeline progress.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: `[3/12] analyzing: predikan.docx`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovered {
                new_files,
                already_processed,
            } => format!(
                "already processed: {}\nnew files to process: {}\n",
                already_processed, new_files
            ),
            ProgressEvent::Analyzing { n, total, file } => {
                format!("[{}/{}] analyzing: {}\n", n, total, file)
            }
            ProgressEvent::Recorded { author, title, .. } => {
                format!("  ✓ {} – {}\n", author, title)
            }
            ProgressEvent::Skipped { reason, .. } => format!("  skipped: {}\n", reason),
            ProgressEvent::Failed { error, .. } => format!("  ✗ analysis failed: {}\n", error),
            ProgressEvent::Finished {
                recorded,
                skipped,
                failed,
            } => format!(
                "done: {} analyzed, {} skipped, {} failed\n",
                recorded, skipped, failed
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Discovered {
                new_files,
                already_processed,
            } => serde_json::json!({
                "event": "discovered",
                "new_files": new_files,
                "already_processed": already_processed
            }),
            ProgressEvent::Analyzing { n, total, file } => serde_json::json!({
                "event": "analyzing",
                "n": n,
                "total": total,
                "file": file
            }),
            ProgressEvent::Recorded {
                file,
                author,
                title,
            } => serde_json::json!({
                "event": "recorded",
                "file": file,
                "author": author,
                "title": title
            }),
            ProgressEvent::Skipped { file, reason } => serde_json::json!({
                "event": "skipped",
                "file": file,
                "reason": reason
            }),
            ProgressEvent::Failed { file, error } => serde_json::json!({
                "event": "failed",
                "file": file,
                "error": error
            }),
            ProgressEvent::Finished {
                recorded,
                skipped,
                failed,
            } => serde_json::json!({
                "event": "finished",
                "recorded": recorded,
                "skipped": skipped,
                "failed": failed
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
