//! Output locations and lock-aware writes.
//!
//! Report and export live in `<root>/<dir_name>/analysis-<root name>.<ext>`
//! under the primary root. A target that another program holds open (a
//! word processor showing last run's report, say) yields
//! [`OutputError::FileLocked`]. [`retry_while_locked`] asks a human to close
//! the file and tries again, a bounded number of times.

use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::OutputError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Name of the root folder, used in file names and the report title.
    pub folder_name: String,
    pub report: PathBuf,
    pub bibliography: PathBuf,
}

impl OutputPaths {
    pub fn for_root(root: &Path, dir_name: &str) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let folder_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());
        let dir = root.join(dir_name);
        Self {
            report: dir.join(format!("analysis-{}.docx", folder_name)),
            bibliography: dir.join(format!("analysis-{}.ris", folder_name)),
            folder_name,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::for_root(
            config.primary_folder()?,
            &config.output.dir_name,
        ))
    }
}

/// Fails with `FileLocked` if `path` exists but cannot be opened for append.
pub fn ensure_unlocked(path: &Path) -> Result<(), OutputError> {
    if !path.exists() {
        return Ok(());
    }
    OpenOptions::new()
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| classify(path, e))
}

/// Replaces `path` with `bytes`, creating the parent directory.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    ensure_unlocked(path)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, bytes).map_err(|e| OutputError::io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(classify(path, e));
    }
    Ok(())
}

fn classify(path: &Path, err: std::io::Error) -> OutputError {
    if is_lock_error(&err) {
        OutputError::FileLocked(path.to_path_buf())
    } else {
        OutputError::io(path, err)
    }
}

/// Only Windows holds files locked while they are open. A permission error
/// elsewhere is a read-only target, which waiting cannot fix.
fn is_lock_error(err: &std::io::Error) -> bool {
    // ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

/// Calls `write` until it stops failing with `FileLocked`. After each locked
/// attempt a notice goes to `notice` and one line is read from `input`: an
/// empty answer retries, `q` or end of input gives up. Returns `Ok(false)`
/// when the output was skipped, including after `max_attempts` attempts.
pub fn retry_while_locked<R, N, F>(
    max_attempts: usize,
    input: &mut R,
    notice: &mut N,
    mut write: F,
) -> Result<bool, OutputError>
where
    R: BufRead,
    N: Write,
    F: FnMut() -> Result<(), OutputError>,
{
    for attempt in 1..=max_attempts {
        let path = match write() {
            Ok(()) => return Ok(true),
            Err(OutputError::FileLocked(path)) => path,
            Err(e) => return Err(e),
        };

        tracing::warn!(file = %path.display(), attempt, "output locked");
        if attempt == max_attempts {
            let _ = writeln!(
                notice,
                "error: {} is still locked after {} attempts",
                path.display(),
                max_attempts
            );
            break;
        }
        let _ = writeln!(
            notice,
            "{} is open in another program. Close it and press Enter (q to skip).",
            path.display()
        );
        let _ = notice.flush();

        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(0) | Err(_) => break,
            Ok(_) if answer.trim().eq_ignore_ascii_case("q") => break,
            Ok(_) => {}
        }
    }
    Ok(false)
}
