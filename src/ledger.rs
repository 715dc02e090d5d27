//! Persistent processing ledger.
//!
//! The ledger is a pretty-printed JSON object mapping absolute file paths to
//! [`DocumentRecord`]s. It is the only record of which files have been
//! analyzed: a path present here is never offered for processing again.
//!
//! The pipeline saves after every recorded file, so an interrupted run loses
//! at most the file it was working on.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::Ledger;

#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger. A missing file is an empty ledger.
    pub fn load(&self) -> Result<Ledger> {
        if !self.path.exists() {
            return Ok(Ledger::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read ledger: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Ledger::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ledger: {}", self.path.display()))
    }

    /// Overwrites the ledger via a sibling temp file and a rename, creating
    /// parent directories as needed.
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create ledger directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(ledger)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write ledger: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace ledger: {}", self.path.display()))?;
        Ok(())
    }

    /// Deletes the ledger so every file is processed again.
    pub fn reset(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete ledger: {}", self.path.display())),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
