//! TOML configuration.
//!
//! A single file describes which folders to scan, how documents are read,
//! which model analyzes them, and where the ledger and outputs live:
//!
//! ```toml
//! folders = ["/home/anna/Dokument/Forskning"]
//! extensions = [".txt", ".docx", ".pdf", ".pptx"]
//! default_author = "Stiftelsen Exempel"
//!
//! [output]
//! ledger = "data/processed.json"
//!
//! [anthropic]
//! model = "claude-sonnet-4-5"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::DocType;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub folders: Vec<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    pub default_author: String,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub citation: CitationConfig,
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

fn default_extensions() -> Vec<String> {
    ["txt", "docx", "pdf", "pptx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_ledger_path")]
    pub ledger: PathBuf,
    /// Name of the folder generated outputs are written to. Directories
    /// with this name are never scanned.
    #[serde(default = "default_dir_name")]
    pub dir_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ledger: default_ledger_path(),
            dir_name: default_dir_name(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/processed.json")
}
fn default_dir_name() -> String {
    "analyzer".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CitationConfig {
    #[serde(default = "default_non_citable_types")]
    pub non_citable_types: Vec<String>,
    #[serde(default = "default_non_citable_extensions")]
    pub non_citable_extensions: Vec<String>,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            non_citable_types: default_non_citable_types(),
            non_citable_extensions: default_non_citable_extensions(),
        }
    }
}

fn default_non_citable_types() -> Vec<String> {
    vec!["predikan".to_string(), "övrigt".to_string()]
}
fn default_non_citable_extensions() -> Vec<String> {
    vec!["pptx".to_string(), "ppt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_tokens() -> u32 {
    1024
}
fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Characters of extracted text sent to the model; the rest is dropped.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Trimmed content shorter than this is treated as unreadable.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    6000
}
fn default_min_chars() -> usize {
    50
}

/// Lowercases an extension and strips a leading dot: `".PDF"` → `"pdf"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

impl Config {
    /// Replaces the configured roots, e.g. from `--folder`.
    pub fn with_folders(mut self, folders: Vec<PathBuf>) -> Self {
        if !folders.is_empty() {
            self.folders = folders;
        }
        self
    }

    /// The root that owns the report and export files.
    pub fn primary_folder(&self) -> Result<&Path> {
        self.folders
            .first()
            .map(PathBuf::as_path)
            .context("No folders configured")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    config.extensions = config
        .extensions
        .iter()
        .map(|e| normalize_extension(e))
        .filter(|e| !e.is_empty())
        .collect();
    config.citation.non_citable_extensions = config
        .citation
        .non_citable_extensions
        .iter()
        .map(|e| normalize_extension(e))
        .collect();

    if config.folders.is_empty() {
        bail!("folders must list at least one directory");
    }

    if config.extensions.is_empty() {
        bail!("extensions must not be empty");
    }

    if config.default_author.trim().is_empty() {
        bail!("default_author must not be empty");
    }

    if config.output.dir_name.trim().is_empty() {
        bail!("output.dir_name must not be empty");
    }

    if config.anthropic.model.trim().is_empty() {
        bail!("anthropic.model must be specified");
    }

    if config.anthropic.max_tokens == 0 {
        bail!("anthropic.max_tokens must be > 0");
    }

    if config.extraction.max_chars == 0 {
        bail!("extraction.max_chars must be > 0");
    }

    if config.extraction.min_chars > config.extraction.max_chars {
        bail!(
            "extraction.min_chars ({}) must not exceed extraction.max_chars ({})",
            config.extraction.min_chars,
            config.extraction.max_chars
        );
    }

    for name in &config.citation.non_citable_types {
        if DocType::from_known(name).is_none() {
            bail!(
                "Unknown document type in citation.non_citable_types: '{}'. Must be one of: {}",
                name,
                DocType::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(config)
}
