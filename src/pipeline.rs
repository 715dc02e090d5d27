//! Processing pipeline.
//!
//! Drives each new file through
//! `discovered → content extracted → metadata extracted → ledger updated`.
//! Files without usable text are skipped, and a failed analysis is logged
//! and skipped; neither is written to the ledger, so both come back on the
//! next run. One bad file never stops the loop.
//!
//! The ledger is saved after every recorded file. Only a failing save
//! aborts the run, since progress could no longer be made durable.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::analyze::MetadataExtractor;
use crate::config::Config;
use crate::discover::{ledger_key, Discoverer, Discovery};
use crate::error::AnalysisError;
use crate::extract::ExtractorRegistry;
use crate::ledger::LedgerStore;
use crate::llm::CompletionModel;
use crate::models::{Analysis, DocumentRecord, Ledger};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Why a file produced no analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No extractor, or the extractor failed.
    Unreadable,
    /// Trimmed text shorter than `extraction.min_chars`.
    TooShort { chars: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unreadable => f.write_str("empty or unreadable content"),
            SkipReason::TooShort { chars } => {
                write!(f, "empty or unreadable content ({} characters)", chars)
            }
        }
    }
}

/// Terminal state of one file.
#[derive(Debug)]
pub enum FileOutcome {
    Recorded(Analysis),
    Skipped(SkipReason),
    Failed(AnalysisError),
}

/// What happened during one run. Holds paths only: reports are always
/// rendered from the ledger, never from this list.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub already_processed: usize,
    pub recorded: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Delete the ledger before discovery.
    pub reset: bool,
    /// Process at most this many new files.
    pub limit: Option<usize>,
}

pub struct Pipeline<'a> {
    extractors: &'a ExtractorRegistry,
    analyzer: &'a MetadataExtractor<'a>,
    store: &'a LedgerStore,
    min_chars: usize,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        extractors: &'a ExtractorRegistry,
        analyzer: &'a MetadataExtractor<'a>,
        store: &'a LedgerStore,
        min_chars: usize,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            extractors,
            analyzer,
            store,
            min_chars,
            progress,
        }
    }

    /// Processes `files` in order, saving `ledger` after each success.
    pub async fn run(&self, ledger: &mut Ledger, files: &[PathBuf]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let total = files.len();

        for (i, path) in files.iter().enumerate() {
            let file = display_name(path);
            self.progress.report(ProgressEvent::Analyzing {
                n: i + 1,
                total,
                file: file.clone(),
            });

            let key = ledger_key(path);
            if ledger.contains_key(&key) {
                tracing::debug!(file = %path.display(), "already in ledger, leaving untouched");
                continue;
            }

            match self.process_file(path).await {
                FileOutcome::Recorded(analysis) => {
                    let record =
                        DocumentRecord::new(&analysis, chrono::Local::now().naive_local())?;
                    ledger.insert(key, record);
                    self.store.save(ledger)?;

                    tracing::info!(file = %path.display(), doc_type = %analysis.doc_type, "recorded");
                    self.progress.report(ProgressEvent::Recorded {
                        file,
                        author: analysis.author,
                        title: analysis.title,
                    });
                    summary.recorded.push(path.clone());
                }
                FileOutcome::Skipped(reason) => {
                    tracing::info!(file = %path.display(), %reason, "skipped");
                    self.progress.report(ProgressEvent::Skipped {
                        file,
                        reason: reason.to_string(),
                    });
                    summary.skipped.push((path.clone(), reason));
                }
                FileOutcome::Failed(error) => {
                    tracing::warn!(file = %path.display(), error = %error, "analysis failed");
                    self.progress.report(ProgressEvent::Failed {
                        file,
                        error: error.to_string(),
                    });
                    summary.failed.push((path.clone(), error.to_string()));
                }
            }
        }

        self.progress.report(ProgressEvent::Finished {
            recorded: summary.recorded.len(),
            skipped: summary.skipped.len(),
            failed: summary.failed.len(),
        });
        Ok(summary)
    }

    /// Extracts and analyzes one file without touching the ledger.
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let Some(content) = self.extractors.extract_content(path) else {
            return FileOutcome::Skipped(SkipReason::Unreadable);
        };

        let chars = content.trim().chars().count();
        if chars < self.min_chars {
            return FileOutcome::Skipped(SkipReason::TooShort { chars });
        }

        match self.analyzer.extract(path, &content).await {
            Ok(analysis) => FileOutcome::Recorded(analysis),
            Err(e) => FileOutcome::Failed(e),
        }
    }
}

/// Loads the ledger (after an optional reset) and lists the files still to
/// be processed.
pub fn plan(config: &Config, store: &LedgerStore, options: &RunOptions) -> Result<(Ledger, Discovery)> {
    if options.reset {
        tracing::info!(ledger = %store.path().display(), "resetting ledger");
        store.reset()?;
    }
    let ledger = store.load()?;
    let mut discovery = Discoverer::from_config(config)?.scan(&config.folders, &ledger)?;
    if let Some(limit) = options.limit {
        discovery.new_files.truncate(limit);
    }
    Ok((ledger, discovery))
}

/// Discovers new files under the configured roots and processes them.
pub async fn run_pipeline(
    config: &Config,
    model: &dyn CompletionModel,
    options: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let store = LedgerStore::new(&config.output.ledger);
    let (mut ledger, discovery) = plan(config, &store, options)?;

    tracing::info!(
        already_processed = discovery.already_processed,
        new_files = discovery.new_files.len(),
        model = model.model_name(),
        "starting analysis"
    );
    progress.report(ProgressEvent::Discovered {
        new_files: discovery.new_files.len(),
        already_processed: discovery.already_processed,
    });

    let extractors = ExtractorRegistry::default();
    let analyzer = MetadataExtractor::new(model, config.extraction.max_chars, &config.default_author);
    let pipeline = Pipeline::new(
        &extractors,
        &analyzer,
        &store,
        config.extraction.min_chars,
        progress,
    );

    let mut summary = pipeline.run(&mut ledger, &discovery.new_files).await?;
    summary.already_processed = discovery.already_processed;
    Ok(summary)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
