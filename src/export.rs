//! Renders the report and the RIS export from the ledger.
//!
//! Always works from [`aggregate`] over the persisted ledger, so the outputs
//! cover every document ever processed, including runs that found nothing
//! new. Writing is left to the caller, which owns the retry policy for
//! locked targets.

use anyhow::Result;
use std::path::PathBuf;

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::models::Ledger;
use crate::output::OutputPaths;
use crate::report::ReportGenerator;
use crate::ris::RisExporter;

/// A rendered file waiting to be written.
#[derive(Debug)]
pub struct RenderedOutput {
    pub kind: OutputKind,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// Documents included.
    pub entries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Report,
    Bibliography,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Report => f.write_str("report"),
            OutputKind::Bibliography => f.write_str("bibliography"),
        }
    }
}

/// Renders the report and, unless skipped, the bibliography.
pub fn render_outputs(
    config: &Config,
    ledger: &Ledger,
    include_bibliography: bool,
) -> Result<Vec<RenderedOutput>> {
    let analyses = aggregate(ledger);
    let paths = OutputPaths::from_config(config)?;

    tracing::info!(documents = analyses.len(), "rendering outputs");

    let mut outputs = vec![RenderedOutput {
        kind: OutputKind::Report,
        path: paths.report,
        bytes: ReportGenerator::new(&paths.folder_name)
            .render(&analyses, chrono::Local::now().naive_local())?,
        entries: analyses.len(),
    }];

    if include_bibliography {
        let (ris, count) = RisExporter::from_config(config).render(&analyses);
        outputs.push(RenderedOutput {
            kind: OutputKind::Bibliography,
            path: paths.bibliography,
            bytes: ris.into_bytes(),
            entries: count,
        });
    }

    Ok(outputs)
}
