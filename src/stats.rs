//! Ledger statistics.
//!
//! A quick summary of what has been processed: record counts, how many
//! carry a usable analysis, the per-type breakdown and how many would be
//! exported. Used by `analyzer status`.

use anyhow::Result;

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::ledger::LedgerStore;
use crate::models::{DocType, Ledger};
use crate::ris::CitationFilter;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub records: usize,
    pub analyzed: usize,
    /// Counts per type, in type-name order; types with no documents omitted.
    pub by_type: Vec<(DocType, usize)>,
    pub citable: usize,
}

pub fn compute_stats(ledger: &Ledger, filter: &CitationFilter) -> LedgerStats {
    let analyses = aggregate(ledger);

    let mut by_type: Vec<(DocType, usize)> = DocType::ALL
        .iter()
        .map(|t| (*t, analyses.iter().filter(|a| a.doc_type == *t).count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    by_type.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

    LedgerStats {
        records: ledger.len(),
        analyzed: analyses.len(),
        by_type,
        citable: analyses.iter().filter(|a| filter.is_citable(a)).count(),
    }
}

/// Run the status command: load the ledger and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let store = LedgerStore::new(&config.output.ledger);
    let ledger = store.load()?;
    let stats = compute_stats(&ledger, &CitationFilter::from_config(config));

    println!("Ledger:       {}", store.path().display());
    println!("Records:      {}", stats.records);
    println!("Analyzed:     {}", stats.analyzed);
    if stats.records > stats.analyzed {
        println!(
            "  without usable analysis: {}",
            stats.records - stats.analyzed
        );
    }
    println!("Citable:      {}", stats.citable);

    if !stats.by_type.is_empty() {
        println!();
        println!("  {:<12} {:>6}", "TYPE", "DOCS");
        println!("  {:<12} {:>6}", "----", "----");
        for (doc_type, count) in &stats.by_type {
            println!("  {:<12} {:>6}", doc_type.as_str(), count);
        }
    }

    Ok(())
}
