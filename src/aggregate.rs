//! Read-back of every analysis stored in the ledger.
//!
//! Reports and exports are built from this, not from the current run, so
//! a run that finds nothing new still renders everything processed before.

use std::path::PathBuf;

use crate::models::{Analysis, Ledger};

/// Analyses of all ledger entries that carry a valid one, in ledger order.
/// Entries without an analysis (older ledgers) are skipped.
pub fn aggregate(ledger: &Ledger) -> Vec<Analysis> {
    ledger
        .iter()
        .filter_map(|(path, record)| {
            let Some(mut analysis) = record.analysis() else {
                tracing::debug!(file = %path, "ledger entry has no usable analysis");
                return None;
            };
            if analysis.filepath.is_none() {
                analysis.filepath = Some(PathBuf::from(path));
            }
            Some(analysis)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentRecord;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn with_analysis(title: &str) -> DocumentRecord {
        DocumentRecord {
            processed_at: at(),
            title: Some(title.to_string()),
            author: Some("Doe, Jane".to_string()),
            analysis: Some(json!({
                "title": title,
                "author": "Doe, Jane",
                "summary": "Sammanfattning.",
                "type": "artikel",
                "year": 2001,
                "date_full": null,
                "is_citable": true
            })),
        }
    }

    #[test]
    fn skips_entries_without_valid_analysis() {
        let mut ledger = Ledger::new();
        ledger.insert("/d/a.txt".into(), with_analysis("A"));
        ledger.insert(
            "/d/b.txt".into(),
            DocumentRecord {
                processed_at: at(),
                title: Some("B".into()),
                author: None,
                analysis: None,
            },
        );
        ledger.insert(
            "/d/c.txt".into(),
            DocumentRecord {
                processed_at: at(),
                title: None,
                author: None,
                analysis: Some(json!({"title": "C"})),
            },
        );
        ledger.insert("/d/d.txt".into(), with_analysis("D"));

        let titles: Vec<String> = aggregate(&ledger).into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["A", "D"]);
    }

    #[test]
    fn missing_filepath_is_filled_from_key() {
        let mut ledger = Ledger::new();
        ledger.insert("/d/a.txt".into(), with_analysis("A"));
        let all = aggregate(&ledger);
        assert_eq!(all[0].filepath.as_deref(), Some(std::path::Path::new("/d/a.txt")));
    }
}
