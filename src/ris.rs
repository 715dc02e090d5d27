//! RIS bibliography export.
//!
//! Only citable documents are exported: the model must have flagged them
//! citable, their type must not be in `citation.non_citable_types`, and their
//! file extension must not be in `citation.non_citable_extensions` (slide
//! decks are excluded even when flagged). Each record is emitted in a fixed
//! tag order and closed with `ER` plus a blank line.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt::Write;

use crate::config::{normalize_extension, Config};
use crate::models::{Analysis, DocType};

pub struct CitationFilter {
    non_citable_types: HashSet<DocType>,
    non_citable_extensions: HashSet<String>,
}

impl CitationFilter {
    pub fn new(non_citable_types: &[String], non_citable_extensions: &[String]) -> Self {
        Self {
            non_citable_types: non_citable_types.iter().map(|t| DocType::parse(t)).collect(),
            non_citable_extensions: non_citable_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.citation.non_citable_types,
            &config.citation.non_citable_extensions,
        )
    }

    pub fn is_citable(&self, analysis: &Analysis) -> bool {
        analysis.is_citable
            && !self.non_citable_types.contains(&analysis.doc_type)
            && !analysis
                .extension()
                .is_some_and(|ext| self.non_citable_extensions.contains(&ext))
    }
}

pub struct RisExporter {
    filter: CitationFilter,
}

impl RisExporter {
    pub fn new(filter: CitationFilter) -> Self {
        Self { filter }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(CitationFilter::from_config(config))
    }

    /// Renders every citable analysis; returns the text and the record count.
    pub fn render(&self, analyses: &[Analysis]) -> (String, usize) {
        let mut out = String::new();
        let mut count = 0;
        for analysis in analyses.iter().filter(|a| self.filter.is_citable(a)) {
            self.write_record(&mut out, analysis);
            count += 1;
        }
        (out, count)
    }

    fn write_record(&self, out: &mut String, a: &Analysis) {
        tag(out, "TY", a.doc_type.ris_type());
        tag(out, "TI", &a.title);
        if let Some(uri) = a
            .filepath
            .as_deref()
            .and_then(|p| url::Url::from_file_path(p).ok())
        {
            tag(out, "L1", uri.as_str());
        }
        for author in split_authors(&a.author) {
            tag(out, "AU", &format_author(&author));
        }
        if let Some(date) = a.date_full.as_deref() {
            tag(out, "DA", &ris_date(date));
        } else if let Some(year) = a.year {
            tag(out, "PY", &year.to_string());
        }
        if !a.summary.trim().is_empty() {
            tag(out, "N2", &a.summary);
        }
        opt_tag(out, "JO", &a.publication);
        opt_tag(out, "PB", &a.publisher);
        opt_tag(out, "CY", &a.publisher_place);
        opt_tag(out, "SN", &a.isbn);
        opt_tag(out, "SP", &a.pages_total.map(|p| p.to_string()));
        opt_tag(out, "ET", &a.edition);
        opt_tag(out, "PB", &a.institution);
        opt_tag(out, "CY", &a.institution_place);
        opt_tag(out, "M3", &a.thesis_type);
        out.push_str("ER  - \n\n");
    }
}

fn tag(out: &mut String, name: &str, value: &str) {
    // RIS is line-oriented; fold embedded newlines.
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let _ = writeln!(out, "{}  - {}", name, value);
}

fn opt_tag(out: &mut String, name: &str, value: &Option<String>) {
    if let Some(v) = value {
        tag(out, name, v);
    }
}

/// Splits a `;`-separated author field.
pub fn split_authors(field: &str) -> Vec<String> {
    field
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"Jane Doe"` → `"Doe, Jane"`. Names that already contain a comma, and
/// single-word names, are returned unchanged.
pub fn format_author(name: &str) -> String {
    let name = name.trim();
    if name.contains(',') {
        return name.to_string();
    }
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.split_last() {
        Some((last, first)) if !first.is_empty() => format!("{}, {}", last, first.join(" ")),
        _ => name.to_string(),
    }
}

/// ISO dates become RIS `YYYY/MM/DD`; anything else passes through.
fn ris_date(date: &str) -> String {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|_| date.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn analysis(doc_type: DocType, file: &str) -> Analysis {
        Analysis {
            title: "Titel".to_string(),
            author: "Jane Doe".to_string(),
            summary: "En kort\nsammanfattning.".to_string(),
            doc_type,
            year: Some(2004),
            date_full: None,
            is_citable: true,
            publication: None,
            publisher: None,
            publisher_place: None,
            isbn: None,
            pages_total: None,
            edition: None,
            institution: None,
            institution_place: None,
            thesis_type: None,
            filepath: Some(PathBuf::from(file)),
        }
    }

    fn exporter() -> RisExporter {
        RisExporter::new(CitationFilter::new(
            &["predikan".to_string(), "övrigt".to_string()],
            &[".pptx".to_string()],
        ))
    }

    #[test]
    fn author_formatting() {
        assert_eq!(format_author("Jane Doe"), "Doe, Jane");
        assert_eq!(format_author("Doe, Jane"), "Doe, Jane");
        assert_eq!(format_author("Platon"), "Platon");
        assert_eq!(format_author("Anna Maria Svensson"), "Svensson, Anna Maria");
    }

    #[test]
    fn multiple_authors_each_get_a_line() {
        let mut a = analysis(DocType::Artikel, "/d/a.pdf");
        a.author = "Jane Doe; Svensson, Per;".to_string();
        let (ris, _) = exporter().render(&[a]);
        assert!(ris.contains("AU  - Doe, Jane\nAU  - Svensson, Per\n"));
    }

    #[test]
    fn every_author_follows_the_same_rule() {
        let mut a = analysis(DocType::Studie, "/d/a.pdf");
        a.author = "Org X; Stiftelsen".to_string();
        let (ris, _) = exporter().render(&[a]);
        assert!(ris.contains("AU  - X, Org\nAU  - Stiftelsen\n"));
    }

    #[test]
    fn citation_filter() {
        let filter = exporter().filter;
        assert!(filter.is_citable(&analysis(DocType::Artikel, "/d/a.pdf")));
        assert!(!filter.is_citable(&analysis(DocType::Predikan, "/d/a.pdf")));
        assert!(!filter.is_citable(&analysis(DocType::Ovrigt, "/d/a.docx")));
        assert!(!filter.is_citable(&analysis(DocType::Bok, "/d/Slides.PPTX")));
        let mut flagged = analysis(DocType::Bok, "/d/a.pdf");
        flagged.is_citable = false;
        assert!(!filter.is_citable(&flagged));
    }

    #[test]
    fn full_book_record_in_tag_order() {
        let mut a = analysis(DocType::Bok, "/d/bok.pdf");
        a.date_full = Some("2004-09-01".to_string());
        a.publisher = Some("Verbum".to_string());
        a.publisher_place = Some("Stockholm".to_string());
        a.isbn = Some("91-526-0000-0".to_string());
        a.pages_total = Some(312);
        a.edition = Some("2".to_string());

        let (ris, count) = exporter().render(&[a]);
        assert_eq!(count, 1);
        assert_eq!(
            ris,
            "TY  - BOOK\n\
             TI  - Titel\n\
             L1  - file:///d/bok.pdf\n\
             AU  - Doe, Jane\n\
             DA  - 2004/09/01\n\
             N2  - En kort sammanfattning.\n\
             PB  - Verbum\n\
             CY  - Stockholm\n\
             SN  - 91-526-0000-0\n\
             SP  - 312\n\
             ET  - 2\n\
             ER  - \n\n"
        );
    }

    #[test]
    fn thesis_record_reuses_pb_and_cy() {
        let mut a = analysis(DocType::Uppsats, "/d/uppsats.pdf");
        a.institution = Some("Uppsala universitet".to_string());
        a.institution_place = Some("Uppsala".to_string());
        a.thesis_type = Some("Masteruppsats".to_string());

        let (ris, _) = exporter().render(&[a]);
        assert!(ris.starts_with("TY  - THES\n"));
        assert!(ris.contains("PY  - 2004\n"));
        assert!(!ris.contains("DA  -"));
        assert!(ris.contains("PB  - Uppsala universitet\nCY  - Uppsala\nM3  - Masteruppsats\nER  - \n\n"));
    }

    #[test]
    fn non_citable_entries_are_dropped() {
        let (ris, count) = exporter().render(&[
            analysis(DocType::Predikan, "/d/p.docx"),
            analysis(DocType::Artikel, "/d/a.pptx"),
        ]);
        assert_eq!(count, 0);
        assert!(ris.is_empty());
    }
}
