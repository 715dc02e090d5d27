//! Consolidated report as a Word document.
//!
//! Analyses are grouped by type, groups sorted by type name, and every
//! document gets one section: title, author, date, type-specific
//! publication or institution line, source file, summary.
//!
//! The `.docx` is assembled directly from WordprocessingML parts with `zip`;
//! only the handful of paragraph styles the report uses are defined.

use anyhow::Result;
use chrono::NaiveDateTime;
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

use crate::models::{Analysis, DocType};

const UNKNOWN_DATE: &str = "Okänt";

/// All analyses of one type.
#[derive(Debug)]
pub struct TypeGroup<'a> {
    pub doc_type: DocType,
    pub entries: Vec<&'a Analysis>,
}

/// Groups by type, sorted by type name; entries keep their input order.
pub fn group_by_type(analyses: &[Analysis]) -> Vec<TypeGroup<'_>> {
    let mut groups: Vec<TypeGroup<'_>> = Vec::new();
    for analysis in analyses {
        match groups.iter_mut().find(|g| g.doc_type == analysis.doc_type) {
            Some(group) => group.entries.push(analysis),
            None => groups.push(TypeGroup {
                doc_type: analysis.doc_type,
                entries: vec![analysis],
            }),
        }
    }
    groups.sort_by(|a, b| a.doc_type.as_str().cmp(b.doc_type.as_str()));
    groups
}

/// Full date if known, else the year, else "Okänt".
pub fn display_date(analysis: &Analysis) -> String {
    if let Some(date) = analysis.date_full.as_deref() {
        return date.to_string();
    }
    match analysis.year {
        Some(year) => year.to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Heading1,
    Heading2,
    Normal,
}

impl Style {
    fn id(&self) -> Option<&'static str> {
        match self {
            Style::Title => Some("Title"),
            Style::Heading1 => Some("Heading1"),
            Style::Heading2 => Some("Heading2"),
            Style::Normal => None,
        }
    }
}

#[derive(Debug)]
struct Paragraph {
    style: Style,
    label: Option<&'static str>,
    text: String,
}

impl Paragraph {
    fn styled(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            label: None,
            text: text.into(),
        }
    }

    fn field(label: &'static str, text: impl Into<String>) -> Self {
        Self {
            style: Style::Normal,
            label: Some(label),
            text: text.into(),
        }
    }
}

pub struct ReportGenerator {
    folder_name: String,
}

impl ReportGenerator {
    pub fn new(folder_name: &str) -> Self {
        Self {
            folder_name: folder_name.to_string(),
        }
    }

    /// Renders the `.docx` bytes.
    pub fn render(&self, analyses: &[Analysis], generated_at: NaiveDateTime) -> Result<Vec<u8>> {
        let paragraphs = self.layout(analyses, generated_at);
        build_docx(&paragraphs)
    }

    fn layout(&self, analyses: &[Analysis], generated_at: NaiveDateTime) -> Vec<Paragraph> {
        let mut out = vec![
            Paragraph::styled(Style::Title, format!("Dokumentanalys: {}", self.folder_name)),
            Paragraph::styled(
                Style::Normal,
                format!(
                    "Genererad {} · {} dokument",
                    generated_at.format("%Y-%m-%d %H:%M"),
                    analyses.len()
                ),
            ),
        ];

        for group in group_by_type(analyses) {
            out.push(Paragraph::styled(
                Style::Heading1,
                format!("{} ({})", group.doc_type.heading(), group.entries.len()),
            ));
            for analysis in group.entries {
                document_section(&mut out, analysis);
            }
        }
        out
    }
}

fn document_section(out: &mut Vec<Paragraph>, a: &Analysis) {
    out.push(Paragraph::styled(Style::Heading2, a.title.clone()));
    out.push(Paragraph::field("Författare", a.author.clone()));
    out.push(Paragraph::field("Datum", display_date(a)));

    match a.doc_type {
        DocType::Artikel => {
            if let Some(publication) = &a.publication {
                out.push(Paragraph::field("Publicerad i", publication.clone()));
            }
        }
        DocType::Bok => {
            if let Some(publisher) = join_place(&a.publisher, &a.publisher_place) {
                out.push(Paragraph::field("Förlag", publisher));
            }
        }
        DocType::Uppsats => {
            if let Some(mut institution) = join_place(&a.institution, &a.institution_place) {
                if let Some(kind) = &a.thesis_type {
                    institution.push_str(&format!(" ({})", kind));
                }
                out.push(Paragraph::field("Lärosäte", institution));
            }
        }
        _ => {}
    }

    out.push(Paragraph::field("Fil", a.file_name()));
    out.push(Paragraph::styled(Style::Normal, a.summary.clone()));
}

fn join_place(name: &Option<String>, place: &Option<String>) -> Option<String> {
    match (name, place) {
        (Some(n), Some(p)) => Some(format!("{}, {}", n, p)),
        (Some(n), None) => Some(n.clone()),
        (None, _) => None,
    }
}

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="80"/></w:pPr><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="40"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style></w:styles>"#;

fn build_docx(paragraphs: &[Paragraph]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/styles.xml", STYLES),
    ] {
        zip.start_file(name, SimpleFileOptions::default())?;
        zip.write_all(body.as_bytes())?;
    }

    zip.start_file("word/document.xml", SimpleFileOptions::default())?;
    zip.write_all(document_xml(paragraphs).as_bytes())?;

    Ok(zip.finish()?.into_inner())
}

fn document_xml(paragraphs: &[Paragraph]) -> String {
    let mut xml = String::with_capacity(paragraphs.len() * 128);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(r#"<w:document xmlns:w="{}"><w:body>"#, W_NS));
    for p in paragraphs {
        xml.push_str("<w:p>");
        if let Some(id) = p.style.id() {
            xml.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, id));
        }
        if let Some(label) = p.label {
            xml.push_str(&format!(
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}: </w:t></w:r>"#,
                escape(label)
            ));
        }
        xml.push_str("<w:r>");
        for (i, line) in p.text.split('\n').enumerate() {
            if i > 0 {
                xml.push_str("<w:br/>");
            }
            xml.push_str(&format!(
                r#"<w:t xml:space="preserve">{}</w:t>"#,
                escape(&xml_safe(line))
            ));
        }
        xml.push_str("</w:r></w:p>");
    }
    xml.push_str("<w:sectPr/></w:body></w:document>");
    xml
}

/// Drops characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn analysis(title: &str, doc_type: DocType) -> Analysis {
        Analysis {
            title: title.to_string(),
            author: "Doe, Jane".to_string(),
            summary: "Sammanfattning <med> & tecken.".to_string(),
            doc_type,
            year: None,
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
            filepath: Some(PathBuf::from(format!("/d/{}.pdf", title))),
        }
    }

    fn generated() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn groups_sorted_by_type_name() {
        let all = vec![
            analysis("a", DocType::Ovrigt),
            analysis("b", DocType::Uppsats),
            analysis("c", DocType::Artikel),
            analysis("d", DocType::Uppsats),
            analysis("e", DocType::Bok),
        ];
        let groups = group_by_type(&all);
        let order: Vec<&str> = groups.iter().map(|g| g.doc_type.as_str()).collect();
        assert_eq!(order, vec!["artikel", "bok", "uppsats", "övrigt"]);
        let uppsatser: Vec<&str> = groups[2].entries.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(uppsatser, vec!["b", "d"]);
    }

    #[test]
    fn date_prefers_full_then_year() {
        let mut a = analysis("a", DocType::Artikel);
        assert_eq!(display_date(&a), "Okänt");
        a.year = Some(1999);
        assert_eq!(display_date(&a), "1999");
        a.date_full = Some("1999-12-24".to_string());
        assert_eq!(display_date(&a), "1999-12-24");
    }

    #[test]
    fn section_fields_in_fixed_order() {
        let mut a = analysis("Avhandlingen", DocType::Uppsats);
        a.institution = Some("Lunds universitet".to_string());
        a.institution_place = Some("Lund".to_string());
        a.thesis_type = Some("Doktorsavhandling".to_string());

        let mut out = Vec::new();
        document_section(&mut out, &a);
        let labels: Vec<Option<&str>> = out.iter().map(|p| p.label).collect();
        assert_eq!(
            labels,
            vec![None, Some("Författare"), Some("Datum"), Some("Lärosäte"), Some("Fil"), None]
        );
        assert_eq!(out[0].style, Style::Heading2);
        assert_eq!(out[3].text, "Lunds universitet, Lund (Doktorsavhandling)");
        assert_eq!(out[4].text, "Avhandlingen.pdf");
    }

    #[test]
    fn docx_is_readable_and_escaped() {
        let all = vec![analysis("Första", DocType::Artikel)];
        let bytes = ReportGenerator::new("Forskning")
            .render(&all, generated())
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("word/document.xml").unwrap(), &mut xml)
            .unwrap();
        assert!(xml.contains("Dokumentanalys: Forskning"));
        assert!(xml.contains("Artiklar (1)"));
        assert!(xml.contains("Sammanfattning &lt;med&gt; &amp; tecken."));
        assert_eq!(xml.matches(r#"<w:pStyle w:val="Heading2"/>"#).count(), 1);
        assert!(archive.by_name("word/styles.xml").is_ok());
    }
}
