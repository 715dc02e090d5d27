//! Core data models shared by the pipeline, the ledger and the renderers.
//!
//! An [`Analysis`] is the structured metadata the language model returns
//! for one document. A [`DocumentRecord`] is the ledger entry that marks a
//! file as processed and carries its analysis for later read-back.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Processed files keyed by absolute path.
pub type Ledger = BTreeMap<String, DocumentRecord>;

/// Closed set of document types. Anything the model invents lands in
/// [`DocType::Ovrigt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    Artikel,
    Uppsats,
    Bok,
    Predikan,
    Studie,
    Ovrigt,
}

impl DocType {
    pub const ALL: [DocType; 6] = [
        DocType::Artikel,
        DocType::Uppsats,
        DocType::Bok,
        DocType::Predikan,
        DocType::Studie,
        DocType::Ovrigt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Artikel => "artikel",
            DocType::Uppsats => "uppsats",
            DocType::Bok => "bok",
            DocType::Predikan => "predikan",
            DocType::Studie => "studie",
            DocType::Ovrigt => "övrigt",
        }
    }

    /// Case-insensitive lookup. `avhandling` is accepted as a thesis.
    pub fn from_known(name: &str) -> Option<DocType> {
        match name.trim().to_lowercase().as_str() {
            "artikel" => Some(DocType::Artikel),
            "uppsats" | "avhandling" => Some(DocType::Uppsats),
            "bok" => Some(DocType::Bok),
            "predikan" => Some(DocType::Predikan),
            "studie" => Some(DocType::Studie),
            "övrigt" | "ovrigt" => Some(DocType::Ovrigt),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> DocType {
        DocType::from_known(name).unwrap_or(DocType::Ovrigt)
    }

    /// Plural heading used in the report.
    pub fn heading(&self) -> &'static str {
        match self {
            DocType::Artikel => "Artiklar",
            DocType::Uppsats => "Uppsatser",
            DocType::Bok => "Böcker",
            DocType::Predikan => "Predikningar",
            DocType::Studie => "Studier",
            DocType::Ovrigt => "Övrigt",
        }
    }

    /// RIS `TY` reference type.
    pub fn ris_type(&self) -> &'static str {
        match self {
            DocType::Artikel => "JOUR",
            DocType::Uppsats => "THES",
            DocType::Bok => "BOOK",
            DocType::Studie => "RPRT",
            DocType::Predikan | DocType::Ovrigt => "GEN",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DocType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| DocType::parse(&s)).unwrap_or(DocType::Ovrigt))
    }
}

/// Structured metadata for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub title: String,
    /// `"Last, First"`; several authors separated by `;`.
    pub author: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    #[serde(default, deserialize_with = "lenient::number")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub date_full: Option<String>,
    pub is_citable: bool,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub publisher_place: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub pages_total: Option<u32>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub institution_place: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub thesis_type: Option<String>,

    /// Source file; set by the pipeline, never requested from the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
}

impl Analysis {
    pub fn file_name(&self) -> String {
        self.filepath
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Lowercase extension of the source file without the dot.
    pub fn extension(&self) -> Option<String> {
        self.filepath
            .as_deref()
            .and_then(Path::extension)
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

/// Ledger entry for one processed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(alias = "processed")]
    pub processed_at: NaiveDateTime,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Kept as raw JSON so that older or damaged entries survive a
    /// load/save cycle untouched. See [`DocumentRecord::analysis`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
}

impl DocumentRecord {
    pub fn new(analysis: &Analysis, processed_at: NaiveDateTime) -> serde_json::Result<Self> {
        Ok(Self {
            processed_at,
            title: Some(analysis.title.clone()),
            author: Some(analysis.author.clone()),
            analysis: Some(serde_json::to_value(analysis)?),
        })
    }

    /// The stored analysis, or `None` if absent or not schema-valid.
    pub fn analysis(&self) -> Option<Analysis> {
        self.analysis
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Tolerant decoders for model output: models return `"2019"` as often as
/// `2019`, and `""` where they mean null.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() || s.eq_ignore_ascii_case("null") {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn number<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64>,
    {
        let raw = match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        Ok(raw.and_then(|i| T::try_from(i).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "title": "Nådens ordning",
            "author": "Svensson, Anna",
            "summary": "En studie av nådens ordning i luthersk tradition.",
            "type": "studie",
            "year": 2019,
            "date_full": null,
            "is_citable": true
        })
    }

    #[test]
    fn unknown_type_becomes_ovrigt() {
        let mut v = base();
        v["type"] = json!("roman");
        let a: Analysis = serde_json::from_value(v).unwrap();
        assert_eq!(a.doc_type, DocType::Ovrigt);
    }

    #[test]
    fn type_is_case_insensitive_and_accepts_avhandling() {
        assert_eq!(DocType::parse("Artikel"), DocType::Artikel);
        assert_eq!(DocType::parse("AVHANDLING"), DocType::Uppsats);
        assert_eq!(DocType::parse("Övrigt"), DocType::Ovrigt);
    }

    #[test]
    fn year_accepts_numeric_string() {
        let mut v = base();
        v["year"] = json!("1987");
        let a: Analysis = serde_json::from_value(v).unwrap();
        assert_eq!(a.year, Some(1987));
    }

    #[test]
    fn year_with_text_is_null() {
        let mut v = base();
        v["year"] = json!("okänt");
        let a: Analysis = serde_json::from_value(v).unwrap();
        assert_eq!(a.year, None);
    }

    #[test]
    fn empty_optional_strings_are_null() {
        let mut v = base();
        v["publisher"] = json!("  ");
        v["isbn"] = json!(9789100000000u64);
        let a: Analysis = serde_json::from_value(v).unwrap();
        assert_eq!(a.publisher, None);
        assert_eq!(a.isbn.as_deref(), Some("9789100000000"));
    }

    #[test]
    fn missing_required_field_fails() {
        let mut v = base();
        v.as_object_mut().unwrap().remove("is_citable");
        assert!(serde_json::from_value::<Analysis>(v).is_err());
    }

    #[test]
    fn record_reads_legacy_processed_key() {
        let rec: DocumentRecord = serde_json::from_value(json!({
            "processed": "2024-03-01T10:15:30.123456",
            "title": "Gammal post",
            "author": "Okänd"
        }))
        .unwrap();
        assert!(rec.analysis.is_none());
        assert!(rec.analysis().is_none());
    }

    #[test]
    fn record_with_damaged_analysis_yields_none() {
        let rec = DocumentRecord {
            processed_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            title: None,
            author: None,
            analysis: Some(json!({"title": "only a title"})),
        };
        assert!(rec.analysis().is_none());
    }

    #[test]
    fn ris_types() {
        assert_eq!(DocType::Artikel.ris_type(), "JOUR");
        assert_eq!(DocType::Uppsats.ris_type(), "THES");
        assert_eq!(DocType::Bok.ris_type(), "BOOK");
        assert_eq!(DocType::Studie.ris_type(), "RPRT");
        assert_eq!(DocType::Predikan.ris_type(), "GEN");
    }
}
