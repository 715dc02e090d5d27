//! Metadata extraction.
//!
//! Builds one prompt per document from its filename and (truncated) text,
//! asks the [`CompletionModel`] for a JSON object matching the [`Analysis`]
//! schema, and validates the reply. A reply that does not parse is a failure
//! for that file; nothing is retried here.

use std::path::Path;

use crate::error::AnalysisError;
use crate::llm::CompletionModel;
use crate::models::Analysis;

/// Author values the model uses when it cannot tell.
const UNKNOWN_AUTHORS: &[&str] = &["okänd", "unknown"];

const PROMPT_TEMPLATE: &str = r#"Analysera följande dokument och svara ENDAST med ett JSON-objekt, utan annan text, enligt detta schema:
{
  "title": "dokumentets titel, eller ett beskrivande namn om titel saknas",
  "author": "författare i formatet \"Efternamn, Förnamn\"; flera författare separeras med semikolon; \"Okänd\" om det inte framgår",
  "summary": "sammanfattning på svenska, 10-50 ord beroende på innehållets komplexitet",
  "type": "exakt ett av: artikel, uppsats, bok, predikan, studie, övrigt",
  "year": utgivningsår som heltal, eller null,
  "date_full": "fullständigt datum som ÅÅÅÅ-MM-DD, eller null",
  "is_citable": true om det är en akademisk artikel, uppsats, bok eller studie, annars false,
  "publication": "tidskrift eller publikation (endast artikel), eller null",
  "publisher": "förlag (endast bok), eller null",
  "publisher_place": "förlagsort (endast bok), eller null",
  "isbn": "ISBN (endast bok), eller null",
  "pages_total": antal sidor som heltal (endast bok), eller null,
  "edition": "upplaga (endast bok), eller null",
  "institution": "lärosäte (endast uppsats), eller null",
  "institution_place": "lärosätets ort (endast uppsats), eller null",
  "thesis_type": "typ av uppsats, t.ex. kandidatuppsats eller doktorsavhandling (endast uppsats), eller null"
}

Filnamn: {filename}

Dokumentets innehåll (kan vara avkortat):
{content}
"#;

pub struct MetadataExtractor<'a> {
    model: &'a dyn CompletionModel,
    max_chars: usize,
    default_author: String,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(model: &'a dyn CompletionModel, max_chars: usize, default_author: &str) -> Self {
        Self {
            model,
            max_chars,
            default_author: default_author.to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Analyzes one document. The returned analysis has `filepath` set.
    pub async fn extract(&self, path: &Path, content: &str) -> Result<Analysis, AnalysisError> {
        let prompt = build_prompt(path, content, self.max_chars);
        let reply = self
            .model
            .complete(&prompt)
            .await
            .map_err(AnalysisError::Service)?;

        let mut analysis = parse_analysis(&reply)?;
        if is_unknown_author(&analysis.author) {
            analysis.author = self.default_author.clone();
        }
        analysis.filepath = Some(path.to_path_buf());
        Ok(analysis)
    }
}

pub fn build_prompt(path: &Path, content: &str, max_chars: usize) -> String {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    PROMPT_TEMPLATE
        .replace("{filename}", &filename)
        .replace("{content}", truncate_chars(content, max_chars))
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parses a model reply, stripping a surrounding Markdown code fence.
pub fn parse_analysis(reply: &str) -> Result<Analysis, AnalysisError> {
    let json = strip_code_fence(reply);
    if json.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    Ok(serde_json::from_str(json)?)
}

/// Returns the body of the first fenced block (```` ``` ```` or
/// ```` ```json ````), ignoring prose before the opening and after the
/// closing fence. Unfenced input is returned trimmed.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[start + 3..];
    // Drop the info string (`json`, `JSON`, ...) up to the end of the fence line.
    let body = match after_open.find('\n') {
        Some(i) => &after_open[i + 1..],
        None => after_open.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn is_unknown_author(author: &str) -> bool {
    let author = author.trim().to_lowercase();
    author.is_empty() || UNKNOWN_AUTHORS.contains(&author.as_str())
}
