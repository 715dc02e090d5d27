//! Text extraction, one extractor per document format.
//!
//! The [`ExtractorRegistry`] maps a normalized file extension to a
//! [`ContentExtractor`]. An extension without an extractor is simply absent
//! from the registry; [`ExtractorRegistry::extract_content`] turns that and
//! every read failure into `None` plus a warning, so the pipeline can treat
//! them all as "no content".

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::normalize_extension;
use crate::error::ExtractError;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Reads the text of one kind of document.
pub trait ContentExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// `.txt` and `.md`, decoded as UTF-8 with invalid bytes replaced.
pub struct PlainText;

/// `.docx`: paragraphs of `word/document.xml`.
pub struct RichDocument;

/// `.pptx`: slides in presentation order.
pub struct SlideDeck;

/// `.pdf` via `pdf-extract`.
pub struct PortableDocument;

impl ContentExtractor for PlainText {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl ContentExtractor for RichDocument {
    fn name(&self) -> &'static str {
        "rich-document"
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        let mut archive = open_zip(&bytes)?;
        let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
        ooxml_text(&xml)
    }
}

impl ContentExtractor for SlideDeck {
    fn name(&self) -> &'static str {
        "slide-deck"
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        let mut archive = open_zip(&bytes)?;
        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|n| {
                let number = n
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()?;
                Some((number, n.to_string()))
            })
            .collect();
        slides.sort();

        let mut out = String::new();
        for (_, name) in slides {
            let xml = read_zip_entry_bounded(&mut archive, &name)?;
            let text = ooxml_text(&xml)?;
            if text.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&text);
        }
        Ok(out)
    }
}

impl ContentExtractor for PortableDocument {
    fn name(&self) -> &'static str {
        "portable-document"
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        // pdf-extract panics on some malformed files instead of returning an error.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes)) {
            Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
            Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
        }
    }
}

/// Extractors keyed by lowercase extension without the dot.
pub struct ExtractorRegistry {
    extractors: HashMap<String, Box<dyn ContentExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("txt", Box::new(PlainText));
        registry.register("md", Box::new(PlainText));
        registry.register("docx", Box::new(RichDocument));
        registry.register("pptx", Box::new(SlideDeck));
        registry.register("pdf", Box::new(PortableDocument));
        registry
    }
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    pub fn register(&mut self, extension: &str, extractor: Box<dyn ContentExtractor>) {
        self.extractors
            .insert(normalize_extension(extension), extractor);
    }

    pub fn get(&self, extension: &str) -> Option<&dyn ContentExtractor> {
        self.extractors
            .get(&normalize_extension(extension))
            .map(|e| e.as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn ContentExtractor> {
        self.get(&path.extension()?.to_string_lossy())
    }

    /// Extracted text, or `None` when there is no extractor or reading fails.
    pub fn extract_content(&self, path: &Path) -> Option<String> {
        let Some(extractor) = self.for_path(path) else {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            tracing::warn!(file = %path.display(), "{}", ExtractError::Unsupported(ext));
            return None;
        };

        match extractor.extract(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    extractor = extractor.name(),
                    error = %e,
                    "could not read file"
                );
                None
            }
        }
    }
}

fn open_zip(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Text runs (`<w:t>`, `<a:t>`) of a WordprocessingML or DrawingML part,
/// one line per paragraph.
fn ooxml_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let text = t.unescape().map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}
