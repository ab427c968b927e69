//! Document intake: loading files and extracting their text.
//!
//! [`FileLoader`] turns a path into one preliminary [`Chunk`] named after the
//! file. [`ExtParser`] then replaces its content with text extracted by a
//! parser chosen from the file extension:
//!
//! | Extension | Parser |
//! |-----------|--------|
//! | `.html`, `.htm` | tag-stripping HTML text extraction |
//! | `.pdf` | `pdf-extract` (feature `pdf`) |
//! | `.txt`, `.md`, anything else | plain UTF-8 text |

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Chunk, META_EXTENSION, META_FILE_NAME, META_SOURCE, META_URI};
use crate::error::{RagError, Result};

/// Reads a file into a single preliminary chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load `path`. The chunk id is the file name and the content is the
    /// file's bytes decoded as lossy UTF-8.
    pub async fn load(&self, path: &Path) -> Result<Chunk> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RagError::InputError(format!("'{}' has no file name", path.display())))?;
        let uri = path.to_string_lossy().into_owned();

        debug!(file = %file_name, bytes = bytes.len(), "loaded file");
        Ok(Chunk::new(file_name.clone(), String::from_utf8_lossy(&bytes).into_owned())
            .with_metadata(META_SOURCE, uri.clone())
            .with_metadata(META_URI, uri)
            .with_metadata(META_FILE_NAME, file_name)
            .with_metadata(META_EXTENSION, extension_of(path)))
    }
}

/// Lower-cased extension with its leading dot, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// The parser picked for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Html,
    Pdf,
    Text,
}

impl ParserKind {
    /// Choose a parser from a lower-cased extension such as `.pdf`.
    pub fn for_extension(extension: &str) -> Self {
        match extension {
            ".html" | ".htm" => Self::Html,
            ".pdf" => Self::Pdf,
            _ => Self::Text,
        }
    }
}

/// Dispatches to a text extractor by file extension.
///
/// When the chunk carries a `uri`, the raw bytes are re-read from that path
/// so binary formats are not seen through the loader's lossy decoding. If
/// extraction fails the chunk keeps its loaded content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtParser;

impl ExtParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse(&self, mut chunk: Chunk) -> Result<Chunk> {
        let (kind, bytes) = match chunk.uri().map(str::to_owned) {
            Some(uri) => {
                let kind = ParserKind::for_extension(&extension_of(Path::new(&uri)));
                (kind, tokio::fs::read(&uri).await?)
            }
            None => {
                let extension =
                    chunk.metadata.get(META_EXTENSION).and_then(Value::as_str).unwrap_or_default();
                (ParserKind::for_extension(extension), chunk.content.clone().into_bytes())
            }
        };

        match extract(kind, &bytes) {
            Ok(text) => {
                debug!(document = %chunk.id, parser = ?kind, chars = text.chars().count(), "parsed document");
                chunk.content = text;
            }
            Err(e) => {
                warn!(document = %chunk.id, parser = ?kind, error = %e, "parse failed, keeping loaded content");
            }
        }
        Ok(chunk)
    }
}

fn extract(kind: ParserKind, bytes: &[u8]) -> Result<String> {
    match kind {
        ParserKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        ParserKind::Html => Ok(html_to_text(&String::from_utf8_lossy(bytes))),
        ParserKind::Pdf => pdf_to_text(bytes),
    }
}

#[cfg(feature = "pdf")]
fn pdf_to_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RagError::ParseError(format!("pdf extraction failed: {e}")))
}

#[cfg(not(feature = "pdf"))]
fn pdf_to_text(_bytes: &[u8]) -> Result<String> {
    Err(RagError::ParseError("pdf support is not enabled".to_string()))
}

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
        .expect("static pattern")
});
static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("static pattern")
});
static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/li|/tr|/h[1-6]|/title)\b[^>]*>")
        .expect("static pattern")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static pattern"));
static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\f]+").expect("static pattern"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("static pattern"));

/// Extract readable text from HTML markup.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(html, "");
    let text = COMMENT.replace_all(&text, "");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let text = SPACES.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n").trim().to_string()
}
