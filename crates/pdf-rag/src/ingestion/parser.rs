//! PDF text extraction, one entry per page

use lopdf::Document;
use std::path::Path;

use crate::error::{Error, Result};

/// Text extracted from a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Page number (1-indexed)
    pub number: u32,
    /// Cleaned text of the page
    pub text: String,
}

/// Replace typographic characters that PDF fonts commonly emit with ASCII
fn normalize_glyphs(text: &str) -> String {
    text.replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Clean up extracted page text
///
/// Lines are trimmed and runs of blank lines collapse into one, so paragraph
/// breaks survive as `"\n\n"` for the splitter.
fn cleanup_page_text(text: &str) -> String {
    let normalized = normalize_glyphs(text);
    let mut out = String::with_capacity(normalized.len());
    let mut pending_blank = false;

    for line in normalized.lines().map(str::trim) {
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        pending_blank = false;
    }

    out
}

/// PDF parser built on lopdf
pub struct PdfParser;

impl PdfParser {
    /// Parse PDF bytes into per-page text
    ///
    /// Pages without extractable text are left out. Fails with
    /// `Error::Processing` when the bytes are not a readable PDF.
    pub fn parse(filename: &str, data: &[u8]) -> Result<Vec<PageText>> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::processing(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(Error::processing(filename, "PDF has no pages"));
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        for number in page_numbers {
            match doc.extract_text(&[number]) {
                Ok(raw) => {
                    let text = cleanup_page_text(&raw);
                    if text.is_empty() {
                        tracing::debug!("{} page {} has no text", filename, number);
                    } else {
                        pages.push(PageText { number, text });
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not extract text from {} page {}: {}", filename, number, e);
                }
            }
        }

        if pages.is_empty() {
            tracing::warn!("{} has no extractable text, it may be image-based", filename);
        }

        Ok(pages)
    }

    /// Read and parse a PDF file
    pub fn parse_file(path: &Path) -> Result<Vec<PageText>> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf");
        let data = std::fs::read(path).map_err(|e| Error::processing(filename, e.to_string()))?;
        Self::parse(filename, &data)
    }
}
