//! Uploaded file validation and processing

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

use crate::config::{allowed_mime_type, ALLOWED_EXTENSIONS, MAX_FILE_SIZE_BYTES, MAX_FILE_SIZE_MB};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("File type '{extension}' is not supported. Allowed: {allowed}")]
    UnsupportedType { extension: String, allowed: String },

    #[error("File size exceeds {}MB limit", MAX_FILE_SIZE_MB)]
    TooLarge,
}

/// An accepted upload, ready to be turned into content blocks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFile {
    pub name: String,
    pub mime_type: String,
    /// Base64 of the raw bytes
    #[serde(skip_serializing)]
    pub data: String,
    /// Present for text-like and Word files
    #[serde(skip_serializing)]
    pub extracted_text: Option<String>,
}

/// A file the client sent that was not accepted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedFile {
    pub filename: String,
    pub error: String,
}

/// Lower-cased extension including the dot, or "" when there is none
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn validate_file(filename: &str, size: usize) -> Result<(), AttachmentError> {
    let extension = extension_of(filename);
    if allowed_mime_type(&extension).is_none() {
        let allowed = ALLOWED_EXTENSIONS
            .iter()
            .map(|(ext, _)| *ext)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AttachmentError::UnsupportedType { extension, allowed });
    }

    if size > MAX_FILE_SIZE_BYTES {
        return Err(AttachmentError::TooLarge);
    }

    Ok(())
}

pub fn mime_type_for(filename: &str) -> &'static str {
    allowed_mime_type(&extension_of(filename)).unwrap_or(FALLBACK_MIME_TYPE)
}

/// Validate an upload, encode it and extract any text it carries
pub fn process_file(filename: &str, bytes: &[u8]) -> Result<ProcessedFile, AttachmentError> {
    validate_file(filename, bytes.len())?;

    let extracted_text = match extension_of(filename).as_str() {
        ".txt" | ".md" | ".csv" => Some(decode_text(bytes)),
        ".docx" | ".doc" => Some(extract_docx_text(bytes)),
        _ => None,
    };

    Ok(ProcessedFile {
        name: filename.to_string(),
        mime_type: mime_type_for(filename).to_string(),
        data: STANDARD.encode(bytes),
        extracted_text,
    })
}

/// UTF-8, falling back to Latin-1 (every byte maps to one char)
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Paragraph text of a Word document, one paragraph per line
///
/// Never fails; unreadable documents yield a bracketed notice instead.
pub fn extract_docx_text(bytes: &[u8]) -> String {
    match read_docx_paragraphs(bytes) {
        Ok(paragraphs) => paragraphs.join("\n"),
        Err(e) => format!("[Could not extract text from document: {}]", e),
    }
}

fn read_docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    let run = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>").map_err(|e| e.to_string())?;
    let entity = Regex::new(r"&(?:#x([0-9A-Fa-f]+)|#([0-9]+)|(lt|gt|quot|apos|amp));")
        .map_err(|e| e.to_string())?;

    let body = xml.split("</w:body>").next().unwrap_or(&xml);
    let mut parts = body.split("</w:p>").collect::<Vec<_>>();
    // Whatever follows the last paragraph end is section properties
    parts.pop();

    Ok(parts
        .into_iter()
        .map(|paragraph| {
            run.captures_iter(paragraph)
                .map(|cap| match cap.get(1) {
                    Some(text) => unescape_xml(&entity, text.as_str()),
                    None => "\t".to_string(),
                })
                .collect::<String>()
        })
        .collect())
}

/// Decode named and numeric character references in one pass
///
/// References that do not name a valid character are kept as written.
fn unescape_xml(entity: &Regex, text: &str) -> String {
    entity
        .replace_all(text, |cap: &regex::Captures| {
            let decoded = if let Some(hex) = cap.get(1) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
            } else if let Some(dec) = cap.get(2) {
                dec.as_str()
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
            } else {
                cap.get(3).map(|name| {
                    match name.as_str() {
                        "lt" => "<",
                        "gt" => ">",
                        "quot" => "\"",
                        "apos" => "'",
                        _ => "&",
                    }
                    .to_string()
                })
            };
            decoded.unwrap_or_else(|| cap[0].to_string())
        })
        .into_owned()
}

/// Icon for a MIME family
pub fn file_icon(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        "🖼️"
    } else if mime_type == "application/pdf" {
        "📕"
    } else if mime_type.contains("word") {
        "📘"
    } else if mime_type.starts_with("text/") {
        "📄"
    } else {
        "📎"
    }
}

/// Name with an icon for the attachment chips
pub fn display_label(file: &ProcessedFile) -> String {
    let mime = file.mime_type.as_str();
    let icon = if mime.starts_with("image/") {
        "📷"
    } else if mime == "application/pdf" {
        "📄"
    } else if mime.contains("word") || mime == "application/msword" {
        "📝"
    } else if mime.starts_with("text/") {
        "📃"
    } else {
        "📎"
    };
    format!("{} {}", icon, file.name)
}
