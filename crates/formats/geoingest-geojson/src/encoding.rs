//! Candidate text encodings for uploaded JSON documents.

use std::fmt;

use geoingest_shared::{SourcePosition, SpatialFormatReadError, SpatialFormatResult};
use serde_json::Value as JsonValue;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Text encodings tried when decoding an upload, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Plain UTF-8.
    Utf8,
    /// UTF-8 preceded by a byte order mark.
    Utf8Bom,
    /// ISO 8859-1; every byte maps to the code point of the same value.
    Latin1,
    /// Windows code page 1252.
    Windows1252,
}

impl TextEncoding {
    /// Candidate encodings in the order they are attempted.
    pub const CANDIDATES: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Utf8Bom,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    /// Returns the label of this encoding.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8-sig",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Decodes `bytes`, returning `None` when they are not valid in this encoding.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Utf8Bom => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            },
            TextEncoding::Latin1 => Some(bytes.iter().map(|&byte| char::from(byte)).collect()),
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(std::borrow::Cow::into_owned),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes `bytes` under the first candidate encoding that yields JSON.
///
/// The text counts as JSON when it is a single JSON value or, failing that,
/// a sequence of newline-delimited JSON values.
///
/// # Errors
///
/// Returns [`SpatialFormatReadError::Encoding`] when no candidate encoding
/// produces parseable JSON.
pub fn decode_json(bytes: &[u8]) -> SpatialFormatResult<(TextEncoding, Vec<JsonValue>)> {
    for encoding in TextEncoding::CANDIDATES {
        let Some(text) = encoding.decode(bytes) else {
            log::debug!("Upload is not valid {encoding}");
            continue;
        };
        match parse_json_text(&text) {
            Ok(documents) => {
                log::debug!("Decoded upload as {encoding}");
                return Ok((encoding, documents));
            },
            Err(err) => log::debug!("Upload decoded as {encoding} is not JSON: {err}"),
        }
    }

    Err(SpatialFormatReadError::Encoding {
        attempted: TextEncoding::CANDIDATES
            .iter()
            .map(|encoding| encoding.as_str().to_string())
            .collect(),
        context: None,
    })
}

fn parse_json_text(text: &str) -> SpatialFormatResult<Vec<JsonValue>> {
    match serde_json::from_str::<JsonValue>(text) {
        Ok(value) => Ok(vec![value]),
        Err(document_err) => {
            let mut documents = Vec::new();
            for (index, line) in text.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value = serde_json::from_str(line).map_err(|err| {
                    SpatialFormatReadError::Parse {
                        message: format!(
                            "not a JSON document ({document_err}) nor a JSON sequence: {err}"
                        ),
                        position: Some(SourcePosition {
                            line: Some(index as u64 + 1),
                            ..SourcePosition::default()
                        }),
                        context: None,
                    }
                })?;
                documents.push(value);
            }
            if documents.is_empty() {
                return Err(SpatialFormatReadError::parse(format!(
                    "empty document: {document_err}"
                )));
            }
            Ok(documents)
        },
    }
}
