//! Content-Type routing and charset handling.
//!
//! Only bodies declared as `text/html` go through the markup rewriter.
//! The prefix check is case-sensitive and applied to the value exactly as
//! the upstream sent it.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

/// Which branch of the pipeline a response body takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Parse, rewrite and re-serialize.
    Html,
    /// Return the upstream bytes unchanged.
    Opaque,
}

impl BodyKind {
    /// Classify a response by its declared Content-Type.
    pub fn classify(content_type: Option<&str>) -> Self {
        match content_type {
            Some(value) if value.starts_with("text/html") => BodyKind::Html,
            _ => BodyKind::Opaque,
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Html => "html",
            BodyKind::Opaque => "passthrough",
        }
    }
}

/// Pick the encoding of an HTML body.
///
/// Order: `charset` parameter of the Content-Type, then a `charset=`
/// declaration in the first 8 KiB of the document, then UTF-8.
pub fn html_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_html_prefix(body))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode `body` with `encoding`, replacing malformed sequences.
pub fn decode<'a>(body: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let (text, _, _) = encoding.decode(body);
    text
}

/// Encode rewritten text back with the document's encoding.
///
/// Encodings that cannot be produced (UTF-16) fall back to UTF-8, matching
/// `encoding_rs` semantics.
pub fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    for part in content_type.split(';').skip(1) {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("charset") {
            continue;
        }

        let label = value.trim().trim_matches('"').trim_matches('\'');
        if !label.is_empty() {
            return Some(label.to_owned());
        }
    }

    None
}

fn charset_from_html_prefix(body: &[u8]) -> Option<String> {
    let prefix_len = body.len().min(8192);
    let prefix = String::from_utf8_lossy(&body[..prefix_len]);
    let lower = prefix.to_ascii_lowercase();
    let mut search_start = 0;

    while let Some(relative) = lower[search_start..].find("charset=") {
        let charset_start = search_start + relative + "charset=".len();
        if let Some(label) = charset_label(&prefix[charset_start..]) {
            return Some(label);
        }
        search_start = charset_start;
    }

    None
}

fn charset_label(input: &str) -> Option<String> {
    let trimmed = input.trim_start();
    let first = trimmed.chars().next()?;

    let label = if first == '"' || first == '\'' {
        let rest = &trimmed[first.len_utf8()..];
        let end = rest.find(first)?;
        rest[..end].trim()
    } else {
        let end = trimmed
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '"' | '\'' | ';' | '>' | '/'))
            .unwrap_or(trimmed.len());
        trimmed[..end].trim()
    };

    if label.is_empty() {
        None
    } else {
        Some(label.to_owned())
    }
}
