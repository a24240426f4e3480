//! Multipart content encoding for user turns that include media.
//!
//! Turns [`ContentPart`]s into the `[{type: "text"}, {type: "image_url"}]`
//! array the Chat Completions API expects.

use std::path::PathBuf;

use base64::Engine;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while encoding content parts.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A text file part could not be read.
    #[error("failed to read text file '{path}': {source}")]
    ReadFile {
        /// Path of the file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// One entry of a multipart user turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// Inline text.
    Text(String),
    /// Inline media, sent as a base64 data URL.
    Media {
        /// Raw bytes.
        data: Vec<u8>,
        /// MIME type, e.g. `image/png`.
        mime: String,
    },
    /// A text file whose contents are inlined.
    TextFile(PathBuf),
    /// Remote media referenced by URL.
    Url(String),
}

/// A wire-level content array entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireContentPart {
    /// `{"type": "text", "text": ...}`
    Text { text: String },
    /// `{"type": "image_url", "image_url": {"url": ...}}`
    ImageUrl { image_url: ImageUrl },
}

/// URL wrapper inside an `image_url` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl WireContentPart {
    fn text(text: impl Into<String>) -> Self {
        WireContentPart::Text { text: text.into() }
    }

    fn image(url: impl Into<String>) -> Self {
        WireContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// Strips role-echo prefixes (such as `### ` or `@user`) from the edges of a turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefixTrimmer {
    prefixes: Vec<String>,
}

impl PrefixTrimmer {
    /// Create a trimmer for the given prefixes. Blank prefixes are ignored.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.into().trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Trim leading whitespace and one leading prefix.
    pub fn trim_leading<'a>(&self, text: &'a str) -> &'a str {
        let text = text.trim_start();
        self.prefixes
            .iter()
            .find_map(|p| text.strip_prefix(p.as_str()))
            .map_or(text, str::trim_start)
    }

    /// Trim trailing whitespace and one trailing prefix.
    pub fn trim_trailing<'a>(&self, text: &'a str) -> &'a str {
        let text = text.trim_end();
        self.prefixes
            .iter()
            .find_map(|p| text.strip_suffix(p.as_str()))
            .map_or(text, str::trim_end)
    }
}

/// Build a `data:` URL for inline media.
pub fn data_url(mime: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// Encode content parts into a wire content array.
///
/// The first and last parts, when they are text, are trimmed with `trimmer`;
/// interior text is left alone. Empty text never reaches the wire. Output
/// order follows input order.
///
/// # Errors
///
/// Returns [`ContentError::ReadFile`] if a [`ContentPart::TextFile`] cannot be read.
///
/// # Examples
///
/// ```
/// use chatwire_core::content::{ContentPart, PrefixTrimmer, encode_parts};
///
/// let parts = vec![
///     ContentPart::Text(String::new()),
///     ContentPart::Media { data: vec![1, 2, 3], mime: "image/png".to_string() },
/// ];
/// let wire = encode_parts(&parts, &PrefixTrimmer::default()).unwrap();
/// assert_eq!(wire.len(), 1);
/// ```
pub fn encode_parts(
    parts: &[ContentPart],
    trimmer: &PrefixTrimmer,
) -> Result<Vec<WireContentPart>, ContentError> {
    let last = parts.len().saturating_sub(1);
    let mut wire = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        match part {
            ContentPart::Text(text) => {
                let mut text = text.as_str();
                if i == 0 {
                    text = trimmer.trim_leading(text);
                }
                if i == last {
                    text = trimmer.trim_trailing(text);
                }
                if !text.is_empty() {
                    wire.push(WireContentPart::text(text));
                }
            }
            ContentPart::Media { data, mime } => {
                wire.push(WireContentPart::image(data_url(mime, data)));
            }
            ContentPart::TextFile(path) => {
                let text =
                    std::fs::read_to_string(path).map_err(|source| ContentError::ReadFile {
                        path: path.clone(),
                        source,
                    })?;
                if !text.is_empty() {
                    wire.push(WireContentPart::text(text));
                }
            }
            ContentPart::Url(url) => wire.push(WireContentPart::image(url.as_str())),
        }
    }

    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ContentPart {
        ContentPart::Text(s.to_string())
    }

    #[test]
    fn test_empty_text_dropped_media_encoded() {
        let parts = vec![
            text(""),
            ContentPart::Media {
                data: b"\x89PNG".to_vec(),
                mime: "image/png".to_string(),
            },
        ];
        let wire = encode_parts(&parts, &PrefixTrimmer::default()).unwrap();
        assert_eq!(wire.len(), 1);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json[0]["type"], "image_url");
        assert_eq!(json[0]["image_url"]["url"], "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_text_part_serialization() {
        let wire = encode_parts(&[text("Hello")], &PrefixTrimmer::default()).unwrap();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json, serde_json::json!([{"type": "text", "text": "Hello"}]));
    }

    #[test]
    fn test_only_edge_text_is_trimmed() {
        let trimmer = PrefixTrimmer::new(["### "]);
        let parts = vec![
            text("  ### What is in"),
            ContentPart::Url("https://example.com/cat.png".to_string()),
            text("### middle stays  "),
            ContentPart::Url("https://example.com/dog.png".to_string()),
            text("and this?\n\n###"),
        ];
        let wire = encode_parts(&parts, &trimmer).unwrap();
        assert_eq!(wire.len(), 5);
        assert_eq!(wire[0], WireContentPart::text("What is in"));
        assert_eq!(wire[2], WireContentPart::text("### middle stays  "));
        assert_eq!(wire[4], WireContentPart::text("and this?"));
    }

    #[test]
    fn test_single_text_trimmed_both_ends() {
        let trimmer = PrefixTrimmer::new(["@user"]);
        let wire = encode_parts(&[text("@user  hi there \n")], &trimmer).unwrap();
        assert_eq!(wire, vec![WireContentPart::text("hi there")]);
    }

    #[test]
    fn test_text_that_is_only_a_prefix_is_dropped() {
        let trimmer = PrefixTrimmer::new(["###"]);
        let parts = vec![
            text("### "),
            ContentPart::Url("https://example.com/a.png".to_string()),
        ];
        let wire = encode_parts(&parts, &trimmer).unwrap();
        assert_eq!(
            wire,
            vec![WireContentPart::image("https://example.com/a.png")]
        );
    }

    #[test]
    fn test_remote_url_passes_through() {
        let url = "https://example.com/image.jpg?size=large";
        let wire = encode_parts(&[ContentPart::Url(url.to_string())], &PrefixTrimmer::default())
            .unwrap();
        assert_eq!(wire, vec![WireContentPart::image(url)]);
    }

    #[test]
    fn test_text_file_is_inlined() {
        let path = std::env::temp_dir().join("chatwire_content_test.txt");
        std::fs::write(&path, "file body").unwrap();

        let parts = vec![text("Summarize:"), ContentPart::TextFile(path.clone())];
        let wire = encode_parts(&parts, &PrefixTrimmer::default()).unwrap();
        assert_eq!(
            wire,
            vec![
                WireContentPart::text("Summarize:"),
                WireContentPart::text("file body"),
            ]
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_text_file_is_an_error() {
        let parts = vec![ContentPart::TextFile(PathBuf::from(
            "/nonexistent/chatwire/notes.txt",
        ))];
        let result = encode_parts(&parts, &PrefixTrimmer::default());
        assert!(matches!(result, Err(ContentError::ReadFile { .. })));
    }

    #[test]
    fn test_blank_prefixes_ignored() {
        let trimmer = PrefixTrimmer::new(["", "   "]);
        assert_eq!(trimmer, PrefixTrimmer::default());
    }
}
