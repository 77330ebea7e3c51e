//! Tolerant extraction of JSON objects from model output.
//!
//! Chat models wrap structured answers in prose or markdown fences. The
//! parser keeps everything between the first `{` and the last `}` and
//! deserializes it into a strict schema type.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a model response could not be read as the expected object.
#[derive(Debug, Error)]
pub enum MalformedOutput {
    /// The text contains no `{ ... }` span.
    #[error("no JSON object found in model output")]
    NoJsonObject,

    /// A span was found but does not match the schema.
    #[error("invalid JSON object: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Locate the outermost `{ ... }` span in `raw`.
fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse the first JSON object embedded in `raw` into `T`.
///
/// # Errors
///
/// Returns [`MalformedOutput::NoJsonObject`] when no braces are present and
/// [`MalformedOutput::Invalid`] when the span fails to deserialize.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, MalformedOutput> {
    let span = json_span(raw).ok_or(MalformedOutput::NoJsonObject)?;
    Ok(serde_json::from_str(span)?)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Label {
        scope: String,
    }

    #[test]
    fn parses_object_surrounded_by_prose() {
        let raw = "Sure! Here it is:\n```json\n{\"scope\": \"all\"}\n```\nHope that helps.";
        let label: Label = extract_json(raw).unwrap();
        assert_eq!(label, Label { scope: "all".into() });
    }

    #[test]
    fn text_without_braces_is_no_object() {
        let err = extract_json::<Label>("I think it is the whole corpus").unwrap_err();
        assert!(matches!(err, MalformedOutput::NoJsonObject));
    }

    #[test]
    fn reversed_braces_are_no_object() {
        let err = extract_json::<Label>("} oops {").unwrap_err();
        assert!(matches!(err, MalformedOutput::NoJsonObject));
    }

    #[test]
    fn missing_key_is_invalid() {
        let err = extract_json::<Label>("{\"kind\": \"all\"}").unwrap_err();
        assert!(matches!(err, MalformedOutput::Invalid(_)));
    }
}
