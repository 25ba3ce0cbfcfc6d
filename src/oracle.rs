//! AI selector oracle.
//!
//! The oracle is an external completion service: one text prompt in, one
//! text reply out. Everything past the transport lives here: the trait the
//! discovery protocol calls and the lenient parsing of the reply into an
//! [`OracleReply`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::OracleError;
use crate::selector::{SelectorField, SelectorMap};

/// A completion service that proposes selector maps.
#[async_trait]
pub trait SelectorOracle: Send + Sync {
    /// Send `prompt` and return the raw reply text.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// A parsed oracle reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OracleReply {
    pub selectors: SelectorMap,
    pub structure: Option<String>,
    /// Self-reported confidence, clamped to [0, 1].
    pub confidence: f64,
}

#[derive(Deserialize)]
struct RawReply {
    #[serde(default)]
    selectors: Option<Value>,
    #[serde(default)]
    structure: Option<Value>,
    #[serde(default)]
    confidence: Option<Value>,
}

/// Strip a surrounding Markdown code fence, if any.
#[must_use]
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the first newline.
    let body = after.find('\n').map_or(after, |nl| {
        if after[..nl].chars().all(char::is_alphanumeric) {
            &after[nl + 1..]
        } else {
            after
        }
    });
    body.find("```").map_or(body, |end| &body[..end]).trim()
}

/// The outermost `{ ... }` span of `text`.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

impl OracleReply {
    /// Parse a raw reply.
    ///
    /// Code fences and prose around the JSON object are tolerated. A reply
    /// without a `selectors` object is read as a bare selector map. Blank
    /// selectors count as absent.
    ///
    /// # Errors
    ///
    /// [`OracleError::Malformed`] when no JSON object can be read or it names
    /// no selector at all.
    pub fn parse(reply: &str) -> Result<Self, OracleError> {
        let body = strip_code_blocks(reply);
        let span = json_object_span(body)
            .ok_or_else(|| OracleError::Malformed("no JSON object in reply".into()))?;
        let root: Value =
            serde_json::from_str(span).map_err(|e| OracleError::Malformed(e.to_string()))?;
        let raw: RawReply =
            serde_json::from_value(root.clone()).map_err(|e| OracleError::Malformed(e.to_string()))?;

        let selector_value = match raw.selectors {
            Some(value @ Value::Object(_)) => value,
            Some(_) => return Err(OracleError::Malformed("`selectors` is not an object".into())),
            None => root,
        };
        let selectors = selectors_from_value(&selector_value);
        if selectors.is_empty() {
            return Err(OracleError::Malformed("reply names no selectors".into()));
        }

        let structure = match raw.structure {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Null | Value::String(_)) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            selectors,
            structure,
            confidence: parse_confidence(raw.confidence.as_ref()),
        })
    }
}

/// Field-by-field read so one ill-typed field does not sink the reply.
fn selectors_from_value(value: &Value) -> SelectorMap {
    let mut map = SelectorMap::default();
    for field in SelectorField::ALL {
        if let Some(Value::String(sel)) = value.get(field.as_str()) {
            map.set(field, Some(sel.clone()));
        }
    }
    map
}

fn parse_confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().map_or(0.0, |v| {
            if s.trim().ends_with('%') {
                v / 100.0
            } else {
                v
            }
        }),
        _ => 0.0,
    };
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("Here you go:\n```JSON\n{\"a\":1}\n```\nDone."), "{\"a\":1}");
        assert_eq!(strip_code_blocks("  {} "), "{}");
    }

    #[test]
    fn test_parse_full_reply() {
        let reply = r#"```json
{"selectors": {"commentItem": ".c", "username": ".u", "content": ".t", "likes": ""},
 "structure": "flat list", "confidence": 0.9}
```"#;
        let parsed = OracleReply::parse(reply).expect("valid reply");
        assert_eq!(parsed.selectors.get(SelectorField::CommentItem), Some(".c"));
        assert_eq!(parsed.selectors.get(SelectorField::Likes), None);
        assert_eq!(parsed.structure.as_deref(), Some("flat list"));
        assert!((parsed.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_tolerates_prose_and_bare_maps() {
        let reply = r#"Sure! {"commentItem": ".c", "content": ".t", "avatar": 3} Hope that helps."#;
        let parsed = OracleReply::parse(reply).expect("bare map");
        assert_eq!(parsed.selectors.get(SelectorField::Content), Some(".t"));
        assert_eq!(parsed.selectors.get(SelectorField::Avatar), None);
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let high = OracleReply::parse(r#"{"selectors": {"content": ".t"}, "confidence": 7}"#).expect("valid");
        assert_eq!(high.confidence, 1.0);
        let pct = OracleReply::parse(r#"{"selectors": {"content": ".t"}, "confidence": "80%"}"#).expect("valid");
        assert!((pct.confidence - 0.8).abs() < 1e-9);
        let neg = OracleReply::parse(r#"{"selectors": {"content": ".t"}, "confidence": -1}"#).expect("valid");
        assert_eq!(neg.confidence, 0.0);
    }

    #[test]
    fn test_malformed_replies() {
        assert!(matches!(OracleReply::parse("I cannot help"), Err(OracleError::Malformed(_))));
        assert!(matches!(OracleReply::parse("{not json}"), Err(OracleError::Malformed(_))));
        assert!(matches!(
            OracleReply::parse(r#"{"selectors": "none"}"#),
            Err(OracleError::Malformed(_))
        ));
        assert!(matches!(
            OracleReply::parse(r#"{"selectors": {}, "confidence": 1}"#),
            Err(OracleError::Malformed(_))
        ));
    }
}
