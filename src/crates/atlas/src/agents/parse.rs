//! Pulling structured JSON out of model replies.
//!
//! Models wrap JSON in prose or code fences often enough that a bare
//! `serde_json::from_str` on the whole reply fails more than it should.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static FENCED_JSON_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Locate the JSON object in a reply.
///
/// Prefers a fenced code block; otherwise takes the span from the first `{`
/// to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON_REGEX.captures(text) {
        if let Some(body) = captures.get(1) {
            return Some(body.as_str().trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].trim())
}

/// Extract and deserialize the reply. The error string is what ends up in
/// the degraded-output marker.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let json = extract_json(text).ok_or_else(|| "no JSON object found".to_string())?;
    serde_json::from_str(json).map_err(|e| e.to_string())
}

/// Bullet list for prompt sections, with a placeholder when empty.
pub(crate) fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- None identified".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        status: String,
    }

    #[test]
    fn test_extract_json_code_block() {
        let text = "Here is my analysis:\n```json\n{\"status\": \"ok\"}\n```\nLet me know.";
        assert_eq!(extract_json(text), Some("{\"status\": \"ok\"}"));
    }

    #[test]
    fn test_extract_json_unlabelled_fence() {
        let text = "```\n{\"status\": \"ok\"}\n```";
        assert_eq!(extract_json(text), Some("{\"status\": \"ok\"}"));
    }

    #[test]
    fn test_extract_json_raw_object_in_prose() {
        let text = "Sure. {\"status\": \"ok\", \"nested\": {\"a\": 1}} Hope that helps.";
        assert_eq!(extract_json(text), Some("{\"status\": \"ok\", \"nested\": {\"a\": 1}}"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no braces here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_json() {
        let probe: Probe = parse_json("```json\n{\"status\": \"done\"}\n```").unwrap();
        assert_eq!(probe.status, "done");

        let err = parse_json::<Probe>("I could not complete the analysis.").unwrap_err();
        assert_eq!(err, "no JSON object found");

        assert!(parse_json::<Probe>("{\"status\": }").is_err());
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(bullet_list(&[]), "- None identified");
        assert_eq!(bullet_list(&["a".into(), "b".into()]), "- a\n- b");
    }
}
