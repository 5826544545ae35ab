use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::error::AnalysisError;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").unwrap());

/// Which step of the recovery chain produced the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    Strict,
    Trimmed,
    BraceBounded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredJson {
    pub object: Map<String, Value>,
    pub strategy: RecoveryStrategy,
}

/// Removes markdown code fences, a leading byte-order mark and surrounding
/// whitespace. Returns `None` when nothing is left.
pub fn clean_response(raw: &str) -> Option<String> {
    let without_bom = raw.trim_start_matches('\u{feff}');
    let cleaned = CODE_FENCE.replace_all(without_bom, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Recovers a JSON object from model text, trying each strategy from the
/// strictest to the most lenient.
pub fn recover_json(text: &str) -> Result<RecoveredJson, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::MalformedResponse("empty response".to_string()));
    }

    if let Some(object) = parse_object(text) {
        return Ok(RecoveredJson {
            object,
            strategy: RecoveryStrategy::Strict,
        });
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Some(object) = parse_object(trimmed) {
            return Ok(RecoveredJson {
                object,
                strategy: RecoveryStrategy::Trimmed,
            });
        }
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(AnalysisError::MalformedResponse(
            "no JSON object delimiters found".to_string(),
        ));
    };
    if start < end {
        if let Some(object) = parse_object(&trimmed[start..=end]) {
            return Ok(RecoveredJson {
                object,
                strategy: RecoveryStrategy::BraceBounded,
            });
        }
    }

    Err(AnalysisError::MalformedResponse(
        "no valid JSON object found in model output".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_strips_fences_and_whitespace() {
        let raw = "```json\n{\"date\":744,\"flower\":\"桃\",\"imagery\":[\"春\"]}\n```";
        assert_eq!(
            clean_response(raw).as_deref(),
            Some("{\"date\":744,\"flower\":\"桃\",\"imagery\":[\"春\"]}")
        );
        assert_eq!(clean_response("\u{feff}  {} \n").as_deref(), Some("{}"));
    }

    #[test]
    fn clean_propagates_absence() {
        assert_eq!(clean_response(""), None);
        assert_eq!(clean_response("   \n"), None);
        assert_eq!(clean_response("```json\n```"), None);
    }

    #[test]
    fn fenced_and_plain_objects_recover_identically() {
        let plain = r#"{"date":744,"flower":"桃","imagery":["春"]}"#;
        let fenced = format!("```json\n{plain}\n```");
        let from_plain = recover_json(plain).unwrap();
        let from_fenced = recover_json(&clean_response(&fenced).unwrap()).unwrap();
        assert_eq!(from_plain.object, from_fenced.object);
        assert_eq!(from_plain.strategy, RecoveryStrategy::Strict);
        assert_eq!(
            Value::Object(from_plain.object),
            json!({"date": 744, "flower": "桃", "imagery": ["春"]})
        );
    }

    #[test]
    fn surrounding_prose_is_brace_bounded() {
        let text = r#"Here is the result: {"date":744,"flower":"桃","imagery":[]} Thanks!"#;
        let recovered = recover_json(text).unwrap();
        assert_eq!(recovered.strategy, RecoveryStrategy::BraceBounded);
        assert_eq!(
            Value::Object(recovered.object),
            json!({"date": 744, "flower": "桃", "imagery": []})
        );
    }

    #[test]
    fn nested_objects_keep_outer_braces() {
        let text = r#"结果 {"date":-104,"flower":"梅","imagery":["雪"],"extra":{"k":1}} 完"#;
        let recovered = recover_json(text).unwrap();
        assert_eq!(recovered.object["date"], json!(-104));
        assert_eq!(recovered.object["extra"], json!({"k": 1}));
    }

    #[test]
    fn unrecoverable_inputs_are_malformed() {
        for text in [
            "",
            "no json here",
            "} backwards {",
            "{broken: json}",
            "[1, 2, 3]",
            "\"just a string\"",
        ] {
            assert!(
                matches!(recover_json(text), Err(AnalysisError::MalformedResponse(_))),
                "{text:?} should fail"
            );
        }
    }
}
