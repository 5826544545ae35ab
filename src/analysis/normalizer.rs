use serde_json::{Map, Value};
use tracing::warn;

use super::error::AnalysisError;
use crate::domain::{FlowerSynonymTable, StandardizedAnalysis, NO_FLOWER};

const BCE_MARKER: &str = "公元前";
const CE_MARKER: &str = "公元";

/// Maps raw model fields onto a [`StandardizedAnalysis`]. Never fails: any
/// missing or ill-typed field falls back to its default.
#[derive(Debug, Clone, Copy)]
pub struct FieldNormalizer<'a> {
    flowers: &'a FlowerSynonymTable,
}

impl FieldNormalizer<'static> {
    pub fn standard() -> Self {
        Self::new(FlowerSynonymTable::standard())
    }
}

impl Default for FieldNormalizer<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(flowers: &'a FlowerSynonymTable) -> Self {
        Self { flowers }
    }

    pub fn normalize(&self, object: &Map<String, Value>) -> StandardizedAnalysis {
        StandardizedAnalysis {
            date: normalize_date(field(object, "date")),
            flower: self.normalize_flower(field(object, "flower")),
            imagery: normalize_imagery(field(object, "imagery")),
        }
    }

    pub fn normalize_flower(&self, value: &Value) -> String {
        match value {
            Value::String(name) if name.is_empty() => NO_FLOWER.to_string(),
            Value::String(name) => self.flowers.canonical(name).to_string(),
            Value::Null => NO_FLOWER.to_string(),
            other => {
                report(mismatch("flower", other));
                NO_FLOWER.to_string()
            }
        }
    }

    /// Canonical form of an already-extracted flower name.
    pub fn canonical_flower(&self, name: &str) -> String {
        self.normalize_flower(&Value::String(name.to_string()))
    }
}

fn field<'v>(object: &'v Map<String, Value>, key: &str) -> &'v Value {
    object.get(key).unwrap_or(&Value::Null)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(field: &'static str, value: &Value) -> AnalysisError {
    AnalysisError::TypeMismatch {
        field,
        found: kind_of(value),
    }
}

fn report(err: AnalysisError) {
    warn!(error = %err, "field replaced by its default");
}

/// Era year of a raw `date` value; `0` when it cannot be determined.
pub fn normalize_date(value: &Value) -> i32 {
    match value {
        Value::Number(number) => {
            if let Some(year) = number.as_i64() {
                year.clamp(i32::MIN as i64, i32::MAX as i64) as i32
            } else {
                number.as_f64().map(|year| year.trunc() as i32).unwrap_or(0)
            }
        }
        Value::String(text) => parse_date(text),
        Value::Null => 0,
        other => {
            report(mismatch("date", other));
            0
        }
    }
}

/// Parses textual dates such as `"744"`, `"-104"`, `"公元744"` or `"公元前104"`.
pub fn parse_date(text: &str) -> i32 {
    let text = text.trim();
    if text.contains(BCE_MARKER) {
        return parse_year(&text.replace(BCE_MARKER, ""))
            .map(|year| -year)
            .unwrap_or(0);
    }
    if text.contains(CE_MARKER) {
        return parse_year(&text.replace(CE_MARKER, "")).unwrap_or(0);
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    text.parse::<i32>().unwrap_or(0)
}

fn parse_year(text: &str) -> Option<i32> {
    text.trim()
        .parse::<u32>()
        .ok()
        .and_then(|year| i32::try_from(year).ok())
}

/// Imagery tags of a raw `imagery` value, order and duplicates preserved.
pub fn normalize_imagery(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let tags: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            if tags.len() != items.len() {
                warn!(
                    dropped = items.len() - tags.len(),
                    "non-string imagery tags dropped"
                );
            }
            tags
        }
        Value::String(tag) => vec![tag.clone()],
        Value::Null => Vec::new(),
        other => {
            report(mismatch("imagery", other));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> StandardizedAnalysis {
        let Value::Object(object) = value else {
            panic!("test input must be an object");
        };
        FieldNormalizer::standard().normalize(&object)
    }

    #[test]
    fn dates_from_numbers_and_strings() {
        assert_eq!(normalize_date(&json!(744)), 744);
        assert_eq!(normalize_date(&json!(-104)), -104);
        assert_eq!(normalize_date(&json!(744.9)), 744);
        assert_eq!(normalize_date(&json!(-104.5)), -104);
        assert_eq!(normalize_date(&json!("公元前104")), -104);
        assert_eq!(normalize_date(&json!("公元前 221 ")), -221);
        assert_eq!(normalize_date(&json!("公元744")), 744);
        assert_eq!(normalize_date(&json!("744")), 744);
        assert_eq!(normalize_date(&json!(" -104 ")), -104);
    }

    #[test]
    fn unparseable_dates_become_zero() {
        for value in [
            json!("not a year"),
            json!("公元前"),
            json!("约公元前104年"),
            json!("744年"),
            json!("+744"),
            json!("--5"),
            json!("99999999999"),
            json!(""),
            json!(null),
            json!(true),
            json!([744]),
            json!({"year": 744}),
        ] {
            assert_eq!(normalize_date(&value), 0, "{value}");
        }
    }

    #[test]
    fn signed_strings_cover_the_full_year_range() {
        assert_eq!(parse_date("-2147483648"), i32::MIN);
        assert_eq!(parse_date("2147483647"), i32::MAX);
        assert_eq!(parse_date("2147483648"), 0);
        assert_eq!(parse_date("-2147483649"), 0);
        assert_eq!(parse_date("-0"), 0);
    }

    #[test]
    fn out_of_range_numbers_saturate() {
        assert_eq!(normalize_date(&json!(1e12)), i32::MAX);
        assert_eq!(normalize_date(&json!(-5_000_000_000i64)), i32::MIN);
    }

    #[test]
    fn flower_synonyms_and_idempotence() {
        let normalizer = FieldNormalizer::standard();
        assert_eq!(normalizer.canonical_flower("梅花"), "梅花");
        assert_eq!(normalizer.canonical_flower("梅"), "梅花");
        assert_eq!(normalizer.canonical_flower("none"), "none");
        assert_eq!(normalizer.canonical_flower("蔷薇"), "蔷薇");
        for name in ["梅", "荷", "桃", "菊花", "蔷薇", "无", "none", ""] {
            let once = normalizer.canonical_flower(name);
            assert_eq!(normalizer.canonical_flower(&once), once, "{name}");
        }
    }

    #[test]
    fn flower_of_wrong_type_is_none() {
        let normalizer = FieldNormalizer::standard();
        assert_eq!(normalizer.normalize_flower(&json!(3)), "none");
        assert_eq!(normalizer.normalize_flower(&json!(["梅"])), "none");
        assert_eq!(normalizer.normalize_flower(&json!(null)), "none");
        assert_eq!(normalizer.normalize_flower(&json!("")), "none");
    }

    #[test]
    fn custom_table_is_used() {
        let table = FlowerSynonymTable::from_pairs([("plum", "plum blossom")]);
        let normalizer = FieldNormalizer::new(&table);
        assert_eq!(normalizer.canonical_flower("plum"), "plum blossom");
        assert_eq!(normalizer.canonical_flower("梅"), "梅");
    }

    #[test]
    fn imagery_shapes() {
        assert_eq!(
            normalize_imagery(&json!(["春", "月", "春"])),
            vec!["春", "月", "春"]
        );
        assert_eq!(normalize_imagery(&json!("思乡")), vec!["思乡"]);
        assert_eq!(normalize_imagery(&json!(["月", 1, null])), vec!["月"]);
        assert!(normalize_imagery(&json!(42)).is_empty());
        assert!(normalize_imagery(&json!({"a": "b"})).is_empty());
        assert!(normalize_imagery(&json!(null)).is_empty());
    }

    #[test]
    fn full_object_is_normalized() {
        let analysis = normalize(json!({
            "date": "公元前104",
            "flower": "梅",
            "imagery": ["雪", "寒"]
        }));
        assert_eq!(analysis.date, -104);
        assert_eq!(analysis.flower, "梅花");
        assert_eq!(analysis.imagery, vec!["雪", "寒"]);
    }

    #[test]
    fn missing_and_mistyped_fields_fall_back_individually() {
        assert_eq!(normalize(json!({})), StandardizedAnalysis::default());

        let analysis = normalize(json!({
            "date": {"year": 1},
            "flower": "荷",
            "imagery": 7
        }));
        assert_eq!(analysis.date, 0);
        assert_eq!(analysis.flower, "莲花");
        assert!(analysis.imagery.is_empty());

        let analysis = normalize(json!({"date": 1045, "extra": "ignored"}));
        assert_eq!(analysis.date, 1045);
        assert_eq!(analysis.flower, "none");
        assert!(analysis.imagery.is_empty());
    }
}
