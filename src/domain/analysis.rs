use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::flower::NO_FLOWER;
use super::poem::{AnalysisRequest, PoemKey};

/// Normalized model output. All three fields are always present.
///
/// A `date` of `0` means the era could not be determined; a poem genuinely
/// dated to year zero cannot be told apart from that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizedAnalysis {
    pub date: i32,
    pub flower: String,
    pub imagery: Vec<String>,
}

impl Default for StandardizedAnalysis {
    fn default() -> Self {
        Self {
            date: 0,
            flower: NO_FLOWER.to_string(),
            imagery: Vec::new(),
        }
    }
}

impl StandardizedAnalysis {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of analyzing one poem.
///
/// Built only through [`AnalysisRecord::success`] or
/// [`AnalysisRecord::failure`]: a record with an error marker always carries
/// the default analysis. Deserialization rejects records that break this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct AnalysisRecord {
    pub title: String,
    pub author: String,
    pub content: String,
    analysis: StandardizedAnalysis,
    pub source_file: String,
    pub analysis_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AnalysisRecord {
    pub fn success(
        request: &AnalysisRequest,
        analysis: StandardizedAnalysis,
        raw_response: Option<String>,
    ) -> Self {
        Self {
            title: request.title.clone(),
            author: request.author.clone(),
            content: request.content.clone(),
            analysis,
            source_file: request.source.clone(),
            analysis_timestamp: Utc::now(),
            raw_response,
            error: None,
        }
    }

    pub fn failure(request: &AnalysisRequest, error: impl Into<String>) -> Self {
        Self {
            title: request.title.clone(),
            author: request.author.clone(),
            content: request.content.clone(),
            analysis: StandardizedAnalysis::default(),
            source_file: request.source.clone(),
            analysis_timestamp: Utc::now(),
            raw_response: None,
            error: Some(error.into()),
        }
    }

    pub fn analysis(&self) -> &StandardizedAnalysis {
        &self.analysis
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn key(&self) -> PoemKey {
        PoemKey::new(&self.title, &self.author)
    }
}

/// Unchecked shape of a record as found in an export file.
#[derive(Deserialize)]
struct StoredRecord {
    title: String,
    author: String,
    content: String,
    analysis: StandardizedAnalysis,
    source_file: String,
    analysis_timestamp: DateTime<Utc>,
    #[serde(default)]
    raw_response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<StoredRecord> for AnalysisRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        if stored.error.is_some() && !stored.analysis.is_default() {
            return Err(format!(
                "record 《{}》 - {} has an error marker and a non-default analysis",
                stored.title, stored.author
            ));
        }
        Ok(Self {
            title: stored.title,
            author: stored.author,
            content: stored.content,
            analysis: stored.analysis,
            source_file: stored.source_file,
            analysis_timestamp: stored.analysis_timestamp,
            raw_response: stored.raw_response,
            error: stored.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(
            "题都城南庄",
            "崔护",
            "去年今日此门中，人面桃花相映红。",
            "tang.json",
        )
    }

    #[test]
    fn default_analysis_is_the_unknown_sentinel() {
        let analysis = StandardizedAnalysis::default();
        assert_eq!(analysis.date, 0);
        assert_eq!(analysis.flower, "none");
        assert!(analysis.imagery.is_empty());
        assert!(analysis.is_default());
    }

    #[test]
    fn failure_record_carries_default_analysis_and_metadata() {
        let record = AnalysisRecord::failure(&request(), "transport failure");
        assert!(!record.is_success());
        assert_eq!(record.error(), Some("transport failure"));
        assert!(record.analysis().is_default());
        assert_eq!(record.title, "题都城南庄");
        assert_eq!(record.author, "崔护");
        assert_eq!(record.source_file, "tang.json");
        assert!(record.raw_response.is_none());
    }

    #[test]
    fn serialized_record_omits_absent_markers() {
        let analysis = StandardizedAnalysis {
            date: 796,
            flower: "桃花".to_string(),
            imagery: vec!["春风".to_string()],
        };
        let record = AnalysisRecord::success(&request(), analysis, None);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("raw_response").is_none());
        assert_eq!(value["analysis"]["date"], 796);
        assert_eq!(value["analysis"]["flower"], "桃花");

        let back: AnalysisRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn loading_rejects_error_record_with_real_analysis() {
        let mut value = serde_json::to_value(AnalysisRecord::failure(&request(), "timeout")).unwrap();
        assert!(serde_json::from_value::<AnalysisRecord>(value.clone()).is_ok());

        value["analysis"]["flower"] = serde_json::json!("桃花");
        let err = serde_json::from_value::<AnalysisRecord>(value).unwrap_err();
        assert!(err.to_string().contains("error marker"));
    }
}
