use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils;
use crate::AnalyzeError;

/// One analysis invocation. The URL is cleaned exactly once, here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    raw: String,
    url: String,
}

impl AnalysisRequest {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            url: utils::clean_input(raw),
        }
    }

    /// Trimmed input with leading slashes removed.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// The single output record: a flat JSON object that always carries
/// string `platform` and `message` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    fields: Map<String, Value>,
}

impl AnalysisResult {
    /// Serializes a platform record and reads it back as a plain JSON map,
    /// so nothing non-JSON survives into the result.
    pub fn normalize<T: Serialize>(record: &T) -> Result<Self, AnalyzeError> {
        let encoded = serde_json::to_string(record)?;
        let fields: Map<String, Value> = serde_json::from_str(&encoded)?;

        let has_string = |key: &str| matches!(fields.get(key), Some(Value::String(_)));
        if !has_string("platform") || !has_string("message") {
            return Err(AnalyzeError::ExtractError(
                "record is missing platform or message".into(),
            ));
        }
        Ok(Self { fields })
    }

    /// Terminal record for links no analyzer recognises.
    pub fn unknown(message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("platform".into(), Value::from("Unknown"));
        fields.insert("message".into(), Value::from(message.into()));
        Self { fields }
    }

    /// Error-flagged record for failures that escaped a platform analyzer.
    pub fn failure(platform: &str, message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("platform".into(), Value::from(platform));
        fields.insert("error".into(), Value::Bool(true));
        fields.insert("message".into(), Value::from(message.into()));
        Self { fields }
    }

    pub fn platform(&self) -> &str {
        self.get_str("platform").unwrap_or("Unknown")
    }

    pub fn message(&self) -> &str {
        self.get_str("message").unwrap_or_default()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.fields.get("error"), Some(Value::Bool(true)))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    /// `true` when the key is present with a JSON `null`.
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(Value::Null))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Compact single-line JSON.
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        platform: &'static str,
        message: &'static str,
        view_count: u64,
        thumbnail: Option<String>,
    }

    #[test]
    fn request_is_cleaned_once() {
        let req = AnalysisRequest::new("  ///https://t.me/x ");
        assert_eq!(req.url(), "https://t.me/x");
        assert_eq!(req.raw(), "  ///https://t.me/x ");
    }

    #[test]
    fn normalize_keeps_nulls_and_renames() {
        let result = AnalysisResult::normalize(&Sample {
            platform: "Telegram",
            message: "ok",
            view_count: 3,
            thumbnail: None,
        })
        .unwrap();
        assert_eq!(result.platform(), "Telegram");
        assert_eq!(result.get_u64("viewCount"), Some(3));
        assert!(result.is_null("thumbnail"));
        assert!(!result.is_error());
    }

    #[test]
    fn normalize_rejects_records_without_contract_fields() {
        let err = AnalysisResult::normalize(&serde_json::json!({ "platform": "X" }));
        assert!(err.is_err());
    }

    #[test]
    fn failure_record_is_flagged() {
        let result = AnalysisResult::failure("YouTube", "boom");
        assert!(result.is_error());
        assert_eq!(result.to_json(), r#"{"error":true,"message":"boom","platform":"YouTube"}"#);
    }
}
