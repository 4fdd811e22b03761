use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};

use crate::config::Settings;
use crate::error::ReviewError;
use crate::models::{FileRef, RawAnalysis};

/// Everything one verification call sends.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub source: FileRef,
    pub target: FileRef,
    pub api_key: String,
    pub model: String,
}

/// Talks to the verification endpoint.
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
    source_field: String,
    target_field: String,
}

impl AnalysisClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.verify_url.clone(),
            source_field: settings.source_field.clone(),
            target_field: settings.target_field.clone(),
        })
    }

    /// Uploads both files and returns the unvalidated result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<RawAnalysis, ReviewError> {
        let form = Form::new()
            .part(self.source_field.clone(), file_part(&request.source).await?)
            .part(self.target_field.clone(), file_part(&request.target).await?)
            .text("api_key", request.api_key.clone())
            .text("model", request.model.clone());

        tracing::info!(
            "verifying {} against {} with {}",
            request.source.name,
            request.target.name,
            request.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReviewError::RemoteCallFailed(e.to_string()))?;

        // Error payloads come back with a 500, so read the body regardless.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReviewError::RemoteCallFailed(e.to_string()))?;
        tracing::debug!("verification service answered {} ({} bytes)", status, body.len());

        parse_response(&body).map_err(|e| match e {
            ReviewError::RemoteCallFailed(msg) if !status.is_success() => {
                ReviewError::RemoteCallFailed(format!("HTTP {}: {}", status, msg))
            }
            other => other,
        })
    }
}

async fn file_part(file: &FileRef) -> Result<Part, ReviewError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|e| ReviewError::RemoteCallFailed(format!("cannot read {}: {}", file.name, e)))?;
    Ok(Part::bytes(bytes).file_name(file.name.clone()))
}

/// Reads either an `{"error": ...}` payload or an analysis result.
pub fn parse_response(body: &str) -> Result<RawAnalysis, ReviewError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ReviewError::RemoteCallFailed(format!("unreadable response: {}", e)))?;
    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        return Err(ReviewError::AnalysisReportedError(error.to_string()));
    }
    serde_json::from_value(value)
        .map_err(|e| ReviewError::RemoteCallFailed(format!("malformed response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_is_reported_verbatim() {
        assert_eq!(
            parse_response(r#"{"error": "400 Bad Request: missing api_key"}"#).unwrap_err(),
            ReviewError::AnalysisReportedError("400 Bad Request: missing api_key".into())
        );
    }

    #[test]
    fn result_payload_is_parsed() {
        let body = r#"{
            "sourceText": "the quick brown fox",
            "targetText": "con cáo nhanh",
            "markers": [
                {"sourceSpan": "quick brown", "targetSpan": "cáo nhanh", "summary": "tone"}
            ]
        }"#;
        let raw = parse_response(body).unwrap();
        let markers = raw.markers.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].summary.as_deref(), Some("tone"));
    }

    #[test]
    fn bad_marker_shape_names_the_cause() {
        let body = r#"{
            "english_text": "the quick brown fox",
            "vietnamese_text": "con cáo nhanh",
            "markers": [{"english_marker": null, "vietnamese_marker": "cáo"}]
        }"#;
        match parse_response(body) {
            Err(ReviewError::RemoteCallFailed(msg)) => {
                assert!(msg.contains("invalid type: null"), "{}", msg);
                assert!(!msg.contains("untagged"), "{}", msg);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_remote_failure() {
        assert!(matches!(
            parse_response("<html>502 Bad Gateway</html>"),
            Err(ReviewError::RemoteCallFailed(_))
        ));
        assert!(matches!(
            parse_response(r#"[1, 2]"#),
            Err(ReviewError::RemoteCallFailed(_))
        ));
    }
}
