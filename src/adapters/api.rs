use crate::domain::model::{AnalysisId, Settings};
use crate::domain::ports::SubmissionBackend;
use crate::utils::error::{CuckooError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    analysis_id: String,
}

/// Submits to a running Cuckoo API server instead of the local CWD.
#[derive(Debug, Clone)]
pub struct ApiSubmitter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiSubmitter {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        validate_url("api_url", base_url)?;
        validate_non_empty_string("api_key", api_key)?;

        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorization(&self) -> String {
        format!("token {}", self.api_key)
    }

    fn analysis_id(response: Response) -> Result<AnalysisId> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(CuckooError::submission(format!(
                "API returned {}: {}",
                status, message
            )));
        }

        let body: SubmitResponse = response.json()?;
        Ok(AnalysisId::new(body.analysis_id))
    }
}

impl SubmissionBackend for ApiSubmitter {
    fn submit_file(&self, path: &Path, settings: &Settings, file_name: &str) -> Result<AnalysisId> {
        let content = std::fs::read(path)?;
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(content).file_name(file_name.to_string()),
            )
            .text("settings", serde_json::to_string(settings)?);

        tracing::debug!("POST {} ({})", self.endpoint("submit/file"), file_name);
        let response = self
            .client
            .post(self.endpoint("submit/file"))
            .header(AUTHORIZATION, self.authorization())
            .multipart(form)
            .send()?;

        Self::analysis_id(response)
    }

    fn submit_url(&self, url: &str, settings: &Settings) -> Result<AnalysisId> {
        let body = serde_json::json!({ "url": url, "settings": settings });

        tracing::debug!("POST {} ({})", self.endpoint("submit/url"), url);
        let response = self
            .client
            .post(self.endpoint("submit/url"))
            .header(AUTHORIZATION, self.authorization())
            .json(&body)
            .send()?;

        Self::analysis_id(response)
    }

    /// The API server schedules its own submissions.
    fn notify(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_inputs() {
        assert!(ApiSubmitter::new("http://127.0.0.1:8090/", "secret").is_ok());
        assert_eq!(
            ApiSubmitter::new("127.0.0.1:8090", "secret").unwrap_err().field(),
            Some("api_url")
        );
        assert_eq!(
            ApiSubmitter::new("http://127.0.0.1:8090", " ").unwrap_err().field(),
            Some("api_key")
        );
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let submitter = ApiSubmitter::new("http://127.0.0.1:8090/", "secret").unwrap();
        assert_eq!(submitter.endpoint("submit/url"), "http://127.0.0.1:8090/submit/url");
    }
}
