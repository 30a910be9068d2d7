//! HuggingFace Inference API text-generation backend.
//!
//! `POST {endpoint}/{model_id}` with a bearer token read from the environment.
//! The client carries a request timeout; an expired request is an ordinary
//! error and ends up as a degraded rewrite.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    config::ModelConfig,
    rewrite::model::{GenerationParams, TextGenerator},
};

pub struct HfInferenceClient {
    client: Client,
    url: String,
    token: String,
}

impl HfInferenceClient {
    /// Build the client.  Fails when the access token is missing, which
    /// counts as a model load failure.
    pub fn from_config(cfg: &ModelConfig) -> Result<Self> {
        let token = std::env::var(&cfg.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| format!("{} is not set", cfg.token_env))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let url = format!("{}/{}", cfg.endpoint.trim_end_matches('/'), cfg.model_id);
        info!("Text generation backend: {url}");
        Ok(Self { client, url, token })
    }

    fn request_body(prompt: &str, params: &GenerationParams) -> Value {
        json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": params.max_new_tokens,
                "do_sample": true,
                "temperature": params.temperature,
                "top_p": params.top_p,
                "return_full_text": false
            },
            "options": { "wait_for_model": true }
        })
    }
}

/// Pull the generated text out of an inference response.
///
/// Accepts `[{"generated_text": …}]`, a bare `{"generated_text": …}`, and
/// reports `{"error": …}` bodies as errors.
pub fn parse_generation(body: &Value) -> Result<String> {
    if let Some(err) = body.get("error").and_then(Value::as_str) {
        bail!("inference API error: {err}");
    }
    let item = body.as_array().and_then(|a| a.first()).unwrap_or(body);
    item.get("generated_text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("inference response has no generated_text")
}

/// Longest raw error body quoted in a failure message.
const ERROR_DETAIL_MAX_CHARS: usize = 200;

/// Describe a failed response: the JSON `error` field when there is one,
/// otherwise the start of the raw body.
pub fn error_detail(body: &str) -> String {
    if let Some(err) = serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
    {
        return err.to_string();
    }
    let raw = body.trim();
    if raw.is_empty() {
        return "no detail".to_string();
    }
    raw.chars().take(ERROR_DETAIL_MAX_CHARS).collect()
}

impl TextGenerator for HfInferenceClient {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&Self::request_body(prompt, params))
            .send()
            .with_context(|| format!("Request to {} failed", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("inference API returned status {status}: {}", error_detail(&body));
        }
        let body: Value = resp.json().context("Failed to parse inference response")?;
        parse_generation(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_response() {
        let body = json!([{ "generated_text": "A darker night." }]);
        assert_eq!(parse_generation(&body).unwrap(), "A darker night.");
    }

    #[test]
    fn test_parse_object_response() {
        let body = json!({ "generated_text": "Onward." });
        assert_eq!(parse_generation(&body).unwrap(), "Onward.");
    }

    #[test]
    fn test_parse_error_response() {
        let body = json!({ "error": "Model is currently loading" });
        let err = parse_generation(&body).unwrap_err();
        assert!(err.to_string().contains("currently loading"), "got: {err}");
    }

    #[test]
    fn test_parse_missing_field() {
        assert!(parse_generation(&json!([{}])).is_err());
    }

    #[test]
    fn test_error_detail_from_json() {
        assert_eq!(error_detail(r#"{"error":"Model is overloaded"}"#), "Model is overloaded");
    }

    #[test]
    fn test_error_detail_from_html_page() {
        let page = format!("<html><body>503 Service Unavailable{}</body></html>", " ".repeat(400));
        let detail = error_detail(&page);
        assert!(detail.starts_with("<html><body>503 Service Unavailable"), "got: {detail}");
        assert_eq!(detail.chars().count(), ERROR_DETAIL_MAX_CHARS);
        assert_eq!(error_detail("  \n"), "no detail");
    }

    #[test]
    fn test_request_body_carries_sampling() {
        let body = HfInferenceClient::request_body("hi", &GenerationParams::default());
        assert_eq!(body["inputs"], "hi");
        assert_eq!(body["parameters"]["max_new_tokens"], 512);
        assert_eq!(body["parameters"]["do_sample"], true);
    }

    #[test]
    fn test_missing_token_fails_to_load() {
        let cfg = ModelConfig {
            token_env: "ECHOVERSE_TEST_TOKEN_THAT_IS_NEVER_SET".into(),
            ..ModelConfig::default()
        };
        let err = HfInferenceClient::from_config(&cfg).err().expect("load should fail");
        assert!(err.to_string().contains("is not set"), "got: {err}");
    }
}
