//! Gemini API client
//!
//! Implements [`PlanGenerator`] on the `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::generator::{FALLBACK_QUOTE, OFFLINE_QUOTE};
use super::{GeneratedPlan, PlanError, PlanGenerator, UserProfile, split_sections};
use crate::config::PlanConfig;
use crate::prompts::PromptLoader;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Output token ceiling for a quote
const QUOTE_MAX_TOKENS: u32 = 50;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    base_url: String,
    http: Client,
    max_output_tokens: u32,
    prompts: PromptLoader,
}

impl GeminiClient {
    /// Create a client from configuration
    ///
    /// A missing API key is reported when a plan is requested, not here, so
    /// that quotes can still fall back quietly.
    pub fn from_config(config: &PlanConfig, prompts: PromptLoader) -> Result<Self, PlanError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.get_api_key().ok();
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(PlanError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_output_tokens: config.max_output_tokens,
            prompts,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(prompt: &str, max_output_tokens: u32) -> serde_json::Value {
        serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": max_output_tokens },
        })
    }

    /// Pull the service's own error message out of an error body
    fn error_message(body: &str) -> String {
        serde_json::from_str::<GeminiErrorBody>(body)
            .ok()
            .and_then(|b| b.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string())
    }

    /// One completion, retrying transient failures
    async fn generate_content(&self, prompt: &str, max_output_tokens: u32) -> Result<String, PlanError> {
        debug!(%self.model, max_output_tokens, "generate_content: called");
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PlanError::MissingApiKey(self.api_key_env.clone()))?;
        let url = self.endpoint();
        let body = Self::build_request_body(prompt, max_output_tokens);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "generate_content: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(&url)
                .query(&[("key", api_key)])
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "generate_content: network error");
                    last_error = Some(PlanError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                let err = PlanError::Api {
                    status,
                    message: Self::error_message(&text),
                };
                if err.is_retryable() && attempt < MAX_RETRIES {
                    debug!(attempt, status, "generate_content: retryable error");
                    last_error = Some(err);
                    continue;
                }
                debug!(%status, "generate_content: API error");
                return Err(err);
            }

            let api_response: GeminiResponse = response.json().await?;
            return api_response.text().ok_or(PlanError::EmptyResponse);
        }

        Err(last_error.unwrap_or_else(|| PlanError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl PlanGenerator for GeminiClient {
    async fn generate_plan(&self, profile: &UserProfile) -> Result<GeneratedPlan, PlanError> {
        debug!(name = %profile.name, "generate_plan: called");
        let prompt = self
            .prompts
            .plan_prompt(profile)
            .map_err(|e| PlanError::Prompt(e.to_string()))?;
        let text = self.generate_content(&prompt, self.max_output_tokens).await?;
        info!(text_len = text.len(), "Plan generated");
        Ok(split_sections(&text))
    }

    async fn generate_quote(&self) -> String {
        debug!("generate_quote: called");
        let prompt = match self.prompts.quote_prompt() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "generate_quote: prompt unavailable");
                return OFFLINE_QUOTE.to_string();
            }
        };
        match self.generate_content(&prompt, QUOTE_MAX_TOKENS).await {
            Ok(text) => text.trim().to_string(),
            Err(PlanError::EmptyResponse) => FALLBACK_QUOTE.to_string(),
            Err(e) => {
                debug!(error = %e, "generate_quote: falling back");
                OFFLINE_QUOTE.to_string()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate, if non-empty
    fn text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    error: GeminiErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}
