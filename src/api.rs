//! Language-model client.
//!
//! The pipeline talks to the model through the [`AskAsync`] trait so that the
//! agents can be driven by a scripted model in tests. The production
//! implementation is [`OllamaClient`], which calls the Ollama
//! `POST {host}/api/generate` endpoint with streaming disabled.
//!
//! # Wire format
//!
//! ```text
//! request:  {"model": "...", "prompt": "...", "system": "...", "stream": false, "options": {"num_ctx": 4096}}
//! response: {"response": "...", ...}
//! ```
//!
//! A non-2xx status, a timeout, or a body without a `response` field is a
//! [`ModelError`]. There is no retry: a failed round-trip ends the caller's
//! stage.

use crate::error::ModelError;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt, with an optional system prompt, and hand back
/// the raw model text.
pub trait AskAsync: Send + Sync {
    /// Send `prompt` to the model and return its raw text answer.
    fn ask(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// Connection settings for the model endpoint.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Base URL, e.g. `http://localhost:11434`.
    pub host: String,
    /// Model name as known to the server, e.g. `llama2`.
    pub model: String,
    /// Upper bound on a single request, including generation time.
    pub timeout: Duration,
    /// Context window passed as `options.num_ctx`.
    pub num_ctx: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Ollama `/api/generate` client.
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    settings: ModelSettings,
}

impl OllamaClient {
    /// Build a client with the configured request timeout.
    pub fn new(settings: ModelSettings) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(ModelError::Transport)?;
        let endpoint = format!("{}/api/generate", settings.host.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, ModelError> {
        let body = GenerateRequest {
            model: &self.settings.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                num_ctx: self.settings.num_ctx,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response.json().await?;
        parsed.response.ok_or(ModelError::MissingResponse)
    }
}

impl fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.settings.model)
            .field("timeout", &self.settings.timeout)
            .field("num_ctx", &self.settings.num_ctx)
            .finish()
    }
}

impl AskAsync for OllamaClient {
    #[instrument(level = "info", skip_all, fields(model = %self.settings.model))]
    async fn ask(&self, prompt: &str, system: Option<&str>) -> Result<String, ModelError> {
        debug!(target: "llm", system = system.unwrap_or(""), "Sending prompt:\n{prompt}");
        info!(
            target: "llm",
            prompt_bytes = prompt.len(),
            has_system = system.is_some(),
            "Sending prompt"
        );

        let t0 = Instant::now();
        let res = self.generate(prompt, system).await;
        let dt = t0.elapsed();

        match &res {
            Ok(text) => {
                info!(
                    target: "llm",
                    elapsed_ms = dt.as_millis() as u64,
                    response_bytes = text.len(),
                    response_preview = %truncate_for_log(text, 120),
                    "Received response"
                );
                debug!(target: "llm", "Received response:\n{text}");
            }
            Err(e) => warn!(
                target: "llm",
                elapsed_ms = dt.as_millis() as u64,
                error = %e,
                "Model call failed"
            ),
        }
        res
    }
}
