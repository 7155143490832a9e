//! Optional second pass over a generated post.

use super::{ModelTask, ask_validated, non_empty};
use crate::api::AskAsync;
use crate::error::{CallError, EmptyResponse};
use crate::prompts::{ENHANCER_SYSTEM, enhancement_prompt};
use tracing::{error, info, instrument};

#[derive(Debug)]
pub struct ContentEnhancer<'a, M> {
    model: &'a M,
}

impl<'a, M: AskAsync> ContentEnhancer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    /// Ask the model to improve clarity while keeping the technical content.
    ///
    /// The answer is accepted as free text; only a blank answer is rejected.
    #[instrument(level = "info", skip_all, fields(input_bytes = content.len()))]
    pub async fn enhance_content(&self, content: &str) -> Result<String, CallError<EmptyResponse>> {
        let task = ModelTask {
            name: "enhance_content",
            prompt: enhancement_prompt(content),
            system: ENHANCER_SYSTEM,
        };
        let result = ask_validated(self.model, task, |raw| {
            non_empty(raw).map(|text| text.trim().to_string())
        })
        .await;

        match &result {
            Ok(text) => info!(output_bytes = text.len(), "Enhanced content"),
            Err(e) => error!(error = %e, "Failed to enhance content"),
        }
        result
    }
}
