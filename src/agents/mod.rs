//! Model-backed pipeline stages.
//!
//! Every stage has the same shape: build a prompt, send it with a fixed
//! system prompt, then validate the text that comes back. [`ModelTask`]
//! captures the first two parts and [`ask_validated`] runs the round-trip
//! with a caller-supplied validator, so request logging and failure
//! classification live in one place.
//!
//! | Stage | Validator output |
//! |-------|------------------|
//! | [`selector::StorySelector`] | [`Selection`](crate::models::Selection) with an in-range index |
//! | [`writer::BlogWriter`] | non-empty markdown, kept verbatim |
//! | [`enhancer::ContentEnhancer`] | non-empty free text |

pub mod enhancer;
pub mod selector;
pub mod writer;

use crate::api::AskAsync;
use crate::error::{CallError, EmptyResponse};
use crate::utils::truncate_for_log;
use std::fmt::Display;
use tracing::{debug, instrument, warn};

/// One prompt/system pair for a named stage.
#[derive(Debug)]
pub struct ModelTask<'a> {
    /// Stage name used in logs.
    pub name: &'static str,
    pub prompt: String,
    pub system: &'a str,
}

/// Run one model round-trip and validate the answer.
///
/// Transport failures come back as [`CallError::Model`], validator
/// rejections as [`CallError::Rejected`]. The raw text of a rejected answer
/// is logged at debug level.
#[instrument(level = "info", skip_all, fields(task = task.name))]
pub async fn ask_validated<M, T, E, F>(
    model: &M,
    task: ModelTask<'_>,
    validate: F,
) -> Result<T, CallError<E>>
where
    M: AskAsync,
    E: Display,
    F: FnOnce(&str) -> Result<T, E>,
{
    let raw = model.ask(&task.prompt, Some(task.system)).await?;
    validate(&raw).map_err(|e| {
        warn!(
            error = %e,
            response_preview = %truncate_for_log(&raw, 200),
            "Model response rejected"
        );
        debug!(raw = %raw, "Rejected model response");
        CallError::Rejected(e)
    })
}

/// Validator for free-text stages: anything but whitespace is accepted.
pub fn non_empty(raw: &str) -> Result<&str, EmptyResponse> {
    if raw.trim().is_empty() {
        Err(EmptyResponse)
    } else {
        Ok(raw)
    }
}
