//! Error taxonomy for the blog pipeline.
//!
//! The failure classes map onto the stages of a run:
//!
//! | Class | Type |
//! |-------|------|
//! | transport (network, timeout, bad status) | [`ModelError`], [`FeedError`] |
//! | malformed model output | [`ParseError`], [`EmptyResponse`] |
//! | contract violation by the model | [`SelectionError::IndexOutOfRange`] |
//! | persistence | [`WriteError`], [`PublishError`], [`ScheduleError`] |
//!
//! None of these is retried. A pipeline run ends with a [`PipelineError`]
//! that the caller logs.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the model endpoint.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request timed out")]
    Timeout,

    #[error("model request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("model endpoint returned HTTP {0}")]
    Status(u16),

    #[error("model response has no `response` field")]
    MissingResponse,
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ModelError::Timeout
        } else if let Some(status) = e.status() {
            ModelError::Status(status.as_u16())
        } else {
            ModelError::Transport(e)
        }
    }
}

/// Failure fetching or decoding a news feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed url: {0}")]
    Url(#[from] url::ParseError),

    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed is not valid RSS: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Why a piece of model text could not be turned into a [`Selection`](crate::models::Selection).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoBraces,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("JSON value is not an object")]
    NotAnObject,

    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),

    #[error("invalid selected_index: {0}")]
    InvalidIndex(String),
}

/// Why the selector produced no story.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no candidate stories to choose from")]
    NoCandidates,

    #[error("could not parse selection: {0}")]
    Parse(#[from] ParseError),

    #[error("model selected index {index} but only {len} stories were offered")]
    IndexOutOfRange { index: usize, len: usize },
}

/// The model answered with nothing but whitespace.
#[derive(Debug, Error)]
#[error("model returned an empty response")]
pub struct EmptyResponse;

/// Failure of one structured model call: either the request itself failed or
/// the validator rejected the text that came back.
#[derive(Debug, Error)]
pub enum CallError<E> {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Rejected(E),
}

/// Failure generating or persisting a blog post.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("post generation failed: {0}")]
    Generate(#[from] CallError<EmptyResponse>),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("post has no content")]
    EmptyContent,
}

/// Terminal outcome of a failed pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no stories")]
    NoStories,

    #[error("story selection failed: {0}")]
    Selection(#[from] CallError<SelectionError>),

    #[error("blog generation failed: {0}")]
    Generation(#[from] WriteError),

    #[error("publishing failed: {0}")]
    Publish(#[from] PublishError),
}

/// Rejected schedule update.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("interval must be at least one hour, got {0}")]
    InvalidHours(u32),

    #[error("hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),

    #[error("minute must be between 0 and 59, got {0}")]
    InvalidMinute(u32),

    #[error("invalid day_of_week expression: {0:?}")]
    InvalidDayOfWeek(String),
}
