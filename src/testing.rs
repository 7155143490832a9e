//! Test doubles for the model and the story source.

use crate::api::AskAsync;
use crate::error::ModelError;
use crate::models::Story;
use crate::sources::FetchStories;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A model that answers from a fixed script, one reply per call.
///
/// Once the script runs out every further call fails with HTTP 500.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<(String, Option<String>)>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// A model whose replies all succeed.
    pub fn answering<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every `(prompt, system)` pair received so far.
    pub fn prompts(&self) -> Vec<(String, Option<String>)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AskAsync for ScriptedModel {
    async fn ask(&self, prompt: &str, system: Option<&str>) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), system.map(String::from)));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ModelError::Status(500)))
    }
}

/// A source that always returns the same stories.
#[derive(Debug, Default)]
pub struct StaticSource {
    stories: Vec<Story>,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(stories: Vec<Story>) -> Self {
        Self {
            stories,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FetchStories for StaticSource {
    async fn fetch_stories(&self) -> Vec<Story> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.stories.clone()
    }
}

/// Three distinct stories, titled "Story 0" to "Story 2".
pub fn sample_stories() -> Vec<Story> {
    (0..3)
        .map(|i| {
            Story::new(
                format!("Story {i}"),
                format!("Description {i}"),
                format!("https://example.com/{i}"),
                "Mon, 01 Jun 2024 10:00:00 GMT",
                "Example News",
            )
        })
        .collect()
}
