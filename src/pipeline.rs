//! End-to-end blog generation.
//!
//! One run is strictly sequential:
//!
//! 1. **Fetch**: collect candidate stories from the source
//! 2. **Select**: one model round-trip picks a story
//! 3. **Write**: one model round-trip drafts the post
//! 4. **Enhance** (optional): one more round-trip polishes the draft
//! 5. **Persist**: the post is written to the output directory
//! 6. **Publish**: the publisher stub logs the post
//!
//! Each stage short-circuits the run on failure. Nothing is retried, and a
//! failed run leaves no partial output behind except a post that was written
//! before publishing failed.

use crate::agents::selector::StorySelector;
use crate::agents::writer::BlogWriter;
use crate::api::AskAsync;
use crate::error::PipelineError;
use crate::publish::Publisher;
use crate::sources::FetchStories;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Something that can execute one full blog generation run.
///
/// The scheduler and the HTTP surface only depend on this trait.
pub trait RunPipeline: Send + Sync + 'static {
    /// Run fetch → select → write → publish once; returns the post path.
    fn run_once(&self) -> impl Future<Output = Result<PathBuf, PipelineError>> + Send;
}

#[derive(Debug)]
pub struct Pipeline<S, M> {
    source: S,
    model: M,
    output_dir: PathBuf,
    enhance: bool,
    publisher: Publisher,
}

impl<S: FetchStories, M: AskAsync> Pipeline<S, M> {
    pub fn new(source: S, model: M, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            model,
            output_dir: output_dir.into(),
            enhance: false,
            publisher: Publisher,
        }
    }

    /// Pass every draft through the content enhancer before saving it.
    pub fn with_enhancement(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    #[instrument(level = "info", skip_all, fields(output_dir = %self.output_dir.display()))]
    pub async fn run(&self) -> Result<PathBuf, PipelineError> {
        let stories = self.source.fetch_stories().await;
        if stories.is_empty() {
            error!("No stories found");
            return Err(PipelineError::NoStories);
        }
        info!(count = stories.len(), "Fetched candidate stories");

        let story = StorySelector::new(&self.model).select_story(stories).await?;

        let post = BlogWriter::new(&self.model, &self.output_dir)
            .with_enhancement(self.enhance)
            .generate_blog_post(&story)
            .await?;
        self.publisher.publish_post(&post)?;

        Ok(post.path)
    }
}

impl<S, M> RunPipeline for Pipeline<S, M>
where
    S: FetchStories + 'static,
    M: AskAsync + 'static,
{
    async fn run_once(&self) -> Result<PathBuf, PipelineError> {
        let start_time = Instant::now();
        let outcome = self.run().await;
        let elapsed = start_time.elapsed();
        match &outcome {
            Ok(path) => info!(
                path = %path.display(),
                secs = elapsed.as_secs(),
                "Blog post created successfully"
            ),
            Err(e) => error!(error = %e, secs = elapsed.as_secs(), "Blog generation run failed"),
        }
        outcome
    }
}
