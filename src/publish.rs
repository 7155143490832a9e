//! Post publishing.
//!
//! There is no real publishing target yet: [`Publisher::publish_post`] logs
//! the post metadata and reports success. It is the last stage of a pipeline
//! run and the place where a website or CMS integration would plug in.

use crate::error::PublishError;
use crate::models::Story;
use crate::utils::preview;
use std::path::PathBuf;
use tracing::{error, info, instrument};

/// Characters of content shown in the publish log line.
const PREVIEW_CHARS: usize = 100;

/// Everything the publisher knows about a post.
#[derive(Debug, Clone)]
pub struct BlogPost {
    pub title: String,
    pub content: String,
    /// Outlet of the underlying story.
    pub source: String,
    /// Link to the underlying story.
    pub source_link: String,
    /// Where the markdown file was written.
    pub path: PathBuf,
}

impl BlogPost {
    pub fn new(story: &Story, content: String, path: PathBuf) -> Self {
        Self {
            title: story.title.clone(),
            content,
            source: story.source.clone(),
            source_link: story.url.clone(),
            path,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Publisher;

impl Publisher {
    #[instrument(level = "info", skip_all, fields(path = %post.path.display()))]
    pub fn publish_post(&self, post: &BlogPost) -> Result<(), PublishError> {
        if post.content.trim().is_empty() {
            error!(title = %post.title, "Refusing to publish a post without content");
            return Err(PublishError::EmptyContent);
        }

        info!(
            title = %post.title,
            content_preview = %format!("{}...", preview(&post.content, PREVIEW_CHARS)),
            source = %post.source,
            source_link = %post.source_link,
            "Publishing post"
        );
        Ok(())
    }
}
