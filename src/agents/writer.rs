//! Blog post generation.
//!
//! The writer prompts the model for a complete technical post about the
//! selected story and saves the answer, untouched, as
//! `<output_dir>/<YYYY-MM-DD>-<slug>.md`. With enhancement switched on the
//! draft first goes through the [`ContentEnhancer`]; if that fails the
//! original draft is saved instead.

use super::enhancer::ContentEnhancer;
use super::{ModelTask, ask_validated, non_empty};
use crate::api::AskAsync;
use crate::error::WriteError;
use crate::models::Story;
use crate::outputs::post::{post_filename, write_post};
use crate::prompts::{WRITER_SYSTEM, blog_prompt};
use crate::publish::BlogPost;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

#[derive(Debug)]
pub struct BlogWriter<'a, M> {
    model: &'a M,
    output_dir: &'a Path,
    enhance: bool,
}

impl<'a, M: AskAsync> BlogWriter<'a, M> {
    pub fn new(model: &'a M, output_dir: &'a Path) -> Self {
        Self {
            model,
            output_dir,
            enhance: false,
        }
    }

    pub fn with_enhancement(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    /// Generate a post for `story` and write it under today's date.
    ///
    /// The returned post carries the path of the written file.
    ///
    /// # Arguments
    ///
    /// * `story` - The selected story the post is about.
    ///
    /// # Returns
    ///
    /// The saved post, or a [`WriteError`] when drafting failed or the file
    /// could not be written. A failed enhancement pass is not an error: the
    /// draft is saved instead.
    pub async fn generate_blog_post(&self, story: &Story) -> Result<BlogPost, WriteError> {
        let draft = self.draft(story).await?;
        let content = if self.enhance {
            self.enhance_or_keep(draft).await
        } else {
            draft
        };
        let path = self.save(story, &content, Local::now().date_naive()).await?;
        Ok(BlogPost::new(story, content, path))
    }

    async fn enhance_or_keep(&self, draft: String) -> String {
        match ContentEnhancer::new(self.model).enhance_content(&draft).await {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!(error = %e, "Enhancement failed; keeping the original draft");
                draft
            }
        }
    }

    /// Ask the model for the post body.
    #[instrument(level = "info", skip_all, fields(title = %story.title))]
    async fn draft(&self, story: &Story) -> Result<String, WriteError> {
        let task = ModelTask {
            name: "generate_blog_post",
            prompt: blog_prompt(story),
            system: WRITER_SYSTEM,
        };
        match ask_validated(self.model, task, |raw| non_empty(raw).map(str::to_string)).await {
            Ok(content) => {
                info!(bytes = content.len(), "Generated blog content");
                Ok(content)
            }
            Err(e) => {
                error!(error = %e, "Failed to generate blog content");
                Err(e.into())
            }
        }
    }

    /// Persist `content` for `story` as of `date`.
    async fn save(
        &self,
        story: &Story,
        content: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, WriteError> {
        let filename = post_filename(&story.title, date);
        write_post(self.output_dir, &filename, content)
            .await
            .map_err(|source| {
                let path = self.output_dir.join(&filename);
                error!(path = %path.display(), error = %source, "Failed to save blog post");
                WriteError::Io { path, source }
            })
    }
}
