//! Story selection.
//!
//! The model sees every candidate with its 0-based index and must answer with
//! `{"selected_index": <n>, "reason": "<why>"}`. The answer is sanitized,
//! parsed, and range-checked against the candidate list. There is no fallback
//! pick: any failure means no story for this run.

use super::{ModelTask, ask_validated};
use crate::api::AskAsync;
use crate::error::{CallError, SelectionError};
use crate::models::{Selection, Story};
use crate::prompts::{SELECTION_SYSTEM, selection_prompt};
use crate::sanitize::{extract_selection, sanitize};
use tracing::{error, info, instrument, warn};

#[derive(Debug)]
pub struct StorySelector<'a, M> {
    model: &'a M,
}

impl<'a, M: AskAsync> StorySelector<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    /// Ask the model to pick one story.
    ///
    /// On success the chosen story is returned with `selection_reason` set to
    /// the model's reason.
    ///
    /// # Arguments
    ///
    /// * `stories` - Candidates in the order they are numbered in the prompt.
    ///
    /// # Returns
    ///
    /// The chosen story, [`CallError::Model`] when the model call itself
    /// failed, or [`CallError::Rejected`] when there were no candidates or the
    /// answer could not be parsed or was out of range.
    #[instrument(level = "info", skip_all, fields(candidates = stories.len()))]
    pub async fn select_story(
        &self,
        mut stories: Vec<Story>,
    ) -> Result<Story, CallError<SelectionError>> {
        if stories.is_empty() {
            return Err(CallError::Rejected(SelectionError::NoCandidates));
        }

        let task = ModelTask {
            name: "select_story",
            prompt: selection_prompt(&stories),
            system: SELECTION_SYSTEM,
        };
        let len = stories.len();
        let result = ask_validated(self.model, task, |raw| validate_selection(raw, len)).await;

        let selection = match result {
            Ok(selection) => selection,
            Err(e) => {
                match &e {
                    CallError::Model(err) => error!(error = %err, "No response from model"),
                    CallError::Rejected(SelectionError::IndexOutOfRange { index, len }) => error!(
                        index,
                        len, "Model selected a story index outside the candidate list"
                    ),
                    CallError::Rejected(err) => warn!(error = %err, "Failed to parse story selection"),
                }
                return Err(e);
            }
        };

        let mut story = stories.swap_remove(selection.selected_index);
        info!(
            index = selection.selected_index,
            title = %story.title,
            reason = %selection.reason,
            "Selected story"
        );
        story.selection_reason = Some(selection.reason);
        Ok(story)
    }
}

/// Sanitize, parse, and range-check one selection answer.
fn validate_selection(raw: &str, len: usize) -> Result<Selection, SelectionError> {
    let selection = extract_selection(&sanitize(raw))?;
    if selection.selected_index >= len {
        return Err(SelectionError::IndexOutOfRange {
            index: selection.selected_index,
            len,
        });
    }
    Ok(selection)
}
