//! Story sources.
//!
//! A source turns a list of keywords into a short list of candidate
//! [`Story`] values. The only production source is [`google_news`], which
//! runs one RSS search per keyword.
//!
//! Whatever the source, candidates go through the same policy in
//! [`relevant_stories`]:
//!
//! 1. keep entries whose title or description mentions a keyword
//!    (case-insensitive)
//! 2. drop entries whose exact title was already kept
//! 3. stop at the configured story count

pub mod google_news;

use crate::models::Story;
use itertools::Itertools;
use std::future::Future;
use std::path::Path;
use tracing::{error, info, instrument};

/// Keywords used when the keyword file cannot be read.
pub const DEFAULT_KEYWORDS: &[&str] = &["technology", "AI", "software"];

/// Anything that can produce the candidate stories for one pipeline run.
pub trait FetchStories: Send + Sync {
    /// Fetch candidates. Transport failures are logged by the source and
    /// reduce the result; an empty list means nothing usable was found.
    fn fetch_stories(&self) -> impl Future<Output = Vec<Story>> + Send;
}

/// Load keywords from a file with one keyword per line.
///
/// Blank lines are skipped and surrounding whitespace is trimmed. A missing or
/// unreadable file falls back to [`DEFAULT_KEYWORDS`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_keywords(path: &Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let keywords = parse_keywords(&text);
            info!(count = keywords.len(), "Loaded keywords");
            keywords
        }
        Err(e) => {
            error!(error = %e, "Failed to load keywords; using defaults");
            DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
        }
    }
}

fn parse_keywords(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Whether `text` contains any of `keywords`, ignoring case.
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .any(|k| haystack.contains(&k.to_lowercase()))
}

/// Apply the relevance filter, title deduplication and the story cap.
///
/// Earlier entries win: when two entries share a title, the first relevant
/// one is kept regardless of how their descriptions differ.
pub fn relevant_stories(
    candidates: impl IntoIterator<Item = Story>,
    keywords: &[String],
    limit: usize,
) -> Vec<Story> {
    candidates
        .into_iter()
        .filter(|s| contains_keyword(&s.title, keywords) || contains_keyword(&s.description, keywords))
        .unique_by(|s| s.title.clone())
        .take(limit)
        .collect()
}
