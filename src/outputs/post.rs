//! Post filenames and persistence.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Longest slug kept in a filename, in characters.
pub const MAX_SLUG_CHARS: usize = 50;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").unwrap());

/// Convert a story title to a filename slug.
///
/// Characters other than word characters, whitespace and hyphens are removed,
/// runs of whitespace and hyphens collapse to a single hyphen, leading and
/// trailing hyphens are trimmed, and the result is cut to
/// [`MAX_SLUG_CHARS`] characters. Case is preserved.
///
/// ```ignore
/// assert_eq!(slugify_title("AI: The Future!! 2024"), "AI-The-Future-2024");
/// ```
pub fn slugify_title(title: &str) -> String {
    let stripped = NON_WORD.replace_all(title, "");
    let collapsed = SEPARATOR_RUNS.replace_all(&stripped, "-");
    collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect()
}

/// `<YYYY-MM-DD>-<slug>.md`
pub fn post_filename(title: &str, date: NaiveDate) -> String {
    format!("{}-{}.md", date.format("%Y-%m-%d"), slugify_title(title))
}

/// Write `content` verbatim to `dir/filename`, creating `dir` if needed.
///
/// An existing file with the same name is overwritten.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %filename))]
pub async fn write_post(dir: &Path, filename: &str, content: &str) -> std::io::Result<PathBuf> {
    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create output directory");
        return Err(e);
    }
    let path = dir.join(filename);
    fs::write(&path, content).await?;
    info!(path = %path.display(), bytes = content.len(), "Wrote blog post");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_post_filename_literal_case() {
        assert_eq!(
            post_filename("AI: The Future!! 2024", date(2024, 6, 1)),
            "2024-06-01-AI-The-Future-2024.md"
        );
    }

    #[test]
    fn test_slug_is_idempotent() {
        let once = slugify_title("AI: The Future!! 2024");
        assert_eq!(slugify_title(&once), once);
    }

    #[test]
    fn test_slugify_title_collapses_separators() {
        assert_eq!(slugify_title("Rust -- in   the  kernel"), "Rust-in-the-kernel");
        assert_eq!(slugify_title("  - leading and trailing -  "), "leading-and-trailing");
        assert_eq!(slugify_title("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_slugify_title_keeps_unicode_letters() {
        assert_eq!(slugify_title("Café über naïve?"), "Café-über-naïve");
    }

    #[test]
    fn test_slugify_title_truncates_to_fifty_chars() {
        let title = "word ".repeat(30);
        let slug = slugify_title(&title);
        assert_eq!(slug.chars().count(), MAX_SLUG_CHARS);
        assert!(slug.starts_with("word-word-"));
    }

    #[test]
    fn test_slugify_title_of_punctuation_only() {
        assert_eq!(post_filename("?!?", date(2024, 1, 2)), "2024-01-02-.md");
    }

    #[tokio::test]
    async fn test_write_post_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("output/posts");

        let path = write_post(&dir, "2024-06-01-x.md", "first").await.unwrap();
        assert_eq!(path, dir.join("2024-06-01-x.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        write_post(&dir, "2024-06-01-x.md", "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
