//! Google News RSS search.
//!
//! For every keyword the source requests
//! `{base}/news/rss/search?q={keyword}&hl={language}` and parses the RSS 2.0
//! response. Terms are queried one after the other and querying stops as soon
//! as enough relevant stories have been collected.
//!
//! Item descriptions in these feeds are HTML fragments (a link to the story
//! plus the outlet name), so markup is stripped before the text is used for
//! keyword matching or shown to the model.

use super::{FetchStories, relevant_stories};
use crate::error::FeedError;
use crate::models::Story;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::pin::pin;
use tracing::{debug, error, info, instrument};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Feed location and result limits.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Base URL of the news site, e.g. `https://news.google.com`.
    pub base_url: String,
    /// Interface language passed as `hl`.
    pub language: String,
    /// Maximum number of stories returned per run.
    pub num_stories: usize,
}

#[derive(Debug)]
pub struct GoogleNewsSource {
    client: Client,
    settings: FeedSettings,
    keywords: Vec<String>,
}

impl GoogleNewsSource {
    pub fn new(settings: FeedSettings, keywords: Vec<String>) -> Result<Self, FeedError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            settings,
            keywords,
        })
    }

    fn search_url(&self, term: &str) -> Result<Url, FeedError> {
        search_url(&self.settings.base_url, term, &self.settings.language)
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_term(&self, term: &str) -> Result<Vec<Story>, FeedError> {
        let url = self.search_url(term)?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let stories = parse_feed(&body)?;
        info!(count = stories.len(), "Retrieved feed entries");
        Ok(stories)
    }
}

impl FetchStories for GoogleNewsSource {
    #[instrument(level = "info", skip_all, fields(limit = self.settings.num_stories))]
    async fn fetch_stories(&self) -> Vec<Story> {
        let limit = self.settings.num_stories;
        let mut batches = pin!(stream::iter(self.keywords.iter()).then(|term| async move {
            match self.fetch_term(term).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(%term, error = %e, "Failed to fetch news for term");
                    Vec::new()
                }
            }
        }));

        let mut stories = Vec::new();
        while stories.len() < limit {
            let Some(batch) = batches.next().await else {
                break;
            };
            stories = relevant_stories(stories.into_iter().chain(batch), &self.keywords, limit);
        }

        info!(count = stories.len(), "Fetched unique relevant stories");
        debug!(titles = ?stories.iter().map(|s| &s.title).collect::<Vec<_>>(), "Candidate stories");
        stories
    }
}

/// Build the search URL for one term.
pub fn search_url(base_url: &str, term: &str, language: &str) -> Result<Url, FeedError> {
    let mut url = Url::parse(&format!("{}/news/rss/search", base_url.trim_end_matches('/')))?;
    url.query_pairs_mut()
        .append_pair("q", term)
        .append_pair("hl", language);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// Parse an RSS 2.0 document into stories, in feed order.
///
/// Missing fields get placeholders: `"No Title"`, `"No Description"`,
/// `"Unknown"` for the outlet, and empty strings for link and date.
pub fn parse_feed(xml: &str) -> Result<Vec<Story>, FeedError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss.channel.items.into_iter().map(item_to_story).collect())
}

fn item_to_story(item: Item) -> Story {
    let description = item
        .description
        .map(|d| html_to_text(&d))
        .filter(|d| !d.is_empty());
    Story::new(
        non_empty(item.title).unwrap_or_else(|| "No Title".to_string()),
        description.unwrap_or_else(|| "No Description".to_string()),
        item.link.unwrap_or_default(),
        item.pub_date.unwrap_or_default(),
        non_empty(item.source.and_then(|s| s.name)).unwrap_or_else(|| "Unknown".to_string()),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Flatten an HTML fragment into whitespace-normalized text.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
