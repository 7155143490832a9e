//! Data models shared by the pipeline stages and the scheduler.
//!
//! - [`Story`]: a candidate news story as fetched from a feed
//! - [`Selection`]: the model's pick, parsed out of free text
//! - [`ScheduleConfig`]: the persisted schedule for the `blog_generator` job
//!
//! A [`Story`] lives only for one pipeline run. Its identity for
//! deduplication is the exact, case-sensitive `title`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A candidate news story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Headline as published by the feed.
    pub title: String,
    /// Plain-text description, markup removed.
    pub description: String,
    /// Link to the original story.
    pub url: String,
    /// Publication timestamp exactly as the feed wrote it.
    pub published_at: String,
    /// Name of the outlet that published the story.
    pub source: String,
    /// Why the model picked this story. Only set by the selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_reason: Option<String>,
}

impl Story {
    /// Build an unselected story.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        published_at: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: url.into(),
            published_at: published_at.into(),
            source: source.into(),
            selection_reason: None,
        }
    }
}

/// The model's answer to "which story should we write about?".
///
/// `selected_index` is known to be non-negative once parsed; whether it is in
/// range is checked against the candidate list by the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub selected_index: usize,
    pub reason: String,
}

/// Trigger type of the scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Interval,
    Cron,
}

/// Type-specific trigger fields.
///
/// Every field is optional so that a disabled schedule round-trips as `{}`.
/// Which fields are meaningful depends on `kind`: `hours` for
/// [`ScheduleKind::Interval`], `day_of_week`/`hour`/`minute` for
/// [`ScheduleKind::Cron`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ScheduleKind>,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub hour: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub minute: Option<u32>,
}

impl ScheduleSpec {
    /// An interval trigger firing every `hours` hours.
    pub fn interval(hours: u32) -> Self {
        Self {
            kind: Some(ScheduleKind::Interval),
            hours: Some(hours),
            ..Self::default()
        }
    }

    /// A cron-style trigger.
    pub fn cron(day_of_week: impl Into<String>, hour: u32, minute: u32) -> Self {
        Self {
            kind: Some(ScheduleKind::Cron),
            day_of_week: Some(day_of_week.into()),
            hour: Some(hour),
            minute: Some(minute),
            ..Self::default()
        }
    }
}

/// Persisted schedule: the single source of truth for the scheduled job.
///
/// Serialized shape:
/// `{"enabled": bool, "schedule": {"type": "interval"|"cron", "hours"?, "day_of_week"?, "hour"?, "minute"?}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: ScheduleSpec,
}

impl ScheduleConfig {
    /// The "no schedule" value: `{"enabled": false, "schedule": {}}`.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(schedule: ScheduleSpec) -> Self {
        Self {
            enabled: true,
            schedule,
        }
    }
}

/// Accept `6`, `"6"` or `null` for numeric schedule fields.
///
/// Browser forms tend to post numbers as strings.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a non-negative integer, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!(
            "expected a non-negative integer, got {other}"
        ))),
    }
}
