//! Cleaning and parsing of free-text model output.
//!
//! Local models like to wrap JSON in markdown fences, prefix it with
//! "Here is the result:", or emit string concatenation as if they were
//! writing source code. [`sanitize`] undoes the common artifacts with plain
//! substring operations, and [`extract_selection`] pulls the
//! `{"selected_index": .., "reason": ..}` object out of whatever is left.

use crate::error::ParseError;
use crate::models::Selection;
use serde_json::Value;

/// Phrase that marks a chatty preamble in front of the actual answer.
const PREAMBLE_MARKER: &str = "Here is";

/// Strip fences and concatenation artifacts from raw model text.
///
/// Steps, in order:
/// 1. remove ```` ```json ```` and ```` ``` ```` markers
/// 2. replace `" +` and `+ "` with `"`, then trim
/// 3. if the text contains "Here is", keep only the span from the first `{`
///    to the last `}` inclusive
///
/// When step 3 finds no braces the text is returned as it stood after step 2;
/// callers still have to validate the structure.
pub fn sanitize(raw: &str) -> String {
    let cleaned = strip_fences(raw)
        .replace("\" +", "\"")
        .replace("+ \"", "\"")
        .trim()
        .to_string();

    if cleaned.contains(PREAMBLE_MARKER) {
        if let Some(span) = brace_span(&cleaned) {
            return span.to_string();
        }
    }
    cleaned
}

/// Parse a [`Selection`] out of arbitrary text.
///
/// The span from the first `{` to the last `}` is cut out, fences are removed,
/// and the result must be a JSON object with a non-negative integer
/// `selected_index` (a numeric string is accepted) and a non-empty string
/// `reason`. Single shot: there is no retry on failure.
///
/// # Arguments
///
/// * `text` - The raw model answer, possibly wrapped in prose or fences.
///
/// # Returns
///
/// The parsed selection, or a [`ParseError`] saying whether the JSON was
/// malformed or a field was missing or of the wrong type.
pub fn extract_selection(text: &str) -> Result<Selection, ParseError> {
    let span = brace_span(text).ok_or(ParseError::NoBraces)?;
    let candidate = strip_fences(span);
    let value: Value = serde_json::from_str(candidate.trim())?;
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    let selected_index = match object.get("selected_index") {
        None | Some(Value::Null) => return Err(ParseError::MissingField("selected_index")),
        Some(raw) => coerce_index(raw)?,
    };

    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .filter(|r| !r.trim().is_empty())
        .ok_or(ParseError::MissingField("reason"))?;

    Ok(Selection {
        selected_index,
        reason: reason.to_string(),
    })
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Slice from the first `{` to the last `}`, if they appear in that order.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn coerce_index(raw: &Value) -> Result<usize, ParseError> {
    let as_int = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match as_int {
        Some(i) if i >= 0 => usize::try_from(i).map_err(|_| ParseError::InvalidIndex(raw.to_string())),
        _ => Err(ParseError::InvalidIndex(raw.to_string())),
    }
}
