//! Prompt templates.
//!
//! Each stage of the pipeline has a user prompt builder and a fixed system
//! prompt. [`wrap_prompt`] adds explicit response-format instructions on top
//! of a base prompt for stages whose answer is parsed.

use crate::models::Story;

pub const SELECTION_SYSTEM: &str = r#"You are a technical blog content curator.
Respond with ONLY a JSON object in this exact format, with no additional text or explanations:
{
    "selected_index": <number>,
    "reason": "<explanation string>"
}"#;

pub const WRITER_SYSTEM: &str = "You are a professional blog writer who creates engaging, \
technical content from news articles while maintaining accuracy and readability.";

pub const ENHANCER_SYSTEM: &str = "You are a content enhancement specialist.
Your role is to improve and enrich blog post content while maintaining accuracy and readability.";

/// Field descriptions for the selection answer, in the order they are listed.
pub const SELECTION_FORMAT: &[(&str, &str)] = &[
    ("selected_index", "number: the index of the chosen story"),
    ("reason", "string: brief explanation of why this story was chosen"),
];

/// Wrap a prompt with single-turn, format-only instructions.
///
/// The output reads:
///
/// ```text
/// CONTEXT: <system_context>          (only when given)
///
/// IMPORTANT INSTRUCTIONS:
/// 1. Respond ONLY with the requested format below
/// ...
///
/// EXPECTED FORMAT:
/// key: <description>
///
/// PROMPT:
/// <base_prompt>
/// ```
pub fn wrap_prompt(
    base_prompt: &str,
    expected_format: &[(&str, &str)],
    system_context: Option<&str>,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(context) = system_context {
        lines.push(format!("CONTEXT: {context}\n"));
    }
    lines.extend(
        [
            "IMPORTANT INSTRUCTIONS:",
            "1. Respond ONLY with the requested format below",
            "2. Do NOT include explanations or additional text",
            "3. Do NOT wait for confirmation or further input",
            "4. Ensure ALL required fields are present",
            "\nEXPECTED FORMAT:",
        ]
        .map(String::from),
    );
    lines.extend(
        expected_format
            .iter()
            .map(|(key, description)| format!("{key}: <{description}>")),
    );
    lines.push("\nPROMPT:".to_string());
    lines.push(base_prompt.to_string());
    lines.join("\n")
}

/// List every story with its 0-based index and ask for the best one.
pub fn selection_prompt(stories: &[Story]) -> String {
    let stories_text = stories
        .iter()
        .enumerate()
        .map(|(i, story)| {
            format!(
                "[{i}] Title: {}\nDescription: {}\nURL: {}",
                story.title, story.description, story.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let base = format!(
        r#"Please analyze these news stories and select the most interesting one for a technical blog post:

{stories_text}

Select the story that best matches these criteria:
- Technical relevance and depth
- Current importance
- Educational value
- Reader engagement potential

Respond with a JSON object containing:
1. selected_index: the index number of the chosen story
2. reason: brief explanation of why this story was chosen"#
    );

    wrap_prompt(&base, SELECTION_FORMAT, None)
}

/// Ask for a full technical post ending in a References section that cites
/// the story as `[Title](URL)`.
pub fn blog_prompt(story: &Story) -> String {
    format!(
        r#"Create a technical blog post based on this news story:

Title: {title}
Description: {description}
URL: {url}

Requirements:
1. Write in a professional, technical tone
2. Include specific technical details and explanations
3. Structure with clear headings and paragraphs
4. Add technical insights and analysis
5. Include relevant examples or use cases
6. Maintain accuracy of information
7. End with a References section that includes:
   - The original source URL as: "[{title}]({url})"
   - Any additional relevant technical sources

Generate the complete blog post content:"#,
        title = story.title,
        description = story.description,
        url = story.url,
    )
}

pub fn enhancement_prompt(content: &str) -> String {
    format!(
        r#"Please enhance this blog post content while maintaining its core message and technical accuracy.
Add relevant details, examples, and improve readability where needed.

Original content:
{content}

Guidelines:
- Maintain technical accuracy
- Improve clarity and flow
- Add relevant examples or context
- Keep the same overall tone
- Preserve any technical terms and concepts"#
    )
}
