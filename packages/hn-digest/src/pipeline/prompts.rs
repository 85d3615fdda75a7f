//! Prompts handed to agent sessions.

use chrono::NaiveDate;

use crate::models::Interest;
use crate::vault::{
    AGENT_INSTRUCTIONS_FILE_NAME, DIGEST_FILE_NAME, NEWS_DIGEST_FOLDER, STORIES_FOLDER,
    UNPROCESSED_DIGEST_DATA_FILE_NAME,
};

/// System message confining the digest agent to its folder.
pub fn digest_system_message() -> String {
    format!(
        "You are an AI agent running in a secure sandbox environment with access only to the {folder} folder.\n\
         You have read/write access to files in this folder, but cannot access anything outside it.\n\
         Follow the instructions in {agent} in the current directory exactly.\n\
         Your ONLY task is to read {raw}, apply the user's interests\n\
         to group and rank stories, and write the JSON output to {digest}.\n\
         Do NOT modify {raw}.\n\
         The JSON schema is specified in {agent}; follow it precisely.",
        folder = NEWS_DIGEST_FOLDER,
        agent = AGENT_INSTRUCTIONS_FILE_NAME,
        raw = UNPROCESSED_DIGEST_DATA_FILE_NAME,
        digest = DIGEST_FILE_NAME,
    )
}

/// User prompt for a digest run.
pub fn digest_prompt(interests: &[Interest], max_stories_per_group: usize, today: NaiveDate) -> String {
    let interest_lines = interests
        .iter()
        .map(|interest| format!("- {}: {}", interest.name, interest.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate a news digest from the stories in {raw}.\n\
         \n\
         The user's configured interests are:\n\
         {interest_lines}\n\
         \n\
         Group the stories by these interests, rank them by trending score (points + comments + recency), \
         and save the JSON result following the exact schema in {agent}.\n\
         Total amount of selected story per group should not exceed {max_stories_per_group}.\n\
         Each story can belong to exactly one interest group.\n\
         Omit interest groups with no matching stories.\n\
         Today's date is {today}.",
        raw = UNPROCESSED_DIGEST_DATA_FILE_NAME,
        agent = AGENT_INSTRUCTIONS_FILE_NAME,
        today = today.format("%Y-%m-%d"),
    )
}

/// System message confining the insight agent to the stories folder.
pub fn insight_system_message() -> String {
    format!(
        "You are an AI agent running in a secure sandbox environment with access only to the {folder} folder.\n\
         You have read access to story markdown files in this folder and cannot access anything outside it.\n\
         Follow the instructions in {agent} in the current directory exactly.\n\
         Output must be markdown only and must start directly with `## TL;DR`.\n\
         Do NOT include intro phrases, process narration, or any text before the first heading.",
        folder = STORIES_FOLDER,
        agent = AGENT_INSTRUCTIONS_FILE_NAME,
    )
}

/// User prompt for a story insight.
pub fn insight_prompt(story_id: u64) -> String {
    format!(
        "Read `{story_id}.md` in the current directory and produce the insight in markdown.\n\
         Follow the instructions in {agent} in the current directory exactly.\n\
         Return ONLY the final markdown content. Do not add any prefatory sentence, commentary, \
         code fences, or notes before `## TL;DR`.",
        agent = AGENT_INSTRUCTIONS_FILE_NAME,
    )
}
