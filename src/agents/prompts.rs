//! Prompt text for the three agents

use crate::models::JournalEntry;

/// Interaction log name of the command agent
pub const COMMAND_AGENT: &str = "game_agent";
/// Interaction log name of the narration decider
pub const DECIDER_AGENT: &str = "update_decider";
/// Interaction log name of the narrator
pub const NARRATOR_AGENT: &str = "story_narration";

/// Narrator reply meaning there is nothing new to tell
pub const NOTHING_TO_NARRATE: &str = "No new events to narrate.";

pub const COMMAND_SYSTEM: &str = "\
You are playing a parser-based interactive fiction game. Read the game log \
and choose the single next command to type.

Commands are short imperative English sentences: NORTH (or N), EXAMINE LAMP, \
TAKE ALL, PUT KEY IN BOX, ASK WIZARD ABOUT CROWN, INVENTORY (or I), LOOK (or L). \
Only the first six letters of each word matter and case is ignored. Several \
actions can be chained with THEN or a period.

When the log ends with ***MORE*** or the game asks you to press a key, answer \
with the command ENTER. When it ends with the '>' prompt, answer with the next \
sensible move. Explore methodically, read everything, and avoid repeating a \
command that just failed.

Reply with a JSON object: {\"command\": \"...\", \"explanation\": \"...\"}";

pub const DECIDER_SYSTEM: &str = "\
You decide when the story narration of an interactive fiction session should \
be extended. You receive the most recent game updates as JSON. Narration is \
worthwhile when something happened: the player moved, found or used an \
object, met a character, or the plot advanced. It is not worthwhile for \
parser errors, repeated descriptions, or keypress prompts.

Reply with a JSON object: {\"should_update\": true|false, \"reason\": \"...\"}";

pub const NARRATOR_SYSTEM: &str = "\
You narrate an interactive fiction game as a story. Write a short, direct \
passage about the newest events only. Keep continuity with the previous \
narrations and never repeat what they already told. Include dialogue and \
discoveries, skip parser errors and system prompts, never mention that this \
is a game, and never invent details the game did not show. If nothing new \
happened, reply exactly: No new events to narrate.";

/// User message for the command agent
pub fn command_prompt(transcript: &str, awaiting_keypress: bool) -> String {
    let mut prompt = format!(
        "Here is the current game log. What should the next command be?\n\n{}\n\n",
        transcript
    );
    if awaiting_keypress {
        prompt.push_str("The game is waiting for a keypress.\n\n");
    }
    prompt.push_str(
        "Respond with ONLY the raw JSON object, nothing else. Do not use markdown or any extra text.",
    );
    prompt
}

/// User message for the narration decider
pub fn decision_prompt(recent: &[JournalEntry]) -> String {
    let updates = serde_json::to_string_pretty(recent).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Here are the last few game updates. Should the story be updated?\n\n{}\n\n\
         Respond with ONLY a JSON object containing a 'should_update' boolean and a 'reason' string.",
        updates
    )
}

/// User message for the narrator
pub fn narration_prompt(previous: &str, events: &str) -> String {
    format!(
        "Previous narrations:\n{}\n\nLatest game events to narrate:\n{}\n\n\
         Write the next narration. Describe only what is new, stay concise, and respond with the narration only.",
        previous, events
    )
}

/// Whether a narrator reply carries no narration
pub fn is_empty_narration(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOTHING_TO_NARRATE)
}
