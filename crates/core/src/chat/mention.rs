//! # Mentions
//!
//! Deciding whether a chat message is addressed to the bot, and formatting
//! what the bot says back.

use serde::{Deserialize, Serialize};

/// Discord rejects messages over 2000 characters; leave room for the framing.
pub const MAX_REPLY_CHARS: usize = 1900;

pub const GREETING: &str = "👋 Hi! Send me a task after mentioning me, like:\n`@Influenxers Ingest product for michelechungugc using Notion...`";

pub const PROCESSING: &str =
    "🧠 Influenxers is processing your task. This may take up to 30 minutes ⏳...";

/// A chat message as seen by the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    /// User ids mentioned in the message
    pub mention_ids: Vec<String>,
}

/// What to do with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionOutcome {
    /// Not for us
    Ignore,
    /// Mentioned with no task text
    Greeting,
    /// Mentioned with a task
    Task(String),
}

/// Classify a message for the bot with id `bot_user_id`.
pub fn classify(bot_user_id: &str, message: &ChatMessage) -> MentionOutcome {
    if message.author_is_bot {
        return MentionOutcome::Ignore;
    }
    if !message.mention_ids.iter().any(|id| id == bot_user_id) {
        return MentionOutcome::Ignore;
    }

    let task = strip_mention(&message.content, bot_user_id);
    if task.is_empty() {
        MentionOutcome::Greeting
    } else {
        MentionOutcome::Task(task)
    }
}

/// Remove every `<@id>` / `<@!id>` mention of the bot and trim.
pub fn strip_mention(content: &str, bot_user_id: &str) -> String {
    content
        .replace(&format!("<@{}>", bot_user_id), "")
        .replace(&format!("<@!{}>", bot_user_id), "")
        .trim()
        .to_string()
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

pub fn format_success(output: &str) -> String {
    format!(
        "✅ Done!\n```\n{}\n```",
        truncate_chars(output, MAX_REPLY_CHARS)
    )
}

pub fn format_failure(error: &str) -> String {
    format!(
        "❌ Something went wrong:\n```\n{}\n```",
        truncate_chars(error, MAX_REPLY_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "1100";

    fn message(content: &str, mentions: &[&str], bot: bool) -> ChatMessage {
        ChatMessage {
            id: "m1".to_string(),
            channel_id: "c1".to_string(),
            author_id: "u1".to_string(),
            author_is_bot: bot,
            content: content.to_string(),
            mention_ids: mentions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_task_after_mention() {
        let msg = message("<@1100> Analyze style for @creator", &[BOT], false);
        assert_eq!(
            classify(BOT, &msg),
            MentionOutcome::Task("Analyze style for @creator".to_string())
        );
    }

    #[test]
    fn test_nickname_mention_is_stripped() {
        let msg = message("hey <@!1100>   generate a script", &[BOT], false);
        assert_eq!(
            classify(BOT, &msg),
            MentionOutcome::Task("hey    generate a script".to_string())
        );
    }

    #[test]
    fn test_bare_mention_is_greeting() {
        let msg = message("  <@1100>  ", &[BOT], false);
        assert_eq!(classify(BOT, &msg), MentionOutcome::Greeting);
    }

    #[test]
    fn test_unmentioned_and_bot_messages_are_ignored() {
        assert_eq!(
            classify(BOT, &message("generate a script", &[], false)),
            MentionOutcome::Ignore
        );
        assert_eq!(
            classify(BOT, &message("<@2200> hi", &["2200"], false)),
            MentionOutcome::Ignore
        );
        assert_eq!(
            classify(BOT, &message("<@1100> loop", &[BOT], true)),
            MentionOutcome::Ignore
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(2000);
        let cut = truncate_chars(&text, MAX_REPLY_CHARS);
        assert_eq!(cut.chars().count(), MAX_REPLY_CHARS);
        assert_eq!(truncate_chars("short", MAX_REPLY_CHARS), "short");
    }

    #[test]
    fn test_formatted_replies_fit_discord_limit() {
        let long = "x".repeat(5000);
        assert!(format_success(&long).chars().count() <= 2000);
        assert!(format_failure(&long).chars().count() <= 2000);
        assert!(format_success("ok").starts_with("✅ Done!"));
        assert!(format_failure("boom").contains("boom"));
    }
}
