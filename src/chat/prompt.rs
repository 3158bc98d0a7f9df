// src/chat/prompt.rs
// Conversation assembly for one chat request

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

pub const SYSTEM_PROMPT: &str = r#"You are "Luna", a creative writing companion.

LANGUAGE: answer in English.

ROLE: help with scripts, novels, plotting, character development and prose.
Be creative, inspiring and detailed. You refer to yourself as female.

STYLE: neutral English. Be direct and helpful, skip conversational filler.

CONTEXT: stay consistent with the chat history. When a question concerns the
user's own characters, places or plot, look it up in their notes with the
search_knowledge_base tool. Use web_search only for real-world facts."#;

/// A prior turn as the UI sends it. Older clients use `type`/`text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "type")]
    pub role: String,
    #[serde(default, alias = "text")]
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    fn to_message(&self) -> ChatMessage {
        match self.role.to_ascii_lowercase().as_str() {
            "user" => ChatMessage::user(&self.content),
            "system" => ChatMessage::system(&self.content),
            // assistant, bot, luna, ...
            _ => ChatMessage::assistant(&self.content),
        }
    }
}

/// System prompt, the newest `max_history` turns, optional notes, then the prompt
pub fn build_messages(
    system_prompt: &str,
    history: &[HistoryEntry],
    max_history: usize,
    notes: &[String],
    prompt: &str,
) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(max_history);
    let mut messages = Vec::with_capacity(history.len() - start + 3);

    messages.push(ChatMessage::system(system_prompt));
    messages.extend(
        history[start..]
            .iter()
            .filter(|entry| !entry.content.trim().is_empty())
            .map(HistoryEntry::to_message),
    );
    if !notes.is_empty() {
        messages.push(ChatMessage::system(notes_message(notes)));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

fn notes_message(notes: &[String]) -> String {
    let mut text = String::from("Relevant notes from the user's vault:\n");
    for note in notes {
        text.push_str("\n---\n");
        text.push_str(note);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn history(n: usize) -> Vec<HistoryEntry> {
        (0..n)
            .map(|i| HistoryEntry::new(if i % 2 == 0 { "user" } else { "assistant" }, format!("m{i}")))
            .collect()
    }

    #[test]
    fn keeps_only_the_newest_history() {
        let messages = build_messages("sys", &history(15), 10, &[], "now");
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "m5");
        assert_eq!(messages[11], ChatMessage::user("now"));
    }

    #[test]
    fn notes_go_right_before_the_prompt() {
        let notes = vec!["Ilsa is a smuggler.".to_string()];
        let messages = build_messages("sys", &[], 10, &notes, "who is Ilsa?");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::System);
        assert!(messages[1].content.contains("Ilsa is a smuggler."));
    }

    #[test]
    fn accepts_legacy_history_shape() {
        let entry: HistoryEntry =
            serde_json::from_value(serde_json::json!({"type": "bot", "text": "hello"})).unwrap();
        assert_eq!(entry.to_message(), ChatMessage::assistant("hello"));
    }
}
