use serde::{Deserialize, Deserializer, Serialize};

/// Role of a message in an incoming chat request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
    /// Any other role (tool, function, ...). Not forwarded upstream.
    #[serde(other)]
    Other,
}

/// Message content: a plain string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message. Only text parts carry prompt content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Plain text of the content; text parts are joined by newlines.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A role-tagged message of an OpenAI-style chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: MessageRole,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: MessageContent,
}

/// Explicit `null` content reads as empty text.
fn null_as_empty<'de, D>(deserializer: D) -> Result<MessageContent, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<MessageContent>::deserialize(deserializer)?.unwrap_or_default())
}

/// Flatten a conversation into the single prompt string sent upstream.
///
/// System parts become `[Instructions]: ...`, assistant parts become
/// `[Previous reply]: ...`, user parts are kept verbatim, and parts are
/// separated by a blank line. Messages with other roles are dropped.
pub fn flatten_prompt(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter_map(|m| {
            let content = m.content.as_text();
            match m.role {
                MessageRole::System => Some(format!("[Instructions]: {content}")),
                MessageRole::User => Some(content),
                MessageRole::Assistant => Some(format!("[Previous reply]: {content}")),
                MessageRole::Other => None,
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(role: MessageRole, text: &str) -> ChatMessage {
        ChatMessage {
            role,
            content: MessageContent::Text(text.to_string()),
        }
    }

    #[test]
    fn test_flatten_roles() {
        let messages = vec![
            text_message(MessageRole::System, "X"),
            text_message(MessageRole::User, "Y"),
            text_message(MessageRole::Assistant, "Z"),
        ];
        assert_eq!(
            flatten_prompt(&messages),
            "[Instructions]: X\n\nY\n\n[Previous reply]: Z"
        );
    }

    #[test]
    fn test_flatten_empty() {
        assert_eq!(flatten_prompt(&[]), "");
    }

    #[test]
    fn test_missing_role_defaults_to_user_and_unknown_roles_drop() {
        let messages: Vec<ChatMessage> = serde_json::from_value(serde_json::json!([
            {"content": "hello"},
            {"role": "tool", "content": "ignored"},
            {"role": "assistant"}
        ]))
        .unwrap();

        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Other);
        assert_eq!(flatten_prompt(&messages), "hello\n\n[Previous reply]: ");
    }

    #[test]
    fn test_content_parts_are_joined() {
        let message: ChatMessage = serde_json::from_value(serde_json::json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image_url"},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();

        assert_eq!(flatten_prompt(&[message]), "first\nsecond");
    }

    #[test]
    fn test_null_content_reads_as_empty_text() {
        let messages: Vec<ChatMessage> = serde_json::from_value(serde_json::json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": null}
        ]))
        .unwrap();

        assert_eq!(messages[1].content, MessageContent::Text(String::new()));
        assert_eq!(flatten_prompt(&messages), "hi\n\n[Previous reply]: ");
    }
}
