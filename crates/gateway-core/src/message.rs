//! Conversation messages and content parts.
//!
//! The same types describe the request history and the fragments carried by
//! a [`Delta`](crate::Delta): a streamed fragment is simply a partial message.

use serde::{Deserialize, Serialize};

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End user
    #[default]
    User,
    /// Model output
    Assistant,
    /// Tool output fed back to the model
    Tool,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Binary attachment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    /// Optional file name
    pub name: Option<String>,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    /// Raw bytes
    pub content: Vec<u8>,
}

/// Tool invocation requested by the model.
///
/// On a streamed fragment any field may be empty: the id only appears on the
/// first fragment of a call, later fragments carry argument text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCall {
    /// Call identifier
    pub id: String,
    /// Function name
    pub name: String,
    /// JSON-encoded arguments, possibly partial
    pub arguments: String,
}

impl ToolCall {
    /// Create a complete tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    /// Id of the call this answers
    pub id: String,
    /// Tool output
    pub data: String,
}

/// Model reasoning trace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reasoning {
    /// Reasoning item id
    pub id: String,
    /// Reasoning text
    pub text: String,
    /// Reasoning summary
    pub summary: String,
    /// Opaque signature used to replay the reasoning
    pub signature: String,
}

impl Reasoning {
    /// Whether the fragment carries nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.text.is_empty() && self.summary.is_empty() && self.signature.is_empty()
    }
}

/// Exactly one kind of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain text
    Text(String),
    /// Model refusal
    Refusal(String),
    /// Attachment
    File(File),
    /// Tool call or tool call fragment
    ToolCall(ToolCall),
    /// Tool output
    ToolResult(ToolResult),
    /// Reasoning trace or fragment
    Reasoning(Reasoning),
}

/// A conversation message or message fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Author role
    pub role: Role,
    /// Ordered content parts
    pub content: Vec<Content>,
}

impl Message {
    /// Create a message with the given role and parts
    #[must_use]
    pub fn new(role: Role, content: Vec<Content>) -> Self {
        Self { role, content }
    }

    /// System message with a single text part
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![Content::Text(text.into())])
    }

    /// User message with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Content::Text(text.into())])
    }

    /// Assistant message with a single text part
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Content::Text(text.into())])
    }

    /// Tool message answering a call
    pub fn tool(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(
            Role::Tool,
            vec![Content::ToolResult(ToolResult {
                id: id.into(),
                data: data.into(),
            })],
        )
    }

    /// All text parts, separated by a blank line
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::Text(text) if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Concatenated refusal text
    #[must_use]
    pub fn refusal(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::Refusal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool calls in order
    #[must_use]
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// First reasoning part, if any
    #[must_use]
    pub fn reasoning(&self) -> Option<&Reasoning> {
        self.content.iter().find_map(|c| match c {
            Content::Reasoning(reasoning) => Some(reasoning),
            _ => None,
        })
    }
}

/// Function tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// Whether the schema must be followed exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_joins_parts() {
        let message = Message::new(
            Role::Assistant,
            vec![
                Content::Text("first".into()),
                Content::ToolCall(ToolCall::new("call_1", "lookup", "{}")),
                Content::Text("second".into()),
            ],
        );

        assert_eq!(message.text(), "first\n\nsecond");
        assert_eq!(message.tool_calls().len(), 1);
        assert!(message.reasoning().is_none());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
    }
}
