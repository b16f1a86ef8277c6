//! Conversation types for Turnstile
//!
//! Turns, roles, tool-call requests/results and the persisted conversation
//! record that the file-backed store writes to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the user
    User,
    /// Messages from the assistant
    Assistant,
    /// Results from tool executions
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// One role-tagged unit of conversation content exchanged with the model.
///
/// Assistant turns that echo model-issued tool calls carry them in
/// `tool_calls`; tool turns carry the `tool_call_id` they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,
    /// Text content
    pub content: String,
    /// Tool calls requested by the assistant (echo turns only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// The tool call this turn answers (tool turns only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Turn {
    fn plain(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system turn.
    ///
    /// # Example
    /// ```
    /// use turnstile::history::{Role, Turn};
    ///
    /// let turn = Turn::system("You are a helpful assistant.");
    /// assert_eq!(turn.role, Role::System);
    /// ```
    pub fn system(content: &str) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a user turn.
    pub fn user(content: &str) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: &str) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant turn echoing the raw tool-call requests of a
    /// completion.
    ///
    /// # Example
    /// ```
    /// use turnstile::history::{ToolCallRequest, Turn};
    ///
    /// let call = ToolCallRequest::new("call_1", "echo", r#"{"message": "hi"}"#);
    /// let turn = Turn::assistant_with_tool_calls("", vec![call]);
    /// assert!(turn.has_tool_calls());
    /// ```
    pub fn assistant_with_tool_calls(content: &str, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Create a tool turn carrying a serialized tool result.
    pub fn tool(call_id: &str, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }

    /// Check whether this turn carries any tool-call requests.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }

    /// Check whether this is a tool result turn.
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool && self.tool_call_id.is_some()
    }
}

/// A model-issued request to invoke a registered tool function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier the model uses to correlate the result
    pub call_id: String,
    /// Name of the function to invoke
    pub function_name: String,
    /// Raw JSON-encoded arguments, exactly as issued by the model
    pub arguments: String,
}

impl ToolCallRequest {
    /// Create a new tool-call request.
    pub fn new(call_id: &str, function_name: &str, arguments: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            function_name: function_name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    /// Parse the arguments as a specific type.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.arguments)
    }
}

/// The serialized return value of one resolved tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The `call_id` of the request this answers
    pub call_id: String,
    /// JSON-serialized return value of the tool
    pub serialized_result: String,
}

impl ToolCallResult {
    /// Convert into the tool turn fed to the second completion call.
    pub fn into_turn(self) -> Turn {
        Turn {
            role: Role::Tool,
            content: self.serialized_result,
            tool_calls: None,
            tool_call_id: Some(self.call_id),
        }
    }
}

/// The persisted conversation of a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// The user this conversation belongs to
    pub user_id: String,
    /// Turns in original order
    pub turns: Vec<Turn>,
    /// When this conversation was created
    pub created_at: DateTime<Utc>,
    /// When this conversation was last modified
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation for the given user.
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append turns in order, bumping `updated_at`.
    pub fn extend(&mut self, turns: &[Turn]) {
        self.turns.extend_from_slice(turns);
        self.updated_at = Utc::now();
    }

    /// Number of persisted turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been persisted yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        assert_eq!(Turn::system("s").role, Role::System);
        assert_eq!(Turn::user("u").role, Role::User);
        assert_eq!(Turn::assistant("a").role, Role::Assistant);

        let tool = Turn::tool("call_1", "{}");
        assert_eq!(tool.role, Role::Tool);
        assert!(tool.is_tool_result());
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_echo_turn_without_calls_reports_none() {
        let turn = Turn::assistant_with_tool_calls("", vec![]);
        assert!(!turn.has_tool_calls());
        assert!(!Turn::assistant("plain").has_tool_calls());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), r#""tool""#);
        let parsed: Role = serde_json::from_str(r#""assistant""#).unwrap();
        assert_eq!(parsed, Role::Assistant);
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn test_turn_serialization_skips_none() {
        let json = serde_json::to_string(&Turn::user("hello")).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));

        let parsed: Turn = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(parsed, Turn::user("hi"));
    }

    #[test]
    fn test_tool_call_result_into_turn() {
        let result = ToolCallResult {
            call_id: "call_9".into(),
            serialized_result: r#"{"ok":true}"#.into(),
        };
        let turn = result.into_turn();
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.content, r#"{"ok":true}"#);
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Debug, Deserialize)]
        struct Args {
            city: String,
        }

        let call = ToolCallRequest::new("c1", "weather", r#"{"city": "Lisbon"}"#);
        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.city, "Lisbon");
        assert!(ToolCallRequest::new("c2", "weather", "not json")
            .parse_arguments::<Args>()
            .is_err());
    }

    #[test]
    fn test_conversation_extend() {
        let mut conversation = Conversation::new("u1");
        assert!(conversation.is_empty());
        conversation.extend(&[Turn::user("hi"), Turn::assistant("hello")]);
        assert_eq!(conversation.len(), 2);
        assert!(conversation.updated_at >= conversation.created_at);
    }
}
