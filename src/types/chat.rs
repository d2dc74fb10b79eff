use serde::Serialize;

use super::ToolResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One side of a request/response pair in the chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    pub role: Role,
    pub text: String,
    pub thinking: Option<String>,
    pub tool_used: Option<String>,
    pub tool_result: Option<ToolResult>,
}

impl ChatExchange {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            thinking: None,
            tool_used: None,
            tool_result: None,
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        thinking: Option<String>,
        tool: Option<(String, ToolResult)>,
    ) -> Self {
        let (tool_used, tool_result) = match tool {
            Some((name, result)) => (Some(name), Some(result)),
            None => (None, None),
        };
        Self {
            role: Role::Assistant,
            text: text.into(),
            thinking,
            tool_used,
            tool_result,
        }
    }
}
