use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Text generation backend.
///
/// `json_mode` asks the backend to constrain output to a JSON object where it
/// supports that; callers still parse strictly.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, messages: &[Message], json_mode: bool) -> anyhow::Result<String>;

    /// Model identifier for logs.
    fn name(&self) -> &str;
}

// ── ScriptedModel ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// In-process model answering from a fixed script.
///
/// Rules are checked in insertion order against the last user message; the
/// first rule whose marker occurs in it decides the reply. Without a matching
/// rule the default reply is returned.
#[derive(Debug)]
pub struct ScriptedModel {
    rules: Vec<(String, Reply)>,
    default: Reply,
    calls: Mutex<Vec<(String, bool)>>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new("")
    }
}

impl ScriptedModel {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: Reply::Text(default_reply.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, marker: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((marker.into(), Reply::Text(reply.into())));
        self
    }

    pub fn fail_on(mut self, marker: impl Into<String>, error: impl Into<String>) -> Self {
        self.rules.push((marker.into(), Reply::Fail(error.into())));
        self
    }

    /// Prompts received so far with their JSON-mode flag.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, messages: &[Message], json_mode: bool) -> anyhow::Result<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.clone(), json_mode));
        }
        let reply = self
            .rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.default);
        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(error) => Err(anyhow::anyhow!(error.clone())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_matches_first_rule() {
        let model = ScriptedModel::new("default")
            .on("技术领域", "领域文本")
            .fail_on("崩溃", "boom");
        let reply = model
            .invoke(&[Message::system("role"), Message::user("撰写技术领域")], false)
            .await
            .unwrap();
        assert_eq!(reply, "领域文本");
        assert!(model.invoke(&[Message::user("崩溃")], true).await.is_err());
        assert_eq!(model.invoke(&[Message::user("其他")], false).await.unwrap(), "default");
        assert_eq!(model.call_count(), 3);
        assert!(model.calls()[1].1);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("x")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"x"}"#);
    }
}
