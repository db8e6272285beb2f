use crate::brief::Brief;
use crate::keys::Key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored version of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    /// Trimmed model output or an assembled section.
    Text(String),

    /// Parsed structured model output.
    Structured(Value),

    /// Ordered list of strings (normalized titles, per-point details).
    List(Vec<String>),

    /// The drawings collection. Empty means drawings were skipped.
    Drawings(Vec<Drawing>),

    /// A snapshot of the structured brief.
    Brief(Brief),
}

impl Content {
    pub fn text(s: impl Into<String>) -> Self {
        Content::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Content::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_drawings(&self) -> Option<&[Drawing]> {
        match self {
            Content::Drawings(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(s) => s.trim().is_empty(),
            Content::Structured(v) => match v {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            },
            Content::List(items) => items.iter().all(|s| s.trim().is_empty()),
            Content::Drawings(d) => d.is_empty(),
            Content::Brief(b) => b.is_empty(),
        }
    }

    /// Plain-text rendering used for prompt bindings, generic section
    /// assembly, and refinement context.
    pub fn render_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Structured(v) => stringify_value(v),
            Content::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Content::Drawings(drawings) => {
                if drawings.is_empty() {
                    return String::new();
                }
                let mut out = String::from("附图列表:");
                for d in drawings {
                    out.push_str(&format!("\n- {}: {}", d.title, d.description));
                }
                out
            }
            Content::Brief(brief) => brief.render_text(),
        }
    }
}

/// Lists render one entry per line; records pretty-print.
pub(crate) fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => serde_json::to_string_pretty(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// A drawing concept proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawingIdea {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A drawing with its diagram source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawing {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Mermaid source without code fences.
    #[serde(default)]
    pub code: String,
}

/// Version history of one key.
///
/// Once a version exists `active` always indexes into `versions`. Appending
/// moves `active` to the newest entry; history is never truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedArtifact {
    pub versions: Vec<Content>,
    pub active: usize,
    pub updated_at: DateTime<Utc>,
}

impl VersionedArtifact {
    pub fn active_content(&self) -> Option<&Content> {
        self.versions.get(self.active)
    }
}

/// Result of a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionUpdate {
    pub key: Key,
    /// Index of the now-active version.
    pub index: usize,
    /// Total number of versions after the commit.
    pub count: usize,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_list_renders_line_by_line() {
        let content = Content::Structured(json!(["a", {"k": 1}, ""]));
        assert_eq!(content.render_text(), "a\n{\"k\":1}");
    }

    #[test]
    fn test_drawings_render_as_listing() {
        let content = Content::Drawings(vec![Drawing {
            title: "系统架构图".into(),
            description: "整体结构".into(),
            code: "graph TD".into(),
        }]);
        assert_eq!(content.render_text(), "附图列表:\n- 系统架构图: 整体结构");
        assert!(Content::Drawings(vec![]).is_empty());
    }

    #[test]
    fn test_whitespace_text_is_empty() {
        assert!(Content::text("  \n").is_empty());
        assert!(!Content::text("x").is_empty());
        assert!(Content::List(vec!["".into(), " ".into()]).is_empty());
    }

    #[test]
    fn test_content_serde_tagging() {
        let json = serde_json::to_value(Content::List(vec!["a".into()])).unwrap();
        assert_eq!(json, json!({"type": "list", "value": ["a"]}));
        let back: Content = serde_json::from_value(json).unwrap();
        assert_eq!(back, Content::List(vec!["a".into()]));
    }
}
