//! Normalization of structured model output.
//!
//! Models answer list-shaped requests in several ways: a bare array, an
//! object wrapping the array under some field name, a single record, or a
//! bare string. [`Shape::classify`] recognizes each form explicitly; anything
//! else is an [`DraftError::UnrecognizedShape`] rather than an empty result.

use crate::error::{DraftError, Result};
use crate::keys::UnitKey;
use crate::types::DrawingIdea;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TITLE_WRAPPERS: &[&str] = &["titles", "options", "data", "items", "list", "names"];
const TITLE_FIELDS: &[&str] = &["title", "name", "text", "value"];
const TITLE_PLACEHOLDERS: &[&str] = &["title", "titles", "data", "items", "list", "options", "names"];

const IDEA_WRAPPERS: &[&str] = &["ideas", "items", "data", "list", "options", "figures", "drawings"];
const IDEA_TITLE_FIELDS: &[&str] = &["title", "name", "text"];
const IDEA_DESCRIPTION_FIELDS: &[&str] = &["description", "desc", "detail"];

const POINT_WRAPPERS: &[&str] = &["points", "solution_points", "items", "data", "list"];
const POINT_FIELDS: &[&str] = &["point", "text", "content", "title", "description"];

const LABEL_WRAPPERS: &[&str] = &["labels", "items", "data", "list"];

/// Recognized output shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<'a> {
    /// `[ ... ]`
    List(&'a [Value]),
    /// `{"titles": [ ... ]}` and friends.
    Wrapped(&'a str, &'a [Value]),
    /// `{"title": "..."}`: a single entry.
    Record(&'a Map<String, Value>),
    /// `"..."`
    Scalar(&'a str),
}

impl<'a> Shape<'a> {
    pub fn classify(value: &'a Value, wrappers: &[&str], entry_fields: &[&str]) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Shape::List(items)),
            Value::String(s) => Some(Shape::Scalar(s)),
            Value::Object(map) => {
                // Wrapper names are tried in priority order, not map order.
                for wrapper in wrappers {
                    if let Some((name, Value::Array(items))) = map.get_key_value(*wrapper) {
                        return Some(Shape::Wrapped(name, items));
                    }
                }
                if entry_fields.iter().any(|f| map.contains_key(*f)) {
                    return Some(Shape::Record(map));
                }
                None
            }
            _ => None,
        }
    }

    /// Individual entries, each a string or a record.
    pub fn entries(&self) -> Vec<&'a Value> {
        match self {
            Shape::List(items) | Shape::Wrapped(_, items) => items.iter().collect(),
            Shape::Record(_) | Shape::Scalar(_) => Vec::new(),
        }
    }
}

/// First non-empty string among `fields` of a record.
fn field_text(map: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| match map.get(*f) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn entry_text(entry: &Value, fields: &[&str]) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => field_text(map, fields),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn unrecognized(unit: UnitKey, value: &Value) -> DraftError {
    DraftError::UnrecognizedShape {
        key: unit.to_string(),
        raw: value.to_string(),
    }
}

fn texts(value: &Value, unit: UnitKey, wrappers: &[&str], fields: &[&str]) -> Result<Vec<String>> {
    let shape = Shape::classify(value, wrappers, fields).ok_or_else(|| unrecognized(unit, value))?;
    let raw: Vec<String> = match shape {
        Shape::Scalar(s) => vec![s.trim().to_string()],
        Shape::Record(map) => field_text(map, fields).into_iter().collect(),
        Shape::List(_) | Shape::Wrapped(..) => shape
            .entries()
            .into_iter()
            .filter_map(|e| entry_text(e, fields))
            .collect(),
    };
    Ok(raw)
}

fn dedup_non_empty(items: Vec<String>, drop: impl Fn(&str) -> bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_string();
        if item.is_empty() || drop(&item) || out.contains(&item) {
            continue;
        }
        out.push(item);
    }
    out
}

/// Candidate titles: trimmed, deduplicated, without empty strings or
/// generic field names echoed back by the model.
pub fn normalize_titles(value: &Value) -> Result<Vec<String>> {
    let raw = texts(value, UnitKey::TitleOptions, TITLE_WRAPPERS, TITLE_FIELDS)?;
    Ok(dedup_non_empty(raw, |s| {
        TITLE_PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(s))
    }))
}

/// Ordered technical points.
pub fn normalize_points(value: &Value) -> Result<Vec<String>> {
    let raw = texts(value, UnitKey::SolutionPoints, POINT_WRAPPERS, POINT_FIELDS)?;
    Ok(dedup_non_empty(raw, |_| false))
}

/// Drawing ideas. Bare strings become title-only ideas; records without any
/// title field are dropped.
pub fn normalize_ideas(value: &Value) -> Result<Vec<DrawingIdea>> {
    let shape = Shape::classify(value, IDEA_WRAPPERS, IDEA_TITLE_FIELDS)
        .ok_or_else(|| unrecognized(UnitKey::MermaidIdeas, value))?;
    let idea_of = |entry: &Value| -> Option<DrawingIdea> {
        match entry {
            Value::String(s) if !s.trim().is_empty() => Some(DrawingIdea {
                title: s.trim().to_string(),
                description: String::new(),
            }),
            Value::Object(map) => field_text(map, IDEA_TITLE_FIELDS).map(|title| DrawingIdea {
                title,
                description: field_text(map, IDEA_DESCRIPTION_FIELDS).unwrap_or_default(),
            }),
            _ => None,
        }
    };
    let ideas = match shape {
        Shape::Scalar(_) | Shape::Record(_) => idea_of(value).into_iter().collect(),
        Shape::List(_) | Shape::Wrapped(..) => {
            shape.entries().into_iter().filter_map(idea_of).collect()
        }
    };
    Ok(ideas)
}

/// A reference numeral assigned to a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureLabel {
    pub label: String,
    pub name: String,
}

pub fn normalize_labels(value: &Value) -> Result<Vec<FigureLabel>> {
    let shape = Shape::classify(value, LABEL_WRAPPERS, &["label", "name"])
        .ok_or_else(|| unrecognized(UnitKey::FigureLabels, value))?;
    let label_of = |entry: &Value| -> Option<FigureLabel> {
        let map = entry.as_object()?;
        let label = match map.get("label").or_else(|| map.get("number")) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };
        let name = field_text(map, &["name", "component"])?;
        Some(FigureLabel { label, name })
    };
    let labels = match shape {
        Shape::Record(_) => label_of(value).into_iter().collect(),
        Shape::Scalar(_) => return Err(unrecognized(UnitKey::FigureLabels, value)),
        Shape::List(_) | Shape::Wrapped(..) => {
            shape.entries().into_iter().filter_map(label_of).collect()
        }
    };
    Ok(labels)
}

/// One problem found by the claims support check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIssue {
    #[serde(default)]
    pub claim: Option<u32>,
    pub problem: String,
    #[serde(default)]
    pub suggestion: String,
}

/// Outcome of checking the claims against the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsReport {
    pub supported: bool,
    pub issues: Vec<ClaimIssue>,
}

pub fn normalize_claims_report(value: &Value) -> Result<ClaimsReport> {
    let map = value
        .as_object()
        .ok_or_else(|| unrecognized(UnitKey::ClaimsCheck, value))?;
    let issues: Vec<ClaimIssue> = match map.get("issues") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(ClaimIssue {
                    claim: None,
                    problem: s.trim().to_string(),
                    suggestion: String::new(),
                }),
                Value::Object(m) => field_text(m, &["problem", "issue", "description"]).map(|problem| {
                    ClaimIssue {
                        claim: m.get("claim").and_then(Value::as_u64).map(|n| n as u32),
                        problem,
                        suggestion: field_text(m, &["suggestion", "fix"]).unwrap_or_default(),
                    }
                }),
                _ => None,
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return Err(unrecognized(UnitKey::ClaimsCheck, value)),
    };
    let supported = match map.get("supported") {
        Some(Value::Bool(b)) => *b,
        _ => issues.is_empty(),
    };
    Ok(ClaimsReport { supported, issues })
}

/// Strip a surrounding code fence (```` ```mermaid ```` or bare ```` ``` ````).
pub fn clean_diagram_code(raw: &str) -> String {
    let mut code = raw.trim();
    if let Some(rest) = code.strip_prefix("```") {
        code = rest.strip_prefix("mermaid").unwrap_or(rest);
    }
    if let Some(rest) = code.strip_suffix("```") {
        code = rest;
    }
    code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_titles_dedup_and_placeholders() {
        let titles = normalize_titles(&json!(["Foo", "Foo", "", "items"])).unwrap();
        assert_eq!(titles, vec!["Foo".to_string()]);
    }

    #[test]
    fn test_titles_accept_every_known_shape() {
        let expected = vec!["一种图像识别方法".to_string(), "一种识别装置".to_string()];
        let shapes = [
            json!(["一种图像识别方法", "一种识别装置"]),
            json!([{"title": "一种图像识别方法"}, {"name": "一种识别装置"}]),
            json!({"titles": ["一种图像识别方法", " 一种识别装置 "]}),
            json!({"options": [{"text": "一种图像识别方法"}, {"value": "一种识别装置"}]}),
        ];
        for shape in shapes {
            assert_eq!(normalize_titles(&shape).unwrap(), expected);
        }
        assert_eq!(
            normalize_titles(&json!({"title": "一种图像识别方法"})).unwrap(),
            vec!["一种图像识别方法".to_string()]
        );
        assert_eq!(
            normalize_titles(&json!(["TITLES", "Data"])).unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_wrapper_priority_beats_key_order() {
        let value = json!({"data": ["乙"], "titles": ["甲"]});
        assert_eq!(normalize_titles(&value).unwrap(), vec!["甲".to_string()]);

        let value = json!({"data": [{"title": "图B"}], "ideas": [{"title": "图A"}]});
        let ideas = normalize_ideas(&value).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title, "图A");
    }

    #[test]
    fn test_titles_unrecognized_shape_is_error() {
        let err = normalize_titles(&json!({"unexpected": 3})).unwrap_err();
        assert!(matches!(err, DraftError::UnrecognizedShape { .. }));
        assert!(normalize_titles(&json!(42)).is_err());
    }

    #[test]
    fn test_ideas_from_mixed_entries() {
        let ideas = normalize_ideas(&json!({"ideas": [
            "系统结构图",
            {"title": "方法流程图", "desc": "步骤S1至S4"},
            {"description": "无标题"}
        ]}))
        .unwrap();
        assert_eq!(
            ideas,
            vec![
                DrawingIdea { title: "系统结构图".into(), description: String::new() },
                DrawingIdea { title: "方法流程图".into(), description: "步骤S1至S4".into() },
            ]
        );
    }

    #[test]
    fn test_ideas_single_record() {
        let ideas = normalize_ideas(&json!({"name": "模块图", "detail": "模块关系"})).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].description, "模块关系");
        assert!(normalize_ideas(&json!(true)).is_err());
    }

    #[test]
    fn test_points_shapes() {
        assert_eq!(
            normalize_points(&json!({"points": [{"point": "甲"}, "乙", "乙"]})).unwrap(),
            vec!["甲".to_string(), "乙".to_string()]
        );
    }

    #[test]
    fn test_labels() {
        let labels = normalize_labels(&json!([{"label": 1, "name": "传感器"}, {"label": "2"}])).unwrap();
        assert_eq!(labels, vec![FigureLabel { label: "1".into(), name: "传感器".into() }]);
    }

    #[test]
    fn test_claims_report_defaults_supported_from_issues() {
        let report = normalize_claims_report(&json!({"issues": [{"claim": 2, "problem": "术语不一致"}]})).unwrap();
        assert!(!report.supported);
        assert_eq!(report.issues[0].claim, Some(2));
        let clean = normalize_claims_report(&json!({"supported": true, "issues": []})).unwrap();
        assert!(clean.supported);
        assert!(normalize_claims_report(&json!([])).is_err());
    }

    #[test]
    fn test_clean_diagram_code() {
        assert_eq!(clean_diagram_code("```mermaid\ngraph TD\nA-->B\n```"), "graph TD\nA-->B");
        assert_eq!(clean_diagram_code("```\nflowchart LR\n```\n"), "flowchart LR");
        assert_eq!(clean_diagram_code("graph TD"), "graph TD");
    }
}
