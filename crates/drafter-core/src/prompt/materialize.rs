use crate::error::{DraftError, Result};
use std::collections::BTreeMap;

/// Named values for a template.
///
/// A name bound to `None` is a tolerated empty brief field and renders as the
/// empty string; a name that was never bound is an error at materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, Option<String>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), Some(value.into()));
        self
    }

    /// Bind a value that may legitimately be empty.
    pub fn bind_tolerant(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        let value = if value.trim().is_empty() { None } else { Some(value) };
        self.values.insert(name.into(), value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_deref().unwrap_or_default())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Finds `{identifier}` tokens starting at byte offset `from`.
/// Returns `(start, end_exclusive, name)`.
fn next_placeholder(template: &str, from: usize) -> Option<(usize, usize, &str)> {
    let bytes = template.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(rel) = template[i + 1..].find(|c| c == '{' || c == '}') {
                let close = i + 1 + rel;
                if bytes[close] == b'}' {
                    let name = &template[i + 1..close];
                    if is_identifier(name) {
                        return Some((i, close + 1, name));
                    }
                }
            }
        }
        i += 1;
    }
    None
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut pos = 0;
    while let Some((_, end, name)) = next_placeholder(template, pos) {
        if !names.contains(&name) {
            names.push(name);
        }
        pos = end;
    }
    names
}

/// Substitute `{identifier}` placeholders with bound values.
///
/// Braces that do not enclose a bare identifier (JSON examples, stray
/// delimiters) are copied through literally. Bound values are inserted
/// verbatim and never rescanned, so braces inside them survive unchanged.
pub fn materialize(template: &str, bindings: &Bindings) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut pos = 0;
    while let Some((start, end, name)) = next_placeholder(template, pos) {
        out.push_str(&template[pos..start]);
        let value = bindings
            .get(name)
            .ok_or_else(|| DraftError::MissingBinding(name.to_string()))?;
        out.push_str(value);
        pos = end;
    }
    out.push_str(&template[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_substitutes_named_placeholders() {
        let b = Bindings::new().with("x", "甲").with("y", "乙");
        assert_eq!(materialize("{x} 与 {y}；再次 {x}", &b).unwrap(), "甲 与 乙；再次 甲");
    }

    #[test]
    fn test_value_with_braces_is_not_rescanned() {
        let b = Bindings::new().with("x", "{unrelated} and {x}");
        assert_eq!(materialize("<{x}>", &b).unwrap(), "<{unrelated} and {x}>");
    }

    #[test]
    fn test_literal_json_in_template_survives() {
        let b = Bindings::new().with("topic", "t");
        let template = r#"输出示例 {"titles": ["a"]} 主题 {topic} {'k': 1} { } {}"#;
        assert_eq!(
            materialize(template, &b).unwrap(),
            r#"输出示例 {"titles": ["a"]} 主题 t {'k': 1} { } {}"#
        );
    }

    #[test]
    fn test_missing_binding_is_error() {
        let err = materialize("问题：{problem_statement}", &Bindings::new()).unwrap_err();
        assert!(matches!(err, DraftError::MissingBinding(ref n) if n == "problem_statement"));
    }

    #[test]
    fn test_tolerated_empty_binding_renders_empty() {
        let mut b = Bindings::new();
        b.bind_tolerant("achieved_effects", "   ");
        assert_eq!(materialize("效果：[{achieved_effects}]", &b).unwrap(), "效果：[]");
    }

    #[test]
    fn test_nested_open_brace_finds_inner_placeholder() {
        let b = Bindings::new().with("a", "1");
        assert_eq!(materialize("{{a}}", &b).unwrap(), "{1}");
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(placeholders("{b} {a} {b} {\"x\"} {_c1}"), vec!["b", "a", "_c1"]);
    }

    proptest! {
        #[test]
        fn prop_bound_values_appear_verbatim(value in ".*") {
            let b = Bindings::new().with("x", value.clone());
            let out = materialize("前{x}后", &b).unwrap();
            prop_assert_eq!(out, format!("前{}后", value));
        }
    }
}
