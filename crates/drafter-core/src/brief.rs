//! The structured brief: the user-reviewed analysis of the invention that
//! seeds every generation unit.

use crate::error::{DraftError, Result};
use crate::keys::BriefField;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One key component or method step with its function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyComponent {
    pub name: String,
    #[serde(default)]
    pub function: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brief {
    #[serde(default)]
    pub background_technology: Option<String>,
    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub core_inventive_concept: Option<String>,
    #[serde(default)]
    pub technical_solution_summary: Option<String>,
    #[serde(default)]
    pub achieved_effects: Option<String>,
    #[serde(default)]
    pub key_components_or_steps: Vec<KeyComponent>,
}

impl Brief {
    /// Trimmed text of a field; empty when absent. The components field
    /// renders as `name: function` lines.
    pub fn field_text(&self, field: BriefField) -> String {
        let raw = match field {
            BriefField::BackgroundTechnology => self.background_technology.as_deref(),
            BriefField::ProblemStatement => self.problem_statement.as_deref(),
            BriefField::CoreInventiveConcept => self.core_inventive_concept.as_deref(),
            BriefField::TechnicalSolutionSummary => self.technical_solution_summary.as_deref(),
            BriefField::AchievedEffects => self.achieved_effects.as_deref(),
            BriefField::KeyComponentsOrSteps => return self.components_text(),
        };
        raw.map(str::trim).unwrap_or_default().to_string()
    }

    pub fn has(&self, field: BriefField) -> bool {
        !self.field_text(field).is_empty()
    }

    /// Replace a text field. Whitespace-only values clear the field.
    pub fn set_field(&mut self, field: BriefField, value: &str) -> Result<()> {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match field {
            BriefField::BackgroundTechnology => self.background_technology = value,
            BriefField::ProblemStatement => self.problem_statement = value,
            BriefField::CoreInventiveConcept => self.core_inventive_concept = value,
            BriefField::TechnicalSolutionSummary => self.technical_solution_summary = value,
            BriefField::AchievedEffects => self.achieved_effects = value,
            BriefField::KeyComponentsOrSteps => {
                let parsed: Value = serde_json::from_str(value.as_deref().unwrap_or("[]"))?;
                self.key_components_or_steps = parse_components(&parsed)?;
            }
        }
        Ok(())
    }

    pub fn components_text(&self) -> String {
        self.key_components_or_steps
            .iter()
            .map(|c| {
                if c.function.trim().is_empty() {
                    c.name.trim().to_string()
                } else {
                    format!("{}: {}", c.name.trim(), c.function.trim())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn components_json(&self) -> String {
        serde_json::to_string_pretty(&self.key_components_or_steps).unwrap_or_else(|_| "[]".into())
    }

    pub fn is_empty(&self) -> bool {
        BriefField::ALL.iter().all(|f| !self.has(*f))
    }

    pub fn render_text(&self) -> String {
        BriefField::ALL
            .iter()
            .filter(|f| self.has(**f))
            .map(|f| format!("{}: {}", f.as_str(), self.field_text(*f)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the analysis model's JSON answer. Missing fields stay empty;
    /// the component list may arrive as records, strings, or one string.
    pub fn from_model_value(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            DraftError::Validation("brief analysis must be a JSON object".into())
        })?;
        let text = |name: &str| -> Option<String> {
            match obj.get(name) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Null) | None => None,
                Some(Value::String(_)) => None,
                Some(other) => Some(other.to_string()),
            }
        };
        let components = match obj.get(BriefField::KeyComponentsOrSteps.as_str()) {
            Some(v) => parse_components(v)?,
            None => Vec::new(),
        };
        Ok(Self {
            background_technology: text(BriefField::BackgroundTechnology.as_str()),
            problem_statement: text(BriefField::ProblemStatement.as_str()),
            core_inventive_concept: text(BriefField::CoreInventiveConcept.as_str()),
            technical_solution_summary: text(BriefField::TechnicalSolutionSummary.as_str()),
            achieved_effects: text(BriefField::AchievedEffects.as_str()),
            key_components_or_steps: components,
        })
    }
}

/// Accepts a list of `{name, function}` records, a list of strings, or a
/// single newline-separated string. Records without a name are rejected.
pub fn parse_components(value: &Value) -> Result<Vec<KeyComponent>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(component_from_line)
            .collect()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) if !s.trim().is_empty() => out.push(component_from_line(s.trim())),
                    Value::String(_) => {}
                    Value::Object(map) => {
                        let name = map
                            .get("name")
                            .and_then(Value::as_str)
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .ok_or_else(|| {
                                DraftError::Validation(format!(
                                    "key component #{} is missing a name",
                                    i + 1
                                ))
                            })?;
                        let function = map
                            .get("function")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .trim();
                        out.push(KeyComponent {
                            name: name.to_string(),
                            function: function.to_string(),
                        });
                    }
                    other => {
                        return Err(DraftError::Validation(format!(
                            "key component #{} has unsupported shape: {}",
                            i + 1,
                            other
                        )))
                    }
                }
            }
            Ok(out)
        }
        other => Err(DraftError::Validation(format!(
            "key components must be a list, got {}",
            other
        ))),
    }
}

fn component_from_line(line: &str) -> KeyComponent {
    let split = line.split_once('：').or_else(|| line.split_once(':'));
    match split {
        Some((name, function)) => KeyComponent {
            name: name.trim().to_string(),
            function: function.trim().to_string(),
        },
        None => KeyComponent {
            name: line.to_string(),
            function: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_text_trims_and_defaults() {
        let brief = Brief {
            problem_statement: Some("  噪声大  ".into()),
            ..Default::default()
        };
        assert_eq!(brief.field_text(BriefField::ProblemStatement), "噪声大");
        assert_eq!(brief.field_text(BriefField::AchievedEffects), "");
        assert!(!brief.has(BriefField::AchievedEffects));
    }

    #[test]
    fn test_from_model_value_tolerates_component_shapes() {
        let value = json!({
            "background_technology": "图像识别",
            "problem_statement": "",
            "key_components_or_steps": ["采集模块：采集图像", {"name": "处理模块", "function": "提取边缘"}]
        });
        let brief = Brief::from_model_value(&value).unwrap();
        assert_eq!(brief.background_technology.as_deref(), Some("图像识别"));
        assert_eq!(brief.problem_statement, None);
        assert_eq!(brief.key_components_or_steps.len(), 2);
        assert_eq!(brief.key_components_or_steps[0].name, "采集模块");
        assert_eq!(brief.key_components_or_steps[0].function, "采集图像");
        assert_eq!(brief.components_text(), "采集模块: 采集图像\n处理模块: 提取边缘");
    }

    #[test]
    fn test_from_model_value_rejects_non_object() {
        assert!(Brief::from_model_value(&json!(["a"])).is_err());
    }

    #[test]
    fn test_component_without_name_is_rejected() {
        let err = parse_components(&json!([{"function": "x"}])).unwrap_err();
        assert!(matches!(err, DraftError::Validation(_)));
    }

    #[test]
    fn test_set_field_components_from_json() {
        let mut brief = Brief::default();
        brief
            .set_field(
                BriefField::KeyComponentsOrSteps,
                r#"[{"name": "传感器", "function": "测量"}]"#,
            )
            .unwrap();
        assert_eq!(brief.key_components_or_steps[0].name, "传感器");
        brief.set_field(BriefField::CoreInventiveConcept, "   ").unwrap();
        assert_eq!(brief.core_inventive_concept, None);
    }
}
