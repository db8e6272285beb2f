//! Whole-document refinement into a parallel draft.

use crate::audit::AuditAction;
use crate::error::{DraftError, Result};
use crate::keys::{Key, SectionKey};
use crate::prompt::{materialize, templates, Bindings};
use crate::session::{DraftSession, REFINED_DRAFT_META};
use crate::storage::ContentStore;
use crate::types::Content;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Refined section texts. Kept apart from the versioned primary content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedDraft {
    pub sections: BTreeMap<SectionKey, Content>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RefinedDraft {
    pub fn get(&self, section: SectionKey) -> Option<&Content> {
        self.sections.get(&section)
    }
}

fn context_block(section: SectionKey, content: &Content) -> Option<String> {
    let text = content.render_text();
    if text.trim().is_empty() {
        return None;
    }
    Some(format!("--- {} ---\n{}", section.label(), text))
}

impl<S: ContentStore> DraftSession<S> {
    /// Rewrite every generated section with the rest of the document as
    /// context. Drawings are carried over unchanged. The primary versions are
    /// never touched; the result is saved as the session's refined draft.
    pub async fn refine_all(&self) -> Result<RefinedDraft> {
        let mut current = BTreeMap::new();
        for section in self.graph.section_order() {
            if let Some(content) = self.store.get_active(Key::Section(*section))? {
                current.insert(*section, content);
            }
        }
        if current.values().all(Content::is_empty) {
            return Err(DraftError::Validation("no generated sections to refine".into()));
        }

        let mut sections = BTreeMap::new();
        let mut warnings = Vec::new();
        for section in self.graph.section_order() {
            let Some(content) = current.get(section) else {
                continue;
            };
            if *section == SectionKey::Drawings {
                sections.insert(*section, content.clone());
                continue;
            }

            let context = self
                .graph
                .section_order()
                .iter()
                .filter(|other| *other != section)
                .filter_map(|other| current.get(other).and_then(|c| context_block(*other, c)))
                .collect::<Vec<_>>()
                .join("\n\n");

            let definition = self.graph.section(*section)?;
            let instructions = definition
                .refine_instructions
                .iter()
                .map(|u| self.graph.unit(*u).map(|unit| unit.template))
                .collect::<Result<Vec<_>>>()?
                .join("\n\n");

            let mut bindings = Bindings::new();
            bindings
                .bind_tolerant("global_context", context)
                .bind("target_section_name", section.label())
                .bind("target_section_content", content.render_text());
            if instructions.is_empty() {
                let warning = format!("{} has no original instructions; refined with context only", section);
                self.audit.warn(
                    AuditAction::RefineWarning,
                    warning.clone(),
                    json!({ "section": section }),
                );
                warnings.push(warning);
                bindings.bind_tolerant("original_generation_prompt", "");
            } else {
                bindings.bind("original_generation_prompt", instructions);
            }

            let prompt = materialize(templates::REFINE, &bindings)?;
            let raw = self
                .call_model(&format!("refine-{}", section), &prompt, false)
                .await?;
            let refined = raw.trim();
            if refined.is_empty() {
                let warning = format!("{} refinement came back empty; kept current text", section);
                self.audit.warn(
                    AuditAction::RefineWarning,
                    warning.clone(),
                    json!({ "section": section }),
                );
                warnings.push(warning);
                sections.insert(*section, content.clone());
            } else {
                sections.insert(*section, Content::text(refined));
            }
        }

        let draft = RefinedDraft {
            sections,
            warnings,
            created_at: Utc::now(),
        };
        self.store
            .put_metadata(REFINED_DRAFT_META, &serde_json::to_vec(&draft)?)?;
        self.audit.info(
            AuditAction::RefineCompleted,
            format!("refined {} sections", draft.sections.len()),
            json!({
                "sections": draft.sections.keys().collect::<Vec<_>>(),
                "warnings": draft.warnings.len(),
            }),
        );
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Drawing;

    #[test]
    fn test_context_block_skips_empty() {
        assert!(context_block(SectionKey::Claims, &Content::text("  ")).is_none());
        assert_eq!(
            context_block(SectionKey::Claims, &Content::text("1. 一种方法。")).unwrap(),
            "--- 权利要求书 ---\n1. 一种方法。"
        );
    }

    #[test]
    fn test_context_block_lists_drawings() {
        let drawings = Content::Drawings(vec![Drawing {
            title: "流程图".into(),
            description: "方法步骤".into(),
            code: "graph TD".into(),
        }]);
        assert_eq!(
            context_block(SectionKey::Drawings, &drawings).unwrap(),
            "--- 附图 ---\n附图列表:\n- 流程图: 方法步骤"
        );
    }

    #[test]
    fn test_refined_draft_serde() {
        let mut sections = BTreeMap::new();
        sections.insert(SectionKey::Abstract, Content::text("摘要"));
        let draft = RefinedDraft {
            sections,
            warnings: vec![],
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&draft).unwrap();
        assert!(json.contains("\"abstract\""));
        let back: RefinedDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back, draft);
    }
}
