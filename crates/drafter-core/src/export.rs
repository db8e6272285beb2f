//! Rendering a finished draft as a single document.

use crate::error::Result;
use crate::fallback::NO_DRAWINGS;
use crate::keys::{Key, SectionKey};
use crate::normalize::FigureLabel;
use crate::refine::RefinedDraft;
use crate::session::DraftSession;
use crate::storage::ContentStore;
use crate::types::{Content, Drawing};
use std::collections::BTreeMap;

const NUMERALS: [&str; 9] = ["一", "二", "三", "四", "五", "六", "七", "八", "九"];

/// Section contents plus what the renderer needs besides them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatentDocument {
    pub sections: BTreeMap<SectionKey, Content>,
    pub figure_labels: Vec<FigureLabel>,
    pub skip_drawings: bool,
}

impl PatentDocument {
    pub fn text(&self, section: SectionKey) -> String {
        self.sections
            .get(&section)
            .map(|c| c.render_text().trim().to_string())
            .unwrap_or_default()
    }

    pub fn drawings(&self) -> &[Drawing] {
        self.sections
            .get(&SectionKey::Drawings)
            .and_then(Content::as_drawings)
            .unwrap_or_default()
    }
}

pub trait DocumentRenderer {
    fn render(&self, document: &PatentDocument) -> String;
}

/// Markdown with one top-level heading per section in fixed order.
#[derive(Debug, Default)]
pub struct MarkdownRenderer;

fn render_labels(labels: &[FigureLabel]) -> String {
    let mut out = String::from("附图标记说明：");
    for l in labels {
        out.push_str(&format!("\n{} {}", l.label, l.name));
    }
    out
}

fn render_drawings(drawings: &[Drawing]) -> String {
    drawings
        .iter()
        .enumerate()
        .map(|(i, d)| format!("## 附图{}：{}\n```mermaid\n{}\n```\n\n", i + 1, d.title, d.code.trim()))
        .collect()
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, document: &PatentDocument) -> String {
        let mut out = String::new();
        for (i, section) in SectionKey::ALL.iter().enumerate() {
            out.push_str(&format!("# {}、{}\n", NUMERALS[i], section.label()));
            match section {
                SectionKey::Drawings => {
                    let drawings = document.drawings();
                    if document.skip_drawings || drawings.is_empty() {
                        out.push_str(NO_DRAWINGS);
                        out.push('\n');
                    } else {
                        out.push_str(&render_drawings(drawings));
                    }
                }
                SectionKey::FigureDescription => {
                    let text = document.text(*section);
                    if text.is_empty() && document.skip_drawings {
                        out.push_str(NO_DRAWINGS);
                    } else {
                        out.push_str(&text);
                    }
                    out.push_str("\n\n");
                    if !document.skip_drawings && !document.figure_labels.is_empty() {
                        out.push_str(&render_labels(&document.figure_labels));
                        out.push_str("\n\n");
                    }
                }
                _ => {
                    out.push_str(&document.text(*section));
                    out.push_str("\n\n");
                }
            }
        }
        out
    }
}

impl<S: ContentStore> DraftSession<S> {
    /// Collect the active primary sections.
    pub fn document(&self) -> Result<PatentDocument> {
        let mut sections = BTreeMap::new();
        for section in SectionKey::ALL {
            if let Some(content) = self.store.get_active(Key::Section(*section))? {
                sections.insert(*section, content);
            }
        }
        Ok(PatentDocument {
            sections,
            figure_labels: self.figure_labels()?,
            skip_drawings: self.config.skip_drawings,
        })
    }

    /// Refined sections where available, primary content elsewhere.
    pub fn refined_document(&self, refined: &RefinedDraft) -> Result<PatentDocument> {
        let mut document = self.document()?;
        for (section, content) in &refined.sections {
            document.sections.insert(*section, content.clone());
        }
        Ok(document)
    }

    /// Render the draft as Markdown, preferring the refined draft when asked
    /// and one exists.
    pub fn export_markdown(&self, use_refined: bool) -> Result<String> {
        let document = match self.refined()? {
            Some(refined) if use_refined => self.refined_document(&refined)?,
            _ => self.document()?,
        };
        Ok(MarkdownRenderer.render(&document))
    }
}
