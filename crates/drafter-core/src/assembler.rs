//! Section assembly: composes a section from its units' active content.
//!
//! Assembly is a pure function of the store snapshot and the brief, so
//! assembling twice without intervening commits gives identical output.

use crate::brief::Brief;
use crate::error::{DraftError, Result};
use crate::fallback;
use crate::keys::{BriefField, Key, SectionKey, UnitKey};
use crate::normalize::{normalize_ideas, normalize_points, normalize_titles};
use crate::storage::ContentStore;
use crate::types::{Content, Drawing, DrawingIdea};

/// Assembled section content plus the pieces that came from fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub content: Content,
    pub fallbacks: Vec<String>,
}

pub struct Assembler<'a, S: ContentStore + ?Sized> {
    store: &'a S,
    brief: &'a Brief,
    skip_drawings: bool,
}

impl<'a, S: ContentStore + ?Sized> Assembler<'a, S> {
    pub fn new(store: &'a S, brief: &'a Brief, skip_drawings: bool) -> Self {
        Self {
            store,
            brief,
            skip_drawings,
        }
    }

    pub fn assemble(&self, section: SectionKey) -> Result<Assembled> {
        let mut fallbacks = Vec::new();
        let content = match section {
            SectionKey::Title => self.title(&mut fallbacks)?,
            SectionKey::TechnicalField => {
                self.text_or(UnitKey::TechField, &mut fallbacks, || {
                    fallback::technical_field(self.brief)
                })?
            }
            SectionKey::Background => self.background(&mut fallbacks)?,
            SectionKey::Invention => self.invention(&mut fallbacks)?,
            SectionKey::FigureDescription => self.figure_description(&mut fallbacks)?,
            SectionKey::Implementation => self.implementation(&mut fallbacks)?,
            SectionKey::Claims => self.text_or(UnitKey::ClaimsText, &mut fallbacks, || {
                fallback::claims(self.brief, &self.solution_points().unwrap_or_default())
            })?,
            SectionKey::Abstract => self.text_or(UnitKey::AbstractText, &mut fallbacks, || {
                fallback::abstract_text(self.brief)
            })?,
            SectionKey::Drawings => return self.drawings(),
        };

        if content.is_empty() {
            return Err(DraftError::EmptyAssembledSection(section.to_string()));
        }
        Ok(Assembled { content, fallbacks })
    }

    fn active(&self, unit: UnitKey) -> Result<Option<Content>> {
        self.store.get_active(Key::Unit(unit))
    }

    fn unit_text(&self, unit: UnitKey) -> Result<String> {
        Ok(self
            .active(unit)?
            .map(|c| c.render_text().trim().to_string())
            .unwrap_or_default())
    }

    fn brief_text(&self, field: BriefField) -> String {
        self.brief.field_text(field)
    }

    fn text_or(
        &self,
        unit: UnitKey,
        fallbacks: &mut Vec<String>,
        fallback: impl FnOnce() -> String,
    ) -> Result<Content> {
        let text = self.unit_text(unit)?;
        if !text.is_empty() {
            return Ok(Content::Text(text));
        }
        fallbacks.push(unit.to_string());
        Ok(Content::Text(fallback()))
    }

    pub(crate) fn solution_points(&self) -> Result<Vec<String>> {
        Ok(match self.active(UnitKey::SolutionPoints)? {
            Some(Content::List(points)) => points,
            Some(Content::Structured(value)) => normalize_points(&value).unwrap_or_default(),
            Some(Content::Text(text)) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
    }

    pub(crate) fn drawing_ideas(&self) -> Result<Vec<DrawingIdea>> {
        Ok(match self.active(UnitKey::MermaidIdeas)? {
            Some(Content::Structured(value)) => normalize_ideas(&value).unwrap_or_default(),
            Some(Content::Drawings(drawings)) => drawings
                .into_iter()
                .map(|d| DrawingIdea {
                    title: d.title,
                    description: d.description,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Non-empty title candidates from the active title options.
    pub(crate) fn title_candidates(&self) -> Result<Vec<String>> {
        let candidates = match self.active(UnitKey::TitleOptions)? {
            Some(Content::List(titles)) => titles,
            Some(Content::Structured(value)) => normalize_titles(&value).unwrap_or_default(),
            Some(Content::Text(text)) => vec![text],
            _ => Vec::new(),
        };
        Ok(candidates
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }

    fn title(&self, fallbacks: &mut Vec<String>) -> Result<Content> {
        if let Some(last) = self.title_candidates()?.pop() {
            return Ok(Content::Text(last));
        }
        fallbacks.push(UnitKey::TitleOptions.to_string());
        Ok(Content::Text(fallback::title(self.brief).unwrap_or_default()))
    }

    fn background(&self, fallbacks: &mut Vec<String>) -> Result<Content> {
        let mut context = self.unit_text(UnitKey::BackgroundContext)?;
        if context.is_empty() {
            context = self.brief_text(BriefField::BackgroundTechnology);
            fallbacks.push(UnitKey::BackgroundContext.to_string());
        }
        let mut problem = self.unit_text(UnitKey::BackgroundProblem)?;
        if problem.is_empty() {
            problem = self.brief_text(BriefField::ProblemStatement);
            fallbacks.push(UnitKey::BackgroundProblem.to_string());
        }
        if context.is_empty() && problem.is_empty() {
            return Ok(Content::text(""));
        }
        Ok(Content::Text(format!(
            "## 2.1 对最接近发明的同类现有技术状况加以分析说明\n{}\n\n\
             ## 2.2 实事求是地指出现有技术存在的问题，尽可能分析存在的原因。\n{}",
            context, problem
        )))
    }

    fn invention(&self, fallbacks: &mut Vec<String>) -> Result<Content> {
        let mut purpose = self.unit_text(UnitKey::InventionPurpose)?;
        if purpose.is_empty() {
            purpose = fallback::invention_purpose(self.brief);
            fallbacks.push(UnitKey::InventionPurpose.to_string());
        }
        let mut solution = self.unit_text(UnitKey::InventionSolutionDetail)?;
        if solution.is_empty() {
            solution = self.brief_text(BriefField::TechnicalSolutionSummary);
            fallbacks.push(UnitKey::InventionSolutionDetail.to_string());
        }
        let mut effects = self.unit_text(UnitKey::InventionEffects)?;
        if effects.is_empty() {
            effects = self.brief_text(BriefField::AchievedEffects);
            fallbacks.push(UnitKey::InventionEffects.to_string());
        }
        if purpose.is_empty() && solution.is_empty() && effects.is_empty() {
            return Ok(Content::text(""));
        }
        Ok(Content::Text(format!(
            "## 3.1 发明目的\n{}\n\n## 3.2 技术解决方案\n{}\n\n## 3.3 技术效果\n{}",
            purpose, solution, effects
        )))
    }

    fn figure_description(&self, fallbacks: &mut Vec<String>) -> Result<Content> {
        if self.skip_drawings {
            return Ok(Content::text(fallback::NO_DRAWINGS));
        }
        let notes = self.unit_text(UnitKey::FigureNotes)?;
        if !notes.is_empty() {
            return Ok(Content::Text(notes));
        }
        fallbacks.push(UnitKey::FigureNotes.to_string());
        let lines: Vec<String> = self
            .drawing_ideas()?
            .iter()
            .enumerate()
            .map(|(i, idea)| {
                if idea.description.is_empty() {
                    format!("图{}为{}。", i + 1, idea.title)
                } else {
                    format!("图{}为{}，{}。", i + 1, idea.title, idea.description.trim_end_matches('。'))
                }
            })
            .collect();
        Ok(Content::Text(lines.join("\n")))
    }

    fn implementation(&self, fallbacks: &mut Vec<String>) -> Result<Content> {
        let mut details: Vec<String> = match self.active(UnitKey::ImplementationDetails)? {
            Some(Content::List(items)) => items,
            Some(other) => other
                .render_text()
                .lines()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        details.retain(|d| !d.trim().is_empty());
        if details.is_empty() {
            let mut solution = self.unit_text(UnitKey::InventionSolutionDetail)?;
            if solution.is_empty() {
                solution = self.brief_text(BriefField::TechnicalSolutionSummary);
            }
            details = fallback::implementation(&solution);
            fallbacks.push(UnitKey::ImplementationDetails.to_string());
        }
        Ok(Content::Text(
            details
                .iter()
                .enumerate()
                .map(|(i, d)| format!("{}. {}", i + 1, d.trim()))
                .collect::<Vec<_>>()
                .join("\n"),
        ))
    }

    /// An empty list is the skip marker, not a failure.
    fn drawings(&self) -> Result<Assembled> {
        if self.skip_drawings {
            return Ok(Assembled {
                content: Content::Drawings(Vec::new()),
                fallbacks: Vec::new(),
            });
        }
        let drawings: Vec<Drawing> = match self.active(UnitKey::MermaidCode)? {
            Some(Content::Drawings(d)) => d,
            _ => Vec::new(),
        };
        if drawings.is_empty() {
            return Err(DraftError::EmptyAssembledSection(SectionKey::Drawings.to_string()));
        }
        Ok(Assembled {
            content: Content::Drawings(drawings),
            fallbacks: Vec::new(),
        })
    }
}
