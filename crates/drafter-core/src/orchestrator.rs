//! Runs generation units and assembles sections.
//!
//! Everything here is sequential: one model call is awaited before the next
//! is issued, and iterative units walk their source list in order. A unit
//! commits at most one version, and only after all of its calls succeeded.

use crate::assembler::Assembler;
use crate::audit::{preview, AuditAction};
use crate::brief::Brief;
use crate::error::{DraftError, Result};
use crate::fallback;
use crate::graph::{GenerationUnit, OutputMode, SOLUTION_POINTS_STR};
use crate::keys::{BriefField, Dependency, Key, SectionKey, UnitKey};
use crate::model::Message;
use crate::normalize::{
    clean_diagram_code, normalize_claims_report, normalize_ideas, normalize_labels,
    normalize_points, normalize_titles, ClaimsReport, FigureLabel,
};
use crate::prompt::{materialize, placeholders, templates, Bindings};
use crate::session::DraftSession;
use crate::staleness::Freshness;
use crate::storage::ContentStore;
use crate::types::{Content, Drawing, DrawingIdea, VersionUpdate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

/// Sections whose text forms the specification context for cross-section
/// prompts.
const CONTEXT_SECTIONS: &[SectionKey] = &[
    SectionKey::TechnicalField,
    SectionKey::Background,
    SectionKey::Invention,
    SectionKey::Implementation,
];

/// What happened to one unit during section generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Committed { unit: UnitKey, index: usize },
    Skipped { unit: UnitKey, reason: String },
}

/// Result of generating one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    pub section: SectionKey,
    pub units: Vec<UnitOutcome>,
    /// Units whose part of the section came from the brief.
    pub fallbacks: Vec<String>,
    pub update: VersionUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateScope {
    /// Every section in order.
    All,
    /// Only sections that were never generated or are stale.
    Outdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub section: SectionKey,
    pub error: String,
}

/// Result of a whole-document run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub reports: Vec<SectionReport>,
    pub failures: Vec<SectionFailure>,
    /// Sections left alone because they were fresh.
    pub unchanged: Vec<SectionKey>,
    /// True when a model or storage failure ended the run early.
    pub aborted: bool,
}

impl GenerationSummary {
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.failures.is_empty()
    }
}

impl<S: ContentStore> DraftSession<S> {
    /// One audited model call bounded by the configured timeout.
    pub(crate) async fn call_model(&self, tag: &str, prompt: &str, json_mode: bool) -> Result<String> {
        let step = self.audit.next_step(tag);
        self.persist_audit_step();
        let audit_config = self.audit.config();
        let prompt_file = self.audit.write_artifact(&step, "prompt", prompt);
        self.audit.info(
            AuditAction::ModelCall,
            format!("{} -> {}", step, self.model.name()),
            json!({
                "step": step,
                "tag": tag,
                "json_mode": json_mode,
                "prompt_preview": preview(prompt, audit_config.prompt_preview_chars),
                "prompt_file": prompt_file,
            }),
        );

        let messages = [Message::system(templates::ROLE), Message::user(prompt)];
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.config.model_timeout, self.model.invoke(&messages, json_mode)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => {
                let seconds = self.config.model_timeout.as_secs();
                self.audit.error(
                    AuditAction::ModelError,
                    format!("{} timed out after {}s", step, seconds),
                    json!({ "step": step, "tag": tag, "elapsed_ms": elapsed_ms }),
                );
                Err(DraftError::ModelTimeout {
                    key: tag.to_string(),
                    seconds,
                })
            }
            Ok(Err(e)) => {
                let message = format!("{:#}", e);
                self.audit.error(
                    AuditAction::ModelError,
                    format!("{} failed: {}", step, message),
                    json!({ "step": step, "tag": tag, "elapsed_ms": elapsed_ms }),
                );
                Err(DraftError::ModelInvocation {
                    key: tag.to_string(),
                    message,
                })
            }
            Ok(Ok(text)) => {
                let response_file = self.audit.write_artifact(&step, "response", &text);
                self.audit.info(
                    AuditAction::ModelResponse,
                    format!("{} answered in {}ms", step, elapsed_ms),
                    json!({
                        "step": step,
                        "tag": tag,
                        "elapsed_ms": elapsed_ms,
                        "response_chars": text.chars().count(),
                        "response_preview": preview(&text, audit_config.response_preview_chars),
                        "response_file": response_file,
                    }),
                );
                Ok(text)
            }
        }
    }

    /// Run a single unit and commit its output as a new version.
    pub async fn run_unit(&self, key: UnitKey) -> Result<VersionUpdate> {
        let unit = self.graph.unit(key)?.clone();
        let brief = self.brief()?;

        if self.config.skip_drawings {
            let skipped = match key {
                UnitKey::MermaidIdeas => Some(Content::Structured(Value::Array(Vec::new()))),
                UnitKey::MermaidCode => Some(Content::Drawings(Vec::new())),
                _ => None,
            };
            if let Some(content) = skipped {
                return self.commit_unit(key, content, "drawings skipped");
            }
        }

        let bindings = match self.resolve_bindings(&unit, &brief) {
            Ok(bindings) => bindings,
            Err(e) => {
                self.audit.warn(
                    AuditAction::UnitSkipped,
                    format!("{}: {}", key, e),
                    json!({ "unit": key }),
                );
                return Err(e);
            }
        };

        let produced = match unit.iterate_over {
            Some(source) => self.run_iterative(&unit, source, &brief, &bindings).await,
            None => self.run_single(&unit, &bindings).await,
        };
        match produced.and_then(|content| self.title_or_fallback(key, content, &brief)) {
            Ok(content) => self.commit_unit(key, content, "generated"),
            Err(e) => {
                self.audit.error(
                    AuditAction::UnitFailed,
                    format!("{}: {}", key, e),
                    json!({ "unit": key, "raw": e.raw_output() }),
                );
                Err(e)
            }
        }
    }

    /// Title candidates that normalize to nothing are replaced by the
    /// brief-derived title before anything is committed.
    fn title_or_fallback(&self, key: UnitKey, content: Content, brief: &Brief) -> Result<Content> {
        if key != UnitKey::TitleOptions || !content.is_empty() {
            return Ok(content);
        }
        let Some(title) = fallback::title(brief) else {
            return Err(DraftError::UnresolvedDependency {
                key: key.to_string(),
                missing: vec![
                    BriefField::CoreInventiveConcept.to_string(),
                    BriefField::TechnicalSolutionSummary.to_string(),
                ],
            });
        };
        self.audit.warn(
            AuditAction::SectionFallback,
            format!("{} had no usable candidates; using brief title", key),
            json!({ "unit": key, "fallback": title }),
        );
        Ok(Content::List(vec![title]))
    }

    fn commit_unit(&self, key: UnitKey, content: Content, note: &str) -> Result<VersionUpdate> {
        let update = self.store.append_version(Key::Unit(key), content)?;
        self.audit.info(
            AuditAction::UnitCommitted,
            format!("{} version {} ({})", key, update.index, note),
            json!({ "unit": key, "index": update.index, "count": update.count }),
        );
        Ok(update)
    }

    /// Bind brief fields, resolved dependencies, and derived values.
    fn resolve_bindings(&self, unit: &GenerationUnit, brief: &Brief) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        for field in BriefField::ALL {
            bindings.bind_tolerant(field.as_str(), brief.field_text(*field));
        }

        let mut missing = Vec::new();
        for dep in &unit.dependencies {
            match dep {
                Dependency::Field(field) => {
                    if !unit.tolerates_empty_brief && !brief.has(*field) {
                        missing.push(field.to_string());
                    }
                }
                Dependency::Artifact(Key::Brief) => {
                    if !unit.tolerates_empty_brief && brief.is_empty() {
                        missing.push(Key::Brief.to_string());
                    }
                }
                Dependency::Artifact(Key::Unit(upstream)) => {
                    let text = self
                        .store
                        .get_active(Key::Unit(*upstream))?
                        .filter(|c| !c.is_empty())
                        .map(|c| c.render_text())
                        .or_else(|| {
                            upstream
                                .brief_substitute()
                                .map(|f| brief.field_text(f))
                                .filter(|t| !t.is_empty())
                        });
                    match text {
                        Some(text) => {
                            bindings.bind(upstream.as_str(), text);
                        }
                        None => missing.push(upstream.to_string()),
                    }
                }
                Dependency::Artifact(Key::Section(section)) => {
                    match self
                        .store
                        .get_active(Key::Section(*section))?
                        .filter(|c| !c.is_empty())
                    {
                        Some(content) => {
                            bindings.bind(section.as_str(), content.render_text());
                        }
                        None => missing.push(section.to_string()),
                    }
                }
            }
        }
        if !missing.is_empty() {
            return Err(DraftError::UnresolvedDependency {
                key: unit.key.to_string(),
                missing,
            });
        }

        bindings.bind("key_components_json", brief.components_json());
        if unit
            .dependencies
            .contains(&Dependency::from(UnitKey::SolutionPoints))
        {
            let points = Assembler::new(&self.store, brief, self.config.skip_drawings).solution_points()?;
            bindings.bind(SOLUTION_POINTS_STR, numbered(&points));
        }
        if placeholders(unit.template).contains(&"global_context") {
            bindings.bind("global_context", self.specification_context()?);
        }
        Ok(bindings)
    }

    /// Labeled blocks of the assembled specification sections.
    fn specification_context(&self) -> Result<String> {
        let mut blocks = Vec::new();
        for section in CONTEXT_SECTIONS {
            if let Some(content) = self.store.get_active(Key::Section(*section))? {
                if !content.is_empty() {
                    blocks.push(format!("--- {} ---\n{}", section.label(), content.render_text()));
                }
            }
        }
        Ok(blocks.join("\n\n"))
    }

    async fn run_single(&self, unit: &GenerationUnit, bindings: &Bindings) -> Result<Content> {
        let prompt = materialize(unit.template, bindings)?;
        let json_mode = unit.mode == OutputMode::StructuredJson;
        let raw = self.call_model(&format!("unit-{}", unit.key), &prompt, json_mode).await?;
        match unit.mode {
            OutputMode::PlainText => Ok(Content::Text(raw.trim().to_string())),
            OutputMode::StructuredJson => {
                let value: Value = serde_json::from_str(raw.trim()).map_err(|e| {
                    DraftError::MalformedStructuredOutput {
                        key: unit.key.to_string(),
                        reason: e.to_string(),
                        raw: raw.clone(),
                    }
                })?;
                normalize_output(unit.key, value).map_err(|e| match e {
                    DraftError::UnrecognizedShape { key, .. } => DraftError::UnrecognizedShape {
                        key,
                        raw: raw.clone(),
                    },
                    other => other,
                })
            }
        }
    }

    async fn run_iterative(
        &self,
        unit: &GenerationUnit,
        source: UnitKey,
        brief: &Brief,
        bindings: &Bindings,
    ) -> Result<Content> {
        let assembler = Assembler::new(&self.store, brief, self.config.skip_drawings);
        let tag = format!("unit-{}", unit.key);
        match source {
            UnitKey::SolutionPoints => {
                let points = assembler.solution_points()?;
                if points.is_empty() {
                    return Err(empty_source(unit.key, source));
                }
                let mut details = Vec::with_capacity(points.len());
                for (i, point) in points.iter().enumerate() {
                    let item = bindings.clone().with("point", point.as_str());
                    let prompt = materialize(unit.template, &item)?;
                    let raw = self.call_model(&format!("{}-{}", tag, i + 1), &prompt, false).await?;
                    details.push(raw.trim().to_string());
                }
                Ok(Content::List(details))
            }
            UnitKey::MermaidIdeas => {
                let ideas = assembler.drawing_ideas()?;
                if ideas.is_empty() {
                    return Err(empty_source(unit.key, source));
                }
                let mut drawings = Vec::with_capacity(ideas.len());
                for (i, idea) in ideas.into_iter().enumerate() {
                    let code = self
                        .diagram_code(unit, bindings, &idea, &format!("{}-{}", tag, i + 1))
                        .await?;
                    drawings.push(Drawing {
                        title: idea.title,
                        description: idea.description,
                        code,
                    });
                }
                Ok(Content::Drawings(drawings))
            }
            other => Err(DraftError::Validation(format!(
                "{} cannot iterate over {}",
                unit.key, other
            ))),
        }
    }

    async fn diagram_code(
        &self,
        unit: &GenerationUnit,
        bindings: &Bindings,
        idea: &DrawingIdea,
        tag: &str,
    ) -> Result<String> {
        let item = bindings
            .clone()
            .with("title", idea.title.as_str())
            .with("description", idea.description.as_str());
        let prompt = materialize(unit.template, &item)?;
        let raw = self.call_model(tag, &prompt, false).await?;
        Ok(clean_diagram_code(&raw))
    }

    // ── Sections ─────────────────────────────────────────────────────────────

    /// Run a section's units in order, assemble, and commit the section.
    ///
    /// Units that fail with a recoverable error are reported and the section
    /// falls back to brief-derived content for their part. Model and storage
    /// failures abort the section with nothing further committed.
    pub async fn generate_section(&self, section: SectionKey) -> Result<SectionReport> {
        let definition = self.graph.section(section)?.clone();
        let brief = self.brief()?;
        self.check_gates(section, &definition.dependencies, &brief)?;

        let mut outcomes = Vec::new();
        for unit in &definition.prerequisites {
            let present = self
                .store
                .get_active(Key::Unit(*unit))?
                .is_some_and(|c| !c.is_empty() || self.config.skip_drawings);
            if !present {
                outcomes.push(self.run_reported(section, *unit).await?);
            }
        }
        for unit in &definition.units {
            outcomes.push(self.run_reported(section, *unit).await?);
        }

        let brief = self.brief()?;
        let assembler = Assembler::new(&self.store, &brief, self.config.skip_drawings);
        let assembled = match assembler.assemble(section) {
            Ok(assembled) => assembled,
            Err(e) => {
                self.audit.error(
                    AuditAction::SectionFailed,
                    format!("{}: {}", section, e),
                    json!({ "section": section }),
                );
                return Err(e);
            }
        };
        if !assembled.fallbacks.is_empty() {
            self.audit.warn(
                AuditAction::SectionFallback,
                format!("{} used brief fallback for {}", section, assembled.fallbacks.join(", ")),
                json!({ "section": section, "units": assembled.fallbacks }),
            );
        }

        // Every title candidate becomes a selectable version; the assembled
        // one is the last.
        if section == SectionKey::Title {
            let candidates = assembler.title_candidates()?;
            for candidate in candidates.iter().take(candidates.len().saturating_sub(1)) {
                self.store
                    .append_version(Key::Section(section), Content::text(candidate.as_str()))?;
            }
        }
        let update = self.store.append_version(Key::Section(section), assembled.content)?;
        self.audit.info(
            AuditAction::SectionCommitted,
            format!("{} version {}", section, update.index),
            json!({ "section": section, "index": update.index, "count": update.count }),
        );
        Ok(SectionReport {
            section,
            units: outcomes,
            fallbacks: assembled.fallbacks,
            update,
        })
    }

    async fn run_reported(&self, section: SectionKey, unit: UnitKey) -> Result<UnitOutcome> {
        match self.run_unit(unit).await {
            Ok(update) => Ok(UnitOutcome::Committed {
                unit,
                index: update.index,
            }),
            Err(e) if e.is_recoverable() => Ok(UnitOutcome::Skipped {
                unit,
                reason: e.to_string(),
            }),
            Err(e) => {
                self.audit.error(
                    AuditAction::SectionFailed,
                    format!("{} aborted at {}: {}", section, unit, e),
                    json!({ "section": section, "unit": unit }),
                );
                Err(e)
            }
        }
    }

    fn check_gates(&self, section: SectionKey, gates: &[Dependency], brief: &Brief) -> Result<()> {
        let mut missing = Vec::new();
        for dep in gates {
            let present = match dep {
                Dependency::Artifact(Key::Brief) => !brief.is_empty(),
                Dependency::Field(field) => brief.has(*field),
                Dependency::Artifact(key) => self.store.get_active(*key)?.is_some_and(|c| !c.is_empty()),
            };
            if !present {
                missing.push(dep.to_string());
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        let e = DraftError::UnresolvedDependency {
            key: section.to_string(),
            missing,
        };
        self.audit.warn(
            AuditAction::SectionFailed,
            e.to_string(),
            json!({ "section": section }),
        );
        Err(e)
    }

    /// Generate sections in display order.
    ///
    /// Sections that cannot be assembled or whose gates are unmet are
    /// recorded and the run continues; a model or storage failure stops it.
    pub async fn generate_all(&self, scope: GenerateScope) -> Result<GenerationSummary> {
        let mut summary = GenerationSummary::default();
        let order = self.graph.section_order().to_vec();
        for section in order {
            if scope == GenerateScope::Outdated
                && self.status(Key::Section(section))? == Freshness::Fresh
            {
                summary.unchanged.push(section);
                continue;
            }
            match self.generate_section(section).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    let stop = !(e.is_recoverable() || matches!(e, DraftError::EmptyAssembledSection(_)));
                    summary.failures.push(SectionFailure {
                        section,
                        error: e.to_string(),
                    });
                    if stop {
                        summary.aborted = true;
                        break;
                    }
                }
            }
        }
        Ok(summary)
    }

    // ── Auxiliary units ──────────────────────────────────────────────────────

    /// Assign reference numerals to the brief's key components.
    pub async fn generate_figure_labels(&self) -> Result<Vec<FigureLabel>> {
        self.run_unit(UnitKey::FigureLabels).await?;
        self.figure_labels()
    }

    /// Check that every claim feature is supported by the description.
    pub async fn check_claims(&self) -> Result<ClaimsReport> {
        self.run_unit(UnitKey::ClaimsCheck).await?;
        match self.store.get_active(Key::Unit(UnitKey::ClaimsCheck))? {
            Some(Content::Structured(value)) => Ok(serde_json::from_value(value)?),
            _ => Err(DraftError::Validation("claims check produced no report".into())),
        }
    }

    /// Regenerate the diagram code of one drawing and commit new versions of
    /// the diagram unit and the drawings section.
    pub async fn regenerate_drawing(&self, index: usize) -> Result<VersionUpdate> {
        let mut drawings = match self.store.get_active(Key::Section(SectionKey::Drawings))? {
            Some(Content::Drawings(d)) if !d.is_empty() => d,
            _ => match self.store.get_active(Key::Unit(UnitKey::MermaidCode))? {
                Some(Content::Drawings(d)) => d,
                _ => Vec::new(),
            },
        };
        if index >= drawings.len() {
            return Err(DraftError::Validation(format!(
                "drawing {} does not exist ({} drawings)",
                index,
                drawings.len()
            )));
        }

        let unit = self.graph.unit(UnitKey::MermaidCode)?.clone();
        let brief = self.brief()?;
        let bindings = self.resolve_bindings(&unit, &brief)?;
        let idea = DrawingIdea {
            title: drawings[index].title.clone(),
            description: drawings[index].description.clone(),
        };
        let code = self
            .diagram_code(&unit, &bindings, &idea, &format!("drawing-{}", index + 1))
            .await?;
        drawings[index].code = code;

        self.commit_unit(UnitKey::MermaidCode, Content::Drawings(drawings.clone()), "drawing regenerated")?;
        let update = self
            .store
            .append_version(Key::Section(SectionKey::Drawings), Content::Drawings(drawings))?;
        self.audit.info(
            AuditAction::SectionCommitted,
            format!("drawings version {} (drawing {} regenerated)", update.index, index + 1),
            json!({ "section": SectionKey::Drawings, "index": update.index, "drawing": index }),
        );
        Ok(update)
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn empty_source(unit: UnitKey, source: UnitKey) -> DraftError {
    DraftError::UnresolvedDependency {
        key: unit.to_string(),
        missing: vec![source.to_string()],
    }
}

/// Unit-specific normalization of parsed JSON output.
fn normalize_output(unit: UnitKey, value: Value) -> Result<Content> {
    Ok(match unit {
        UnitKey::TitleOptions => Content::List(normalize_titles(&value)?),
        UnitKey::SolutionPoints => Content::List(normalize_points(&value)?),
        UnitKey::MermaidIdeas => Content::Structured(serde_json::to_value(normalize_ideas(&value)?)?),
        UnitKey::FigureLabels => Content::Structured(serde_json::to_value(normalize_labels(&value)?)?),
        UnitKey::ClaimsCheck => {
            Content::Structured(serde_json::to_value(normalize_claims_report(&value)?)?)
        }
        _ => Content::Structured(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered() {
        assert_eq!(numbered(&["甲".into(), "乙".into()]), "1. 甲\n2. 乙");
        assert_eq!(numbered(&[]), "");
    }

    #[test]
    fn test_normalize_output_titles() {
        let content = normalize_output(UnitKey::TitleOptions, json!({"titles": ["A", "A", "B"]})).unwrap();
        assert_eq!(content, Content::List(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn test_normalize_output_passthrough() {
        let value = json!({"anything": 1});
        let content = normalize_output(UnitKey::TechField, value.clone()).unwrap();
        assert_eq!(content, Content::Structured(value));
    }
}
