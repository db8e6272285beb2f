use crate::audit::{AuditAction, AuditLog};
use crate::brief::Brief;
use crate::config::SessionConfig;
use crate::error::{DraftError, Result};
use crate::graph::DependencyGraph;
use crate::keys::{BriefField, Key, SectionKey, UnitKey};
use crate::model::LanguageModel;
use crate::normalize::FigureLabel;
use crate::prompt::{materialize, templates, Bindings};
use crate::refine::RefinedDraft;
use crate::staleness::{Freshness, StalenessEvaluator};
use crate::storage::ContentStore;
use crate::types::{Content, VersionUpdate, VersionedArtifact};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Metadata key holding the last allocated audit step.
pub const AUDIT_STEP_META: &str = "audit_step";

/// Metadata key holding the serialized refined draft.
pub const REFINED_DRAFT_META: &str = "refined_draft";

/// Per-section row for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatus {
    pub section: SectionKey,
    pub label: String,
    pub freshness: Freshness,
    pub versions: usize,
    pub active: Option<usize>,
}

/// One drafting session: the content store, the workflow graph, a model
/// backend, and the audit trail. All operations go through this object.
///
/// # Example
/// ```rust,no_run
/// use drafter_core::{DraftSession, MemoryStore, ScriptedModel, SectionKey, SessionConfig};
/// use std::sync::Arc;
///
/// # async fn run() -> drafter_core::Result<()> {
/// let model = Arc::new(ScriptedModel::new("本发明涉及图像处理领域。"));
/// let session = DraftSession::new(MemoryStore::new(), model, SessionConfig::default(), "demo")?;
/// session.analyze_brief("一种基于边缘检测的图像识别方法……").await?;
/// session.generate_section(SectionKey::TechnicalField).await?;
/// # Ok(())
/// # }
/// ```
pub struct DraftSession<S: ContentStore> {
    pub(crate) store: S,
    pub(crate) graph: Arc<DependencyGraph>,
    pub(crate) model: Arc<dyn LanguageModel>,
    pub(crate) config: SessionConfig,
    pub(crate) audit: AuditLog,
}

impl<S: ContentStore> DraftSession<S> {
    /// Open a session over `store`. Audit step numbering continues from the
    /// value persisted in the store's metadata.
    pub fn new(
        store: S,
        model: Arc<dyn LanguageModel>,
        config: SessionConfig,
        session_id: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let graph = Arc::new(DependencyGraph::standard()?);

        let step = store
            .get_metadata(AUDIT_STEP_META)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map(u64::from_le_bytes)
            .unwrap_or_default();
        let audit = AuditLog::new(config.audit.clone(), session_id).resume_from(step);
        audit.info(
            AuditAction::SessionOpened,
            format!("session {} opened", audit.session_id()),
            json!({
                "model": model.name(),
                "skip_drawings": config.skip_drawings,
                "resumed_step": step,
            }),
        );

        Ok(Self {
            store,
            graph,
            model,
            config,
            audit,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub(crate) fn persist_audit_step(&self) {
        let step = self.audit.current_step().to_le_bytes();
        if let Err(e) = self.store.put_metadata(AUDIT_STEP_META, &step) {
            log::warn!("Failed to persist audit step: {}", e);
        }
    }

    // ── Brief ────────────────────────────────────────────────────────────────

    /// The active brief, or an empty one before analysis.
    pub fn brief(&self) -> Result<Brief> {
        match self.store.get_active(Key::Brief)? {
            Some(Content::Brief(brief)) => Ok(brief),
            Some(_) => Err(DraftError::Validation(
                "structured_brief holds non-brief content".into(),
            )),
            None => Ok(Brief::default()),
        }
    }

    pub fn set_brief(&self, brief: Brief) -> Result<VersionUpdate> {
        let update = self.store.append_version(Key::Brief, Content::Brief(brief))?;
        self.audit.info(
            AuditAction::BriefUpdated,
            format!("brief version {} committed", update.index),
            json!({ "index": update.index, "count": update.count }),
        );
        Ok(update)
    }

    /// Replace one brief field and commit the result as a new brief version.
    pub fn update_brief_field(&self, field: BriefField, value: &str) -> Result<VersionUpdate> {
        let mut brief = self.brief()?;
        brief.set_field(field, value)?;
        self.set_brief(brief)
    }

    /// Turn free-form disclosure text into a structured brief and commit it.
    pub async fn analyze_brief(&self, user_input: &str) -> Result<Brief> {
        if user_input.trim().is_empty() {
            return Err(DraftError::Validation("disclosure text is empty".into()));
        }
        let prompt = materialize(
            templates::ANALYZE,
            &Bindings::new().with("user_input", user_input.trim()),
        )?;
        let raw = self.call_model(Key::Brief.as_str(), &prompt, true).await?;
        let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|e| {
            DraftError::MalformedStructuredOutput {
                key: Key::Brief.to_string(),
                reason: e.to_string(),
                raw: raw.clone(),
            }
        })?;
        let brief = Brief::from_model_value(&value).map_err(|_| DraftError::UnrecognizedShape {
            key: Key::Brief.to_string(),
            raw: raw.clone(),
        })?;
        self.set_brief(brief.clone())?;
        Ok(brief)
    }

    // ── Presentation ─────────────────────────────────────────────────────────

    pub fn artifact(&self, key: Key) -> Result<Option<VersionedArtifact>> {
        self.store.get(key)
    }

    pub fn versions(&self, key: Key) -> Result<Vec<Content>> {
        self.store.get_versions(key)
    }

    pub fn active_content(&self, key: Key) -> Result<Option<Content>> {
        self.store.get_active(key)
    }

    pub fn is_stale(&self, key: Key) -> Result<bool> {
        StalenessEvaluator::new(&self.graph, &self.store).is_stale(key)
    }

    pub fn status(&self, key: Key) -> Result<Freshness> {
        StalenessEvaluator::new(&self.graph, &self.store).status(key)
    }

    /// Status of every section in display order.
    pub fn overview(&self) -> Result<Vec<SectionStatus>> {
        let mut evaluator = StalenessEvaluator::new(&self.graph, &self.store);
        let mut rows = Vec::with_capacity(self.graph.section_order().len());
        for section in self.graph.section_order() {
            let key = Key::Section(*section);
            let artifact = self.store.get(key)?;
            rows.push(SectionStatus {
                section: *section,
                label: section.label().to_string(),
                freshness: evaluator.status(key)?,
                versions: artifact.as_ref().map_or(0, |a| a.versions.len()),
                active: artifact.map(|a| a.active),
            });
        }
        Ok(rows)
    }

    pub fn set_active_version(&self, key: Key, index: usize) -> Result<VersionUpdate> {
        let update = self.store.set_active(key, index)?;
        self.audit.info(
            AuditAction::VersionSelected,
            format!("{} switched to version {}", key, index),
            json!({ "key": key, "index": index, "count": update.count }),
        );
        Ok(update)
    }

    /// Append a user-authored version. The content variant must fit the key:
    /// the brief takes a brief record, drawing keys take a drawings list.
    pub fn submit_edited_version(&self, key: Key, content: Content) -> Result<VersionUpdate> {
        let is_drawing_key = matches!(
            key,
            Key::Section(SectionKey::Drawings) | Key::Unit(UnitKey::MermaidCode)
        );
        let fits = match (&content, key) {
            (Content::Brief(_), Key::Brief) => true,
            (_, Key::Brief) | (Content::Brief(_), _) => false,
            (Content::Drawings(_), _) => is_drawing_key,
            (_, _) => !is_drawing_key,
        };
        if !fits {
            return Err(DraftError::Validation(format!(
                "content type does not fit {}",
                key
            )));
        }
        let update = self.store.append_version(key, content)?;
        self.audit.info(
            AuditAction::VersionEdited,
            format!("edited version of {} committed as {}", key, update.index),
            json!({ "key": key, "index": update.index, "count": update.count }),
        );
        Ok(update)
    }

    /// The last refined draft, if a refinement pass has run.
    pub fn refined(&self) -> Result<Option<RefinedDraft>> {
        match self.store.get_metadata(REFINED_DRAFT_META)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Active figure labels without generating them.
    pub fn figure_labels(&self) -> Result<Vec<FigureLabel>> {
        match self.store.get_active(Key::Unit(UnitKey::FigureLabels))? {
            Some(Content::Structured(value)) => Ok(serde_json::from_value(value)?),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditConfig;
    use crate::model::ScriptedModel;
    use crate::storage::MemoryStore;
    use crate::types::Drawing;

    fn session() -> DraftSession<MemoryStore> {
        let config = SessionConfig::new().with_audit(AuditConfig::disabled());
        DraftSession::new(MemoryStore::new(), Arc::new(ScriptedModel::default()), config, "t")
            .unwrap()
    }

    #[test]
    fn test_brief_defaults_to_empty() {
        let s = session();
        assert!(s.brief().unwrap().is_empty());
    }

    #[test]
    fn test_update_brief_field_appends_version() {
        let s = session();
        s.update_brief_field(BriefField::ProblemStatement, "识别率低").unwrap();
        let update = s
            .update_brief_field(BriefField::AchievedEffects, "准确率提升")
            .unwrap();
        assert_eq!(update.index, 1);
        let brief = s.brief().unwrap();
        assert_eq!(brief.field_text(BriefField::ProblemStatement), "识别率低");
        assert_eq!(brief.field_text(BriefField::AchievedEffects), "准确率提升");
    }

    #[test]
    fn test_submit_edited_version_checks_variant() {
        let s = session();
        assert!(s
            .submit_edited_version(Key::Brief, Content::text("x"))
            .is_err());
        assert!(s
            .submit_edited_version(Key::Section(SectionKey::Claims), Content::Drawings(vec![]))
            .is_err());
        let drawing = Drawing {
            title: "流程图".into(),
            description: String::new(),
            code: "graph TD; A-->B".into(),
        };
        let update = s
            .submit_edited_version(Key::Section(SectionKey::Drawings), Content::Drawings(vec![drawing]))
            .unwrap();
        assert_eq!(update.index, 0);
        s.submit_edited_version(Key::Section(SectionKey::Claims), Content::text("1. 一种方法。"))
            .unwrap();
    }

    #[test]
    fn test_select_version_out_of_range() {
        let s = session();
        s.submit_edited_version(Key::Section(SectionKey::Abstract), Content::text("a"))
            .unwrap();
        let err = s
            .set_active_version(Key::Section(SectionKey::Abstract), 3)
            .unwrap_err();
        assert!(matches!(err, DraftError::InvalidVersionIndex { index: 3, len: 1, .. }));
    }

    #[test]
    fn test_overview_lists_all_sections() {
        let s = session();
        let rows = s.overview().unwrap();
        assert_eq!(rows.len(), SectionKey::ALL.len());
        assert!(rows.iter().all(|r| r.freshness == Freshness::NotGenerated));
        assert_eq!(rows[0].label, "发明名称");
    }
}
