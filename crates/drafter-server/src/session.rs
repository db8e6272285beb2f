use crate::config::DrafterConfig;
use crate::llm::OpenAiCompatibleModel;
use anyhow::Context;
use drafter_core::{DraftSession, LanguageModel, RedbStore};
use std::sync::Arc;
use tracing::info;

pub type Session = DraftSession<RedbStore>;

/// Open the configured session against the configured model endpoint.
pub fn open(config: &DrafterConfig) -> anyhow::Result<Session> {
    let model = Arc::new(OpenAiCompatibleModel::new(config.model.clone())?);
    open_with_model(config, model)
}

/// Open the session database, creating the data directory when missing.
pub fn open_with_model(
    config: &DrafterConfig,
    model: Arc<dyn LanguageModel>,
) -> anyhow::Result<Session> {
    std::fs::create_dir_all(&config.session.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.session.data_dir.display()
        )
    })?;
    let db_path = config.db_path();
    let store = RedbStore::open(&db_path)
        .with_context(|| format!("Failed to open session database {}", db_path.display()))?;
    info!(
        "Session '{}' opened at {} (model: {})",
        config.session.session_id,
        db_path.display(),
        model.name()
    );
    let session = DraftSession::new(
        store,
        model,
        config.session_config(),
        config.session.session_id.clone(),
    )?;
    Ok(session)
}
