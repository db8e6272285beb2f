//! Append-only audit trail of every model call and commit.
//!
//! Records are JSON lines in `<log_dir>/run_<session>.log`. Full prompt and
//! response texts go to `<log_dir>/artifacts/run_<session>/<step>_prompt.txt`
//! and `<step>_response.txt`; the log itself carries truncated previews.

use crate::error::{DraftError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl AuditLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            AuditLevel::Debug => log::Level::Debug,
            AuditLevel::Info => log::Level::Info,
            AuditLevel::Warn => log::Level::Warn,
            AuditLevel::Error => log::Level::Error,
        }
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "session.opened")]
    SessionOpened,
    #[serde(rename = "brief.updated")]
    BriefUpdated,
    #[serde(rename = "model.call")]
    ModelCall,
    #[serde(rename = "model.response")]
    ModelResponse,
    #[serde(rename = "model.error")]
    ModelError,
    #[serde(rename = "unit.committed")]
    UnitCommitted,
    #[serde(rename = "unit.skipped")]
    UnitSkipped,
    #[serde(rename = "unit.failed")]
    UnitFailed,
    #[serde(rename = "section.fallback")]
    SectionFallback,
    #[serde(rename = "section.committed")]
    SectionCommitted,
    #[serde(rename = "section.failed")]
    SectionFailed,
    #[serde(rename = "version.selected")]
    VersionSelected,
    #[serde(rename = "version.edited")]
    VersionEdited,
    #[serde(rename = "refine.warning")]
    RefineWarning,
    #[serde(rename = "refine.completed")]
    RefineCompleted,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::SessionOpened => write!(f, "session.opened"),
            AuditAction::BriefUpdated => write!(f, "brief.updated"),
            AuditAction::ModelCall => write!(f, "model.call"),
            AuditAction::ModelResponse => write!(f, "model.response"),
            AuditAction::ModelError => write!(f, "model.error"),
            AuditAction::UnitCommitted => write!(f, "unit.committed"),
            AuditAction::UnitSkipped => write!(f, "unit.skipped"),
            AuditAction::UnitFailed => write!(f, "unit.failed"),
            AuditAction::SectionFallback => write!(f, "section.fallback"),
            AuditAction::SectionCommitted => write!(f, "section.committed"),
            AuditAction::SectionFailed => write!(f, "section.failed"),
            AuditAction::VersionSelected => write!(f, "version.selected"),
            AuditAction::VersionEdited => write!(f, "version.edited"),
            AuditAction::RefineWarning => write!(f, "refine.warning"),
            AuditAction::RefineCompleted => write!(f, "refine.completed"),
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| DraftError::UnknownKey(s.to_string()))
    }
}

/// A single line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    pub level: AuditLevel,
    pub action: AuditAction,
    pub message: String,
    #[serde(default)]
    pub context: Value,
}

/// Audit log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write the JSONL log and artifact files. Default: true.
    pub enabled: bool,

    /// Root directory for run logs. Default: `logs`.
    pub log_dir: PathBuf,

    /// Characters of prompt kept in the log record. Default: 3000.
    pub prompt_preview_chars: usize,

    /// Characters of response kept in the log record. Default: 5000.
    pub response_preview_chars: usize,

    /// Write full prompt/response files. Default: true.
    pub capture_artifacts: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: PathBuf::from("logs"),
            prompt_preview_chars: 3000,
            response_preview_chars: 5000,
            capture_artifacts: true,
        }
    }
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_preview_limits(mut self, prompt: usize, response: usize) -> Self {
        self.prompt_preview_chars = prompt;
        self.response_preview_chars = response;
        self
    }

    pub fn with_artifacts(mut self, capture: bool) -> Self {
        self.capture_artifacts = capture;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_dir.as_os_str().is_empty() {
            return Err(DraftError::Validation("audit log_dir must not be empty".into()));
        }
        if self.prompt_preview_chars == 0 || self.response_preview_chars == 0 {
            return Err(DraftError::Validation(
                "audit preview limits must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Filter criteria for reading the audit log back.
#[derive(Debug, Default)]
pub struct AuditFilter {
    /// Only entries at or after this timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Only entries of this action type.
    pub action: Option<AuditAction>,
    /// Only entries at or above this level.
    pub min_level: Option<AuditLevel>,
    /// Keep only the most recent N matches.
    pub limit: Option<usize>,
}

/// Truncate `s` to at most `max_chars` characters, marking the cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let byte_end = s
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    format!("{}...[truncated]", &s[..byte_end])
}

fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

/// Per-session audit writer.
pub struct AuditLog {
    config: AuditConfig,
    session_id: String,
    /// Step counter behind `NNNN_tag` step ids.
    seq: AtomicU64,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(config: AuditConfig, session_id: impl Into<String>) -> Self {
        Self {
            config,
            session_id: session_id.into(),
            seq: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Continue step numbering from a previous run of the same session.
    pub fn resume_from(self, step: u64) -> Self {
        self.seq.store(step, Ordering::SeqCst);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn current_step(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    pub fn log_path(&self) -> PathBuf {
        self.config.log_dir.join(format!("run_{}.log", self.session_id))
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.config
            .log_dir
            .join("artifacts")
            .join(format!("run_{}", self.session_id))
    }

    /// Allocate the next step id, e.g. `0007_unit-tech_field`.
    pub fn next_step(&self, tag: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:04}_{}", n, sanitize_tag(tag))
    }

    /// Append one record. Write failures are reported through `log` and do
    /// not interrupt the caller.
    pub fn record(&self, level: AuditLevel, action: AuditAction, message: impl Into<String>, context: Value) {
        let record = AuditRecord {
            ts: Utc::now(),
            level,
            action,
            message: message.into(),
            context,
        };
        log::log!(level.as_log_level(), "[{}] {}", record.action, record.message);
        if !self.config.enabled {
            return;
        }
        if let Err(e) = self.append(&record) {
            log::warn!("Failed to write audit record {}: {}", record.action, e);
        }
    }

    pub fn info(&self, action: AuditAction, message: impl Into<String>, context: Value) {
        self.record(AuditLevel::Info, action, message, context);
    }

    pub fn warn(&self, action: AuditAction, message: impl Into<String>, context: Value) {
        self.record(AuditLevel::Warn, action, message, context);
    }

    pub fn error(&self, action: AuditAction, message: impl Into<String>, context: Value) {
        self.record(AuditLevel::Error, action, message, context);
    }

    /// Write the full text of a prompt or response next to the log. Returns
    /// the file path when written.
    pub fn write_artifact(&self, step_id: &str, kind: &str, text: &str) -> Option<PathBuf> {
        if !self.config.enabled || !self.config.capture_artifacts {
            return None;
        }
        let dir = self.artifact_dir();
        let path = dir.join(format!("{}_{}.txt", step_id, kind));
        let written = fs::create_dir_all(&dir).and_then(|_| fs::write(&path, text));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                log::warn!("Failed to write audit artifact {}: {}", path.display(), e);
                None
            }
        }
    }

    fn append(&self, record: &AuditRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read this session's records back.
    pub fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>> {
        read_log(&self.log_path(), filter)
    }
}

/// Read records from a run log, skipping lines that fail to parse.
pub fn read_log(path: &Path, filter: &AuditFilter) -> Result<Vec<AuditRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(fs::File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let record = match serde_json::from_str::<AuditRecord>(&line) {
            Ok(r) => r,
            Err(_) => continue, // skip corrupt lines
        };
        if filter.since.is_some_and(|since| record.ts < since) {
            continue;
        }
        if filter.action.is_some_and(|action| record.action != action) {
            continue;
        }
        if filter.min_level.is_some_and(|level| record.level < level) {
            continue;
        }
        records.push(record);
    }
    if let Some(limit) = filter.limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }
    Ok(records)
}
