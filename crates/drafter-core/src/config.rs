use crate::audit::AuditConfig;
use crate::error::{DraftError, Result};
use std::time::Duration;

/// Configuration for a drafting session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Skip diagram generation entirely. Default: true.
    pub skip_drawings: bool,

    /// Upper bound on a single model call. Default: 180 seconds.
    pub model_timeout: Duration,

    /// Audit log settings.
    pub audit: AuditConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            skip_drawings: true,
            model_timeout: Duration::from_secs(180),
            audit: AuditConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_drawings(mut self, skip: bool) -> Self {
        self.skip_drawings = skip;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_timeout.is_zero() {
            return Err(DraftError::Validation(
                "model_timeout must be greater than zero".into(),
            ));
        }
        self.audit.validate()
    }
}
