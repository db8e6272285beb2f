pub mod keys;
pub mod types;
pub mod brief;
pub mod error;
pub mod storage;
pub mod graph;
pub mod staleness;
pub mod prompt;
pub mod normalize;
pub mod fallback;
pub mod model;
pub mod audit;
pub mod config;
pub mod session;
pub mod orchestrator;
pub mod assembler;
pub mod refine;
pub mod export;

pub use error::{DraftError, Result};
pub use keys::{BriefField, Dependency, Key, SectionKey, UnitKey, BRIEF_KEY};
pub use types::{Content, Drawing, DrawingIdea, VersionUpdate, VersionedArtifact};
pub use brief::{Brief, KeyComponent};
pub use storage::{ContentStore, MemoryStore, RedbStore, CURRENT_SCHEMA_VERSION};
pub use graph::{DependencyGraph, GenerationUnit, OutputMode, SectionDefinition};
pub use staleness::{Freshness, StalenessEvaluator};
pub use prompt::{materialize, placeholders, Bindings};
pub use normalize::{ClaimIssue, ClaimsReport, FigureLabel};
pub use model::{LanguageModel, Message, MessageRole, ScriptedModel};
pub use audit::{AuditAction, AuditConfig, AuditFilter, AuditLevel, AuditLog, AuditRecord};
pub use config::SessionConfig;
pub use session::{DraftSession, SectionStatus};
pub use orchestrator::{GenerateScope, GenerationSummary, SectionFailure, SectionReport, UnitOutcome};
pub use assembler::{Assembled, Assembler};
pub use refine::RefinedDraft;
pub use export::{DocumentRenderer, MarkdownRenderer, PatentDocument};

#[cfg(test)]
mod tests;
