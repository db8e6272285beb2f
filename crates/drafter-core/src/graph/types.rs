use crate::keys::{Dependency, SectionKey, UnitKey};
use serde::{Deserialize, Serialize};

/// How a unit's model output is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    PlainText,
    StructuredJson,
}

/// A single templated model call and its inputs.
#[derive(Debug, Clone)]
pub struct GenerationUnit {
    pub key: UnitKey,
    pub template: &'static str,
    pub mode: OutputMode,
    pub dependencies: Vec<Dependency>,
    /// List-producing unit whose items this unit runs over, one call each.
    pub iterate_over: Option<UnitKey>,
    /// Render empty brief fields as empty strings instead of blocking.
    pub tolerates_empty_brief: bool,
}

impl GenerationUnit {
    pub fn new(key: UnitKey, template: &'static str, mode: OutputMode) -> Self {
        Self {
            key,
            template,
            mode,
            dependencies: Vec::new(),
            iterate_over: None,
            tolerates_empty_brief: true,
        }
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn iterating(mut self, source: UnitKey) -> Self {
        self.iterate_over = Some(source);
        self
    }

    pub fn strict_brief(mut self) -> Self {
        self.tolerates_empty_brief = false;
        self
    }

    /// Placeholder names bound per item when iterating.
    pub fn item_bindings(&self) -> &'static [&'static str] {
        match self.iterate_over {
            Some(UnitKey::SolutionPoints) => &["point"],
            Some(UnitKey::MermaidIdeas) => &["title", "description"],
            _ => &[],
        }
    }
}

/// A user-facing section.
#[derive(Debug, Clone)]
pub struct SectionDefinition {
    pub key: SectionKey,
    /// Units run in order on every generation.
    pub units: Vec<UnitKey>,
    /// Units run only when they have no content yet.
    pub prerequisites: Vec<UnitKey>,
    /// Gating dependencies.
    pub dependencies: Vec<Dependency>,
    /// Unit templates replayed to the refinement pass.
    pub refine_instructions: Vec<UnitKey>,
}

impl SectionDefinition {
    pub fn new(key: SectionKey) -> Self {
        Self {
            key,
            units: Vec::new(),
            prerequisites: Vec::new(),
            dependencies: Vec::new(),
            refine_instructions: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.key.label()
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = UnitKey>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn with_prerequisites(mut self, units: impl IntoIterator<Item = UnitKey>) -> Self {
        self.prerequisites.extend(units);
        self
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn refined_with(mut self, units: impl IntoIterator<Item = UnitKey>) -> Self {
        self.refine_instructions.extend(units);
        self
    }
}
