//! Closed key enumerations for units, sections, and brief fields.
//!
//! Every artifact in the content store is addressed by a [`Key`]. Parsing an
//! unknown name fails loudly with [`DraftError::UnknownKey`] instead of
//! silently creating a new slot.

use crate::error::{DraftError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! closed_keys {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DraftError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DraftError::UnknownKey(other.to_string())),
                }
            }
        }
    };
}

closed_keys! {
    /// A generation micro-step.
    UnitKey {
        TitleOptions => "title_options",
        TechField => "tech_field",
        BackgroundProblem => "background_problem",
        BackgroundContext => "background_context",
        InventionPurpose => "invention_purpose",
        SolutionPoints => "solution_points",
        InventionSolutionDetail => "invention_solution_detail",
        InventionEffects => "invention_effects",
        MermaidIdeas => "mermaid_ideas",
        FigureNotes => "figure_notes",
        FigureLabels => "figure_labels",
        MermaidCode => "mermaid_code",
        ImplementationDetails => "implementation_details",
        ClaimsText => "claims_text",
        ClaimsCheck => "claims_check",
        AbstractText => "abstract_text",
    }
}

closed_keys! {
    /// A user-facing section of the patent document.
    SectionKey {
        Title => "title",
        TechnicalField => "technical_field",
        Background => "background",
        Invention => "invention",
        FigureDescription => "figure_description",
        Implementation => "implementation",
        Claims => "claims",
        Abstract => "abstract",
        Drawings => "drawings",
    }
}

closed_keys! {
    /// A field of the structured brief.
    BriefField {
        BackgroundTechnology => "background_technology",
        ProblemStatement => "problem_statement",
        CoreInventiveConcept => "core_inventive_concept",
        TechnicalSolutionSummary => "technical_solution_summary",
        AchievedEffects => "achieved_effects",
        KeyComponentsOrSteps => "key_components_or_steps",
    }
}

impl UnitKey {
    /// Brief field that can stand in for this unit's output when the unit has
    /// never produced content.
    pub fn brief_substitute(&self) -> Option<BriefField> {
        match self {
            UnitKey::BackgroundProblem => Some(BriefField::ProblemStatement),
            UnitKey::BackgroundContext => Some(BriefField::BackgroundTechnology),
            UnitKey::InventionSolutionDetail => Some(BriefField::TechnicalSolutionSummary),
            UnitKey::InventionEffects => Some(BriefField::AchievedEffects),
            _ => None,
        }
    }
}

impl SectionKey {
    /// Display label used in headings and refinement context.
    pub fn label(&self) -> &'static str {
        match self {
            SectionKey::Title => "发明名称",
            SectionKey::TechnicalField => "技术领域",
            SectionKey::Background => "背景技术",
            SectionKey::Invention => "发明内容",
            SectionKey::FigureDescription => "附图说明",
            SectionKey::Implementation => "具体实施方式",
            SectionKey::Claims => "权利要求书",
            SectionKey::Abstract => "摘要",
            SectionKey::Drawings => "附图",
        }
    }
}

/// Address of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Key {
    /// The structured brief record.
    Brief,
    Unit(UnitKey),
    Section(SectionKey),
}

pub const BRIEF_KEY: &str = "structured_brief";

impl Key {
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Brief => BRIEF_KEY,
            Key::Unit(unit) => unit.as_str(),
            Key::Section(section) => section.as_str(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Key {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self> {
        if s == BRIEF_KEY {
            return Ok(Key::Brief);
        }
        if let Ok(section) = s.parse::<SectionKey>() {
            return Ok(Key::Section(section));
        }
        s.parse::<UnitKey>().map(Key::Unit)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.as_str().to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = DraftError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<UnitKey> for Key {
    fn from(unit: UnitKey) -> Self {
        Key::Unit(unit)
    }
}

impl From<SectionKey> for Key {
    fn from(section: SectionKey) -> Self {
        Key::Section(section)
    }
}

/// Anything a unit or section can depend on: a stored artifact or a single
/// brief field. Brief fields share the brief's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dependency {
    Artifact(Key),
    Field(BriefField),
}

impl Dependency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::Artifact(key) => key.as_str(),
            Dependency::Field(field) => field.as_str(),
        }
    }

    /// The stored artifact whose timestamp governs this dependency.
    pub fn timestamp_key(&self) -> Key {
        match self {
            Dependency::Artifact(key) => *key,
            Dependency::Field(_) => Key::Brief,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Key> for Dependency {
    fn from(key: Key) -> Self {
        Dependency::Artifact(key)
    }
}

impl From<UnitKey> for Dependency {
    fn from(unit: UnitKey) -> Self {
        Dependency::Artifact(Key::Unit(unit))
    }
}

impl From<SectionKey> for Dependency {
    fn from(section: SectionKey) -> Self {
        Dependency::Artifact(Key::Section(section))
    }
}

impl From<BriefField> for Dependency {
    fn from(field: BriefField) -> Self {
        Dependency::Field(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_are_unique() {
        let mut names: Vec<&str> = UnitKey::ALL.iter().map(|k| k.as_str()).collect();
        names.extend(SectionKey::ALL.iter().map(|k| k.as_str()));
        names.extend(BriefField::ALL.iter().map(|k| k.as_str()));
        names.push(BRIEF_KEY);
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_key_roundtrip_through_str() {
        for unit in UnitKey::ALL {
            let key: Key = unit.as_str().parse().unwrap();
            assert_eq!(key, Key::Unit(*unit));
        }
        for section in SectionKey::ALL {
            let key: Key = section.as_str().parse().unwrap();
            assert_eq!(key, Key::Section(*section));
        }
        assert_eq!("structured_brief".parse::<Key>().unwrap(), Key::Brief);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = "figures_description".parse::<Key>().unwrap_err();
        assert!(matches!(err, DraftError::UnknownKey(ref k) if k == "figures_description"));
        assert!("".parse::<SectionKey>().is_err());
    }

    #[test]
    fn test_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&Key::Section(SectionKey::Claims)).unwrap();
        assert_eq!(json, "\"claims\"");
        let back: Key = serde_json::from_str("\"mermaid_code\"").unwrap();
        assert_eq!(back, Key::Unit(UnitKey::MermaidCode));
        assert!(serde_json::from_str::<Key>("\"nope\"").is_err());
    }

    #[test]
    fn test_brief_fields_share_brief_timestamp() {
        let dep = Dependency::from(BriefField::ProblemStatement);
        assert_eq!(dep.timestamp_key(), Key::Brief);
        assert_eq!(dep.as_str(), "problem_statement");
    }
}
