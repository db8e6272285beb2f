//! Static dependency metadata for units and sections.

mod standard;
mod types;

pub use types::{GenerationUnit, OutputMode, SectionDefinition};

use crate::error::{DraftError, Result};
use crate::keys::{BriefField, Dependency, Key, SectionKey, UnitKey};
use crate::prompt::placeholders;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeMap;

/// Placeholders every unit may reference besides its own dependencies.
pub const DERIVED_BINDINGS: &[&str] = &["key_components_json", "global_context"];

/// Placeholder rendering the solution points as a numbered list. Requires a
/// dependency on the solution points unit.
pub const SOLUTION_POINTS_STR: &str = "solution_points_str";

/// Immutable unit and section definitions, validated as a DAG.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    units: BTreeMap<UnitKey, GenerationUnit>,
    sections: BTreeMap<SectionKey, SectionDefinition>,
    order: Vec<SectionKey>,
}

impl DependencyGraph {
    /// The patent drafting workflow.
    pub fn standard() -> Result<Self> {
        Self::new(standard::units(), standard::sections(), SectionKey::ALL.to_vec())
    }

    pub fn new(
        units: Vec<GenerationUnit>,
        sections: Vec<SectionDefinition>,
        order: Vec<SectionKey>,
    ) -> Result<Self> {
        let graph = Self {
            units: units.into_iter().map(|u| (u.key, u)).collect(),
            sections: sections.into_iter().map(|s| (s.key, s)).collect(),
            order,
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn unit(&self, key: UnitKey) -> Result<&GenerationUnit> {
        self.units
            .get(&key)
            .ok_or_else(|| DraftError::UnknownKey(key.to_string()))
    }

    pub fn section(&self, key: SectionKey) -> Result<&SectionDefinition> {
        self.sections
            .get(&key)
            .ok_or_else(|| DraftError::UnknownKey(key.to_string()))
    }

    pub fn units_for(&self, section: SectionKey) -> Result<Vec<&GenerationUnit>> {
        self.section(section)?
            .units
            .iter()
            .map(|u| self.unit(*u))
            .collect()
    }

    /// Everything whose change makes `key` stale. A section depends on its
    /// gating dependencies and on its constituent units.
    pub fn dependencies_of(&self, key: Key) -> Vec<Dependency> {
        match key {
            Key::Brief => Vec::new(),
            Key::Unit(unit) => self
                .units
                .get(&unit)
                .map(|u| u.dependencies.clone())
                .unwrap_or_default(),
            Key::Section(section) => self
                .sections
                .get(&section)
                .map(|s| {
                    let mut deps = s.dependencies.clone();
                    deps.extend(s.units.iter().map(|u| Dependency::from(*u)));
                    deps
                })
                .unwrap_or_default(),
        }
    }

    /// Sections in display order, which is also a valid generation order.
    pub fn section_order(&self) -> &[SectionKey] {
        &self.order
    }

    /// Units that belong to no section and run on demand.
    pub fn auxiliary_units(&self) -> Vec<UnitKey> {
        self.units
            .keys()
            .filter(|u| self.owning_section(**u).is_none())
            .copied()
            .collect()
    }

    pub fn owning_section(&self, unit: UnitKey) -> Option<SectionKey> {
        self.order
            .iter()
            .find(|s| {
                self.sections
                    .get(s)
                    .is_some_and(|def| def.units.contains(&unit))
            })
            .copied()
    }

    /// Every stored key in an order where dependencies come first. Brief
    /// fields are folded into the brief record.
    pub fn generation_order(&self) -> Result<Vec<Key>> {
        let graph = self.build_graph()?;
        let sorted = toposort(&graph, None)
            .map_err(|cycle| DraftError::DependencyCycle(cycle.node_id().to_string()))?;
        Ok(sorted
            .into_iter()
            .filter_map(|node| match node {
                Dependency::Artifact(key) => Some(key),
                Dependency::Field(_) => None,
            })
            .collect())
    }

    fn validate(&self) -> Result<()> {
        self.generation_order()?;
        self.check_order()
    }

    fn build_graph(&self) -> Result<DiGraphMap<Dependency, ()>> {
        let mut graph: DiGraphMap<Dependency, ()> = DiGraphMap::new();

        for unit in self.units.values() {
            let node = graph.add_node(Dependency::from(unit.key));
            for dep in &unit.dependencies {
                self.check_known(unit.key.as_str(), dep)?;
                graph.add_edge(*dep, node, ());
            }
            self.check_unit(unit)?;
        }

        for section in self.sections.values() {
            let node = graph.add_node(Dependency::from(section.key));
            for dep in &section.dependencies {
                self.check_known(section.key.as_str(), dep)?;
                graph.add_edge(*dep, node, ());
            }
            for unit in section.units.iter().chain(&section.prerequisites) {
                self.unit(*unit)?;
                graph.add_edge(Dependency::from(*unit), node, ());
            }
            for unit in &section.refine_instructions {
                self.unit(*unit)?;
            }
        }

        // Brief fields move with the brief record.
        for field in BriefField::ALL {
            graph.add_edge(Dependency::Artifact(Key::Brief), Dependency::Field(*field), ());
        }
        Ok(graph)
    }

    fn check_known(&self, owner: &str, dep: &Dependency) -> Result<()> {
        let known = match dep {
            Dependency::Field(_) | Dependency::Artifact(Key::Brief) => true,
            Dependency::Artifact(Key::Unit(u)) => self.units.contains_key(u),
            Dependency::Artifact(Key::Section(s)) => self.sections.contains_key(s),
        };
        if known {
            Ok(())
        } else {
            Err(DraftError::Validation(format!(
                "{} depends on undefined {}",
                owner, dep
            )))
        }
    }

    fn check_unit(&self, unit: &GenerationUnit) -> Result<()> {
        if let Some(source) = unit.iterate_over {
            if !unit.dependencies.contains(&Dependency::from(source)) {
                return Err(DraftError::Validation(format!(
                    "{} iterates over {} without depending on it",
                    unit.key, source
                )));
            }
        }

        for name in placeholders(unit.template) {
            let is_dependency = unit.dependencies.iter().any(|d| d.as_str() == name);
            let is_field = BriefField::ALL.iter().any(|f| f.as_str() == name);
            let is_derived = DERIVED_BINDINGS.contains(&name)
                || (name == SOLUTION_POINTS_STR
                    && unit
                        .dependencies
                        .contains(&Dependency::from(UnitKey::SolutionPoints)));
            let is_item = unit.item_bindings().contains(&name);
            if !(is_dependency || is_field || is_derived || is_item) {
                return Err(DraftError::Validation(format!(
                    "template of {} references unknown placeholder {{{}}}",
                    unit.key, name
                )));
            }
        }
        Ok(())
    }

    /// Every section's section-level dependencies must come earlier.
    fn check_order(&self) -> Result<()> {
        for (pos, key) in self.order.iter().enumerate() {
            let section = self.section(*key)?;
            for dep in &section.dependencies {
                if let Dependency::Artifact(Key::Section(upstream)) = dep {
                    let upstream_pos = self.order.iter().position(|s| s == upstream);
                    if upstream_pos.map_or(true, |p| p >= pos) {
                        return Err(DraftError::Validation(format!(
                            "section {} is ordered before its dependency {}",
                            key, upstream
                        )));
                    }
                }
            }
        }
        if self.order.len() != self.sections.len() {
            return Err(DraftError::Validation(
                "section order must list every section exactly once".into(),
            ));
        }
        Ok(())
    }
}
