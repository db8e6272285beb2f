use super::types::{GenerationUnit, OutputMode, SectionDefinition};
use crate::keys::{BriefField as F, Dependency, Key, SectionKey as S, UnitKey as U};
use crate::prompt::templates as t;

fn field(f: F) -> Dependency {
    Dependency::Field(f)
}

fn unit(u: U) -> Dependency {
    Dependency::from(u)
}

fn section(s: S) -> Dependency {
    Dependency::from(s)
}

const BRIEF: Dependency = Dependency::Artifact(Key::Brief);

pub(super) fn units() -> Vec<GenerationUnit> {
    use OutputMode::{PlainText, StructuredJson};

    vec![
        GenerationUnit::new(U::TitleOptions, t::TITLE, StructuredJson)
            .depends_on([field(F::CoreInventiveConcept), field(F::TechnicalSolutionSummary)]),
        GenerationUnit::new(U::TechField, t::TECH_FIELD, PlainText)
            .depends_on([field(F::CoreInventiveConcept), field(F::TechnicalSolutionSummary)]),
        GenerationUnit::new(U::BackgroundProblem, t::BACKGROUND_PROBLEM, PlainText)
            .depends_on([field(F::ProblemStatement)]),
        GenerationUnit::new(U::BackgroundContext, t::BACKGROUND_CONTEXT, PlainText)
            .depends_on([field(F::BackgroundTechnology), unit(U::BackgroundProblem)]),
        GenerationUnit::new(U::InventionPurpose, t::INVENTION_PURPOSE, PlainText)
            .depends_on([unit(U::BackgroundProblem)]),
        GenerationUnit::new(U::SolutionPoints, t::SOLUTION_POINTS, StructuredJson)
            .depends_on([field(F::TechnicalSolutionSummary), field(F::KeyComponentsOrSteps)]),
        GenerationUnit::new(U::InventionSolutionDetail, t::SOLUTION_DETAIL, PlainText).depends_on([
            field(F::CoreInventiveConcept),
            field(F::TechnicalSolutionSummary),
            field(F::KeyComponentsOrSteps),
        ]),
        GenerationUnit::new(U::InventionEffects, t::INVENTION_EFFECTS, PlainText)
            .depends_on([unit(U::SolutionPoints), field(F::AchievedEffects)]),
        GenerationUnit::new(U::MermaidIdeas, t::MERMAID_IDEAS, StructuredJson)
            .depends_on([unit(U::InventionSolutionDetail)]),
        GenerationUnit::new(U::FigureNotes, t::FIGURE_NOTES, PlainText)
            .depends_on([unit(U::MermaidIdeas)]),
        GenerationUnit::new(U::FigureLabels, t::FIGURE_LABELS, StructuredJson)
            .depends_on([field(F::KeyComponentsOrSteps)])
            .strict_brief(),
        GenerationUnit::new(U::MermaidCode, t::MERMAID_CODE, PlainText)
            .depends_on([unit(U::MermaidIdeas), unit(U::InventionSolutionDetail)])
            .iterating(U::MermaidIdeas),
        GenerationUnit::new(U::ImplementationDetails, t::IMPLEMENTATION_POINT, PlainText)
            .depends_on([unit(U::SolutionPoints)])
            .iterating(U::SolutionPoints),
        GenerationUnit::new(U::ClaimsText, t::CLAIMS, PlainText).depends_on([
            field(F::CoreInventiveConcept),
            field(F::TechnicalSolutionSummary),
            field(F::KeyComponentsOrSteps),
            unit(U::SolutionPoints),
        ]),
        GenerationUnit::new(U::ClaimsCheck, t::CLAIMS_CHECK, StructuredJson).depends_on([
            section(S::Claims),
            field(F::KeyComponentsOrSteps),
            section(S::TechnicalField),
            section(S::Background),
            section(S::Invention),
            section(S::Implementation),
        ]),
        GenerationUnit::new(U::AbstractText, t::ABSTRACT, PlainText).depends_on([
            field(F::ProblemStatement),
            unit(U::SolutionPoints),
            field(F::AchievedEffects),
        ]),
    ]
}

pub(super) fn sections() -> Vec<SectionDefinition> {
    vec![
        SectionDefinition::new(S::Title)
            .with_units([U::TitleOptions])
            .depends_on([BRIEF]),
        SectionDefinition::new(S::TechnicalField)
            .with_units([U::TechField])
            .depends_on([BRIEF])
            .refined_with([U::TechField]),
        SectionDefinition::new(S::Background)
            .with_units([U::BackgroundProblem, U::BackgroundContext])
            .depends_on([BRIEF])
            .refined_with([U::BackgroundContext, U::BackgroundProblem]),
        SectionDefinition::new(S::Invention)
            .with_units([
                U::InventionPurpose,
                U::SolutionPoints,
                U::InventionSolutionDetail,
                U::InventionEffects,
            ])
            .depends_on([section(S::Background), BRIEF])
            .refined_with([U::InventionPurpose, U::InventionSolutionDetail, U::InventionEffects]),
        SectionDefinition::new(S::FigureDescription)
            .with_units([U::MermaidIdeas, U::FigureNotes])
            .depends_on([section(S::Invention)])
            .refined_with([U::FigureNotes]),
        SectionDefinition::new(S::Implementation)
            .with_units([U::ImplementationDetails])
            .depends_on([section(S::Invention), BRIEF])
            .refined_with([U::ImplementationDetails]),
        SectionDefinition::new(S::Claims)
            .with_units([U::ClaimsText])
            .depends_on([section(S::Invention), BRIEF])
            .refined_with([U::ClaimsText]),
        SectionDefinition::new(S::Abstract)
            .with_units([U::AbstractText])
            .depends_on([section(S::Invention), BRIEF])
            .refined_with([U::AbstractText]),
        SectionDefinition::new(S::Drawings)
            .with_prerequisites([U::MermaidIdeas])
            .with_units([U::MermaidCode])
            .depends_on([section(S::Invention)]),
    ]
}
