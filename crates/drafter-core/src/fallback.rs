//! Deterministic brief-derived content for when model output is missing.
//!
//! Every function here is pure over the brief (and, for claims, the solution
//! points). Clauses whose source field is empty are left out rather than
//! filled with invented wording.

use crate::brief::Brief;
use crate::keys::BriefField;

/// Placeholder for the drawing description when drawings are skipped.
pub const NO_DRAWINGS: &str = "（本申请无附图）";

/// Drop trailing sentence punctuation so a field can be embedded mid-sentence.
fn clause(s: &str) -> &str {
    s.trim().trim_end_matches(['。', '；', ';', '.', '，', ','])
}

pub fn technical_field(brief: &Brief) -> String {
    let tech = brief.field_text(BriefField::BackgroundTechnology);
    let core = brief.field_text(BriefField::CoreInventiveConcept);
    match (tech.is_empty(), core.is_empty()) {
        (false, false) => format!(
            "本发明涉及{}领域，尤其涉及基于{}的相关技术。",
            clause(&tech),
            clause(&core)
        ),
        (false, true) => format!("本发明涉及{}领域，尤其涉及相关系统与方法。", clause(&tech)),
        (true, false) => format!("本发明涉及相关技术领域，尤其涉及基于{}的系统与方法。", clause(&core)),
        (true, true) => "本发明涉及相关技术领域。".to_string(),
    }
}

pub fn title(brief: &Brief) -> Option<String> {
    let core = brief.field_text(BriefField::CoreInventiveConcept);
    let solution = brief.field_text(BriefField::TechnicalSolutionSummary);
    match (core.is_empty(), solution.is_empty()) {
        (false, false) => Some(format!("一种基于{}的{}", clause(&core), clause(&solution))),
        (true, false) => Some(format!("一种{}", clause(&solution))),
        (false, true) => Some(format!("一种基于{}的技术方案", clause(&core))),
        (true, true) => None,
    }
}

/// Up to three claims: an independent method claim on the first solution
/// point, a dependent claim on the solution summary, and a system claim.
pub fn claims(brief: &Brief, solution_points: &[String]) -> String {
    let core = brief.field_text(BriefField::CoreInventiveConcept);
    let solution = brief.field_text(BriefField::TechnicalSolutionSummary);
    let effects = brief.field_text(BriefField::AchievedEffects);

    let first_point = solution_points
        .iter()
        .map(|p| p.trim())
        .find(|p| !p.is_empty())
        .map(str::to_string)
        .or_else(|| Some(core.clone()).filter(|c| !c.is_empty()));
    let Some(first_point) = first_point else {
        return String::new();
    };

    let subject = if core.is_empty() {
        String::new()
    } else {
        format!("基于{}的", clause(&core))
    };

    let mut claims = vec![format!(
        "一种{}方法，其特征在于，包括：{}。",
        subject,
        clause(&first_point)
    )];
    if !solution.is_empty() {
        claims.push(format!(
            "根据权利要求1所述的方法，其特征在于，{}。",
            clause(&solution)
        ));
    }
    let mut system = format!("一种{}系统，其特征在于，所述系统用于执行权利要求1所述的方法", subject);
    if !effects.is_empty() {
        system.push_str(&format!("，以实现{}", clause(&effects)));
    }
    system.push('。');
    claims.push(system);

    claims
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn abstract_text(brief: &Brief) -> String {
    let tech = brief.field_text(BriefField::BackgroundTechnology);
    let core = brief.field_text(BriefField::CoreInventiveConcept);
    let solution = brief.field_text(BriefField::TechnicalSolutionSummary);
    let effects = brief.field_text(BriefField::AchievedEffects);

    let mut parts = Vec::new();
    if tech.is_empty() {
        parts.push("本发明涉及相关技术领域".to_string());
    } else {
        parts.push(format!("本发明涉及{}领域", clause(&tech)));
    }
    if !core.is_empty() {
        parts.push(format!("提出一种基于{}的技术方案", clause(&core)));
    }
    if !solution.is_empty() {
        parts.push(format!("通过所述方案{}", clause(&solution)));
    }
    if !effects.is_empty() {
        parts.push(format!("能够实现{}", clause(&effects)));
    }
    format!("{}。", parts.join("，"))
}

pub fn invention_purpose(brief: &Brief) -> String {
    let problem = brief.field_text(BriefField::ProblemStatement);
    let core = brief.field_text(BriefField::CoreInventiveConcept);
    if problem.is_empty() || core.is_empty() {
        return String::new();
    }
    format!("为解决{}，提出基于{}的技术方案。", clause(&problem), clause(&core))
}

/// A single embodiment restating the solution.
pub fn implementation(solution: &str) -> Vec<String> {
    if solution.trim().is_empty() {
        return Vec::new();
    }
    vec![format!(
        "实施例1：按照上述技术解决方案实施，核心方案如下：{}",
        solution.trim()
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(tech: &str, core: &str) -> Brief {
        Brief {
            background_technology: Some(tech.to_string()).filter(|s| !s.is_empty()),
            core_inventive_concept: Some(core.to_string()).filter(|s| !s.is_empty()),
            ..Default::default()
        }
    }

    #[test]
    fn test_technical_field_variants() {
        assert_eq!(
            technical_field(&brief("图像识别", "边缘检测算法")),
            "本发明涉及图像识别领域，尤其涉及基于边缘检测算法的相关技术。"
        );
        assert_eq!(
            technical_field(&brief("图像识别", "")),
            "本发明涉及图像识别领域，尤其涉及相关系统与方法。"
        );
        assert_eq!(
            technical_field(&brief("", "边缘检测算法")),
            "本发明涉及相关技术领域，尤其涉及基于边缘检测算法的系统与方法。"
        );
        assert_eq!(technical_field(&Brief::default()), "本发明涉及相关技术领域。");
    }

    #[test]
    fn test_technical_field_is_deterministic() {
        let b = brief("图像识别", "边缘检测算法");
        assert_eq!(technical_field(&b), technical_field(&b));
    }

    #[test]
    fn test_title_fallback() {
        let mut b = brief("", "边缘检测");
        assert_eq!(title(&b).unwrap(), "一种基于边缘检测的技术方案");
        b.technical_solution_summary = Some("图像处理方法".into());
        assert_eq!(title(&b).unwrap(), "一种基于边缘检测的图像处理方法");
        assert!(title(&Brief::default()).is_none());
    }

    #[test]
    fn test_claims_omit_missing_clauses() {
        let b = brief("", "边缘检测");
        let text = claims(&b, &["对图像进行灰度化。".to_string()]);
        assert_eq!(
            text,
            "1. 一种基于边缘检测的方法，其特征在于，包括：对图像进行灰度化。\n\
             2. 一种基于边缘检测的系统，其特征在于，所述系统用于执行权利要求1所述的方法。"
        );
        assert_eq!(claims(&Brief::default(), &[]), "");
    }

    #[test]
    fn test_claims_full() {
        let b = Brief {
            core_inventive_concept: Some("边缘检测".into()),
            technical_solution_summary: Some("先滤波再检测".into()),
            achieved_effects: Some("准确率提升".into()),
            ..Default::default()
        };
        let text = claims(&b, &[]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("1. 一种基于边缘检测的方法"));
        assert_eq!(lines[1], "2. 根据权利要求1所述的方法，其特征在于，先滤波再检测。");
        assert!(lines[2].ends_with("以实现准确率提升。"));
    }

    #[test]
    fn test_abstract_joins_present_fields() {
        let b = Brief {
            background_technology: Some("图像识别".into()),
            achieved_effects: Some("速度更快。".into()),
            ..Default::default()
        };
        assert_eq!(abstract_text(&b), "本发明涉及图像识别领域，能够实现速度更快。");
    }

    #[test]
    fn test_purpose_requires_problem_and_core() {
        let mut b = brief("", "边缘检测");
        assert_eq!(invention_purpose(&b), "");
        b.problem_statement = Some("识别率低".into());
        assert_eq!(invention_purpose(&b), "为解决识别率低，提出基于边缘检测的技术方案。");
    }
}
