use super::BriefCommands;
use crate::session::Session;
use anyhow::Result;
use drafter_core::brief::parse_components as components_from_value;
use drafter_core::{Brief, BriefField, KeyComponent};
use serde_json::Value;

pub async fn run(cmd: BriefCommands, session: &Session) -> Result<()> {
    match cmd {
        BriefCommands::Show { json } => show(session, json),
        BriefCommands::Set { field, value } => set(session, &field, &value),
        BriefCommands::Review => review(session),
    }
}

fn field_label(field: BriefField) -> &'static str {
    match field {
        BriefField::BackgroundTechnology => "背景技术",
        BriefField::ProblemStatement => "要解决的技术问题",
        BriefField::CoreInventiveConcept => "核心创新点",
        BriefField::TechnicalSolutionSummary => "技术方案概述",
        BriefField::AchievedEffects => "有益效果",
        BriefField::KeyComponentsOrSteps => "关键部件/步骤",
    }
}

pub(crate) fn print_brief(brief: &Brief) {
    for field in BriefField::ALL {
        let text = brief.field_text(*field);
        println!("【{}】({})", field_label(*field), field);
        if text.is_empty() {
            println!("  (empty)");
        } else {
            for line in text.lines() {
                println!("  {}", line);
            }
        }
    }
}

fn show(session: &Session, json: bool) -> Result<()> {
    let brief = session.brief()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&brief)?);
        return Ok(());
    }
    if brief.is_empty() {
        println!("(no brief yet; run `drafter analyze` first)");
        return Ok(());
    }
    print_brief(&brief);
    Ok(())
}

fn set(session: &Session, field: &str, value: &str) -> Result<()> {
    let field: BriefField = field.parse()?;
    if field == BriefField::KeyComponentsOrSteps {
        let components = parse_components(value)?;
        let mut brief = session.brief()?;
        brief.key_components_or_steps = components;
        let update = session.set_brief(brief)?;
        println!("✅ {} updated (brief version {})", field, update.index);
        return Ok(());
    }
    let update = session.update_brief_field(field, value)?;
    println!("✅ {} updated (brief version {})", field, update.index);
    Ok(())
}

/// `name: function` per line.
fn parse_components(text: &str) -> Result<Vec<KeyComponent>> {
    Ok(components_from_value(&Value::String(text.to_string()))?)
}

fn review(session: &Session) -> Result<()> {
    use inquire::{Confirm, Editor, Text};

    let original = session.brief()?;
    let mut brief = original.clone();

    for field in BriefField::ALL {
        let current = brief.field_text(*field);
        let prompt = format!("{} ({})", field_label(*field), field);
        let edited = if current.contains('\n') || *field == BriefField::KeyComponentsOrSteps {
            Editor::new(&prompt)
                .with_predefined_text(&current)
                .prompt()?
        } else {
            Text::new(&prompt).with_initial_value(&current).prompt()?
        };
        if edited.trim() == current {
            continue;
        }
        if *field == BriefField::KeyComponentsOrSteps {
            brief.key_components_or_steps = parse_components(&edited)?;
        } else {
            brief.set_field(*field, &edited)?;
        }
    }

    if brief == original {
        println!("No changes.");
        return Ok(());
    }
    let confirmed = Confirm::new("Commit the reviewed brief as a new version?")
        .with_default(true)
        .prompt()?;
    if !confirmed {
        println!("Discarded.");
        return Ok(());
    }
    let update = session.set_brief(brief)?;
    println!("✅ Brief version {} committed", update.index);
    println!("Sections generated from the old brief are now stale; see `drafter status`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_components() {
        let parsed = parse_components("采集模块：获取图像\n\n 处理模块: 提取边缘 \n存储单元").unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name, "采集模块");
        assert_eq!(parsed[0].function, "获取图像");
        assert_eq!(parsed[1].function, "提取边缘");
        assert_eq!(parsed[2].name, "存储单元");
        assert!(parsed[2].function.is_empty());
    }
}
