use super::{CheckClaimsArgs, DrawingCommands, GenerateArgs};
use crate::session::Session;
use anyhow::Result;
use drafter_core::{
    Content, GenerateScope, GenerationSummary, Key, SectionKey, SectionReport, UnitOutcome,
};

pub async fn run(args: GenerateArgs, session: &Session) -> Result<()> {
    if args.target == "all" {
        let scope = if args.outdated {
            GenerateScope::Outdated
        } else {
            GenerateScope::All
        };
        let summary = session.generate_all(scope).await?;
        print_summary(&summary);
        if summary.aborted {
            anyhow::bail!("generation aborted; see `drafter audit --level error`");
        }
        return Ok(());
    }

    if args.outdated {
        anyhow::bail!("--outdated only applies to `generate all`");
    }
    let section: SectionKey = args.target.parse()?;
    println!("Generating {} ({})...", section.label(), section);
    let report = session.generate_section(section).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SectionReport) {
    println!(
        "✅ {} ({}) → version {}",
        report.section.label(),
        report.section,
        report.update.index
    );
    for outcome in &report.units {
        match outcome {
            UnitOutcome::Committed { unit, index } => println!("  ✓ {:<28} v{}", unit.as_str(), index),
            UnitOutcome::Skipped { unit, reason } => println!("  ✗ {:<28} {}", unit.as_str(), reason),
        }
    }
    if !report.fallbacks.is_empty() {
        println!("  ↳ brief fallback used for: {}", report.fallbacks.join(", "));
    }
}

fn print_summary(summary: &GenerationSummary) {
    for report in &summary.reports {
        print_report(report);
    }
    for section in &summary.unchanged {
        println!("  = {} ({}) is fresh", section.label(), section);
    }
    for failure in &summary.failures {
        println!("❌ {} ({}): {}", failure.section.label(), failure.section, failure.error);
    }
    println!();
    println!(
        "{} generated, {} unchanged, {} failed{}",
        summary.reports.len(),
        summary.unchanged.len(),
        summary.failures.len(),
        if summary.aborted { " (aborted)" } else { "" }
    );
}

pub async fn labels(session: &Session) -> Result<()> {
    let labels = session.generate_figure_labels().await?;
    if labels.is_empty() {
        println!("(no labels generated)");
        return Ok(());
    }
    println!("{:<8}  {}", "LABEL", "NAME");
    println!("{}", "─".repeat(40));
    for label in &labels {
        println!("{:<8}  {}", label.label, label.name);
    }
    Ok(())
}

pub async fn check_claims(args: CheckClaimsArgs, session: &Session) -> Result<()> {
    let report = session.check_claims().await?;
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.supported && report.issues.is_empty() {
        println!("✅ Every claim feature is supported by the description.");
        return Ok(());
    }
    println!(
        "{} {} issue(s) found",
        if report.supported { "⚠️" } else { "❌" },
        report.issues.len()
    );
    for issue in &report.issues {
        let claim = issue
            .claim
            .map(|n| format!("claim {}", n))
            .unwrap_or_else(|| "general".to_string());
        println!("  - [{}] {}", claim, issue.problem);
        if !issue.suggestion.is_empty() {
            println!("    → {}", issue.suggestion);
        }
    }
    Ok(())
}

pub async fn drawing(cmd: DrawingCommands, session: &Session) -> Result<()> {
    match cmd {
        DrawingCommands::List => {
            let drawings = match session.active_content(Key::Section(SectionKey::Drawings))? {
                Some(Content::Drawings(d)) => d,
                _ => Vec::new(),
            };
            if drawings.is_empty() {
                println!("（本申请无附图）");
            }
            for (i, d) in drawings.iter().enumerate() {
                println!("附图{}：{}", i + 1, d.title);
                if !d.description.is_empty() {
                    println!("  {}", d.description);
                }
            }
            Ok(())
        }
        DrawingCommands::Regen { number } => {
            if number == 0 {
                anyhow::bail!("drawings are numbered from 1");
            }
            let update = session.regenerate_drawing(number - 1).await?;
            println!("✅ 附图{} regenerated (drawings version {})", number, update.index);
            Ok(())
        }
    }
}
