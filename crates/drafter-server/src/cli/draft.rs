//! Inspecting and curating versions: status, versions, select, edit, refine,
//! export.

use super::{read_input, EditArgs, ExportArgs, SelectArgs, VersionsArgs};
use crate::content::content_from_text;
use crate::session::Session;
use anyhow::{Context, Result};
use drafter_core::{Freshness, Key};

fn freshness_mark(freshness: Freshness) -> &'static str {
    match freshness {
        Freshness::NotGenerated => "·  not generated",
        Freshness::Fresh => "✓  fresh",
        Freshness::Stale => "⚠  stale",
        Freshness::UpstreamStale => "↑  upstream stale",
    }
}

pub fn status(session: &Session) -> Result<()> {
    let brief = session.brief()?;
    if brief.is_empty() {
        println!("Brief: (none; run `drafter analyze`)");
    } else {
        let versions = session.versions(Key::Brief)?.len();
        println!("Brief: {} version(s)", versions);
    }
    println!();
    println!("{:<20}  {:<12}  {:<18}  {}", "SECTION", "LABEL", "STATUS", "VERSIONS");
    println!("{}", "─".repeat(66));
    for row in session.overview()? {
        let versions = match row.active {
            Some(active) => format!("{} (active {})", row.versions, active),
            None => "0".to_string(),
        };
        println!(
            "{:<20}  {:<12}  {:<18}  {}",
            row.section.as_str(),
            row.label,
            freshness_mark(row.freshness),
            versions
        );
    }
    if let Some(refined) = session.refined()? {
        println!();
        println!(
            "Refined draft: {} sections, {}",
            refined.sections.len(),
            refined.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

fn one_line(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}…", flat.chars().take(max_chars).collect::<String>())
    }
}

pub fn versions(args: VersionsArgs, session: &Session) -> Result<()> {
    let key: Key = args.key.parse()?;
    let Some(artifact) = session.artifact(key)? else {
        println!("(no versions of {})", key);
        return Ok(());
    };
    let stale = session.is_stale(key)?;
    println!(
        "{}: {} version(s), updated {}{}",
        key,
        artifact.versions.len(),
        artifact.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        if stale { ", STALE" } else { "" }
    );
    for (i, content) in artifact.versions.iter().enumerate() {
        let marker = if i == artifact.active { "*" } else { " " };
        let text = content.render_text();
        if args.full {
            println!("{} [{}]", marker, i);
            println!("{}", text);
            println!();
        } else {
            println!("{} [{}] {}", marker, i, one_line(&text, 80));
        }
    }
    Ok(())
}

pub fn select(args: SelectArgs, session: &Session) -> Result<()> {
    let key: Key = args.key.parse()?;
    let update = session.set_active_version(key, args.index)?;
    println!("✅ {} now uses version {} of {}", key, update.index, update.count);
    Ok(())
}

pub fn edit(args: EditArgs, session: &Session) -> Result<()> {
    let key: Key = args.key.parse()?;
    let text = read_input(args.text, args.file.as_ref())?;
    let current = session.active_content(key)?;
    let content = content_from_text(key, &text, current.as_ref())?;
    let update = session.submit_edited_version(key, content)?;
    println!("✅ Edited {} committed as version {}", key, update.index);
    Ok(())
}

pub async fn refine(session: &Session) -> Result<()> {
    println!("Refining the whole draft...");
    let draft = session.refine_all().await?;
    println!("✅ Refined {} sections", draft.sections.len());
    for warning in &draft.warnings {
        println!("  ⚠ {}", warning);
    }
    println!("Export it with `drafter export --refined`.");
    Ok(())
}

pub fn export(args: ExportArgs, session: &Session) -> Result<()> {
    if args.refined && session.refined()?.is_none() {
        tracing::warn!("No refined draft yet; exporting primary content");
    }
    let markdown = session.export_markdown(args.refined)?;
    match args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Exported to {}", path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
