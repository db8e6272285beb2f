use super::AuditArgs;
use crate::config::DrafterConfig;
use anyhow::Result;
use chrono::{Duration, Utc};
use drafter_core::audit::read_log;
use drafter_core::{AuditAction, AuditFilter, AuditLevel, AuditLog};

pub async fn run(args: AuditArgs, config: &DrafterConfig) -> Result<()> {
    let log = AuditLog::new(config.audit_config(), config.session.session_id.clone());
    let path = log.log_path();
    if !path.exists() {
        anyhow::bail!(
            "Audit log not found at {:?}. Run a command against session '{}' first.",
            path,
            config.session.session_id
        );
    }

    let since = args.since.as_deref().map(parse_duration).transpose()?;
    let action = args
        .action
        .as_deref()
        .map(|s| s.parse::<AuditAction>())
        .transpose()?;
    let min_level = args.level.as_deref().map(parse_level).transpose()?;

    let filter = AuditFilter {
        since,
        action,
        min_level,
        limit: Some(args.limit),
    };

    let entries = read_log(&path, &filter)?;

    if entries.is_empty() {
        println!("(no audit entries found)");
        return Ok(());
    }

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            println!("{:<24}  {:<5}  {:<18}  {}", "TIME", "LEVEL", "ACTION", "MESSAGE");
            println!("{}", "─".repeat(90));
            for entry in &entries {
                println!(
                    "{:<24}  {:<5}  {:<18}  {}",
                    entry.ts.format("%Y-%m-%dT%H:%M:%SZ"),
                    format!("{:?}", entry.level).to_uppercase(),
                    entry.action.to_string(),
                    entry.message,
                );
                let file = ["prompt_file", "response_file"]
                    .iter()
                    .find_map(|k| entry.context.get(*k).and_then(|v| v.as_str()));
                if let Some(file) = file {
                    println!("  → {}", file);
                }
            }
            println!();
            println!("{} entries", entries.len());
        }
    }

    Ok(())
}

fn parse_level(s: &str) -> Result<AuditLevel> {
    match s.to_ascii_lowercase().as_str() {
        "debug" => Ok(AuditLevel::Debug),
        "info" => Ok(AuditLevel::Info),
        "warn" | "warning" => Ok(AuditLevel::Warn),
        "error" => Ok(AuditLevel::Error),
        other => anyhow::bail!("Unknown level '{}': expected debug, info, warn, or error", other),
    }
}

/// Parse a human-readable duration like "24h", "7d", "1h30m" into a UTC timestamp.
fn parse_duration(s: &str) -> Result<chrono::DateTime<Utc>> {
    let s = s.trim();
    let mut remaining = s;
    let mut total_seconds: i64 = 0;

    while !remaining.is_empty() {
        let split_at = remaining.find(|c: char| c.is_alphabetic()).ok_or_else(|| {
            anyhow::anyhow!(
                "Cannot parse duration '{}': expected format like '24h', '7d', '1h30m'",
                s
            )
        })?;

        let num: i64 = remaining[..split_at]
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid number in duration '{}'", s))?;

        let rest = &remaining[split_at..];
        let unit_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_end];

        let secs = match unit {
            "s" => num,
            "m" => num * 60,
            "h" => num * 3600,
            "d" => num * 86400,
            "w" => num * 7 * 86400,
            _ => anyhow::bail!("Unknown time unit '{}' in duration '{}'", unit, s),
        };
        total_seconds += secs;
        remaining = &rest[unit_end..];
    }

    Ok(Utc::now() - Duration::seconds(total_seconds))
}
