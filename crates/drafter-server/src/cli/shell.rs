use crate::config::DrafterConfig;
use crate::session::Session;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;

/// REPL over one open session. Each line is parsed like a `drafter`
/// command line, without the program name.
pub async fn run(session: &Session, config: &DrafterConfig, config_path: &Path) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!();
    println!(
        "drafter shell: session '{}' ({})",
        config.session.session_id,
        config.db_path().display()
    );
    println!("Type 'help' for available commands, 'exit' to quit.");
    println!();

    loop {
        match rl.readline("drafter> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if line == "exit" || line == "quit" {
                    println!("Goodbye.");
                    break;
                }

                if line == "help" {
                    print_help();
                    continue;
                }

                let mut argv = vec!["drafter".to_string()];
                argv.extend(shell_split(&line));

                use clap::Parser;
                match super::Cli::try_parse_from(&argv) {
                    Ok(cli) => {
                        if let Err(e) = dispatch(cli.command, session, config, config_path).await {
                            eprintln!("Error: {:#}", e);
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

async fn dispatch(
    command: super::Commands,
    session: &Session,
    config: &DrafterConfig,
    config_path: &Path,
) -> Result<()> {
    use super::Commands;
    match command {
        Commands::Serve => println!("Use 'exit' first, then run `drafter serve`."),
        Commands::Init => println!("Use 'exit' first, then run `drafter init`."),
        Commands::Shell => println!("Already in shell mode."),
        Commands::Config(cmd) => super::config_cmd::run(cmd, config_path, config).await?,
        Commands::Audit(a) => super::audit::run(a, config).await?,
        other => super::run_with_session(other, session).await?,
    }
    Ok(())
}

fn print_help() {
    println!("Available commands (same as CLI, without 'drafter' prefix):");
    println!("  analyze <text> | analyze --file <path>");
    println!("  brief show [--json] | brief set <field> <value> | brief review");
    println!("  generate <section>|all [--outdated]");
    println!("  status");
    println!("  versions <key> [--full]");
    println!("  select <key> <index>");
    println!("  edit <key> --text <text> | edit <key> --file <path>");
    println!("  refine");
    println!("  export [--refined] [--output <path>]");
    println!("  drawing list | drawing regen <number>");
    println!("  labels");
    println!("  check-claims [--format json]");
    println!("  audit [--since 1h] [--action model.call] [--level warn] [--limit N]");
    println!("  config validate|show");
    println!("  exit / quit");
}

/// Simple shell-like word splitting (handles quoted strings).
fn shell_split(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_split_quotes() {
        assert_eq!(
            shell_split(r#"brief set problem_statement "识别 速度慢""#),
            vec!["brief", "set", "problem_statement", "识别 速度慢"]
        );
        assert_eq!(shell_split("  status  "), vec!["status"]);
        assert_eq!(shell_split("edit claims --text '1. 一种方法'"), vec!["edit", "claims", "--text", "1. 一种方法"]);
    }
}
