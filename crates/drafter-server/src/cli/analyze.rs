use super::{brief, read_input, AnalyzeArgs};
use crate::session::Session;
use anyhow::Result;

pub async fn run(args: AnalyzeArgs, session: &Session) -> Result<()> {
    let text = read_input(args.text, args.file.as_ref())?;
    if text.trim().is_empty() {
        anyhow::bail!("Disclosure text is empty. Pass it inline, with --file, or on stdin.");
    }

    println!("Analyzing disclosure ({} chars)...", text.chars().count());
    let brief = session.analyze_brief(&text).await?;
    println!("✅ Structured brief committed\n");
    brief::print_brief(&brief);
    println!();
    println!("Review with `drafter brief review` or `drafter brief set <field> <value>`.");
    Ok(())
}
