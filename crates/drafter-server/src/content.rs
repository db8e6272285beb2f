//! Turning user-supplied text into a content version for a given key.

use anyhow::{bail, Context, Result};
use drafter_core::{Brief, Content, Drawing, Key, SectionKey, UnitKey};

fn is_drawing_key(key: Key) -> bool {
    matches!(
        key,
        Key::Section(SectionKey::Drawings) | Key::Unit(UnitKey::MermaidCode)
    )
}

/// Parse `text` into the variant `key` holds. The variant follows the
/// currently active content when there is one: lists take one item per
/// non-empty line, structured values and records take JSON. The brief and
/// drawing keys always take JSON.
pub fn content_from_text(key: Key, text: &str, current: Option<&Content>) -> Result<Content> {
    if key == Key::Brief {
        let brief: Brief = serde_json::from_str(text).context("brief edits must be a JSON object")?;
        return Ok(Content::Brief(brief));
    }
    if is_drawing_key(key) {
        let drawings: Vec<Drawing> = serde_json::from_str(text)
            .context("drawing edits must be a JSON array of {title, description, code}")?;
        return Ok(Content::Drawings(drawings));
    }
    let content = match current {
        Some(Content::List(_)) => Content::List(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        ),
        Some(Content::Structured(_)) => Content::Structured(
            serde_json::from_str(text).context("structured edits must be valid JSON")?,
        ),
        _ => Content::text(text.trim()),
    };
    if content.is_empty() {
        bail!("refusing to commit an empty version of {}", key);
    }
    Ok(content)
}
