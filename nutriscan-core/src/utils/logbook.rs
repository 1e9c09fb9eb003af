// src/utils/logbook.rs
use anyhow::{Context, Result};
use serde_json::Value;
use std::{fs, io::Write, path::Path};

/// Append one `{timestamp, event, data}` line to the JSONL logbook at `path`.
pub fn emit_event(path: &Path, event: &str, data: Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create logbook dir {}", parent.display()))?;
    }
    let line = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": event,
        "data": data,
    });
    let json = serde_json::to_string(&line)?;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open logbook {}", path.display()))?;
    writeln!(f, "{}", json)?;
    Ok(())
}

/// Read every logbook line back; blank lines are skipped.
pub fn read_events(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("read logbook {}", path.display()))?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, l)| {
            serde_json::from_str(l)
                .with_context(|| format!("logbook {} line {}", path.display(), i + 1))
        })
        .collect()
}
