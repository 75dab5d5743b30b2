use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::DialogueLine;

/// Written next to the combined export; the export itself is a bare array.
#[derive(Serialize)]
struct ExportMeta {
    exported_at: DateTime<Utc>,
    count: usize,
}

/// Write all lines to `out` as a pretty JSON array, plus `<out>.meta.json`.
/// Returns the line count.
pub fn export_all(lines: &[DialogueLine], out: &Path) -> Result<usize> {
    write_json(out, &lines)?;
    let meta = ExportMeta {
        exported_at: Utc::now(),
        count: lines.len(),
    };
    write_json(&meta_path(out), &meta)?;
    Ok(lines.len())
}

pub fn meta_path(out: &Path) -> PathBuf {
    out.with_extension("meta.json")
}

/// One JSON file per episode under `dir`. Returns (lines, files).
pub fn export_per_episode(lines: &[DialogueLine], dir: &Path) -> Result<(usize, usize)> {
    let mut by_episode: BTreeMap<&str, Vec<&DialogueLine>> = BTreeMap::new();
    for line in lines {
        by_episode.entry(line.episode_title.as_str()).or_default().push(line);
    }
    for (title, group) in &by_episode {
        let path = dir.join(format!("{}.json", sanitize_filename(title)));
        write_json(&path, group)?;
    }
    Ok((lines.len(), by_episode.len()))
}

pub fn default_episode_dir(out: &Path) -> PathBuf {
    out.parent().unwrap_or(Path::new(".")).join("episodes")
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Alphanumerics, `-`, `_` and inner spaces survive; spaces become `_`.
fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') { c } else { '_' })
        .collect();
    let safe = kept.trim().replace(' ', "_");
    if safe.is_empty() {
        "unknown".to_string()
    } else {
        safe
    }
}
