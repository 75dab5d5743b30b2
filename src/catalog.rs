use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const BUILTIN_EPISODES: &str = include_str!("../data/episodes.json");

/// One episode to scrape, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub number: u32,
    pub season: u32,
    pub season_name: String,
}

/// Built-in episode list, or the JSON file at `path` when given.
pub fn load(path: Option<&Path>) -> Result<Vec<CatalogEntry>> {
    let entries = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read catalog {}", p.display()))?;
            parse(&raw).with_context(|| format!("Invalid catalog {}", p.display()))?
        }
        None => parse(BUILTIN_EPISODES).context("Invalid built-in catalog")?,
    };
    Ok(entries)
}

fn parse(raw: &str) -> Result<Vec<CatalogEntry>> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(raw)?;
    if let Some(blank) = entries.iter().position(|e| e.title.trim().is_empty()) {
        bail!("entry {} has an empty title", blank);
    }
    Ok(entries)
}

pub fn titles(entries: &[CatalogEntry]) -> impl Iterator<Item = &str> {
    entries.iter().map(|e| e.title.as_str())
}

/// Episode counts per season, in first-seen order.
pub fn season_counts(entries: &[CatalogEntry]) -> Vec<(u32, String, usize)> {
    let mut counts: Vec<(u32, String, usize)> = Vec::new();
    for e in entries {
        match counts.iter_mut().find(|(season, _, _)| *season == e.season) {
            Some((_, _, n)) => *n += 1,
            None => counts.push((e.season, e.season_name.clone(), 1)),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_in_order() {
        let entries = load(None).unwrap();
        assert!(entries.len() > 100);
        assert_eq!(entries[0].title, "Take the Plunge: Part 1");
        assert_eq!(entries[0].number, 1);
        assert_eq!(entries[0].season, 1);
    }

    #[test]
    fn seasons_are_grouped() {
        let entries = load(None).unwrap();
        let counts = season_counts(&entries);
        assert_eq!(counts[0].0, 1);
        assert_eq!(counts[0].1, "BFDI");
        assert_eq!(counts.iter().map(|c| c.2).sum::<usize>(), entries.len());
    }

    #[test]
    fn file_catalog_replaces_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eps.json");
        std::fs::write(
            &path,
            r#"[{"title": "Cycle of Life", "number": 1, "season": 9, "season_name": "Test"}]"#,
        )
        .unwrap();
        let entries = load(Some(&path)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(titles(&entries).collect::<Vec<_>>(), vec!["Cycle of Life"]);
    }

    #[test]
    fn blank_titles_are_rejected() {
        assert!(parse(r#"[{"title": " ", "number": 1, "season": 1, "season_name": "x"}]"#).is_err());
    }
}
