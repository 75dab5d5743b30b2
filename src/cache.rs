use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A previously saved transcript page.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub path: PathBuf,
    pub markup: String,
}

impl CachedPage {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Source of pre-fetched pages consulted before the network.
pub trait LocalCache {
    /// `Ok(None)` when nothing matches. `Err` when a match exists but cannot be read.
    fn lookup(&self, title: &str) -> Result<Option<CachedPage>>;
}

/// Lower-case, ASCII alphanumerics only.
pub fn normalized_key(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Directory of `*.html` snapshots, matched to titles by normalized substring.
pub struct HtmlDir {
    root: PathBuf,
}

impl HtmlDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HtmlDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find(&self, title: &str) -> Option<PathBuf> {
        let target = normalized_key(title);
        if target.is_empty() {
            return None;
        }
        let entries = std::fs::read_dir(&self.root).ok()?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
            .collect();
        files.sort();
        files.into_iter().find(|p| {
            p.file_name()
                .map(|n| normalized_key(&n.to_string_lossy()).contains(&target))
                .unwrap_or(false)
        })
    }
}

impl LocalCache for HtmlDir {
    fn lookup(&self, title: &str) -> Result<Option<CachedPage>> {
        let Some(path) = self.find(title) else {
            return Ok(None);
        };
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read cached page {}", path.display()))?;
        Ok(Some(CachedPage {
            markup: String::from_utf8_lossy(&bytes).into_owned(),
            path,
        }))
    }
}
