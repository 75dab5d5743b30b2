pub mod classify;
pub mod extract;
pub mod names;
pub mod segment;

use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, warn};

use classify::Classifier;
use extract::{Candidate, ExtractedLine, Strategy, STRATEGIES};

/// Dedup compares this many leading characters of a line.
const DEDUP_PREFIX_CHARS: usize = 50;

static TITLE_CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.pi-image-thumbnail").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    Local,
    Fetched,
    Rendered,
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentSource::Local => "local",
            DocumentSource::Fetched => "fetched",
            DocumentSource::Rendered => "rendered",
        })
    }
}

/// A parsed transcript page. Read-only once parsed.
pub struct RawDocument {
    html: Html,
    source: DocumentSource,
}

impl RawDocument {
    pub fn parse(markup: &str, source: DocumentSource) -> Self {
        RawDocument {
            html: Html::parse_document(markup),
            source,
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn source(&self) -> DocumentSource {
        self.source
    }
}

/// Segment → strategies → merge. Output order is deterministic.
pub fn extract(doc: &RawDocument, episode_title: &str, classifier: &Classifier) -> Vec<ExtractedLine> {
    extract_with(doc, episode_title, classifier, STRATEGIES)
}

/// [`extract`] over an explicit strategy table. A strategy that panics on a
/// region loses only that region's candidates.
pub fn extract_with(
    doc: &RawDocument,
    episode_title: &str,
    classifier: &Classifier,
    strategies: &[Strategy],
) -> Vec<ExtractedLine> {
    let regions = segment::segment(doc);
    let mut candidates: Vec<Candidate> = Vec::new();

    for strategy in strategies {
        let before = candidates.len();
        for region in &regions {
            match panic::catch_unwind(AssertUnwindSafe(|| (strategy.run)(region, classifier))) {
                Ok(found) => candidates.extend(found),
                Err(_) => warn!(episode = episode_title, strategy = strategy.name, "strategy failed on a region, skipping it"),
            }
        }
        debug!(
            episode = episode_title,
            strategy = strategy.name,
            candidates = candidates.len() - before,
            "strategy done"
        );
    }

    let lines = merge(candidates, classifier);
    debug!(
        episode = episode_title,
        source = %doc.source(),
        regions = regions.len(),
        tables = segment::all_tables(&regions).count(),
        lines = lines.len(),
        "extraction done"
    );
    lines
}

/// Re-validate every candidate the same way regardless of strategy, then
/// drop repeats of (speaker, line prefix), keeping the first.
fn merge(candidates: Vec<Candidate>, classifier: &Classifier) -> Vec<ExtractedLine> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut lines = Vec::new();

    for candidate in candidates {
        let Some(character) = classifier.vocabulary().resolve(&candidate.speaker_raw) else {
            continue;
        };
        let dialogue = candidate.line.trim();
        if !classifier.is_valid_line(dialogue) {
            continue;
        }
        let prefix: String = dialogue.chars().take(DEDUP_PREFIX_CHARS).collect();
        if seen.insert((character.clone(), prefix)) {
            lines.push(ExtractedLine {
                character,
                dialogue: dialogue.to_string(),
            });
        }
    }

    lines
}

/// Episode title card from the page infobox, without the `/revision` suffix.
pub fn title_card_image(doc: &RawDocument) -> Option<String> {
    doc.html()
        .select(&TITLE_CARD_SEL)
        .find_map(|img| img.value().attr("src"))
        .and_then(|src| src.split("/revision").next())
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

// ── Tests ──
