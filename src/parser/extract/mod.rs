pub mod bold;
pub mod colon;
pub mod lists;
pub mod tables;

use super::classify::Classifier;
use super::segment::Region;

/// A (speaker, line) pair as found by one strategy, before the final merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub speaker_raw: String,
    pub line: String,
}

impl Candidate {
    pub fn new(speaker_raw: impl Into<String>, line: impl Into<String>) -> Self {
        Candidate {
            speaker_raw: speaker_raw.into(),
            line: line.into(),
        }
    }
}

/// A validated, deduplicated line with a canonical speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLine {
    pub character: String,
    pub dialogue: String,
}

pub type StrategyFn = fn(&Region, &Classifier) -> Vec<Candidate>;

pub struct Strategy {
    pub name: &'static str,
    pub run: StrategyFn,
}

/// Run order is part of the output contract: earlier strategies win dedup ties.
pub const STRATEGIES: &[Strategy] = &[
    Strategy { name: "paragraph", run: extract_paragraph },
    Strategy { name: "image_table", run: tables::extract },
    Strategy { name: "bruteforce_table", run: tables::extract_bruteforce },
    Strategy { name: "list_item", run: lists::extract },
];

/// Bold-tag lines, or the colon pattern when the paragraph had none.
fn extract_paragraph(region: &Region, classifier: &Classifier) -> Vec<Candidate> {
    let Region::Paragraph(p) = region else {
        return Vec::new();
    };
    if classifier.is_garbage(&p.text) || classifier.is_stage_direction(&p.text) {
        return Vec::new();
    }

    let found = bold::extract(p, classifier);
    if !found.is_empty() {
        return found;
    }
    colon::extract(&p.text, classifier).into_iter().collect()
}

// ── Tests ──
