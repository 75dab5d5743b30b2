use std::sync::LazyLock;

use regex::Regex;

use super::Candidate;
use crate::parser::classify::Classifier;

/// `Speaker: line` in plain text. The name part is short and letter-led.
static SPEAKER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z\s\-'.]{1,25}):\s*(.+)$").unwrap());

pub fn extract(text: &str, classifier: &Classifier) -> Option<Candidate> {
    let caps = SPEAKER_LINE_RE.captures(text.trim())?;
    let name = caps[1].trim();
    let dialogue = caps[2].trim();

    if classifier.is_known_speaker(name) && classifier.is_valid_line(dialogue) {
        Some(Candidate::new(name, dialogue))
    } else {
        None
    }
}

// ── Tests ──
