use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Regex, RegexSet};

use super::names::Vocabulary;

/// Bumped whenever `SECTION_PATTERNS` or `CREATOR_PATTERNS` change.
pub const PATTERN_SET_VERSION: u32 = 8;

/// Section headers and wiki boilerplate that show up as free text.
const SECTION_PATTERNS: &[&str] = &[
    r"^contents$",
    r"^transcript$",
    r"^gallery$",
    r"^trivia$",
    r"^goofs$",
    r"^continuity$",
    r"^references$",
    r"^the beginning$",
    r"^intro$",
    r"^opening$",
    r"^ending$",
    r"^credits$",
    r"^cake at stake",
    r"^after the intro",
    r"^before cake at stake",
    r"^after cake at stake",
    r"^the contest",
    r"^elimination$",
    r"^stinger$",
    r"^cold open",
    r"^categories$",
    r"^\d+$",
    r"^episode \d+",
    r"^\[\d+\]$",
    r"^edit$",
    r"^edit source$",
    r"well rested$",
    r"look who it is$",
];

/// Sign-offs and requests the creators add around the episode.
const CREATOR_PATTERNS: &[&str] = &[
    r"^hi,? it'?s me,? cary",
    r"^hey,? it'?s cary",
    r"^this is cary",
    r"^thank you (so much )?for watching",
    r"^don'?t forget to (vote|subscribe|like)",
    r"^see you (next time|in the next)",
    r"^if you enjoyed",
    r"^make sure to",
    r"^leave a comment",
    r"^the voting",
];

static SECTION_SET: LazyLock<RegexSet> = LazyLock::new(|| RegexSet::new(SECTION_PATTERNS).unwrap());
static CREATOR_SET: LazyLock<RegexSet> = LazyLock::new(|| RegexSet::new(CREATOR_PATTERNS).unwrap());
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}$").unwrap());

/// Pure text predicates shared by every extraction strategy.
#[derive(Debug, Clone)]
pub struct Classifier {
    episode_titles: HashSet<String>,
    vocabulary: Vocabulary,
}

impl Classifier {
    pub fn new<I, S>(episode_titles: I, vocabulary: Vocabulary) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Classifier {
            episode_titles: episode_titles
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .collect(),
            vocabulary,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Navigation text, section headers, episode titles, creator commentary
    /// and other spans that are never a spoken line.
    pub fn is_garbage(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();

        if lower.chars().count() < 3 {
            return true;
        }
        if self.episode_titles.contains(&lower) {
            return true;
        }
        if SECTION_SET.is_match(&lower) || CREATOR_SET.is_match(&lower) {
            return true;
        }
        // section header artifact left by stripped edit links
        if lower.ends_with("[]") {
            return true;
        }
        TIMESTAMP_RE.is_match(&lower)
    }

    pub fn is_stage_direction(&self, text: &str) -> bool {
        is_stage_direction(text)
    }

    pub fn is_known_speaker(&self, token: &str) -> bool {
        self.vocabulary.resolve(token).is_some()
    }

    /// The gate every candidate line passes before it is emitted.
    pub fn is_valid_line(&self, line: &str) -> bool {
        let line = line.trim();
        line.chars().count() > 2 && !self.is_garbage(line) && !is_stage_direction(line)
    }
}

/// Empty text, or text fully wrapped in brackets or parentheses.
pub fn is_stage_direction(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return true;
    }
    (text.starts_with('[') && text.ends_with(']')) || (text.starts_with('(') && text.ends_with(')'))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(["Cycle of Life", "Take the Plunge: Part 1"], Vocabulary::builtin())
    }

    #[test]
    fn short_text_is_garbage() {
        let c = classifier();
        assert!(c.is_garbage(""));
        assert!(c.is_garbage("ok"));
        assert!(!c.is_garbage("Hey"));
    }

    #[test]
    fn episode_titles_are_garbage() {
        let c = classifier();
        assert!(c.is_garbage("Cycle of Life"));
        assert!(c.is_garbage("  cycle of life "));
        assert!(!c.is_garbage("The cycle of life goes on."));
    }

    #[test]
    fn section_headers_and_markers() {
        let c = classifier();
        for text in [
            "Contents", "Trivia", "Cake at Stake", "Cake at stake 2", "Before Cake at Stake",
            "1234", "[3]", "Edit", "edit source", "Episode 12: Finale", "Cold Open",
            "I feel so well rested", "Well, look who it is",
        ] {
            assert!(c.is_garbage(text), "{:?} should be garbage", text);
        }
    }

    #[test]
    fn creator_commentary() {
        let c = classifier();
        assert!(c.is_garbage("Hi, it's me, Cary!"));
        assert!(c.is_garbage("Thank you so much for watching!"));
        assert!(c.is_garbage("Don't forget to subscribe"));
        assert!(c.is_garbage("See you next time"));
        assert!(!c.is_garbage("I forgot to vote."));
    }

    #[test]
    fn artifacts_and_timestamps() {
        let c = classifier();
        assert!(c.is_garbage("The Contest[]"));
        assert!(c.is_garbage("Intro[]"));
        assert!(c.is_garbage("0:00"));
        assert!(c.is_garbage("12:34"));
        assert!(!c.is_garbage("Meet me at 12:34 sharp"));
    }

    #[test]
    fn stage_directions() {
        assert!(is_stage_direction(""));
        assert!(is_stage_direction("   "));
        assert!(is_stage_direction("[Leafy walks off]"));
        assert!(is_stage_direction("(sighs)"));
        assert!(!is_stage_direction("(sighs) Fine."));
        assert!(!is_stage_direction("Go away."));
    }

    #[test]
    fn known_speakers_go_through_normalization() {
        let c = classifier();
        assert!(c.is_known_speaker("Leafy"));
        assert!(c.is_known_speaker("Ice-Cube:"));
        assert!(c.is_known_speaker("GOLFBALL"));
        assert!(!c.is_known_speaker("Trivia"));
    }

    #[test]
    fn valid_line_gate() {
        let c = classifier();
        assert!(c.is_valid_line("Go away."));
        assert!(!c.is_valid_line("Hi"));
        assert!(!c.is_valid_line("(walks off)"));
        assert!(!c.is_valid_line("Cycle of Life"));
    }

    #[test]
    fn predicates_are_total() {
        let c = classifier();
        for text in ["\u{0}", "[", ")", "🥚", "((()))", "\n\t"] {
            let _ = c.is_garbage(text);
            let _ = c.is_stage_direction(text);
            let _ = c.is_known_speaker(text);
        }
    }
}
