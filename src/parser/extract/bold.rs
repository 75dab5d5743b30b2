use std::sync::LazyLock;

use regex::Regex;

use super::Candidate;
use crate::parser::classify::Classifier;
use crate::parser::segment::{Inline, Paragraph};

static LEADING_COLONS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[:\s]+").unwrap());

/// `<b>Speaker</b>: line`, the usual transcript layout.
///
/// Each bold run naming a known speaker claims the runs after it, up to the
/// next bold run. Italic runs are stage directions and are skipped.
pub fn extract(p: &Paragraph, classifier: &Classifier) -> Vec<Candidate> {
    let mut out = Vec::new();

    for (i, run) in p.runs.iter().enumerate() {
        let Inline::Bold(bold_text) = run else {
            continue;
        };
        let name = bold_text.trim().trim_end_matches(':').trim();
        if !classifier.is_known_speaker(name) {
            continue;
        }

        let mut parts: Vec<String> = Vec::new();
        for next in &p.runs[i + 1..] {
            match next {
                Inline::Bold(_) => break,
                Inline::Italic(_) => continue,
                Inline::Text(t) => {
                    let t = t.trim();
                    let t = t.strip_prefix(':').map(str::trim).unwrap_or(t);
                    if !t.is_empty() {
                        parts.push(t.to_string());
                    }
                }
                Inline::Other(t) => {
                    let t = t.trim();
                    if !t.is_empty() && !classifier.is_stage_direction(t) {
                        parts.push(t.to_string());
                    }
                }
            }
        }

        let joined = parts.join(" ");
        let dialogue = LEADING_COLONS_RE.replace(joined.trim(), "").to_string();
        if classifier.is_valid_line(&dialogue) {
            out.push(Candidate::new(name, dialogue));
        }
    }

    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::names::Vocabulary;

    fn classifier() -> Classifier {
        Classifier::new(Vec::<String>::new(), Vocabulary::builtin())
    }

    fn para(runs: Vec<Inline>) -> Paragraph {
        Paragraph {
            runs,
            text: String::new(),
        }
    }

    #[test]
    fn italic_stage_direction_is_dropped() {
        let p = para(vec![
            Inline::Bold("Four".into()),
            Inline::Text(": Go away. ".into()),
            Inline::Italic("(walks off)".into()),
        ]);
        assert_eq!(extract(&p, &classifier()), vec![Candidate::new("Four", "Go away.")]);
    }

    #[test]
    fn colon_inside_bold_and_multiple_speakers() {
        let p = para(vec![
            Inline::Bold("Leafy:".into()),
            Inline::Text(" Hi, ".into()),
            Inline::Other("Firey".into()),
            Inline::Text("!".into()),
            Inline::Bold("Firey:".into()),
            Inline::Text(" Hello, Leafy.".into()),
        ]);
        assert_eq!(
            extract(&p, &classifier()),
            vec![
                Candidate::new("Leafy", "Hi, Firey !"),
                Candidate::new("Firey", "Hello, Leafy."),
            ]
        );
    }

    #[test]
    fn unknown_bold_names_and_empty_lines_are_ignored() {
        let p = para(vec![
            Inline::Bold("Note".into()),
            Inline::Text(": this is trivia".into()),
            Inline::Bold("Pin".into()),
            Inline::Text(":".into()),
            Inline::Other("(nods)".into()),
        ]);
        assert!(extract(&p, &classifier()).is_empty());
    }
}
