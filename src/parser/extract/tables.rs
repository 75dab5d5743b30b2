use super::Candidate;
use crate::parser::classify::Classifier;
use crate::parser::segment::{Region, Table};

/// Image-labeled dialogue tables: a character portrait in one cell, the line
/// in another. Every table, nested ones included; one speaker and one line
/// per table.
pub fn extract(region: &Region, classifier: &Classifier) -> Vec<Candidate> {
    match region {
        Region::Table(table) => match_table(table, classifier).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Same matching as [`extract`], run as its own pass after it. Runs even when
/// the image-table pass already produced lines; the merge drops repeats.
pub fn extract_bruteforce(region: &Region, classifier: &Classifier) -> Vec<Candidate> {
    match region {
        Region::Table(table) => match_table(table, classifier).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn match_table(table: &Table, classifier: &Classifier) -> Option<Candidate> {
    let speaker = table
        .image_labels
        .iter()
        .find(|label| classifier.is_known_speaker(label))?;

    let dialogue = longest_text_cell(table)?;
    classifier
        .is_valid_line(dialogue)
        .then(|| Candidate::new(speaker.as_str(), dialogue))
}

/// Longest non-image cell text; the earliest wins a tie.
fn longest_text_cell(table: &Table) -> Option<&str> {
    table
        .cells
        .iter()
        .filter(|cell| !cell.has_image)
        .map(|cell| cell.text.trim())
        .filter(|text| !text.is_empty())
        .fold(None, |best: Option<&str>, text| match best {
            Some(b) if b.chars().count() >= text.chars().count() => Some(b),
            _ => Some(text),
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::names::Vocabulary;
    use crate::parser::segment::TableCell;

    fn classifier() -> Classifier {
        Classifier::new(Vec::<String>::new(), Vocabulary::builtin())
    }

    fn cell(text: &str, has_image: bool) -> TableCell {
        TableCell {
            text: text.to_string(),
            has_image,
        }
    }

    fn table(labels: &[&str], cells: Vec<TableCell>) -> Region {
        Region::Table(Table {
            cells,
            image_labels: labels.iter().map(|l| l.to_string()).collect(),
        })
    }

    #[test]
    fn image_label_names_the_speaker() {
        let t = table(&["Leafy"], vec![cell("", true), cell("I don't think so.", false)]);
        assert_eq!(extract(&t, &classifier()), vec![Candidate::new("Leafy", "I don't think so.")]);
    }

    #[test]
    fn first_known_label_and_longest_cell() {
        let t = table(
            &["Background.png", "Ice-Cube", "Leafy"],
            vec![cell("", true), cell("Short one", false), cell("Much longer line!", false), cell("Equal length line", false)],
        );
        assert_eq!(extract(&t, &classifier()), vec![Candidate::new("Ice-Cube", "Much longer line!")]);
    }

    #[test]
    fn both_passes_match_the_same_tables() {
        let t = table(&["Pin"], vec![cell("Let's go, team!", false)]);
        let expected = vec![Candidate::new("Pin", "Let's go, team!")];
        assert_eq!(extract(&t, &classifier()), expected);
        assert_eq!(extract_bruteforce(&t, &classifier()), expected);
    }

    #[test]
    fn no_speaker_or_bad_line_yields_nothing() {
        let c = classifier();
        let unlabeled = table(&["Map.png"], vec![cell("Some caption here", false)]);
        assert!(extract_bruteforce(&unlabeled, &c).is_empty());
        let direction = table(&["Pin"], vec![cell("[Pin jumps]", false)]);
        assert!(extract_bruteforce(&direction, &c).is_empty());
        let empty = table(&["Pin"], vec![cell("", true)]);
        assert!(extract_bruteforce(&empty, &c).is_empty());
    }
}
