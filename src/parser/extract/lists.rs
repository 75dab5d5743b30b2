use super::{colon, Candidate};
use crate::parser::classify::Classifier;
use crate::parser::segment::Region;

/// `<li>Speaker: line</li>` transcripts. Table-of-contents entries are skipped.
pub fn extract(region: &Region, classifier: &Classifier) -> Vec<Candidate> {
    match region {
        Region::ListItem(item) if !item.in_toc => colon::extract(&item.text, classifier).into_iter().collect(),
        _ => Vec::new(),
    }
}
