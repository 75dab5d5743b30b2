use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Bumped whenever `KNOWN_SPEAKERS` or `CORRECTIONS` change.
pub const VOCABULARY_VERSION: u32 = 8;

static NON_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s\-]").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const KNOWN_SPEAKERS: &[&str] = &[
    // Hosts
    "announcer", "four", "two", "x", "one", "purple face",
    "firey speaker box", "flower speaker box", "puffball speaker box",
    // Original contestants
    "blocky", "bubble", "coiny", "david", "eraser", "firey", "flower",
    "golf ball", "ice cube", "leafy", "match", "needle", "pen", "pencil",
    "pin", "rocky", "snowball", "spongy", "teardrop", "tennis ball", "woody",
    // Second season
    "book", "bomby", "dora", "fries", "gelatin", "nickel",
    "puffball", "ruby", "yellow face",
    // Later seasons
    "balloony", "barf bag", "basketball", "bell", "black hole", "bottle",
    "bracelety", "cake", "clock", "cloudy", "eggy", "fanny", "firey jr",
    "foldy", "gaty", "grassy", "lightning", "liy", "lollipop", "loser",
    "marker", "naily", "pie", "pillow", "price tag", "profily", "remote",
    "robot flower", "roboty", "saw", "stapy", "taco", "tree", "tv", "winner",
    "donut",
    // Nicknames
    "gb", "tb", "td", "icy", "needy", "8-ball", "eight ball",
    // Groups and narration
    "everyone", "all", "both", "contestants", "freesmart", "team",
    "narrator", "announcer at stake", "speaker", "host",
    // Creators, recognized so their commentary can be attributed
    "cary", "michael", "jacknjellify",
];

const CORRECTIONS: &[(&str, &str)] = &[
    ("ice-cube", "ice cube"),
    ("icecube", "ice cube"),
    ("golfball", "golf ball"),
    ("tennisball", "tennis ball"),
    ("yellowface", "yellow face"),
    ("yellow-face", "yellow face"),
    ("blackhole", "black hole"),
    ("black-hole", "black hole"),
    ("barfbag", "barf bag"),
    ("barf-bag", "barf bag"),
    ("fireysr", "firey"),
    ("fireyjr", "firey jr"),
    ("firey-jr", "firey jr"),
    ("robotflower", "robot flower"),
    ("robot-flower", "robot flower"),
    ("pricetag", "price tag"),
    ("price-tag", "price tag"),
];

/// Canonical form of a raw speaker token.
///
/// Lowercases, drops punctuation other than hyphens, collapses whitespace and
/// maps known spelling variants onto one spelling. Applying it twice is the
/// same as applying it once.
pub fn normalize(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let stripped = NON_NAME_RE.replace_all(&lower, "");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let name = collapsed.trim();

    CORRECTIONS
        .iter()
        .find(|(variant, _)| *variant == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// The controlled set of canonical speaker names.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    names: HashSet<String>,
}

impl Vocabulary {
    pub fn builtin() -> Self {
        Vocabulary {
            names: KNOWN_SPEAKERS.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Add names from configuration. Each name is normalized first so every
    /// member stays a fixed point of `normalize`.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in extra {
            let canonical = normalize(name.as_ref());
            if !canonical.is_empty() {
                self.names.insert(canonical);
            }
        }
        self
    }

    /// Membership of an already-normalized name.
    pub fn contains(&self, canonical: &str) -> bool {
        self.names.contains(canonical)
    }

    /// Normalize `raw` and return the canonical name if it is a member.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let canonical = normalize(raw);
        self.contains(&canonical).then_some(canonical)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrects_spacing_and_hyphen_variants() {
        assert_eq!(normalize("IceCube"), "ice cube");
        assert_eq!(normalize("Ice-Cube"), "ice cube");
        assert_eq!(normalize("Firey-Jr."), "firey jr");
        assert_eq!(normalize("  Golf   Ball: "), "golf ball");
    }

    #[test]
    fn keeps_unknown_names_cleaned() {
        assert_eq!(normalize("Mr. Nobody!"), "mr nobody");
        assert_eq!(normalize("8-Ball"), "8-ball");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Ice-Cube", "FIREYJR", " Leafy ", "Four:", "Yellow  Face", "Black-Hole!!",
            "Announcer at Stake", "x", "", "   ", "(laughs)", "Tennis_Ball", "fireysr",
            "Robot - Flower", "Pen & Pencil", "Évil Leafy",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input {:?}", s);
        }
    }

    #[test]
    fn every_builtin_name_is_canonical() {
        for name in KNOWN_SPEAKERS {
            assert_eq!(normalize(name), *name);
        }
        for (_, canonical) in CORRECTIONS {
            assert!(Vocabulary::builtin().contains(canonical), "{} missing", canonical);
        }
    }

    #[test]
    fn extra_names_are_normalized() {
        let vocab = Vocabulary::builtin().with_extra(["Evil Leafy!", "  "]);
        assert!(vocab.contains("evil leafy"));
        assert_eq!(vocab.resolve("EVIL LEAFY"), Some("evil leafy".to_string()));
        assert_eq!(vocab.len(), Vocabulary::builtin().len() + 1);
    }
}
