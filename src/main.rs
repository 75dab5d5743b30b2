mod cache;
mod catalog;
mod db;
mod error;
mod export;
mod fetch;
mod parser;
mod scrape;
mod settings;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use cache::HtmlDir;
use parser::classify::Classifier;
use parser::names::Vocabulary;
use settings::Settings;

#[derive(Parser)]
#[command(name = "transcript_scraper", about = "Wiki transcript dialogue scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every catalog episode not yet stored
    Run {
        /// Max catalog entries to go through (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Re-scrape episodes that already have lines
        #[arg(long)]
        rescrape: bool,
        /// Delete all stored lines first
        #[arg(long)]
        clear: bool,
        /// Ignore saved HTML snapshots and always fetch
        #[arg(long)]
        no_cache: bool,
        /// Database path (overrides settings)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Extract dialogue from one saved page and print it
    Parse {
        file: PathBuf,
        /// Episode title used for logging and title filtering
        #[arg(short, long, default_value = "local page")]
        title: String,
    },
    /// Show stored dialogue statistics
    Stats {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Export stored dialogue as JSON
    Export {
        #[arg(short, long, default_value = "exports/dialogue_export.json")]
        out: PathBuf,
        /// Also write one file per episode next to the combined export
        #[arg(long)]
        per_episode: bool,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Search stored dialogue
    Search {
        /// Text the line must contain (case-insensitive)
        #[arg(short, long)]
        keywords: Option<String>,
        /// Part of the speaker name (case-insensitive)
        #[arg(short, long)]
        character: Option<String>,
        /// Season number
        #[arg(short, long)]
        season: Option<u32>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "150")]
        limit: usize,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Episode counts per season
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let episodes = catalog::load(settings.catalog_path.as_deref())?;

    let result = match cli.command {
        Commands::Run { limit, rescrape, clear, no_cache, db } => {
            let classifier = build_classifier(&settings, &episodes);
            let db_path = db.unwrap_or_else(|| settings.db_path.clone());
            let mut store = db::SqliteStore::open(&db_path)?;

            let fetcher = fetch::Fetcher::new(
                fetch::HttpTransport::from_settings(&settings)?,
                fetch::FetchPolicy::from_settings(&settings),
            );
            let html_dir = HtmlDir::new(&settings.html_dir);
            let orchestrator = scrape::Orchestrator {
                fetcher: &fetcher,
                cache: (!no_cache).then_some(&html_dir),
                classifier: &classifier,
                wiki_base: &settings.wiki_base,
                delay: scrape::EpisodeDelay::from_settings(&settings),
            };
            info!(
                episodes = episodes.len(),
                max_retries = fetcher.policy().max_retries,
                cache = %html_dir.root().display(),
                "Starting run into {}",
                db_path.display()
            );

            let opts = scrape::RunOptions { limit, rescrape, clear };
            let summary = orchestrator.run(&episodes, &mut store, &opts).await?;
            summary.print();
            Ok(())
        }
        Commands::Parse { file, title } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let markup = String::from_utf8_lossy(&bytes);
            let classifier = build_classifier(&settings, &episodes);
            let doc = parser::RawDocument::parse(&markup, parser::DocumentSource::Local);
            let lines = parser::extract(&doc, &title, &classifier);
            for line in &lines {
                println!("{:>16} | {}", line.character, line.dialogue);
            }
            if let Some(image) = parser::title_card_image(&doc) {
                println!("\nTitle card: {}", image);
            }
            println!("\n{} lines", lines.len());
            Ok(())
        }
        Commands::Stats { db } => {
            let store = db::SqliteStore::open(&db.unwrap_or_else(|| settings.db_path.clone()))?;
            let s = db::get_stats(store.conn(), 10)?;
            println!("Lines:      {}", s.lines);
            println!("Episodes:   {} / {}", s.episodes, episodes.len());
            println!("Characters: {}", s.characters);
            if !s.top_characters.is_empty() {
                println!("\n--- Top speakers ---");
                for (character, n) in &s.top_characters {
                    println!("  {:<16} {:>6}", character, n);
                }
            }
            Ok(())
        }
        Commands::Export { out, per_episode, db } => {
            let store = db::SqliteStore::open(&db.unwrap_or_else(|| settings.db_path.clone()))?;
            let lines = db::all_lines(store.conn())?;
            let count = export::export_all(&lines, &out)?;
            println!(
                "Exported {} lines to {} (metadata in {})",
                count,
                out.display(),
                export::meta_path(&out).display()
            );
            if per_episode {
                let dir = export::default_episode_dir(&out);
                let (total, files) = export::export_per_episode(&lines, &dir)?;
                println!("Exported {} lines across {} episode files into {}", total, files, dir.display());
            }
            Ok(())
        }
        Commands::Search { keywords, character, season, limit, db } => {
            let store = db::SqliteStore::open(&db.unwrap_or_else(|| settings.db_path.clone()))?;
            let rows = db::search_lines(
                store.conn(),
                keywords.as_deref(),
                character.as_deref(),
                season,
                limit,
            )?;
            if rows.is_empty() {
                println!("No matching dialogue.");
                return Ok(());
            }
            for r in &rows {
                println!(
                    "S{:<2} E{:<3} | {:<28} | {:>14} | {}",
                    r.season,
                    r.episode_number,
                    truncate(&r.episode_title, 28),
                    r.character,
                    r.dialogue
                );
            }
            println!("\n{} lines", rows.len());
            Ok(())
        }
        Commands::Catalog => {
            for (season, name, count) in catalog::season_counts(&episodes) {
                println!("{:>2} | {:<24} | {:>3}", season, name, count);
            }
            println!("\n{} episodes", episodes.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_elapsed(elapsed));
    }

    result
}

fn build_classifier(settings: &Settings, episodes: &[catalog::CatalogEntry]) -> Classifier {
    let vocabulary = Vocabulary::builtin().with_extra(&settings.extra_speakers);
    info!(
        "{} known speakers (vocabulary v{}, patterns v{})",
        vocabulary.len(),
        parser::names::VOCABULARY_VERSION,
        parser::classify::PATTERN_SET_VERSION
    );
    Classifier::new(catalog::titles(episodes), vocabulary)
}

fn format_elapsed(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, _) => format!("{}m {:02}s", m, s),
        _ => format!("{}h {:02}m {:02}s", h, m, s),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 7)), "3h 00m 07s");
    }

    #[test]
    fn long_titles_are_cut() {
        assert_eq!(truncate("Sweet Tooth", 28), "Sweet Tooth");
        assert_eq!(truncate("Are You Smarter Than a Snowball?", 10), "Are You S…");
    }

    #[test]
    fn search_arguments_parse() {
        let cli = Cli::try_parse_from(["transcript_scraper", "search", "-k", "cake", "-s", "2"]).unwrap();
        match cli.command {
            Commands::Search { keywords, character, season, limit, .. } => {
                assert_eq!(keywords.as_deref(), Some("cake"));
                assert_eq!(character, None);
                assert_eq!(season, Some(2));
                assert_eq!(limit, 150);
            }
            _ => panic!("expected search"),
        }
    }
}
