use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::catalog::CatalogEntry;
use crate::db::{DialogueLine, DialogueStore};
use crate::error::FetchError;
use crate::fetch::{self, Fetcher, Transport};
use crate::parser::classify::Classifier;
use crate::parser::extract::ExtractedLine;
use crate::parser::{self, DocumentSource, RawDocument};
use crate::settings::Settings;

/// Pause between episodes: `base` plus uniform jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpisodeDelay {
    pub base: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl EpisodeDelay {
    pub fn from_settings(settings: &Settings) -> Self {
        EpisodeDelay {
            base: Duration::from_millis(settings.episode_delay_ms),
            jitter_min: Duration::from_millis(settings.episode_jitter_min_ms),
            jitter_max: Duration::from_millis(settings.episode_jitter_max_ms),
        }
    }

    fn next(&self) -> Duration {
        self.base + fetch::jitter(self.jitter_min, self.jitter_max)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub limit: Option<usize>,
    /// Process episodes that already have stored lines.
    pub rescrape: bool,
    /// Wipe the store before starting.
    pub clear: bool,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_lines: usize,
    pub failed_titles: Vec<String>,
}

impl RunSummary {
    pub fn print(&self) {
        println!(
            "Processed {} episodes ({} ok, {} failed, {} skipped), {} dialogue lines.",
            self.processed, self.successful, self.failed, self.skipped, self.total_lines,
        );
        if self.successful > 0 {
            println!(
                "Average {:.1} lines per successful episode.",
                self.total_lines as f64 / self.successful as f64
            );
        }
        if !self.failed_titles.is_empty() {
            println!("Failed episodes:");
            for title in self.failed_titles.iter().take(10) {
                println!("  - {}", title);
            }
            if self.failed_titles.len() > 10 {
                println!("  ... and {} more", self.failed_titles.len() - 10);
            }
        }
    }
}

enum EpisodeOutcome {
    Stored(usize),
    FetchFailed(FetchError),
    NoDialogue,
}

/// Walks the catalog one episode at a time: cache or fetch, extract, store.
pub struct Orchestrator<'a, T: Transport, C: LocalCache> {
    pub fetcher: &'a Fetcher<T>,
    /// `None` disables the local cache.
    pub cache: Option<&'a C>,
    pub classifier: &'a Classifier,
    pub wiki_base: &'a str,
    pub delay: EpisodeDelay,
}

impl<T: Transport, C: LocalCache> Orchestrator<'_, T, C> {
    pub async fn run<S: DialogueStore>(
        &self,
        entries: &[CatalogEntry],
        store: &mut S,
        opts: &RunOptions,
    ) -> Result<RunSummary> {
        if opts.clear {
            let removed = store.clear()?;
            info!("Cleared {} stored lines", removed);
        }
        let existing = if opts.rescrape {
            HashSet::new()
        } else {
            store.existing_episode_titles()?
        };
        if !existing.is_empty() {
            info!("Skipping episodes already stored ({} found)", existing.len());
        }

        let entries = &entries[..opts.limit.unwrap_or(entries.len()).min(entries.len())];
        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );

        let mut summary = RunSummary::default();
        for entry in entries {
            if existing.contains(&entry.title) {
                debug!(episode = %entry.title, "already stored, skipping");
                summary.skipped += 1;
                pb.inc(1);
                continue;
            }

            pb.set_message(entry.title.clone());
            summary.processed += 1;
            match self.scrape_episode(entry, store).await? {
                EpisodeOutcome::Stored(n) => {
                    info!("[{}] {}: {} lines", entry.number, entry.title, n);
                    summary.successful += 1;
                    summary.total_lines += n;
                }
                EpisodeOutcome::FetchFailed(e) => {
                    warn!(episode = %entry.title, kind = e.kind(), "Skipped: {}", e);
                    summary.failed += 1;
                    summary.failed_titles.push(entry.title.clone());
                }
                EpisodeOutcome::NoDialogue => {
                    warn!(episode = %entry.title, "No valid dialogue found");
                    summary.failed += 1;
                    summary.failed_titles.push(entry.title.clone());
                }
            }
            pb.inc(1);

            let pause = self.delay.next();
            if !pause.is_zero() {
                debug!("Sleeping {:.1}s", pause.as_secs_f64());
                tokio::time::sleep(pause).await;
            }
        }
        pb.finish_and_clear();

        Ok(summary)
    }

    async fn scrape_episode<S: DialogueStore>(
        &self,
        entry: &CatalogEntry,
        store: &mut S,
    ) -> Result<EpisodeOutcome> {
        let url = fetch::transcript_url(self.wiki_base, &entry.title)?;
        debug!(episode = %entry.title, %url, "scraping");

        let mut extracted = None;
        if let Some(cache) = self.cache {
            match cache.lookup(&entry.title) {
                Ok(Some(page)) => {
                    info!("Using local HTML: {}", page.file_name());
                    extracted = Some(self.extract_lines(&page.markup, DocumentSource::Local, &entry.title));
                }
                Ok(None) => {}
                Err(e) => warn!("{:#}, fetching instead", e),
            }
        }
        let from_cache = extracted.is_some();

        let (mut lines, mut image_url) = match extracted {
            Some(found) => found,
            None => match self.fetch_lines(&url, &entry.title).await {
                Ok(found) => found,
                Err(e) => return Ok(EpisodeOutcome::FetchFailed(e)),
            },
        };

        if lines.is_empty() && from_cache {
            info!("Local HTML produced no dialogue, trying live fetch");
            match self.fetch_lines(&url, &entry.title).await {
                Ok(found) => (lines, image_url) = found,
                Err(e) => return Ok(EpisodeOutcome::FetchFailed(e)),
            }
        }

        if lines.is_empty() {
            return Ok(EpisodeOutcome::NoDialogue);
        }

        for line in &lines {
            store.insert(&DialogueLine {
                episode_title: entry.title.clone(),
                episode_number: entry.number,
                season: entry.season,
                season_name: entry.season_name.clone(),
                character: line.character.clone(),
                dialogue: line.dialogue.clone(),
                transcript_url: url.clone(),
                image_url: image_url.clone(),
            })?;
        }
        Ok(EpisodeOutcome::Stored(lines.len()))
    }

    async fn fetch_lines(
        &self,
        url: &str,
        title: &str,
    ) -> Result<(Vec<ExtractedLine>, Option<String>), FetchError> {
        let outcome = self.fetcher.fetch_with_stats(url).await;
        debug!(
            attempts = outcome.stats.attempts,
            backoff_waits = outcome.stats.backoff_waits,
            render_requests = outcome.stats.render_requests,
            "fetch finished for {}",
            title
        );
        let page = outcome.result?;
        let source = if page.rendered {
            DocumentSource::Rendered
        } else {
            DocumentSource::Fetched
        };
        let markup = String::from_utf8_lossy(&page.body);
        Ok(self.extract_lines(&markup, source, title))
    }

    /// The parsed document lives only inside this call.
    fn extract_lines(
        &self,
        markup: &str,
        source: DocumentSource,
        title: &str,
    ) -> (Vec<ExtractedLine>, Option<String>) {
        let doc = RawDocument::parse(markup, source);
        let image_url = parser::title_card_image(&doc);
        (parser::extract(&doc, title, self.classifier), image_url)
    }
}
