use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::FetchError;
use crate::settings::Settings;

/// Query suffix asking the wiki for the bare rendered article.
pub const RENDER_SUFFIX: &str = "?action=render";

/// Bytes left literal in a page title; everything else is percent-encoded.
const TITLE_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'~')
    .remove(b':')
    .remove(b'!')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',');

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// GET capability used by the fetcher. Errors are transport-level only;
/// HTTP error statuses come back as responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// reqwest client posing as a desktop browser; the wiki serves stub pages
/// to obvious bots.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpTransport { client })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.user_agent, Duration::from_secs(settings.timeout_secs))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Retry budget, size thresholds and backoff shape.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Total attempts, first one included.
    pub max_retries: u32,
    /// A 200 below this is treated as a stub page.
    pub min_body_bytes: usize,
    /// A render-mode response must reach this to be accepted.
    pub min_render_bytes: usize,
    /// Wait before attempt `n` is `(n + 1) * backoff_step` plus jitter.
    pub backoff_step: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            max_retries: 5,
            min_body_bytes: 4000,
            min_render_bytes: 2000,
            backoff_step: Duration::from_secs(5),
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(3),
        }
    }
}

impl FetchPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        FetchPolicy {
            max_retries: settings.max_retries,
            min_body_bytes: settings.min_body_bytes,
            min_render_bytes: settings.min_render_bytes,
            backoff_step: Duration::from_millis(settings.backoff_step_ms),
            jitter_min: Duration::from_millis(settings.retry_jitter_min_ms),
            jitter_max: Duration::from_millis(settings.retry_jitter_max_ms),
        }
    }

    /// Delay before attempt index `attempt` (1-based retries).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1) + jitter(self.jitter_min, self.jitter_max)
    }
}

/// Uniform random duration in `[min, max]`; `min` when the range is empty.
pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: Vec<u8>,
    /// Body came from the render-mode fallback.
    pub rendered: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub attempts: u32,
    pub backoff_waits: u32,
    pub render_requests: u32,
}

pub struct FetchOutcome {
    pub result: Result<FetchedPage, FetchError>,
    pub stats: FetchStats,
}

#[derive(Debug)]
enum FetchState {
    Attempting(u32),
    Backoff(u32),
    RenderFallback { attempt: u32, small_len: usize },
    Success(FetchedPage),
    Failed(FetchError),
}

/// Per-page retry state machine over a [`Transport`].
pub struct Fetcher<T: Transport> {
    transport: T,
    policy: FetchPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, policy: FetchPolicy) -> Self {
        Fetcher { transport, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_with_stats(url).await.result
    }

    pub async fn fetch_with_stats(&self, url: &str) -> FetchOutcome {
        let start = Instant::now();
        let mut stats = FetchStats::default();
        let mut state = if self.policy.max_retries == 0 {
            FetchState::Failed(FetchError::RetriesExhausted)
        } else {
            FetchState::Attempting(0)
        };

        loop {
            state = match state {
                FetchState::Attempting(attempt) => {
                    stats.attempts += 1;
                    self.attempt(url, attempt).await
                }
                FetchState::RenderFallback { attempt, small_len } => {
                    stats.render_requests += 1;
                    self.render_fallback(url, attempt, small_len).await
                }
                FetchState::Backoff(attempt) => {
                    let delay = self.policy.backoff_delay(attempt);
                    info!("Waiting {:.1}s before retry {} for {}", delay.as_secs_f64(), attempt + 1, url);
                    tokio::time::sleep(delay).await;
                    stats.backoff_waits += 1;
                    FetchState::Attempting(attempt)
                }
                FetchState::Success(page) => {
                    debug!(
                        url,
                        bytes = page.body.len(),
                        rendered = page.rendered,
                        attempts = stats.attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "fetched"
                    );
                    return FetchOutcome { result: Ok(page), stats };
                }
                FetchState::Failed(err) => {
                    return FetchOutcome { result: Err(err), stats };
                }
            };
        }
    }

    async fn attempt(&self, url: &str, attempt: u32) -> FetchState {
        let response = match self.transport.get(url).await {
            Ok(r) => r,
            Err(e) => return self.retry_or_fail(attempt, FetchError::Transport(format!("{:#}", e))),
        };

        let len = response.body.len();
        match response.status {
            404 => FetchState::Failed(FetchError::NotFound),
            status @ (429 | 503) => {
                warn!("HTTP {} for {}, will retry after backoff", status, url);
                self.retry_or_fail(attempt, FetchError::RateLimited(status))
            }
            200 if len < self.policy.min_body_bytes => FetchState::RenderFallback {
                attempt,
                small_len: len,
            },
            200 => FetchState::Success(FetchedPage {
                body: response.body,
                rendered: false,
            }),
            status => {
                warn!("HTTP {} for {}, retrying", status, url);
                self.retry_or_fail(attempt, FetchError::Status(status))
            }
        }
    }

    async fn render_fallback(&self, url: &str, attempt: u32, small_len: usize) -> FetchState {
        let render_url = format!("{}{}", url, RENDER_SUFFIX);
        match self.transport.get(&render_url).await {
            Ok(r) if r.status == 200 && r.body.len() >= self.policy.min_render_bytes => {
                info!("Used action=render fallback (len={})", r.body.len());
                return FetchState::Success(FetchedPage {
                    body: r.body,
                    rendered: true,
                });
            }
            Ok(r) => debug!(status = r.status, bytes = r.body.len(), "render fallback rejected"),
            Err(e) => debug!("render request error: {:#}", e),
        }
        warn!("Response too small ({} bytes) for {}", small_len, url);
        self.retry_or_fail(attempt, FetchError::TooSmall(small_len))
    }

    fn retry_or_fail(&self, attempt: u32, err: FetchError) -> FetchState {
        if attempt + 1 >= self.policy.max_retries {
            FetchState::Failed(err)
        } else {
            FetchState::Backoff(attempt + 1)
        }
    }
}

/// `{base}/{Title_With_Underscores}/Transcript`. Only alphanumerics and
/// `_-.~:!'(),` stay literal in the title; `/` is encoded too.
pub fn transcript_url(base: &str, title: &str) -> Result<String> {
    let url = Url::parse(base).with_context(|| format!("Invalid wiki base URL {:?}", base))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("Wiki base URL {:?} cannot take path segments", base));
    }
    let title = title.replace(' ', "_");
    Ok(format!(
        "{}/{}/Transcript",
        url.as_str().trim_end_matches('/'),
        utf8_percent_encode(&title, TITLE_SAFE)
    ))
}


// ── Tests ──
