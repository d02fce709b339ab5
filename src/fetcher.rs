use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::config::Config;
use crate::models::User;
use crate::network::{FetchError, HttpClient};
use crate::profile::extract_member_since;
use crate::progress::{NoopProgress, ProgressSink};

/// Resolves the registration date of a single user.
///
/// `Ok(None)` means the profile was read but carries no date. Transient
/// connectivity failures never surface here; implementations wait them out.
#[async_trait]
pub trait DateFetcher: Send + Sync {
    async fn fetch_member_since(&self, username: &str) -> Result<Option<NaiveDate>, FetchError>;
}

/// Raw profile page retrieval, one attempt per call
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, username: &str) -> Result<String, FetchError>;
}

/// Profile pages served over HTTP at `{base_url}{username}`
#[derive(Debug, Clone)]
pub struct ProfilePages {
    http: HttpClient,
    base_url: String,
}

impl ProfilePages {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, Config::PROFILE_URL)
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn profile_url(&self, username: &str) -> String {
        format!("{}{}", self.base_url, username)
    }
}

#[async_trait]
impl ProfileSource for ProfilePages {
    async fn fetch_profile(&self, username: &str) -> Result<String, FetchError> {
        let url = self.profile_url(username);
        Ok(self.http.get_text(&url).await?.content)
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub backoff: Backoff,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::fixed(Duration::from_secs(Config::RETRY_DELAY_SECS)),
        }
    }
}

/// [`DateFetcher`] that scrapes the date off the profile page and retries
/// connectivity failures forever.
///
/// Any other failure on one profile (oversized page, unusable URL) resolves
/// that user with no date. Only a broken client is returned as an error.
pub struct ProfileDateFetcher<S> {
    source: S,
    config: FetcherConfig,
    progress: Arc<dyn ProgressSink>,
}

impl<S: ProfileSource> ProfileDateFetcher<S> {
    pub fn new(source: S, config: FetcherConfig) -> Self {
        Self {
            source,
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }
}

#[async_trait]
impl<S: ProfileSource> DateFetcher for ProfileDateFetcher<S> {
    async fn fetch_member_since(&self, username: &str) -> Result<Option<NaiveDate>, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.source.fetch_profile(username).await {
                Ok(page) => {
                    return extract_member_since(&page)
                        .map_err(|e| FetchError::BodyError(e.to_string()));
                }
                Err(e) if e.is_retryable() => {
                    let delay = self.config.backoff.delay(attempt);
                    self.progress
                        .fetch_stalled(username, attempt, delay, &e.to_string());
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e @ FetchError::Client(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(username, error = %e, "Profile unusable, leaving user undated");
                    return Ok(None);
                }
            }
        }
    }
}

/// Fetch `user`'s date unless a fetch already completed for it.
///
/// Returns whether the fetcher was actually called.
pub async fn ensure_fetched(user: &mut User, fetcher: &dyn DateFetcher) -> Result<bool, FetchError> {
    if user.fetched {
        return Ok(false);
    }
    let member_since = fetcher.fetch_member_since(&user.username).await?;
    user.mark_fetched(member_since);
    Ok(true)
}
