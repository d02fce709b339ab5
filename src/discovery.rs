//! Bulk user listing through the `user_info` API.
//!
//! Ids are requested in batches; batches whose request failed on the
//! network are retried in later rounds until every batch got an answer.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::backoff::Backoff;
use crate::config::Config;
use crate::models::User;
use crate::network::{FetchResult, HttpClient};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid id range {start}..{end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Discovery task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    users: Vec<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user_id: u64,
    username: String,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// First id to request
    pub start_id: u64,
    /// One past the last id to request
    pub end_id: u64,
    pub id_step: u64,
    pub max_connections: usize,
    /// Pause between rounds that retry failed batches
    pub retry_backoff: Backoff,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            start_id: 1,
            end_id: 1 + Config::ID_STEP,
            id_step: Config::ID_STEP,
            max_connections: Config::MAX_CONNECTIONS,
            retry_backoff: Backoff::exponential(1_000, 60_000),
        }
    }
}

pub struct UserDirectory {
    http: HttpClient,
    base_url: String,
    config: DiscoveryConfig,
}

impl UserDirectory {
    pub fn new(http: HttpClient, config: DiscoveryConfig) -> Self {
        Self::with_base_url(http, Config::USER_INFO_URL, config)
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>, config: DiscoveryConfig) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            config,
        }
    }

    /// One request URL per batch of `id_step` consecutive ids
    pub fn batch_urls(&self) -> Vec<String> {
        let step = self.config.id_step.max(1);
        let mut urls = Vec::new();
        let mut start = self.config.start_id;
        while start < self.config.end_id {
            let end = start.saturating_add(step).min(self.config.end_id);
            let ids = (start..end)
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            urls.push(format!("{}?user_ids={}", self.base_url, ids));
            start = end;
        }
        urls
    }

    /// List every user in the configured id range, sorted by id
    #[tracing::instrument(skip(self), fields(start = self.config.start_id, end = self.config.end_id))]
    pub async fn discover(&self) -> Result<Vec<User>, DiscoveryError> {
        if self.config.start_id >= self.config.end_id {
            return Err(DiscoveryError::InvalidRange {
                start: self.config.start_id,
                end: self.config.end_id,
            });
        }

        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        let mut found: BTreeMap<u64, String> = BTreeMap::new();
        let mut urls = self.batch_urls();
        let mut round: u32 = 0;

        while !urls.is_empty() {
            if round > 0 {
                let delay = self.config.retry_backoff.delay(round - 1);
                tracing::warn!(
                    failed = urls.len(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying failed batches"
                );
                tokio::time::sleep(delay).await;
            }

            let mut tasks = JoinSet::new();
            for url in std::mem::take(&mut urls) {
                let http = self.http.clone();
                let permits = Arc::clone(&permits);
                tasks.spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    let result = http.get_text(&url).await;
                    (url, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (url, result) = joined?;
                match result {
                    Ok(response) => collect_users(&url, response, &mut found),
                    Err(e) if e.is_retryable() => {
                        tracing::debug!(url = %url, error = %e, "Batch failed, queued for retry");
                        urls.push(url);
                    }
                    Err(e) => tracing::warn!(url = %url, error = %e, "Batch skipped"),
                }
            }
            round = round.saturating_add(1);
        }

        tracing::info!(users = found.len(), rounds = round, "Discovery finished");
        Ok(found
            .into_iter()
            .map(|(id, username)| User::new(id, username))
            .collect())
    }
}

fn collect_users(url: &str, response: FetchResult, found: &mut BTreeMap<u64, String>) {
    if !response.is_success() {
        tracing::warn!(url, status = response.status_code, "Batch skipped");
        return;
    }

    match serde_json::from_str::<UserInfoResponse>(&response.content) {
        Ok(body) if body.success => {
            for user in body.users {
                found.insert(user.user_id, user.username);
            }
        }
        Ok(_) => tracing::warn!(url, "Batch rejected by the API"),
        Err(e) => tracing::warn!(url, error = %e, "Unreadable batch response"),
    }
}
