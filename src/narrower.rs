//! Chunked range narrowing.
//!
//! Dates never decrease with user id, so when the first and last user of a
//! contiguous run share a date, every user in between has it too. Each pass
//! splits the undated users into chunks, fetches only the two endpoints of each
//! chunk and either fills the whole chunk or hands it to the next, finer pass.

use std::sync::Arc;
use thiserror::Error;

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::config::Config;
use crate::fetcher::{ensure_fetched, DateFetcher};
use crate::models::User;
use crate::network::FetchError;
use crate::progress::{NoopProgress, PassReport, ProgressSink};

#[derive(Error, Debug)]
pub enum NarrowError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Population plus the working set of the narrowing passes
#[derive(Debug, Clone, PartialEq)]
pub struct NarrowingState {
    /// Chunk size of the next pass
    pub chunk_size: usize,
    /// Whole population, sorted by id
    pub users: Vec<User>,
    /// Indices into `users` still waiting for a collapse, in id order
    pub undated: Vec<usize>,
}

impl NarrowingState {
    /// Start from a freshly loaded population; users already dated are left alone
    pub fn fresh(mut users: Vec<User>, chunk_size: usize) -> Self {
        users.sort_by_key(|u| u.id);
        let undated = users
            .iter()
            .enumerate()
            .filter(|(_, u)| !u.has_member_since())
            .map(|(i, _)| i)
            .collect();

        Self {
            chunk_size,
            users,
            undated,
        }
    }

    pub fn undated_users(&self) -> impl Iterator<Item = &User> {
        self.undated.iter().map(move |&i| &self.users[i])
    }

    /// No pass left to run
    pub fn is_finished(&self) -> bool {
        self.undated.is_empty() || self.chunk_size <= 1
    }

    pub fn into_users(self) -> Vec<User> {
        self.users
    }
}

#[derive(Debug, Clone)]
pub struct NarrowerConfig {
    /// Save a checkpoint after this many chunks; 0 disables checkpointing
    pub checkpoint_every: usize,
}

impl Default for NarrowerConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: Config::CHUNKS_PER_CHECKPOINT,
        }
    }
}

/// Totals for one `RangeNarrower::run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowingReport {
    pub passes: usize,
    pub fetches: usize,
    pub collapsed_users: usize,
    pub remaining: usize,
}

pub struct RangeNarrower {
    fetcher: Arc<dyn DateFetcher>,
    progress: Arc<dyn ProgressSink>,
    config: NarrowerConfig,
}

impl RangeNarrower {
    pub fn new(fetcher: Arc<dyn DateFetcher>, config: NarrowerConfig) -> Self {
        Self {
            fetcher,
            progress: Arc::new(NoopProgress),
            config,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Run passes until the undated set is empty or chunks are down to one user.
    ///
    /// Checkpoints go to `store` under the name `source`. A checkpoint saved
    /// mid-pass lists the chunks carried so far followed by the chunks not yet
    /// visited; both are whole chunks, so re-chunking on resume reproduces the
    /// same boundaries and already fetched endpoints are not fetched again.
    ///
    /// On error `state` still holds every undated user and can be resumed.
    pub async fn run(
        &self,
        source: &str,
        state: &mut NarrowingState,
        store: &mut dyn CheckpointStore,
    ) -> Result<NarrowingReport, NarrowError> {
        let total = state.users.len();
        let mut report = NarrowingReport::default();
        let mut steps = 0usize;

        while !state.is_finished() {
            let chunk_size = state.chunk_size;
            let pending = std::mem::take(&mut state.undated);
            let mut carried = Vec::with_capacity(pending.len());
            let mut chunks_collapsed = 0usize;

            for (n, chunk) in pending.chunks(chunk_size).enumerate() {
                let collapsed = match self.narrow_chunk(&mut state.users, chunk, &mut report).await {
                    Ok(collapsed) => collapsed,
                    Err(e) => {
                        carried.extend_from_slice(&pending[n * chunk_size..]);
                        state.undated = carried;
                        return Err(e);
                    }
                };

                if collapsed {
                    chunks_collapsed += 1;
                    report.collapsed_users += chunk.len();
                } else {
                    carried.extend_from_slice(chunk);
                }

                steps += 1;
                if self.config.checkpoint_every > 0 && steps % self.config.checkpoint_every == 0 {
                    let visited = ((n + 1) * chunk_size).min(pending.len());
                    let mut undated = carried.clone();
                    undated.extend_from_slice(&pending[visited..]);

                    let checkpoint = Checkpoint::from_parts(source, chunk_size, &state.users, &undated);
                    if let Err(e) = store.save(&checkpoint) {
                        state.undated = undated;
                        return Err(e.into());
                    }
                    self.progress.checkpoint_saved(chunk_size, undated.len());
                }
            }

            state.undated = carried;
            state.chunk_size >>= 1;
            report.passes += 1;

            let remaining = state.undated.len();
            self.progress.pass_completed(&PassReport {
                chunk_size,
                remaining,
                chunks_collapsed,
                percent_complete: percent_complete(remaining, total),
            });
        }

        report.remaining = state.undated.len();
        Ok(report)
    }

    /// Fetch both endpoints and fill the chunk when they agree
    async fn narrow_chunk(
        &self,
        users: &mut [User],
        chunk: &[usize],
        report: &mut NarrowingReport,
    ) -> Result<bool, NarrowError> {
        let (Some(&first), Some(&last)) = (chunk.first(), chunk.last()) else {
            return Ok(false);
        };

        if ensure_fetched(&mut users[first], self.fetcher.as_ref()).await? {
            report.fetches += 1;
        }
        if ensure_fetched(&mut users[last], self.fetcher.as_ref()).await? {
            report.fetches += 1;
        }

        match (users[first].member_since, users[last].member_since) {
            (Some(first_date), Some(last_date)) if first_date == last_date => {
                for &i in chunk {
                    users[i].member_since = Some(first_date);
                }
                self.progress
                    .chunk_collapsed(users[first].id, users[last].id, chunk.len());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn percent_complete(remaining: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (1.0 - remaining as f64 / total as f64) * 100.0
}
