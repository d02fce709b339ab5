//! Observability hooks for the inference passes.
//!
//! Components take a `&dyn ProgressSink` instead of logging on their own, so
//! tests can run them silently or record what they report. The binary wires in
//! [`TracingProgress`].

use chrono::NaiveDate;
use std::time::Duration;

/// Summary of one full narrowing pass over the undated set
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    /// Chunk size used during the pass
    pub chunk_size: usize,
    /// Users still undated after the pass
    pub remaining: usize,
    /// Chunks whose endpoints agreed and were collapsed
    pub chunks_collapsed: usize,
    /// Share of the whole population no longer undated, in percent
    pub percent_complete: f64,
}

pub trait ProgressSink: Send + Sync {
    fn pass_completed(&self, _report: &PassReport) {}

    fn chunk_collapsed(&self, _first_id: u64, _last_id: u64, _len: usize) {}

    fn checkpoint_saved(&self, _chunk_size: usize, _undated: usize) {}

    fn date_deduced(&self, _user_id: u64, _date: NaiveDate) {}

    fn fetch_stalled(&self, _username: &str, _attempt: u32, _delay: Duration, _reason: &str) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

/// Forwards progress to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn pass_completed(&self, report: &PassReport) {
        tracing::info!(
            chunk_size = report.chunk_size,
            remaining = report.remaining,
            chunks_collapsed = report.chunks_collapsed,
            "Pass finished"
        );
        tracing::info!(
            "{:.2}% completed, {} users remaining",
            report.percent_complete,
            report.remaining
        );
    }

    fn chunk_collapsed(&self, first_id: u64, last_id: u64, len: usize) {
        tracing::debug!("{} removed, from {} to {}", len, first_id, last_id);
    }

    fn checkpoint_saved(&self, chunk_size: usize, undated: usize) {
        tracing::info!(chunk_size, undated, "Saving data");
    }

    fn date_deduced(&self, user_id: u64, date: NaiveDate) {
        tracing::debug!("Setting {} for user {}", date, user_id);
    }

    fn fetch_stalled(&self, username: &str, attempt: u32, delay: Duration, reason: &str) {
        tracing::warn!(
            username,
            attempt,
            delay_secs = delay.as_secs(),
            reason,
            "Fetch failed, going to sleep"
        );
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every report so tests can assert on them
    #[derive(Debug, Default)]
    pub struct RecordingProgress {
        pub passes: Mutex<Vec<PassReport>>,
        pub collapsed: Mutex<Vec<(u64, u64, usize)>>,
        pub deduced: Mutex<Vec<(u64, NaiveDate)>>,
        pub stalls: Mutex<Vec<u32>>,
        pub checkpoints: Mutex<usize>,
    }

    impl ProgressSink for RecordingProgress {
        fn pass_completed(&self, report: &PassReport) {
            self.passes.lock().unwrap().push(report.clone());
        }

        fn chunk_collapsed(&self, first_id: u64, last_id: u64, len: usize) {
            self.collapsed.lock().unwrap().push((first_id, last_id, len));
        }

        fn checkpoint_saved(&self, _chunk_size: usize, _undated: usize) {
            *self.checkpoints.lock().unwrap() += 1;
        }

        fn date_deduced(&self, user_id: u64, date: NaiveDate) {
            self.deduced.lock().unwrap().push((user_id, date));
        }

        fn fetch_stalled(&self, _username: &str, attempt: u32, _delay: Duration, _reason: &str) {
            self.stalls.lock().unwrap().push(attempt);
        }
    }
}
