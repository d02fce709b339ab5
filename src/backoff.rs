use rand::Rng;
use std::time::Duration;

/// Delay policy between retries of a stalled request.
///
/// `Backoff::fixed` waits the same amount after every failure, which is what the
/// profile fetcher uses: the platform starts refusing connections when it is hit
/// too often and only a long pause clears that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl Backoff {
    pub const fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            base_ms: ms,
            max_ms: ms,
            jitter_percent: 0,
        }
    }

    pub const fn exponential(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_percent: 10,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let grown = if self.base_ms == self.max_ms {
            self.base_ms
        } else {
            self.base_ms
                .saturating_mul(2u64.saturating_pow(attempt.min(20)))
        };
        let capped = grown.min(self.max_ms);
        let jitter = if self.jitter_percent > 0 {
            rand::thread_rng().gen_range(0..capped * self.jitter_percent / 100 + 1)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}
