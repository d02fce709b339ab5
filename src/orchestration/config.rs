//! Config building from command line values.

use std::time::Duration;

use crate::backoff::Backoff;
use crate::fetcher::FetcherConfig;
use crate::narrower::NarrowerConfig;

/// clap value parser: chunk sizes must be powers of two
pub fn parse_chunk_size(raw: &str) -> Result<usize, String> {
    let size: usize = raw
        .parse()
        .map_err(|e| format!("invalid chunk size {:?}: {}", raw, e))?;
    if !size.is_power_of_two() {
        return Err(format!("chunk size must be a power of two, got {}", size));
    }
    Ok(size)
}

pub fn build_narrower_config(checkpoint_every: usize) -> NarrowerConfig {
    NarrowerConfig { checkpoint_every }
}

pub fn build_fetcher_config(retry_delay_secs: u64) -> FetcherConfig {
    FetcherConfig {
        backoff: Backoff::fixed(Duration::from_secs(retry_delay_secs)),
    }
}
