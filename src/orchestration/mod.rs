//! Job drivers wiring the passes to the filesystem and the network.

pub mod config;
pub mod deduce;
pub mod discover;
pub mod narrow;

pub use config::{build_fetcher_config, build_narrower_config, parse_chunk_size};
pub use deduce::{run_deduce_job, snapshot_sequence, DeduceSummary};
pub use discover::run_discover_job;
pub use narrow::{pending_inputs, run_narrow_job, NarrowJob, NarrowSummary};

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::discovery::DiscoveryError;
use crate::narrower::NarrowError;
use crate::population::PopulationError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Population file {path}: {source}")]
    Population {
        path: String,
        #[source]
        source: PopulationError,
    },

    #[error(transparent)]
    Narrow(#[from] NarrowError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Snapshot file name {0:?} has no numeric prefix like 12_")]
    SnapshotName(String),
}

impl JobError {
    pub(crate) fn population(path: &std::path::Path, source: PopulationError) -> Self {
        JobError::Population {
            path: path.display().to_string(),
            source,
        }
    }
}
