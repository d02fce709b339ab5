pub mod backoff;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod deduce;
pub mod discovery;
pub mod fetcher;
pub mod interpolate;
pub mod logging;
pub mod models;
pub mod narrower;
pub mod network;
pub mod orchestration;
pub mod population;
pub mod profile;
pub mod progress;

// Re-export main types for library usage
pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use deduce::{search_next_user, CrossSnapshotDeducer};
pub use discovery::{DiscoveryConfig, UserDirectory};
pub use fetcher::{DateFetcher, FetcherConfig, ProfileDateFetcher, ProfilePages};
pub use interpolate::interpolate;
pub use models::User;
pub use narrower::{NarrowError, NarrowerConfig, NarrowingReport, NarrowingState, RangeNarrower};
pub use network::{FetchError, FetchResult, HttpClient};
pub use profile::extract_member_since;
pub use progress::{NoopProgress, PassReport, ProgressSink, TracingProgress};
