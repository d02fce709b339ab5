use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::User;
use crate::narrower::NarrowingState;

/// Bumped whenever the checkpoint layout changes incompatibly
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Checkpoint lists undated user {0} that is not part of the population")]
    UnknownUser(u64),
}

/// In-progress narrowing state written periodically so a run can resume.
///
/// The undated subset is stored by user id; on restore it is resolved back
/// against `users`, which carry the dates and `fetched` flags gathered so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Input file the state belongs to
    pub source: String,
    pub chunk_size: usize,
    pub users: Vec<User>,
    pub undated_ids: Vec<u64>,
}

impl Checkpoint {
    pub fn capture(source: &str, state: &NarrowingState) -> Self {
        Self::from_parts(source, state.chunk_size, &state.users, &state.undated)
    }

    pub(crate) fn from_parts(
        source: &str,
        chunk_size: usize,
        users: &[User],
        undated: &[usize],
    ) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            source: source.to_string(),
            chunk_size,
            users: users.to_vec(),
            undated_ids: undated.iter().map(|&i| users[i].id).collect(),
        }
    }

    pub fn restore(self) -> Result<NarrowingState, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                expected: CHECKPOINT_VERSION,
            });
        }

        let mut users = self.users;
        users.sort_by_key(|u| u.id);

        let undated = self
            .undated_ids
            .iter()
            .map(|&id| {
                users
                    .binary_search_by_key(&id, |u| u.id)
                    .map_err(|_| CheckpointError::UnknownUser(id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NarrowingState {
            chunk_size: self.chunk_size,
            users,
            undated,
        })
    }
}

/// Durable home of the single live checkpoint
pub trait CheckpointStore: Send {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Replace the stored checkpoint
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Drop the stored checkpoint once a pass completes
    fn clear(&mut self) -> Result<(), CheckpointError>;
}

/// JSON checkpoint in one file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(Some(checkpoint))
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let mut writer = std::io::BufWriter::new(fs::File::create(&temp_path)?);
            serde_json::to_writer(&mut writer, checkpoint)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the checkpoint in memory; handy for tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpointStore {
    slot: Option<Checkpoint>,
    saves: usize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.slot.clone())
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.slot = Some(checkpoint.clone());
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CheckpointError> {
        self.slot = None;
        Ok(())
    }
}
