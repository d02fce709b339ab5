//! Cross-snapshot deduction over a directory of narrowed outputs.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::JobError;
use crate::deduce::CrossSnapshotDeducer;
use crate::models::User;
use crate::population::{load_population, write_population};
use crate::progress::ProgressSink;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeduceSummary {
    pub files: usize,
    pub deduced: usize,
}

fn snapshot_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^(\d+)_").expect("Invalid snapshot prefix regex"))
}

/// Snapshot files ordered by the number in front of their name (`12_users.csv`)
pub fn snapshot_sequence(dir: &Path) -> Result<Vec<PathBuf>, JobError> {
    let mut keyed = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let order = snapshot_prefix()
            .captures(&name)
            .and_then(|c| c[1].parse::<u64>().ok())
            .ok_or_else(|| JobError::SnapshotName(name.clone()))?;
        keyed.push((order, name, entry.path()));
    }
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, _, path)| path).collect())
}

fn load(path: &Path) -> Result<Vec<User>, JobError> {
    load_population(path).map_err(|e| JobError::population(path, e))
}

/// Run the deducer over every snapshot in `input_dir`, writing each one to
/// `output_dir` under the same name.
///
/// The following snapshot is always loaded before the current one is
/// processed, since the forward search may cross into it. The last snapshot
/// is processed without lookahead.
pub fn run_deduce_job(
    input_dir: &Path,
    output_dir: &Path,
    progress: &dyn ProgressSink,
) -> Result<DeduceSummary, JobError> {
    let paths = snapshot_sequence(input_dir)?;
    let mut summary = DeduceSummary::default();
    let Some(first) = paths.first() else {
        tracing::warn!(dir = %input_dir.display(), "No snapshots to deduce from");
        return Ok(summary);
    };
    std::fs::create_dir_all(output_dir)?;

    let mut deducer = CrossSnapshotDeducer::new();
    let mut current = load(first)?;

    for (i, path) in paths.iter().enumerate() {
        tracing::info!("Starting with {}", path.display());
        let next = paths.get(i + 1).map(|p| load(p)).transpose()?;

        let deduced = deducer.deduce(&mut current, next.as_deref(), progress);
        let output = output_dir.join(path.file_name().unwrap_or_default());
        write_population(&output, &current).map_err(|e| JobError::population(&output, e))?;

        tracing::info!(file = %path.display(), deduced, "Snapshot written");
        summary.files += 1;
        summary.deduced += deduced;

        match next {
            Some(users) => current = users,
            None => break,
        }
    }

    Ok(summary)
}
