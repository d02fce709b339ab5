//! Narrowing job over a directory of population files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::JobError;
use crate::checkpoint::CheckpointStore;
use crate::interpolate::interpolate;
use crate::narrower::{NarrowingState, RangeNarrower};
use crate::population::{load_population, write_population};
use crate::progress::ProgressSink;

/// Inputs of one narrowing job
pub struct NarrowJob<'a> {
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub chunk_size: usize,
    pub narrower: &'a RangeNarrower,
    pub progress: &'a dyn ProgressSink,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowSummary {
    pub files: usize,
    pub fetches: usize,
    pub interpolated: usize,
    pub undated: usize,
}

/// Input files, sorted by name, that have no counterpart in `output_dir` yet
pub fn pending_inputs(input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, JobError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if output_dir.join(entry.file_name()).exists() {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Move the input a checkpoint was saved for to the front, so it is finished
/// before any other file overwrites the checkpoint.
fn resume_first(paths: &mut [PathBuf], source: &str) {
    if let Some(pos) = paths
        .iter()
        .position(|p| p.file_name().is_some_and(|name| name.to_string_lossy() == source))
    {
        paths[..=pos].rotate_right(1);
    }
}

/// Narrow, interpolate and write every pending input file.
///
/// The file named by a stored checkpoint goes first and resumes from it; the
/// checkpoint is cleared once that file's output is written.
pub async fn run_narrow_job(
    job: NarrowJob<'_>,
    store: &mut dyn CheckpointStore,
) -> Result<NarrowSummary, JobError> {
    std::fs::create_dir_all(job.output_dir)?;
    let mut summary = NarrowSummary::default();

    let mut paths = pending_inputs(job.input_dir, job.output_dir)?;
    if let Some(checkpoint) = store.load()? {
        resume_first(&mut paths, &checkpoint.source);
    }

    for path in paths {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!("Starting with {}", path.display());
        let started = Instant::now();

        let mut state = match store.load()? {
            Some(checkpoint) if checkpoint.source == source => {
                let state = checkpoint.restore()?;
                let next = state
                    .undated_users()
                    .next()
                    .map(|user| user.to_string())
                    .unwrap_or_default();
                tracing::info!(
                    chunk_size = state.chunk_size,
                    users = state.users.len(),
                    undated = state.undated.len(),
                    next = %next,
                    "Resuming from checkpoint"
                );
                state
            }
            other => {
                if let Some(stale) = other {
                    tracing::warn!(
                        checkpoint_source = %stale.source,
                        "Checkpoint belongs to another file, starting over"
                    );
                }
                let users = load_population(&path).map_err(|e| JobError::population(&path, e))?;
                NarrowingState::fresh(users, job.chunk_size)
            }
        };

        let report = job.narrower.run(&source, &mut state, store).await?;

        let mut users = state.into_users();
        let interpolated = interpolate(&mut users, job.progress);
        let undated = users.iter().filter(|u| !u.has_member_since()).count();

        let output = job.output_dir.join(&source);
        write_population(&output, &users).map_err(|e| JobError::population(&output, e))?;
        store.clear()?;

        tracing::info!(
            file = %source,
            fetches = report.fetches,
            interpolated,
            undated,
            elapsed_secs = started.elapsed().as_secs(),
            "Time elapsed for {}",
            source
        );

        summary.files += 1;
        summary.fetches += report.fetches;
        summary.interpolated += interpolated;
        summary.undated += undated;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pending_inputs_skip_finished_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(input.path().join("b.csv"), "").unwrap();
        std::fs::write(input.path().join("a.csv"), "").unwrap();
        std::fs::write(input.path().join("c.csv"), "").unwrap();
        std::fs::create_dir(input.path().join("nested")).unwrap();
        std::fs::write(output.path().join("b.csv"), "").unwrap();

        let pending = pending_inputs(input.path(), output.path()).unwrap();
        let names: Vec<_> = pending
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "c.csv"]);
    }

    #[test]
    fn test_resume_first_moves_checkpointed_input_ahead() {
        let mut paths: Vec<PathBuf> = ["a.csv", "b.csv", "c.csv", "d.csv"]
            .iter()
            .map(|name| Path::new("in").join(name))
            .collect();

        resume_first(&mut paths, "c.csv");
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c.csv", "a.csv", "b.csv", "d.csv"]);

        resume_first(&mut paths, "gone.csv");
        assert_eq!(paths[0], Path::new("in").join("c.csv"));
    }
}
