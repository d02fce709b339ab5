//! Bulk listing job: discover users and write a population file.

use std::path::Path;

use super::JobError;
use crate::discovery::UserDirectory;
use crate::population::write_population;

/// Discover every user the directory can list and write them, undated, to `output`
pub async fn run_discover_job(directory: &UserDirectory, output: &Path) -> Result<usize, JobError> {
    let users = directory.discover().await?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_population(output, &users).map_err(|e| JobError::population(output, e))?;
    tracing::info!(users = users.len(), output = %output.display(), "Population written");
    Ok(users.len())
}
