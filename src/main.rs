use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use kong_member_since::cli::{Cli, Commands};
use kong_member_since::config::Config;
use kong_member_since::discovery::{DiscoveryConfig, UserDirectory};
use kong_member_since::fetcher::{ProfileDateFetcher, ProfilePages};
use kong_member_since::logging::{init_logging, LoggingError};
use kong_member_since::narrower::RangeNarrower;
use kong_member_since::network::{FetchError, HttpClient};
use kong_member_since::orchestration::{
    build_fetcher_config, build_narrower_config, run_deduce_job, run_discover_job, run_narrow_job,
    JobError, NarrowJob,
};
use kong_member_since::progress::{ProgressSink, TracingProgress};
use kong_member_since::{FileCheckpointStore, NarrowError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("HTTP client error: {0}")]
    Http(#[from] FetchError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Interrupted; rerun the same command to resume from {0}")]
    Interrupted(String),
}

impl MainError {
    /// 3 for bad input or state, 4 when the network gave up on us, 130 on Ctrl+C
    fn exit_code(&self) -> u8 {
        match self {
            MainError::Interrupted(_) => 130,
            MainError::Http(_) => 4,
            MainError::Job(JobError::Narrow(NarrowError::Fetch(_))) => 4,
            MainError::Job(JobError::Discovery(_)) => 4,
            MainError::Logging(_) | MainError::Job(_) => 3,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn narrow(
    input_dir: &str,
    output_dir: &str,
    data_dir: &str,
    chunk_size: usize,
    checkpoint_every: usize,
    retry_delay: u64,
    timeout: u64,
    user_agent: String,
) -> Result<(), MainError> {
    let progress: Arc<dyn ProgressSink> = Arc::new(TracingProgress);

    let http = HttpClient::new(user_agent, timeout)?;
    let fetcher = ProfileDateFetcher::new(ProfilePages::new(http), build_fetcher_config(retry_delay))
        .with_progress(Arc::clone(&progress));
    let narrower = RangeNarrower::new(Arc::new(fetcher), build_narrower_config(checkpoint_every))
        .with_progress(Arc::clone(&progress));

    std::fs::create_dir_all(data_dir).map_err(JobError::from)?;
    let checkpoint_path = Path::new(data_dir).join(Config::CHECKPOINT_FILE);
    let mut store = FileCheckpointStore::new(&checkpoint_path);

    let job = NarrowJob {
        input_dir: Path::new(input_dir),
        output_dir: Path::new(output_dir),
        chunk_size,
        narrower: &narrower,
        progress: progress.as_ref(),
    };

    tokio::select! {
        result = run_narrow_job(job, &mut store) => {
            let summary = result?;
            tracing::info!(
                files = summary.files,
                fetches = summary.fetches,
                interpolated = summary.interpolated,
                undated = summary.undated,
                "Narrowing finished"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            return Err(MainError::Interrupted(checkpoint_path.display().to_string()));
        }
    }

    Ok(())
}

async fn discover(
    output: &str,
    start_id: u64,
    end_id: u64,
    max_connections: usize,
    timeout: u64,
    user_agent: String,
) -> Result<(), MainError> {
    let http = HttpClient::new(user_agent, timeout)?;
    let config = DiscoveryConfig {
        start_id,
        end_id,
        max_connections,
        ..DiscoveryConfig::default()
    };
    let directory = UserDirectory::new(http, config);
    let count = run_discover_job(&directory, Path::new(output)).await?;
    println!("Discovered {} users into {}", count, output);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), MainError> {
    match cli.command {
        Commands::Narrow {
            input_dir,
            output_dir,
            data_dir,
            chunk_size,
            checkpoint_every,
            retry_delay,
            timeout,
            user_agent,
        } => {
            narrow(
                &input_dir,
                &output_dir,
                &data_dir,
                chunk_size,
                checkpoint_every,
                retry_delay,
                timeout,
                user_agent,
            )
            .await
        }
        Commands::Deduce {
            input_dir,
            output_dir,
        } => {
            let summary = run_deduce_job(Path::new(&input_dir), Path::new(&output_dir), &TracingProgress)?;
            println!("Deduced {} dates across {} snapshots", summary.deduced, summary.files);
            Ok(())
        }
        Commands::Discover {
            output,
            start_id,
            end_id,
            max_connections,
            timeout,
            user_agent,
        } => discover(&output, start_id, end_id, max_connections, timeout, user_agent).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let _guard = match init_logging(&cli.log_dir, &cli.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(MainError::from(e).exit_code());
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
