use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::orchestration::parse_chunk_size;

/// Command line interface for the member-since inference jobs.
/// Exit codes: 0=success, 2=invalid arguments, 3=input or state error, 4=network error, 130=interrupted
#[derive(Parser, Debug)]
#[command(name = "kong-member-since")]
#[command(about = "Infer member-since dates for a user population with as few profile fetches as possible")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "./logs",
        help = "Directory for rotated log files"
    )]
    pub log_dir: String,

    #[arg(
        long,
        global = true,
        default_value = "info",
        env = "KONG_LOG_LEVEL",
        help = "Log level used when RUST_LOG is not set"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and infer dates for every population file not yet in the output directory.
    Narrow {
        #[arg(short, long, help = "Directory of id,username population files")]
        input_dir: String,

        #[arg(short, long, help = "Directory receiving the dated population files")]
        output_dir: String,

        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory holding the resumable checkpoint"
        )]
        data_dir: String,

        #[arg(
            short,
            long,
            default_value_t = Config::INITIAL_CHUNK_SIZE,
            value_parser = parse_chunk_size,
            help = "Starting chunk size, a power of two"
        )]
        chunk_size: usize,

        #[arg(
            long,
            default_value_t = Config::CHUNKS_PER_CHECKPOINT,
            help = "Save a checkpoint after this many chunks (0 disables checkpoints)"
        )]
        checkpoint_every: usize,

        #[arg(
            long,
            default_value_t = Config::RETRY_DELAY_SECS,
            help = "Seconds to wait before retrying a refused or failed connection"
        )]
        retry_delay: u64,

        #[arg(
            short,
            long,
            default_value_t = Config::REQUEST_TIMEOUT_SECS,
            help = "Request timeout in seconds"
        )]
        timeout: u64,

        #[arg(
            short,
            long,
            default_value = Config::USER_AGENT,
            help = "User agent string for requests"
        )]
        user_agent: String,
    },

    /// Propagate dates across a numbered sequence of narrowed snapshots.
    Deduce {
        #[arg(short, long, help = "Directory of NN_name.csv snapshots")]
        input_dir: String,

        #[arg(short, long, help = "Directory receiving the completed snapshots")]
        output_dir: String,
    },

    /// List users by id through the user_info API into a population file.
    Discover {
        #[arg(short, long, help = "Population file to write")]
        output: String,

        #[arg(long, help = "First user id to request")]
        start_id: u64,

        #[arg(long, help = "One past the last user id to request")]
        end_id: u64,

        #[arg(
            long,
            default_value_t = Config::MAX_CONNECTIONS,
            help = "Concurrent requests"
        )]
        max_connections: usize,

        #[arg(
            short,
            long,
            default_value_t = Config::DISCOVERY_TIMEOUT_SECS,
            help = "Request timeout in seconds"
        )]
        timeout: u64,

        #[arg(
            short,
            long,
            default_value = Config::USER_AGENT,
            help = "User agent string for requests"
        )]
        user_agent: String,
    },
}

impl Cli {
    /// Parse CLI arguments; on error clap prints help and exits with code 2.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
