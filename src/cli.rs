use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::DEFAULT_CONFIG_NAME;

/// Command-line arguments for config-relay.
///
/// Global options select the configuration file and verbosity; the
/// subcommand chooses what to do with it.
#[derive(Parser, Debug)]
#[clap(
    name = "config-relay",
    about = "Deliver cloud configuration artifacts to policy scanners and sinks"
)]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the relay.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deliver artifacts from a JSON array or JSON-lines file
    Send {
        /// File containing the artifacts
        input: PathBuf,

        /// Transport to use instead of the configured one
        #[clap(short, long)]
        transport: Option<String>,

        /// Send with at most this many artifacts in flight
        #[clap(long)]
        parallel: Option<usize>,

        /// Write a JSON run summary to this path
        #[clap(long)]
        summary: Option<PathBuf>,
    },

    /// Probe a transport's destination
    Health {
        /// Transport to probe instead of the configured one
        #[clap(short, long)]
        transport: Option<String>,
    },

    /// Show the policy and labels each artifact would be scanned with
    Resolve {
        /// File containing the artifacts
        input: PathBuf,
    },

    /// Print the configured policy hierarchy
    Policies,

    /// List registered transport names
    ListTransports,

    /// Create an example configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,
    },
}
