//! Command-line surface of `verdant-node`, built with `clap` derive.
//! Three subcommands: `run`, `status`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use verdant_ledger::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// VERDANT provenance node.
///
/// Runs the herb provenance service: accepts harvest submissions, seals
/// each one into an in-memory tamper-evident chain, serves verification
/// lookups for label hashes, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "verdant-node",
    about = "VERDANT herb provenance node",
    version,
    propagate_version = true
)]
pub struct VerdantNodeCli {
    /// Which mode to start in.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VERDANT node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the provenance node.
    Run(RunArgs),
    /// Query the status of a running node via its HTTP API.
    Status(StatusArgs),
    /// Print build versions and exit.
    Version,
}

/// Flags accepted by `run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where the record mirror is stored.
    ///
    /// Created on first run if it does not exist. Note that only the
    /// record mirror persists here; the chain itself restarts from a
    /// fresh genesis with the process.
    #[arg(long, short = 'd', env = "VERDANT_DATA_DIR", default_value = "./verdant-data")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "VERDANT_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port the Prometheus exposition listens on.
    #[arg(long, env = "VERDANT_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Public base URL of this node, as reachable by QR scanners.
    ///
    /// Embedded in generated QR codes as the verification link, so in any
    /// real deployment this must be the externally visible address, not
    /// localhost.
    #[arg(
        long,
        env = "VERDANT_PUBLIC_URL",
        default_value = "http://127.0.0.1:8373"
    )]
    pub public_url: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VERDANT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Flags accepted by `status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// HTTP API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:8373")]
    pub api_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn clap_definition_is_well_formed() {
        // debug_assert panics on conflicting flags or broken derives.
        VerdantNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_the_ledger_constants() {
        let cli = VerdantNodeCli::parse_from(["verdant-node", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.api_port, DEFAULT_API_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert!(args.public_url.ends_with(&DEFAULT_API_PORT.to_string()));
            }
            other => panic!("expected run subcommand, got {other:?}"),
        }
    }
}
