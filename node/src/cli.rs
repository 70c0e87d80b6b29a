//! # CLI Interface
//!
//! Defines the command-line argument structure for `vaultbank-node` using
//! `clap` derive. Three subcommands: `init`, `run` and `version`. Every
//! flag can also come from a `VAULTBANK_*` environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vaultbank_protocol::config::{PausePolicy, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};
use vaultbank_protocol::Address;

use crate::logging::LogFormat;

/// VaultBank custodial ledger node.
///
/// Hosts one bank deployment over on-disk storage, serves its entry points
/// as a JSON API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "vaultbank-node",
    about = "VaultBank custodial ledger node",
    version,
    propagate_version = true
)]
pub struct VaultBankCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create bank storage in the data directory and deploy the bank at
    /// logic V1.
    Init(InitArgs),
    /// Attach to existing bank storage and serve the API.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory holding the sled database.
    #[arg(long, short = 'd', env = "VAULTBANK_DATA_DIR", default_value = "./vaultbank-data")]
    pub data_dir: PathBuf,

    /// Hex address of the owner.
    ///
    /// When omitted, a fresh owner keypair is generated and its secret key
    /// written to `owner.key` in the data directory.
    #[arg(long, env = "VAULTBANK_OWNER")]
    pub owner: Option<Address>,

    /// Hex address of the admin.
    #[arg(long, env = "VAULTBANK_ADMIN")]
    pub admin: Address,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the sled database. Must have been initialized.
    #[arg(long, short = 'd', env = "VAULTBANK_DATA_DIR", default_value = "./vaultbank-data")]
    pub data_dir: PathBuf,

    /// Port for the JSON API.
    #[arg(long, env = "VAULTBANK_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VAULTBANK_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// What stays open while paused: `strict` or `allow-withdrawals`.
    #[arg(long, env = "VAULTBANK_PAUSE_POLICY", default_value = "strict")]
    pub pause_policy: PausePolicy,

    /// Mount the `/devnet` faucet and token endpoints.
    #[arg(long, env = "VAULTBANK_DEVNET")]
    pub devnet: bool,

    #[arg(long, env = "VAULTBANK_LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Default filter when `RUST_LOG` is unset.
    #[arg(
        long,
        env = "VAULTBANK_LOG_LEVEL",
        default_value = "vaultbank_node=info,vaultbank_contracts=info,vaultbank_protocol=info,tower_http=debug"
    )]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        VaultBankCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = VaultBankCli::try_parse_from(["vaultbank-node", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
        assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(args.pause_policy, PausePolicy::Strict);
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(!args.devnet);
    }

    #[test]
    fn run_parses_policy_and_format() {
        let cli = VaultBankCli::try_parse_from([
            "vaultbank-node",
            "run",
            "--pause-policy",
            "allow-withdrawals",
            "--log-format",
            "json",
            "--devnet",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.pause_policy, PausePolicy::AllowWithdrawals);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.devnet);
    }

    #[test]
    fn init_requires_valid_admin() {
        let admin = Address::from_label("admin");
        let cli = VaultBankCli::try_parse_from([
            "vaultbank-node",
            "init",
            "--admin",
            &admin.to_hex(),
        ])
        .unwrap();
        let Commands::Init(args) = cli.command else {
            panic!("expected init");
        };
        assert_eq!(args.admin, admin);
        assert!(args.owner.is_none());

        assert!(
            VaultBankCli::try_parse_from(["vaultbank-node", "init", "--admin", "nothex"]).is_err()
        );
    }
}
