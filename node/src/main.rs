// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VaultBank Node
//!
//! Entry point for the `vaultbank-node` binary. Parses CLI arguments,
//! initializes logging and metrics, attaches to bank storage, and serves the
//! JSON API.
//!
//! The binary supports three subcommands:
//!
//! - `init`   : create storage and deploy the bank at logic V1
//! - `run`    : attach to existing storage and serve the API and metrics
//! - `version`: print build version information
//!
//! ## Storage
//!
//! One sled database under `<data-dir>/db`. The bank, the native coin and
//! every devnet token each get their own tree, so custody survives a
//! restart alongside the ledger.

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use vaultbank_contracts::{BankProxy, Deployment, SharedBank};
use vaultbank_protocol::config::{BankConfig, BANK_ADDRESS_LABEL, PROTOCOL_VERSION};
use vaultbank_protocol::crypto::Keypair;
use vaultbank_protocol::storage::{LogicVersion, SledStore};
use vaultbank_protocol::vault::{Custody, FungibleToken, NativeCoin, StandardToken, TokenRegistry};
use vaultbank_protocol::Address;

use cli::{Commands, VaultBankCli};
use logging::LogFormat;
use metrics::BankMetrics;

/// Tree holding native coin balances.
const COIN_NAMESPACE: &str = "coin";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VaultBankCli::parse();

    match cli.command {
        Commands::Init(args) => init_bank(args),
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn open_database(data_dir: &Path) -> Result<SledStore> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = SledStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");
    Ok(db)
}

/// Custody handles over the database: the native coin tree plus every
/// token tree found on disk.
fn open_custody(db: &SledStore) -> Result<(Custody, Vec<Arc<StandardToken>>)> {
    let coin_store = db
        .namespace(COIN_NAMESPACE)
        .context("failed to open native coin tree")?;
    let native = Arc::new(NativeCoin::new(Arc::new(coin_store)));
    let tokens = Arc::new(TokenRegistry::new());

    let mut issued = Vec::new();
    for name in db.namespaces() {
        if !name.starts_with("token-") {
            continue;
        }
        let store = db
            .namespace(&name)
            .with_context(|| format!("failed to open token tree {}", name))?;
        let token = Arc::new(
            StandardToken::open(Arc::new(store))
                .with_context(|| format!("failed to load token from {}", name))?,
        );
        tokens
            .register(token.clone())
            .with_context(|| format!("failed to register token from {}", name))?;
        tracing::info!(token = %token.address(), tree = %name, "token loaded");
        issued.push(token);
    }

    Ok((Custody::new(native, tokens), issued))
}

/// Creates the data directory and deploys the bank.
fn init_bank(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("vaultbank_node=info,vaultbank_contracts=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing bank storage");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let (owner, key_path) = match args.owner {
        Some(owner) => (owner, None),
        None => {
            let keypair = Keypair::generate();
            let key_path = data_dir.join("owner.key");
            std::fs::write(&key_path, hex::encode(keypair.secret_key_bytes()))
                .with_context(|| format!("failed to write owner key to {}", key_path.display()))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
            }

            tracing::info!(
                owner = %keypair.address(),
                key_path = %key_path.display(),
                "owner keypair generated"
            );
            (keypair.address(), Some(key_path))
        }
    };

    let db = open_database(data_dir)?;
    let (custody, _) = open_custody(&db)?;
    let deployment = Deployment {
        address: Address::from_label(BANK_ADDRESS_LABEL),
        owner,
        admin: args.admin,
    };
    let (_, receipt) =
        BankProxy::deploy(Arc::new(db.clone()), custody, BankConfig::default(), deployment)
            .context("failed to deploy bank")?;
    db.flush().context("failed to flush database")?;

    println!("Bank initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Bank address   : {}", deployment.address);
    println!("  Owner          : {}", owner);
    println!("  Admin          : {}", args.admin);
    println!("  Logic version  : {}", LogicVersion::V1);
    println!("  Receipt        : {}", receipt.id);
    if let Some(key_path) = key_path {
        println!("  Owner key      : {}", key_path.display());
    }

    Ok(())
}

/// Attaches to bank storage and serves the API and metrics endpoints
/// until SIGINT or SIGTERM.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, args.log_format);

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        pause_policy = %args.pause_policy,
        devnet = args.devnet,
        data_dir = %args.data_dir.display(),
        "starting vaultbank-node"
    );

    // --- Storage and custody ---
    let db = open_database(&args.data_dir)?;
    let (custody, issued) = open_custody(&db)?;
    let config = BankConfig::default().with_pause_policy(args.pause_policy);
    let proxy = BankProxy::attach(Arc::new(db.clone()), custody, config)
        .context("failed to attach to bank storage (run `vaultbank-node init` first)")?;
    let bank = Arc::new(SharedBank::new(proxy));

    // --- Metrics ---
    let bank_metrics = Arc::new(BankMetrics::new().context("failed to register metrics")?);
    bank_metrics.record_state(&bank.view());

    // --- Application state ---
    let devnet = args.devnet.then(|| {
        let devnet = api::Devnet::new(api::TokenStorage::Sled(db.clone()));
        {
            let mut map = devnet.issued.write();
            for token in issued {
                map.insert(token.address(), token);
            }
        }
        devnet
    });
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        bank,
        pause_policy: args.pause_policy,
        metrics: Arc::clone(&bank_metrics),
        devnet,
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&bank_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush database on shutdown")?;
    tracing::info!("vaultbank-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("vaultbank-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", PROTOCOL_VERSION);
    println!("latest logic   {}", LogicVersion::LATEST);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
