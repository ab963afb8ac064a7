//! # Room-Chain Client
//!
//! Console client for the rooms contract.
//!
//! ## Flow
//!
//! ```text
//!  ledger ──eth_getLogs──▶ EventPoller ×3 ──▶ ClientSession ──▶ stdout
//!    ▲                                            │  ▲
//!    └──── eth_sendTransaction ◀── Submitter ◀────┘  └── stdin commands
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (environment, then flags)
//! 2. Initialize telemetry
//! 3. Build the ledger gateway (JSON-RPC, or in-memory with `--simulate`)
//! 4. Start pollers and the session loop
//! 5. Read commands until `quit`, end of input, or Ctrl-C

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use client_runtime::{
    spawn_wanderer, CliArgs, ClientCommand, ClientConfig, ClientSession, InMemoryLedger,
    JsonRpcLedger, LedgerGateway, HELP,
};
use rc_03_command_submission::RoomCommand;
use rc_telemetry::init_telemetry;
use shared_types::{Address, LedgerError, RoomId};

/// Name of the room the simulated peers meet in.
const SIMULATED_ROOM: &str = "lobby";

/// How often a simulated peer picks a new destination.
const WANDER_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let mut config = ClientConfig::from_env().context("Invalid environment configuration")?;
    config.apply_args(&args);
    if config.simulate {
        config = config.with_simulated_defaults();
    }
    config.validate().context("Invalid configuration")?;

    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Room-Chain Client v{}", env!("CARGO_PKG_VERSION"));
    info!("  Mode: {}", if config.simulate { "simulated" } else { "json-rpc" });
    info!("===========================================");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<String>();
    let (input_tx, input_rx) = mpsc::channel::<ClientCommand>(32);

    tokio::spawn(async move {
        while let Some(line) = output_rx.recv().await {
            println!("{line}");
        }
    });

    let console_output = output_tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<ClientCommand>() {
                    Ok(command) => {
                        if input_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = console_output.send(format!("{e}\n{HELP}"));
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down...");
            let _ = ctrl_c_tx.send(true);
        }
    });

    let result = if config.simulate {
        let ledger = simulated_ledger(&config, shutdown_rx.clone())?;
        run_client(Arc::new(ledger), &config, output_tx, input_rx, shutdown_rx).await
    } else {
        let contract = config.contract.context("contract address is required")?;
        let account = config.account.context("account is required")?;
        info!(url = %config.rpc_url, contract = %contract, account = %account, "Connecting to ledger");
        let ledger = JsonRpcLedger::new(config.rpc_url.clone(), contract, account, config.rpc_timeout())
            .context("Failed to build JSON-RPC client")?;
        run_client(Arc::new(ledger), &config, output_tx, input_rx, shutdown_rx).await
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = &result {
        error!(error = %e, "Client stopped with error");
    }
    info!("Client stopped");
    result
}

async fn run_client<G: LedgerGateway>(
    gateway: Arc<G>,
    config: &ClientConfig,
    output: mpsc::UnboundedSender<String>,
    input: mpsc::Receiver<ClientCommand>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let session = ClientSession::new(gateway, config, output.clone())
        .context("Failed to create client session")?;
    info!(actor = %session.local_actor(), "Session ready");
    let _ = output.send(HELP.to_string());
    session.run(input, shutdown).await.context("Session failed")
}

/// Build the in-memory ledger, create the shared room and start the peers.
fn simulated_ledger(config: &ClientConfig, shutdown: watch::Receiver<bool>) -> Result<InMemoryLedger> {
    let contract = config.contract.context("simulated contract missing")?;
    let account = config.account.context("simulated account missing")?;
    let ledger = InMemoryLedger::new(contract, account);

    let host = peer_address(0);
    let room = create_room(&ledger, host).context("Failed to create simulated room")?;
    info!(room = %room, peers = config.simulated_peers, "Simulated ledger ready");

    for i in 0..config.simulated_peers {
        let peer = peer_address(i as u64 + 1);
        spawn_wanderer(
            ledger.clone(),
            peer,
            format!("peer-{}", i + 1),
            room,
            WANDER_INTERVAL,
            shutdown.clone(),
        );
    }
    Ok(ledger)
}

fn create_room(ledger: &InMemoryLedger, host: Address) -> Result<RoomId, LedgerError> {
    ledger.act_as(
        host,
        &RoomCommand::CreateRoom {
            name: SIMULATED_ROOM.to_string(),
        },
    )?;
    // Room ids on the simulated ledger start at 1.
    Ok(RoomId::one())
}

fn peer_address(index: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x9e;
    bytes[12..].copy_from_slice(&index.to_be_bytes());
    Address::new(bytes)
}
