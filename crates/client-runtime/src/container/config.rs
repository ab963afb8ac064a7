//! # Client Configuration
//!
//! Unified configuration for every subsystem and the session loop.
//!
//! Precedence: defaults, then `RC_*` environment variables, then command-line
//! flags. [`ClientConfig::validate`] runs before anything is started.

use clap::Parser;
use rc_01_event_sync::PollerConfig;
use rc_02_entity_state::{ReconcileConfig, SelfCorrectionPolicy};
use rc_03_command_submission::SubmitterConfig;
use rc_telemetry::TelemetryConfig;
use shared_bus::EventSignature;
use shared_types::{Address, BlockNumber};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Contract address used by the simulated ledger when none is configured.
pub const SIMULATED_CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

/// Local account used by the simulated ledger when none is configured.
pub const SIMULATED_ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Configuration errors. All of them prevent the client from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or flag could not be parsed.
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// No contract address configured for a live ledger.
    #[error("Missing contract address: set RC_CONTRACT_ADDRESS or --contract")]
    MissingContract,

    /// No sending account configured for a live ledger.
    #[error("Missing account: set RC_ACCOUNT or --account")]
    MissingAccount,

    /// A subsystem rejected its section.
    #[error("Invalid {section} configuration: {reason}")]
    Section {
        section: &'static str,
        reason: String,
    },
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Rooms contract.
    pub contract: Option<Address>,
    /// Account transactions are sent from; also the local actor.
    pub account: Option<Address>,
    /// Use the in-memory ledger instead of `rpc_url`.
    pub simulate: bool,
    /// Other players driven by the simulated ledger.
    pub simulated_peers: usize,
    /// Events to poll for.
    pub signatures: Vec<EventSignature>,
    /// How often the session logs a state summary.
    pub state_log_interval_ms: u64,
    /// HTTP request timeout for the JSON-RPC gateway.
    pub rpc_timeout_ms: u64,
    pub poller: PollerConfig,
    pub reconcile: ReconcileConfig,
    pub submitter: SubmitterConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            contract: None,
            account: None,
            simulate: false,
            simulated_peers: 2,
            signatures: EventSignature::ALL.to_vec(),
            state_log_interval_ms: 10_000,
            rpc_timeout_ms: 10_000,
            poller: PollerConfig::default(),
            reconcile: ReconcileConfig::default(),
            submitter: SubmitterConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::default()
        };
        config.apply_vars(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `RC_*` variables from `lookup`.
    ///
    /// # Environment Variables
    ///
    /// - `RC_RPC_URL`: JSON-RPC endpoint
    /// - `RC_CONTRACT_ADDRESS`: rooms contract address
    /// - `RC_ACCOUNT`: sending account
    /// - `RC_POLL_INTERVAL_MS`: poll interval (default 1000)
    /// - `RC_WINDOW_SIZE`: blocks per log query, 1..=20 (default 20)
    /// - `RC_FROM_BLOCK`: resume polling after this block
    /// - `RC_SPEED`: movement speed, units per second (default 100)
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RC_RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(contract) = parse_var(&lookup, "RC_CONTRACT_ADDRESS")? {
            self.contract = Some(contract);
        }
        if let Some(account) = parse_var(&lookup, "RC_ACCOUNT")? {
            self.account = Some(account);
        }
        if let Some(interval) = parse_var(&lookup, "RC_POLL_INTERVAL_MS")? {
            self.poller.interval_ms = interval;
        }
        if let Some(window) = parse_var(&lookup, "RC_WINDOW_SIZE")? {
            self.poller.window_size = window;
        }
        if let Some(from) = parse_var::<BlockNumber, _>(&lookup, "RC_FROM_BLOCK")? {
            self.poller.from_block = Some(from);
        }
        if let Some(speed) = parse_var(&lookup, "RC_SPEED")? {
            self.reconcile.speed = speed;
        }
        Ok(())
    }

    /// Apply command-line flags. Flags win over the environment.
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(url) = &args.rpc_url {
            self.rpc_url.clone_from(url);
        }
        if args.contract.is_some() {
            self.contract = args.contract;
        }
        if args.account.is_some() {
            self.account = args.account;
        }
        if let Some(interval) = args.poll_interval_ms {
            self.poller.interval_ms = interval;
        }
        if let Some(window) = args.window_size {
            self.poller.window_size = window;
        }
        if args.from_block.is_some() {
            self.poller.from_block = args.from_block;
        }
        if let Some(speed) = args.speed {
            self.reconcile.speed = speed;
        }
        if args.ignore_self_divergence {
            self.reconcile.self_correction = SelfCorrectionPolicy::Ignore;
        }
        if let Some(level) = &args.log_level {
            self.telemetry.log_level.clone_from(level);
        }
        if args.json_logs {
            self.telemetry.json_logs = true;
        }
        if args.simulate {
            self.simulate = true;
        }
        if let Some(peers) = args.peers {
            self.simulated_peers = peers;
        }
    }

    /// Fill in the simulated contract and account where unset.
    pub fn with_simulated_defaults(mut self) -> Self {
        if self.contract.is_none() {
            self.contract = SIMULATED_CONTRACT.parse().ok();
        }
        if self.account.is_none() {
            self.account = SIMULATED_ACCOUNT.parse().ok();
        }
        self
    }

    /// Reject configurations the client cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract.is_none() {
            return Err(ConfigError::MissingContract);
        }
        if self.account.is_none() {
            return Err(ConfigError::MissingAccount);
        }
        self.poller.validate().map_err(|e| ConfigError::Section {
            section: "poller",
            reason: e.to_string(),
        })?;
        self.reconcile.validate().map_err(|e| ConfigError::Section {
            section: "reconcile",
            reason: e.to_string(),
        })?;
        self.submitter.validate().map_err(|e| ConfigError::Section {
            section: "submitter",
            reason: e.to_string(),
        })?;
        if self.state_log_interval_ms == 0 || self.rpc_timeout_ms == 0 {
            return Err(ConfigError::Section {
                section: "runtime",
                reason: "intervals must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn state_log_interval(&self) -> Duration {
        Duration::from_millis(self.state_log_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Room-Chain client
#[derive(Parser, Debug, Default)]
#[command(name = "room-chain-client")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// JSON-RPC endpoint URL
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Rooms contract address
    #[arg(long)]
    pub contract: Option<Address>,

    /// Account to send transactions from (must be unlocked on the node)
    #[arg(long)]
    pub account: Option<Address>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Blocks per log query (1..=20)
    #[arg(long)]
    pub window_size: Option<u64>,

    /// Resume polling after this block instead of the chain head
    #[arg(long)]
    pub from_block: Option<BlockNumber>,

    /// Movement speed in units per second
    #[arg(long)]
    pub speed: Option<f64>,

    /// Never walk the local actor back to its confirmed position
    #[arg(long)]
    pub ignore_self_divergence: bool,

    /// Log filter directive
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,

    /// Run against an in-memory ledger
    #[arg(long)]
    pub simulate: bool,

    /// Simulated peers wandering the first room (with --simulate)
    #[arg(long)]
    pub peers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_need_contract() {
        let config = ClientConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingContract)));
        assert!(config.with_simulated_defaults().validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        config
            .apply_vars(lookup(&[
                ("RC_CONTRACT_ADDRESS", "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
                ("RC_ACCOUNT", SIMULATED_ACCOUNT),
                ("RC_WINDOW_SIZE", "5"),
                ("RC_FROM_BLOCK", "1200"),
                ("RC_SPEED", "250"),
            ]))
            .unwrap();
        assert_eq!(config.contract, SIMULATED_CONTRACT.parse::<Address>().ok());
        assert_eq!(config.poller.window_size, 5);
        assert_eq!(config.poller.from_block, Some(1200));
        assert_eq!(config.reconcile.speed, 250.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_contract_rejected() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_vars(lookup(&[("RC_CONTRACT_ADDRESS", "0x1234")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "RC_CONTRACT_ADDRESS",
                ..
            }
        ));
    }

    #[test]
    fn test_window_too_wide_rejected() {
        let mut config = ClientConfig::default().with_simulated_defaults();
        config.poller.window_size = 21;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Section { section: "poller", .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ClientConfig::default().with_simulated_defaults();
        config.poller.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flags_override_env() {
        let mut config = ClientConfig::default();
        config
            .apply_vars(lookup(&[("RC_POLL_INTERVAL_MS", "5000")]))
            .unwrap();
        let args = CliArgs::parse_from([
            "room-chain-client",
            "--poll-interval-ms",
            "250",
            "--simulate",
            "--ignore-self-divergence",
        ]);
        config.apply_args(&args);
        assert_eq!(config.poller.interval_ms, 250);
        assert!(config.simulate);
        assert_eq!(config.reconcile.self_correction, SelfCorrectionPolicy::Ignore);
    }
}
