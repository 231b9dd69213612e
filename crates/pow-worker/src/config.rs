//! Worker settings.

use std::time::Duration;

use pow_core::{decode_address, Network, ValidatedAddress};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkerError};
use crate::worker::MAX_WORKERS;

/// Settings for connecting to a node and running workers.
///
/// Every field has a default, so a settings document only needs the values
/// it changes. The short `rpc*` spellings are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(alias = "rpchost")]
    pub rpc_host: String,
    /// Falls back to the network's default port.
    #[serde(alias = "rpcport")]
    pub rpc_port: Option<u16>,
    /// Credentials for the caller's transport.
    #[serde(alias = "rpcuser")]
    pub rpc_user: String,
    #[serde(alias = "rpcpassword")]
    pub rpc_password: String,
    pub network: Network,
    /// Registry name of the miner backend.
    pub miner_type: String,
    /// Base58Check P2PKH address receiving the block reward.
    pub payout_address: String,
    pub workers: usize,
    /// Wall-clock time spent on one template before fetching a new one.
    pub search_budget_secs: u64,
    pub max_consecutive_failures: u32,
    pub retry_delay_ms: u64,
    pub report_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rpc_host: "http://localhost".to_string(),
            rpc_port: None,
            rpc_user: String::new(),
            rpc_password: String::new(),
            network: Network::default(),
            miner_type: "cpu".to_string(),
            payout_address: String::new(),
            workers: 1,
            search_budget_secs: 30,
            max_consecutive_failures: 5,
            retry_delay_ms: 1000,
            report_interval_secs: 10,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document and check them.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values no worker can run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(WorkerError::Config("workers must be at least 1".into()));
        }
        if self.workers > MAX_WORKERS {
            return Err(WorkerError::Config(format!(
                "workers must be at most {}",
                MAX_WORKERS
            )));
        }
        if self.max_consecutive_failures == 0 {
            return Err(WorkerError::Config(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }
        if self.miner_type.is_empty() {
            return Err(WorkerError::Config("miner_type must not be empty".into()));
        }
        Ok(())
    }

    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
            .unwrap_or_else(|| self.network.default_rpc_port())
    }

    /// Node endpoint, e.g. `http://localhost:18332`.
    pub fn rpc_url(&self) -> String {
        format!("{}:{}", self.rpc_host.trim_end_matches('/'), self.rpc_port())
    }

    /// Decode the payout address for the configured network.
    pub fn payout(&self) -> Result<ValidatedAddress> {
        Ok(decode_address(&self.payout_address, self.network)?)
    }

    pub fn search_budget(&self) -> Duration {
        Duration::from_secs(self.search_budget_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rpc_host, "http://localhost");
        assert_eq!(settings.rpc_port(), 8332);
        assert_eq!(settings.rpc_url(), "http://localhost:8332");
        assert_eq!(settings.miner_type, "cpu");
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.search_budget(), Duration::from_secs(30));
        assert_eq!(settings.max_consecutive_failures, 5);
    }

    #[test]
    fn test_from_json_partial() {
        let settings = Settings::from_json(
            r#"{
                "network": "testnet",
                "rpcuser": "miner",
                "rpcpassword": "secret",
                "workers": 4
            }"#,
        )
        .unwrap();

        assert_eq!(settings.network, Network::Testnet);
        assert_eq!(settings.rpc_port(), 18332);
        assert_eq!(settings.rpc_user, "miner");
        assert_eq!(settings.rpc_password, "secret");
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.report_interval_secs, 10);
    }

    #[test]
    fn test_explicit_port_wins() {
        let settings = Settings::from_json(
            r#"{"network": "regtest", "rpc_host": "http://10.0.0.2/", "rpc_port": 9000}"#,
        )
        .unwrap();
        assert_eq!(settings.rpc_url(), "http://10.0.0.2:9000");
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            Settings::from_json(r#"{"workers": 0}"#),
            Err(WorkerError::Config(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"network": "moonnet"}"#),
            Err(WorkerError::Json(_))
        ));
    }

    #[test]
    fn test_worker_count_limit() {
        let at_limit = Settings {
            workers: MAX_WORKERS,
            ..Settings::default()
        };
        assert!(at_limit.validate().is_ok());

        let over_limit = Settings {
            workers: MAX_WORKERS + 1,
            ..Settings::default()
        };
        assert!(matches!(over_limit.validate(), Err(WorkerError::Config(_))));
    }

    #[test]
    fn test_payout_address() {
        let settings = Settings {
            network: Network::Regtest,
            payout_address: "mpXwg4jMtRhuSpVq4xS3HFHmCmWp9NyGKt".into(),
            ..Settings::default()
        };
        assert_eq!(settings.payout().unwrap().pubkey_hash[0], 0x62);

        let wrong_network = Settings {
            network: Network::Mainnet,
            ..settings
        };
        assert!(matches!(wrong_network.payout(), Err(WorkerError::Core(_))));
    }
}
