//! Network definitions and constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Mainnet
    #[default]
    Mainnet,
    /// Public test network
    Testnet,
    /// Local regression-test network
    Regtest,
}

/// Unrecognized network name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl Network {
    /// Get the version byte for P2PKH addresses.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet | Network::Regtest => 0x6f,
        }
    }

    /// Get the default RPC port for this network.
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            Network::Mainnet => 8332,
            Network::Testnet => 18332,
            Network::Regtest => 18443,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_str() {
        assert_eq!("mainnet".parse::<Network>(), Ok(Network::Mainnet));
        assert_eq!("MAINNET".parse::<Network>(), Ok(Network::Mainnet));
        assert_eq!("testnet".parse::<Network>(), Ok(Network::Testnet));
        assert_eq!("regtest".parse::<Network>(), Ok(Network::Regtest));
        assert_eq!(
            "invalid".parse::<Network>(),
            Err(UnknownNetwork("invalid".into()))
        );
    }

    #[test]
    fn test_network_constants() {
        assert_eq!(Network::default(), Network::Mainnet);
        assert_eq!(Network::Mainnet.p2pkh_version(), 0x00);
        assert_eq!(Network::Regtest.p2pkh_version(), 0x6f);
        assert_eq!(Network::Testnet.default_rpc_port(), 18332);
        assert_eq!(Network::Regtest.to_string(), "regtest");
    }

    #[test]
    fn test_network_serde() {
        let network: Network = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(network, Network::Testnet);
        assert_eq!(serde_json::to_string(&Network::Regtest).unwrap(), "\"regtest\"");
    }
}
