//! Supported chains and their leaderboard constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::CompetitionIndex;

/// Default subgraph for the Arbitrum testnet leaderboard.
pub const ARBITRUM_TESTNET_GRAPH: &str =
    "https://api.thegraph.com/subgraphs/name/morazzela/gmx-arbitrum-test-leaderboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainId {
    ArbitrumTestnet,
    Arbitrum,
    Avalanche,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chain: {0} (expected arbitrum, arbitrum-testnet, avalanche or a chain id)")]
pub struct UnknownChain(pub String);

impl ChainId {
    pub const ALL: [ChainId; 3] = [ChainId::ArbitrumTestnet, ChainId::Arbitrum, ChainId::Avalanche];

    pub fn id(self) -> u64 {
        match self {
            ChainId::ArbitrumTestnet => 421611,
            ChainId::Arbitrum => 42161,
            ChainId::Avalanche => 43114,
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            ChainId::ArbitrumTestnet => "arbitrum-testnet",
            ChainId::Arbitrum => "arbitrum",
            ChainId::Avalanche => "avalanche",
        }
    }

    /// Competition currently running on this chain, if any.
    pub fn current_competition_index(self) -> Option<CompetitionIndex> {
        match self {
            ChainId::ArbitrumTestnet => Some(CompetitionIndex(0)),
            ChainId::Arbitrum | ChainId::Avalanche => None,
        }
    }

    pub fn default_indexer_url(self) -> Option<&'static str> {
        match self {
            ChainId::ArbitrumTestnet => Some(ARBITRUM_TESTNET_GRAPH),
            ChainId::Arbitrum | ChainId::Avalanche => None,
        }
    }
}

impl FromStr for ChainId {
    type Err = UnknownChain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(id) = normalized.parse::<u64>() {
            return Self::from_id(id).ok_or(UnknownChain(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|c| c.name() == normalized)
            .ok_or(UnknownChain(s.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
