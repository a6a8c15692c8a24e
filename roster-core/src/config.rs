//! TOML configuration shared by the TUI and CLI.
//!
//! ```toml
//! [view]
//! chain = "arbitrum-testnet"
//! account = "0x..."
//! leader = "0x..."
//! competition = 0
//!
//! [indexer]
//! enabled = true
//! url = "https://..."
//! timeout_secs = 10
//! max_retries = 3
//!
//! [demo]
//! seed = 42
//! teams = 4
//! members_per_team = 8
//! registration_active = true
//! latency_ms = 150
//! ```
//!
//! Every field is optional. A missing file yields the defaults, which run the
//! seeded demo registry on Arbitrum Testnet.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::chain::ChainId;
use crate::domain::{Address, Competition, CompetitionIndex, Team};
use crate::source::{CircuitBreaker, Collaborators, IndexerClient, SimulatedRegistry, SourceError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} has no current competition; set view.competition")]
    NoCompetition(ChainId),

    #[error("no indexer known for {0}; set indexer.url")]
    NoIndexer(ChainId),

    #[error("no team leader given; set view.leader")]
    NoLeader,

    #[error("no team led by {leader} in competition {competition}")]
    TeamNotFound {
        leader: Address,
        competition: CompetitionIndex,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub view: ViewConfig,
    pub indexer: IndexerConfig,
    pub demo: DemoConfig,
}

/// Which team is shown and who is looking at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub chain: ChainId,
    pub account: Option<Address>,
    pub leader: Option<Address>,
    /// Overrides the chain's current competition.
    pub competition: Option<CompetitionIndex>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            chain: ChainId::ArbitrumTestnet,
            account: None,
            leader: None,
            competition: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Read from the live indexer instead of the demo registry.
    pub enabled: bool,
    pub url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_secs: 10,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub seed: u64,
    pub teams: usize,
    pub members_per_team: usize,
    pub registration_active: bool,
    /// Artificial delay per collaborator call.
    pub latency_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            teams: 4,
            members_per_team: 8,
            registration_active: true,
            latency_ms: 0,
        }
    }
}

impl RosterConfig {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading config");
                Self::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Competition whose team is shown.
    pub fn competition_index(&self) -> Result<CompetitionIndex, ConfigError> {
        self.view
            .competition
            .or_else(|| self.view.chain.current_competition_index())
            .ok_or(ConfigError::NoCompetition(self.view.chain))
    }

    pub fn indexer_url(&self) -> Result<String, ConfigError> {
        match &self.indexer.url {
            Some(url) => Ok(url.clone()),
            None => self
                .view
                .chain
                .default_indexer_url()
                .map(str::to_string)
                .ok_or(ConfigError::NoIndexer(self.view.chain)),
        }
    }

    /// Build the collaborators this configuration selects.
    pub fn backend(&self) -> Result<Backend, ConfigError> {
        let competition_index = self.competition_index()?;

        if self.indexer.enabled {
            let url = self.indexer_url()?;
            info!(%url, "using live indexer");
            let client = IndexerClient::new(
                url,
                Duration::from_secs(self.indexer.timeout_secs),
                Arc::new(CircuitBreaker::default_indexer()),
            )?
            .with_retries(self.indexer.max_retries, Duration::from_millis(500));
            return Ok(Backend {
                chain: self.view.chain,
                competition_index,
                collaborators: Collaborators::live(Arc::new(client)),
                registry: None,
                demo_teams: Vec::new(),
            });
        }

        let (registry, demo_teams) = SimulatedRegistry::demo(
            self.view.chain,
            Competition::new(competition_index, self.demo.registration_active),
            self.demo.teams,
            self.demo.members_per_team,
            self.demo.seed,
        );
        let registry =
            Arc::new(registry.with_latency(Duration::from_millis(self.demo.latency_ms)));
        info!(
            seed = self.demo.seed,
            teams = demo_teams.len(),
            "using simulated registry"
        );
        Ok(Backend {
            chain: self.view.chain,
            competition_index,
            collaborators: Collaborators::simulated(registry.clone()),
            registry: Some(registry),
            demo_teams,
        })
    }
}

/// Collaborators plus what is known about the data behind them.
#[derive(Debug)]
pub struct Backend {
    pub chain: ChainId,
    pub competition_index: CompetitionIndex,
    pub collaborators: Collaborators,
    /// Present in demo mode.
    pub registry: Option<Arc<SimulatedRegistry>>,
    pub demo_teams: Vec<Team>,
}

impl Backend {
    pub fn is_demo(&self) -> bool {
        self.registry.is_some()
    }

    /// Fetch the team to show: the one led by `leader`, or the first demo team.
    pub fn resolve_team(&self, leader: Option<&Address>) -> Result<Team, ConfigError> {
        let leader = match leader {
            Some(leader) => leader.clone(),
            None => self
                .demo_teams
                .first()
                .map(|team| team.leader_address().clone())
                .ok_or(ConfigError::NoLeader)?,
        };
        self.collaborators
            .teams
            .team(self.chain, self.competition_index, &leader)?
            .ok_or(ConfigError::TeamNotFound {
                leader,
                competition: self.competition_index,
            })
    }
}
