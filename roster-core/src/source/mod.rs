//! Collaborator traits and structured error types.
//!
//! The roster controller never talks to the chain or the indexer directly.
//! These traits abstract over the competition registry, the indexer's member
//! stats, and the membership contract so implementations can be swapped
//! (HTTP indexer, in-memory simulation) and mocked in tests.

pub mod circuit_breaker;
pub mod indexer;
pub mod read_only;
pub mod simulated;

use std::sync::Arc;

use thiserror::Error;

use crate::chain::ChainId;
use crate::domain::{
    AccountTeam, Address, Competition, CompetitionIndex, MemberStat, Receipt, Team, TxHash,
    TxNotice,
};

pub use circuit_breaker::CircuitBreaker;
pub use indexer::IndexerClient;
pub use read_only::ReadOnlyGateway;
pub use simulated::{Fault, SimulatedRegistry};

/// Errors from read-side sources (indexer, competition registry).
///
/// Displayable in both CLI and TUI contexts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by indexer (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("indexer returned HTTP {0}")]
    Http(u16),

    #[error("indexer query failed: {0}")]
    Query(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("hard stop: indexer has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("competition {0} not found")]
    CompetitionNotFound(CompetitionIndex),

    #[error("source error: {0}")]
    Other(String),
}

/// Errors from the membership contract gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    #[error("confirmation failed: {0}")]
    Confirmation(String),

    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),

    #[error("operation not supported by this gateway: {0}")]
    Unsupported(&'static str),
}

/// Competition registry reader.
pub trait CompetitionSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch metadata for one competition.
    fn competition(
        &self,
        chain: ChainId,
        index: CompetitionIndex,
    ) -> Result<Competition, SourceError>;
}

/// Indexer-backed member statistics for one roster page.
///
/// Implementations return the page ordered by PnL descending so that row
/// position plus page offset is the member's rank within the team.
pub trait RosterStatsSource: Send + Sync {
    fn name(&self) -> &str;

    fn team_members_stats(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<MemberStat>, SourceError>;
}

/// Team snapshots for the view that owns a roster.
pub trait TeamSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when no team led by `leader` exists in the competition.
    fn team(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
    ) -> Result<Option<Team>, SourceError>;
}

/// Indexed team membership for a single account.
pub trait AccountTeamSource: Send + Sync {
    fn name(&self) -> &str;

    /// The team `account` belongs to in `competition_index`, if any.
    fn team_of(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> Result<AccountTeam, SourceError>;
}

/// On-chain membership reads and writes against the registry contract.
pub trait MembershipGateway: Send + Sync {
    fn name(&self) -> &str;

    /// The team `account` currently belongs to in `competition_index`.
    fn account_team(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> Result<AccountTeam, GatewayError>;

    /// Submit a remove-member transaction. Returns once the transaction is sent.
    fn remove_member(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
        member: &Address,
        notice: &TxNotice,
    ) -> Result<TxHash, GatewayError>;

    /// Block until `tx` is final and return its receipt.
    fn wait_for_receipt(&self, chain: ChainId, tx: &TxHash) -> Result<Receipt, GatewayError>;
}

/// Everything a team view talks to, shareable across threads.
#[derive(Clone)]
pub struct Collaborators {
    pub competitions: Arc<dyn CompetitionSource>,
    pub stats: Arc<dyn RosterStatsSource>,
    pub membership: Arc<dyn MembershipGateway>,
    pub teams: Arc<dyn TeamSource>,
}

impl Collaborators {
    /// Use one registry for every role.
    pub fn simulated(registry: Arc<SimulatedRegistry>) -> Self {
        Self {
            competitions: registry.clone(),
            stats: registry.clone(),
            membership: registry.clone(),
            teams: registry,
        }
    }

    /// Reads from a live indexer; writes are unsupported.
    pub fn live(indexer: Arc<IndexerClient>) -> Self {
        Self::read_only(indexer)
    }

    /// Every read answered by `reads`, including the account-team lookup;
    /// writes are unsupported.
    pub fn read_only<R>(reads: Arc<R>) -> Self
    where
        R: CompetitionSource + RosterStatsSource + TeamSource + AccountTeamSource + 'static,
    {
        Self {
            competitions: reads.clone(),
            stats: reads.clone(),
            membership: Arc::new(ReadOnlyGateway::new(reads.clone())),
            teams: reads,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("competitions", &self.competitions.name())
            .field("stats", &self.stats.name())
            .field("membership", &self.membership.name())
            .field("teams", &self.teams.name())
            .finish()
    }
}
