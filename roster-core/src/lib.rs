//! Team roster core: domain types, collaborators and the roster controller.
//!
//! - Domain types (addresses, teams, competitions, receipts)
//! - Chain constants (current competition, default indexer)
//! - Collaborator traits with indexer, simulated and read-only implementations
//! - The roster controller state machine and its executor
//! - TOML configuration

pub mod chain;
pub mod config;
pub mod controller;
pub mod domain;
pub mod source;

pub use chain::ChainId;
pub use config::{Backend, ConfigError, RosterConfig};
pub use controller::{
    LoadState, RemovalError, RosterController, RosterEvent, RosterOutcome, RosterRequest,
};
pub use domain::{Address, Competition, CompetitionIndex, MemberStat, Team, TxHash, TxNotice};
pub use source::{Collaborators, GatewayError, SourceError};
