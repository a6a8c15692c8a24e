//! Domain types: addresses, teams, competitions, member stats, transactions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing addresses and transaction hashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing 0x prefix: {0}")]
    MissingPrefix(String),

    #[error("expected {expected} hex digits, got {actual}: {value}")]
    BadLength {
        value: String,
        expected: usize,
        actual: usize,
    },

    #[error("non-hex character in {0}")]
    NotHex(String),
}

fn parse_hex_prefixed(raw: &str, digits: usize) -> Result<String, ParseError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ParseError::MissingPrefix(trimmed.to_string()))?;
    if body.len() != digits {
        return Err(ParseError::BadLength {
            value: trimmed.to_string(),
            expected: digits,
            actual: body.len(),
        });
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::NotHex(trimmed.to_string()));
    }
    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

/// A 20-byte account address. Stored lowercase, so equality ignores checksum casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shorten to `length` characters, keeping head and tail around `...`.
    ///
    /// `shorten(12)` on `0x1234567890abcdef...` yields `0x123...cdef`-style output.
    pub fn shorten(&self, length: usize) -> String {
        if length == 0 {
            return String::new();
        }
        if self.0.len() <= length || length < 8 {
            return self.0.clone();
        }
        let left = (length - 3) / 2 + 1;
        let right = length - (left + 3);
        format!("{}...{}", &self.0[..left], &self.0[self.0.len() - right..])
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_prefixed(s, 40).map(Address)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a time-boxed competition round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CompetitionIndex(pub u64);

impl fmt::Display for CompetitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a team as held by the contract.
///
/// The leader is always a member; `competition_index` never changes for the
/// lifetime of the team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    leader_address: Address,
    competition_index: CompetitionIndex,
    members: Vec<Address>,
}

impl Team {
    /// Build a team snapshot. Duplicate members are dropped and the leader is
    /// placed first if the given roster omits it.
    pub fn new(
        leader_address: Address,
        competition_index: CompetitionIndex,
        members: impl IntoIterator<Item = Address>,
    ) -> Self {
        let mut roster: Vec<Address> = Vec::new();
        for member in members {
            if !roster.contains(&member) {
                roster.push(member);
            }
        }
        if !roster.contains(&leader_address) {
            roster.insert(0, leader_address.clone());
        }
        Self {
            leader_address,
            competition_index,
            members: roster,
        }
    }

    pub fn leader_address(&self) -> &Address {
        &self.leader_address
    }

    pub fn competition_index(&self) -> CompetitionIndex {
        self.competition_index
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn is_leader(&self, account: &Address) -> bool {
        &self.leader_address == account
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    /// Copy of this snapshot without `member`. The leader cannot be removed.
    pub fn without_member(&self, member: &Address) -> Self {
        if self.is_leader(member) {
            return self.clone();
        }
        Self {
            leader_address: self.leader_address.clone(),
            competition_index: self.competition_index,
            members: self.members.iter().filter(|m| *m != member).cloned().collect(),
        }
    }
}

/// Competition metadata. Only `registration_active` drives roster behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub index: CompetitionIndex,
    pub registration_active: bool,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_team_size: Option<u32>,
}

impl Competition {
    pub fn new(index: CompetitionIndex, registration_active: bool) -> Self {
        Self {
            index,
            registration_active,
            start: None,
            end: None,
            max_team_size: None,
        }
    }
}

/// One member's performance within a competition, as computed by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStat {
    pub address: Address,
    pub pnl: f64,
}

/// Result of the "account's current team" lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTeam {
    pub has_team: bool,
    /// Leader of the team the account belongs to.
    pub leader: Option<Address>,
}

impl AccountTeam {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn led_by(leader: Address) -> Self {
        Self {
            has_team: true,
            leader: Some(leader),
        }
    }
}

/// A 32-byte transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_prefixed(s, 64).map(TxHash)
    }
}

impl TryFrom<String> for TxHash {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Success,
    Reverted,
}

impl TxStatus {
    /// Map a raw receipt status: 1 is success, anything else reverted.
    pub fn from_code(code: u64) -> Self {
        if code == 1 {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx: TxHash,
    pub status: TxStatus,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Messages shown to the user over the life of a membership transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxNotice {
    pub sent: String,
    pub success: String,
    pub failed: String,
}

impl TxNotice {
    pub fn member_removal() -> Self {
        Self {
            sent: "User removal submitted!".into(),
            success: "User removed!".into(),
            failed: "User removal failed.".into(),
        }
    }
}
