//! Roster controller: one instance per team view.
//!
//! The controller owns the page, the busy flag for removals and the latest
//! loaded roster. It never performs I/O. Every state change that needs a
//! collaborator returns a [`RosterRequest`]; the caller executes it (see
//! [`executor`]) and feeds the resulting [`RosterOutcome`] back through
//! [`RosterController::apply`]. Notifications for the owning view queue up as
//! [`RosterEvent`]s and are read with [`RosterController::drain_events`].

pub mod executor;
pub mod pagination;
pub mod permissions;

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chain::ChainId;
use crate::domain::{
    AccountTeam, Address, Competition, CompetitionIndex, MemberStat, Receipt, Team, TxHash,
    TxNotice,
};
use crate::source::{GatewayError, SourceError};

pub use executor::{drive, execute};
pub use pagination::{Pagination, PER_PAGE};
pub use permissions::{can_remove, compute_visibility};

/// Why a removal did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemovalError {
    #[error("a member removal is already in progress")]
    Busy,

    #[error("account is not allowed to remove this member")]
    NotPermitted,

    #[error("no account connected")]
    NoAccount,

    #[error("removal could not be submitted: {0}")]
    Submission(GatewayError),

    #[error("removal could not be confirmed: {0}")]
    Confirmation(GatewayError),

    #[error("removal transaction {tx} reverted")]
    Reverted { tx: TxHash },

    #[error("removal ended without a result")]
    Abandoned,
}

/// Progress of the current roster page.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// A removal in flight. Exists only while the busy flag is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalRequest {
    pub acting_account: Address,
    pub target: MemberStat,
}

/// Work the controller needs done by a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterRequest {
    LoadCompetition {
        competition_index: CompetitionIndex,
    },
    LoadAccountTeam {
        competition_index: CompetitionIndex,
        account: Address,
    },
    LoadPage {
        seq: u64,
        competition_index: CompetitionIndex,
        leader: Address,
        page: u32,
        per_page: u32,
    },
    /// Submit, then wait for the receipt. Answered by one `RemovalSubmitted`
    /// (when the transaction was sent) and exactly one `RemovalFinished`.
    SubmitRemoval {
        competition_index: CompetitionIndex,
        leader: Address,
        member: Address,
        notice: TxNotice,
    },
}

/// Result of executing a [`RosterRequest`].
#[derive(Debug, Clone)]
pub enum RosterOutcome {
    CompetitionLoaded(Result<Competition, SourceError>),
    AccountTeamLoaded {
        account: Address,
        result: Result<AccountTeam, GatewayError>,
    },
    PageLoaded {
        seq: u64,
        result: Result<Vec<MemberStat>, SourceError>,
    },
    RemovalSubmitted {
        tx: TxHash,
    },
    RemovalFinished(Result<Receipt, RemovalError>),
}

/// Which lookup a [`RosterEvent::LoadFailed`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
    Competition,
    AccountTeam,
    Roster,
}

impl std::fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadTarget::Competition => write!(f, "competition"),
            LoadTarget::AccountTeam => write!(f, "account team"),
            LoadTarget::Roster => write!(f, "roster"),
        }
    }
}

/// Notifications for the view that owns the roster.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterEvent {
    /// Team membership changed; the owner should refresh its team snapshot.
    MembersChanged,
    RemovalSubmitted {
        member: Address,
        tx: TxHash,
        message: String,
    },
    RemovalConfirmed {
        member: Address,
        tx: TxHash,
        message: String,
    },
    RemovalFailed(RemovalError),
    LoadFailed {
        target: LoadTarget,
        message: String,
    },
}

/// One rendered roster row.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow<'a> {
    /// 1-based position within the team by PnL.
    pub rank: usize,
    pub stat: &'a MemberStat,
    pub removable: bool,
}

#[derive(Debug)]
pub struct RosterController {
    chain: ChainId,
    team: Team,
    account: Option<Address>,
    current_competition: Option<CompetitionIndex>,
    notice: TxNotice,

    pagination: Pagination,
    members: Vec<MemberStat>,
    load_state: LoadState,
    next_seq: u64,
    latest_seq: Option<u64>,

    competition: Option<Competition>,
    account_team: Option<AccountTeam>,

    removal: Option<RemovalRequest>,
    pending_tx: Option<TxHash>,

    events: VecDeque<RosterEvent>,
}

impl RosterController {
    pub fn new(chain: ChainId, team: Team, account: Option<Address>) -> Self {
        let pagination = Pagination::new(team.members().len(), PER_PAGE);
        Self {
            chain,
            team,
            account,
            current_competition: chain.current_competition_index(),
            notice: TxNotice::member_removal(),
            pagination,
            members: Vec::new(),
            load_state: LoadState::Loading,
            next_seq: 0,
            latest_seq: None,
            competition: None,
            account_team: None,
            removal: None,
            pending_tx: None,
            events: VecDeque::new(),
        }
    }

    /// Competition used for the account-team lookup. Defaults to the chain's
    /// current competition.
    pub fn with_current_competition(mut self, index: Option<CompetitionIndex>) -> Self {
        self.current_competition = index;
        self
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn account(&self) -> Option<&Address> {
        self.account.as_ref()
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn competition(&self) -> Option<&Competition> {
        self.competition.as_ref()
    }

    pub fn account_team(&self) -> Option<&AccountTeam> {
        self.account_team.as_ref()
    }

    pub fn is_removing(&self) -> bool {
        self.removal.is_some()
    }

    pub fn removal(&self) -> Option<&RemovalRequest> {
        self.removal.as_ref()
    }

    pub fn pending_tx(&self) -> Option<&TxHash> {
        self.pending_tx.as_ref()
    }

    /// Initial loads for a freshly mounted view.
    pub fn start(&mut self) -> Vec<RosterRequest> {
        let mut requests = vec![RosterRequest::LoadCompetition {
            competition_index: self.team.competition_index(),
        }];
        requests.extend(self.account_team_request());
        requests.push(self.load_roster_page());
        requests
    }

    fn account_team_request(&mut self) -> Option<RosterRequest> {
        self.account_team = None;
        let account = self.account.clone()?;
        match self.current_competition {
            Some(competition_index) => Some(RosterRequest::LoadAccountTeam {
                competition_index,
                account,
            }),
            None => {
                debug!(chain = %self.chain, "no current competition, account has no team");
                self.account_team = Some(AccountTeam::none());
                None
            }
        }
    }

    /// Jump to page `n`. `None` when `n` is out of bounds or already shown.
    pub fn set_page(&mut self, n: u32) -> Option<RosterRequest> {
        if !self.pagination.go_to(n) {
            return None;
        }
        Some(self.load_roster_page())
    }

    pub fn next_page(&mut self) -> Option<RosterRequest> {
        if !self.pagination.has_next() {
            return None;
        }
        self.set_page(self.pagination.page() + 1)
    }

    pub fn prev_page(&mut self) -> Option<RosterRequest> {
        if !self.pagination.has_previous() {
            return None;
        }
        self.set_page(self.pagination.page() - 1)
    }

    /// Request the current page. Any earlier page request still in flight
    /// becomes stale.
    pub fn load_roster_page(&mut self) -> RosterRequest {
        self.next_seq += 1;
        self.latest_seq = Some(self.next_seq);
        self.load_state = LoadState::Loading;
        RosterRequest::LoadPage {
            seq: self.next_seq,
            competition_index: self.team.competition_index(),
            leader: self.team.leader_address().clone(),
            page: self.pagination.page(),
            per_page: self.pagination.per_page(),
        }
    }

    /// Members of the current page and how far their load got. Members are
    /// empty unless the state is `Ready`.
    pub fn roster(&self) -> (&[MemberStat], &LoadState) {
        (&self.members, &self.load_state)
    }

    pub fn rows(&self) -> Vec<RosterRow<'_>> {
        let offset = self.pagination.offset();
        self.members
            .iter()
            .enumerate()
            .map(|(row, stat)| RosterRow {
                rank: offset + row + 1,
                stat,
                removable: self.can_remove(stat),
            })
            .collect()
    }

    /// Visibility of the manage header, from loaded data only. False until
    /// the competition and (for non-leaders) the account's team are known.
    pub fn show_manage_controls(&self) -> bool {
        let (Some(competition), Some(account)) = (&self.competition, &self.account) else {
            return false;
        };
        if self.team.is_leader(account) {
            return competition.registration_active;
        }
        match &self.account_team {
            Some(account_team) => {
                compute_visibility(Some(account), &self.team, competition, account_team)
            }
            None => false,
        }
    }

    pub fn can_remove(&self, member: &MemberStat) -> bool {
        match &self.competition {
            Some(competition) => {
                can_remove(self.account.as_ref(), member, &self.team, competition)
            }
            None => false,
        }
    }

    /// Start removing `member`. At most one removal runs at a time.
    pub fn remove_member(&mut self, member: &MemberStat) -> Result<RosterRequest, RemovalError> {
        if self.removal.is_some() {
            debug!(member = %member.address, "removal rejected, another is in flight");
            return Err(RemovalError::Busy);
        }
        let Some(account) = self.account.clone() else {
            return Err(RemovalError::NoAccount);
        };
        if !self.can_remove(member) {
            return Err(RemovalError::NotPermitted);
        }

        info!(
            chain = %self.chain,
            competition = %self.team.competition_index(),
            leader = %self.team.leader_address(),
            member = %member.address,
            "submitting member removal"
        );
        self.removal = Some(RemovalRequest {
            acting_account: account,
            target: member.clone(),
        });
        Ok(RosterRequest::SubmitRemoval {
            competition_index: self.team.competition_index(),
            leader: self.team.leader_address().clone(),
            member: member.address.clone(),
            notice: self.notice.clone(),
        })
    }

    /// Membership changed elsewhere; notify the owner and reload the page.
    pub fn revalidate(&mut self) -> RosterRequest {
        self.events.push_back(RosterEvent::MembersChanged);
        self.load_roster_page()
    }

    /// Accept a refreshed snapshot of the same team. The page is clamped to
    /// the new member count and reloaded.
    pub fn replace_team(&mut self, team: Team) -> Option<RosterRequest> {
        if team.leader_address() != self.team.leader_address()
            || team.competition_index() != self.team.competition_index()
        {
            warn!(
                expected = %self.team.leader_address(),
                got = %team.leader_address(),
                "ignoring snapshot of a different team"
            );
            return None;
        }
        if self.pagination.set_total(team.members().len()) {
            debug!(page = self.pagination.page(), "page clamped after team change");
        }
        self.team = team;
        Some(self.load_roster_page())
    }

    pub fn drain_events(&mut self) -> Vec<RosterEvent> {
        self.events.drain(..).collect()
    }

    /// Fold a collaborator result into the controller. Returns any follow-up
    /// requests.
    pub fn apply(&mut self, outcome: RosterOutcome) -> Vec<RosterRequest> {
        match outcome {
            RosterOutcome::CompetitionLoaded(result) => {
                self.on_competition(result);
                Vec::new()
            }
            RosterOutcome::AccountTeamLoaded { account, result } => {
                self.on_account_team(account, result);
                Vec::new()
            }
            RosterOutcome::PageLoaded { seq, result } => {
                self.on_page(seq, result);
                Vec::new()
            }
            RosterOutcome::RemovalSubmitted { tx } => {
                self.on_removal_submitted(tx);
                Vec::new()
            }
            RosterOutcome::RemovalFinished(result) => self.on_removal_finished(result),
        }
    }

    fn on_competition(&mut self, result: Result<Competition, SourceError>) {
        match result {
            Ok(competition) => {
                debug!(
                    index = %competition.index,
                    registration_active = competition.registration_active,
                    "competition loaded"
                );
                self.competition = Some(competition);
            }
            Err(e) => {
                warn!(error = %e, "failed to load competition");
                self.competition = None;
                self.events.push_back(RosterEvent::LoadFailed {
                    target: LoadTarget::Competition,
                    message: e.to_string(),
                });
            }
        }
    }

    fn on_account_team(&mut self, account: Address, result: Result<AccountTeam, GatewayError>) {
        if self.account.as_ref() != Some(&account) {
            debug!(%account, "discarding account team for another account");
            return;
        }
        match result {
            Ok(account_team) => self.account_team = Some(account_team),
            Err(e) => {
                warn!(%account, error = %e, "failed to load account team");
                self.events.push_back(RosterEvent::LoadFailed {
                    target: LoadTarget::AccountTeam,
                    message: e.to_string(),
                });
            }
        }
    }

    fn on_page(&mut self, seq: u64, result: Result<Vec<MemberStat>, SourceError>) {
        if self.latest_seq != Some(seq) {
            debug!(seq, latest = ?self.latest_seq, "discarding stale roster page");
            return;
        }
        match result {
            Ok(members) => {
                debug!(seq, count = members.len(), page = self.pagination.page(), "roster page loaded");
                self.members = members;
                self.load_state = LoadState::Ready;
            }
            Err(e) => {
                warn!(seq, error = %e, "failed to load roster page");
                self.members.clear();
                self.load_state = LoadState::Failed(e.to_string());
                self.events.push_back(RosterEvent::LoadFailed {
                    target: LoadTarget::Roster,
                    message: e.to_string(),
                });
            }
        }
    }

    fn on_removal_submitted(&mut self, tx: TxHash) {
        let Some(removal) = &self.removal else {
            warn!(%tx, "submission reported with no removal in flight");
            return;
        };
        info!(%tx, member = %removal.target.address, "{}", self.notice.sent);
        self.events.push_back(RosterEvent::RemovalSubmitted {
            member: removal.target.address.clone(),
            tx: tx.clone(),
            message: self.notice.sent.clone(),
        });
        self.pending_tx = Some(tx);
    }

    fn on_removal_finished(&mut self, result: Result<Receipt, RemovalError>) -> Vec<RosterRequest> {
        let Some(removal) = self.removal.take() else {
            warn!("removal result arrived with no removal in flight");
            return Vec::new();
        };
        self.pending_tx = None;
        let member = removal.target.address;

        match result {
            Ok(receipt) if receipt.is_success() => {
                info!(tx = %receipt.tx, %member, "{}", self.notice.success);
                self.events.push_back(RosterEvent::RemovalConfirmed {
                    member,
                    tx: receipt.tx,
                    message: self.notice.success.clone(),
                });
                self.events.push_back(RosterEvent::MembersChanged);
                vec![self.load_roster_page()]
            }
            Ok(receipt) => {
                warn!(tx = %receipt.tx, %member, "{} transaction reverted", self.notice.failed);
                self.events
                    .push_back(RosterEvent::RemovalFailed(RemovalError::Reverted { tx: receipt.tx }));
                Vec::new()
            }
            Err(e) => {
                warn!(%member, error = %e, "{}", self.notice.failed);
                self.events.push_back(RosterEvent::RemovalFailed(e));
                Vec::new()
            }
        }
    }
}
