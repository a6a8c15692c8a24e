//! In-memory registry that plays the contract, the indexer, and the competition
//! registry at once.
//!
//! Used by the demo front-ends and by tests. Membership changes land only when
//! a removal's receipt is collected, the way a chain applies state at
//! finality. Faults can be queued to exercise rejected, reverted, and failed
//! paths.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    AccountTeamSource, CompetitionSource, GatewayError, MembershipGateway, RosterStatsSource,
    SourceError, TeamSource,
};
use crate::chain::ChainId;
use crate::domain::{
    AccountTeam, Address, Competition, CompetitionIndex, MemberStat, Receipt, Team, TxHash,
    TxNotice, TxStatus,
};

/// One-shot failure injected into the next matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Next `remove_member` is refused before a transaction exists.
    RejectSubmission,
    /// Next receipt comes back with status 0.
    RevertReceipt,
    /// Next `wait_for_receipt` errors out.
    FailConfirmation,
    /// Next stats query errors out.
    FailStats,
    /// Next competition query errors out.
    FailCompetition,
}

type TeamKey = (ChainId, CompetitionIndex, Address);

#[derive(Debug)]
struct PendingRemoval {
    chain: ChainId,
    competition_index: CompetitionIndex,
    leader: Address,
    member: Address,
    reverts: bool,
}

#[derive(Debug, Default)]
struct State {
    competitions: HashMap<(ChainId, CompetitionIndex), Competition>,
    /// Roster per team, leader first.
    teams: HashMap<TeamKey, Vec<Address>>,
    pnl: HashMap<TeamKey, f64>,
    pending: HashMap<TxHash, PendingRemoval>,
    faults: VecDeque<Fault>,
    nonce: u64,
    remove_calls: usize,
    stats_calls: usize,
}

impl State {
    fn take_fault(&mut self, fault: Fault) -> bool {
        match self.faults.iter().position(|f| *f == fault) {
            Some(pos) => {
                self.faults.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Thread-safe simulated registry.
#[derive(Debug, Default)]
pub struct SimulatedRegistry {
    state: Mutex<State>,
    latency: Duration,
}

impl SimulatedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside each gateway and stats call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seeded demo data: `teams` teams of `members_per_team` on one competition.
    ///
    /// Returns the registry and the generated teams, leaders first.
    pub fn demo(
        chain: ChainId,
        competition: Competition,
        teams: usize,
        members_per_team: usize,
        seed: u64,
    ) -> (Self, Vec<Team>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let registry = Self::new();
        let index = competition.index;
        registry.add_competition(chain, competition);

        let random_address = |rng: &mut StdRng| -> Address {
            let seed: [u8; 32] = rng.gen();
            let digest = blake3::hash(&seed);
            format!("0x{}", &digest.to_hex()[..40])
                .parse()
                .expect("40 hex digits always parse")
        };

        let mut built = Vec::with_capacity(teams);
        for _ in 0..teams {
            let leader = random_address(&mut rng);
            let members: Vec<Address> = std::iter::once(leader.clone())
                .chain((1..members_per_team.max(1)).map(|_| random_address(&mut rng)))
                .collect();
            let team = Team::new(leader, index, members);
            for member in team.members() {
                let pnl = (rng.gen_range(-5_000.0..15_000.0_f64) * 100.0).round() / 100.0;
                registry.set_pnl(chain, index, member, pnl);
            }
            registry.add_team(chain, &team);
            built.push(team);
        }
        (registry, built)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }

    pub fn add_competition(&self, chain: ChainId, competition: Competition) {
        self.lock()
            .competitions
            .insert((chain, competition.index), competition);
    }

    pub fn set_registration_active(&self, chain: ChainId, index: CompetitionIndex, active: bool) {
        if let Some(c) = self.lock().competitions.get_mut(&(chain, index)) {
            c.registration_active = active;
        }
    }

    pub fn add_team(&self, chain: ChainId, team: &Team) {
        let key = (chain, team.competition_index(), team.leader_address().clone());
        self.lock().teams.insert(key, team.members().to_vec());
    }

    pub fn set_pnl(&self, chain: ChainId, index: CompetitionIndex, account: &Address, pnl: f64) {
        self.lock().pnl.insert((chain, index, account.clone()), pnl);
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push_back(fault);
    }

    /// Number of `remove_member` submissions seen so far.
    pub fn remove_calls(&self) -> usize {
        self.lock().remove_calls
    }

    pub fn stats_calls(&self) -> usize {
        self.lock().stats_calls
    }

    /// Leaders of every team in a competition.
    pub fn leaders(&self, chain: ChainId, index: CompetitionIndex) -> Vec<Address> {
        let mut leaders: Vec<Address> = self
            .lock()
            .teams
            .keys()
            .filter(|(c, i, _)| *c == chain && *i == index)
            .map(|(_, _, leader)| leader.clone())
            .collect();
        leaders.sort();
        leaders
    }

    fn team_of_account(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> AccountTeam {
        let state = self.lock();
        state
            .teams
            .iter()
            .find(|((c, i, _), members)| {
                *c == chain && *i == competition_index && members.contains(account)
            })
            .map(|((_, _, leader), _)| AccountTeam::led_by(leader.clone()))
            .unwrap_or_default()
    }

    fn next_tx_hash(state: &mut State, parts: &str) -> TxHash {
        state.nonce += 1;
        let digest = blake3::hash(format!("{parts}:{}", state.nonce).as_bytes());
        format!("0x{}", digest.to_hex())
            .parse()
            .expect("blake3 digests are 64 hex digits")
    }
}

impl CompetitionSource for SimulatedRegistry {
    fn name(&self) -> &str {
        "simulated"
    }

    fn competition(
        &self,
        chain: ChainId,
        index: CompetitionIndex,
    ) -> Result<Competition, SourceError> {
        let mut state = self.lock();
        if state.take_fault(Fault::FailCompetition) {
            return Err(SourceError::NetworkUnreachable("simulated outage".into()));
        }
        state
            .competitions
            .get(&(chain, index))
            .cloned()
            .ok_or(SourceError::CompetitionNotFound(index))
    }
}

impl RosterStatsSource for SimulatedRegistry {
    fn name(&self) -> &str {
        "simulated"
    }

    fn team_members_stats(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<MemberStat>, SourceError> {
        self.simulate_latency();
        let mut state = self.lock();
        state.stats_calls += 1;
        if state.take_fault(Fault::FailStats) {
            return Err(SourceError::Http(502));
        }

        let key = (chain, competition_index, leader.clone());
        let Some(members) = state.teams.get(&key) else {
            return Ok(Vec::new());
        };

        let mut stats: Vec<MemberStat> = members
            .iter()
            .map(|address| MemberStat {
                address: address.clone(),
                pnl: state
                    .pnl
                    .get(&(chain, competition_index, address.clone()))
                    .copied()
                    .unwrap_or(0.0),
            })
            .collect();
        stats.sort_by(|a, b| b.pnl.total_cmp(&a.pnl).then_with(|| a.address.cmp(&b.address)));

        let skip = (page.saturating_sub(1) as usize) * per_page as usize;
        Ok(stats.into_iter().skip(skip).take(per_page as usize).collect())
    }
}

impl TeamSource for SimulatedRegistry {
    fn name(&self) -> &str {
        "simulated"
    }

    fn team(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
    ) -> Result<Option<Team>, SourceError> {
        let state = self.lock();
        Ok(state
            .teams
            .get(&(chain, competition_index, leader.clone()))
            .map(|members| Team::new(leader.clone(), competition_index, members.iter().cloned())))
    }
}

impl AccountTeamSource for SimulatedRegistry {
    fn name(&self) -> &str {
        "simulated"
    }

    fn team_of(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> Result<AccountTeam, SourceError> {
        Ok(self.team_of_account(chain, competition_index, account))
    }
}

impl MembershipGateway for SimulatedRegistry {
    fn name(&self) -> &str {
        "simulated"
    }

    fn account_team(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> Result<AccountTeam, GatewayError> {
        Ok(self.team_of_account(chain, competition_index, account))
    }

    fn remove_member(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
        member: &Address,
        notice: &TxNotice,
    ) -> Result<TxHash, GatewayError> {
        self.simulate_latency();
        let mut state = self.lock();
        state.remove_calls += 1;
        if state.take_fault(Fault::RejectSubmission) {
            return Err(GatewayError::Rejected("user denied transaction signature".into()));
        }

        // The contract reverts on invalid removals; the transaction still gets mined.
        let registration_open = state
            .competitions
            .get(&(chain, competition_index))
            .map(|c| c.registration_active)
            .unwrap_or(false);
        let is_member = state
            .teams
            .get(&(chain, competition_index, leader.clone()))
            .map(|m| m.contains(member))
            .unwrap_or(false);
        let reverts = state.take_fault(Fault::RevertReceipt)
            || !registration_open
            || !is_member
            || leader == member;

        let tx = Self::next_tx_hash(
            &mut state,
            &format!("{chain}:{competition_index}:{leader}:{member}"),
        );
        state.pending.insert(
            tx.clone(),
            PendingRemoval {
                chain,
                competition_index,
                leader: leader.clone(),
                member: member.clone(),
                reverts,
            },
        );
        tracing::info!(%tx, %member, "{}", notice.sent);
        Ok(tx)
    }

    fn wait_for_receipt(&self, chain: ChainId, tx: &TxHash) -> Result<Receipt, GatewayError> {
        self.simulate_latency();
        let mut state = self.lock();
        if state.take_fault(Fault::FailConfirmation) {
            state.pending.remove(tx);
            return Err(GatewayError::Confirmation("receipt polling timed out".into()));
        }

        let pending = state
            .pending
            .remove(tx)
            .filter(|p| p.chain == chain)
            .ok_or_else(|| GatewayError::UnknownTransaction(tx.clone()))?;

        if pending.reverts {
            return Ok(Receipt {
                tx: tx.clone(),
                status: TxStatus::Reverted,
            });
        }

        let key = (pending.chain, pending.competition_index, pending.leader);
        if let Some(members) = state.teams.get_mut(&key) {
            members.retain(|m| *m != pending.member);
        }
        Ok(Receipt {
            tx: tx.clone(),
            status: TxStatus::Success,
        })
    }
}
