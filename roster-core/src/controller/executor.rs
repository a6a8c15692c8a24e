//! Executes [`RosterRequest`]s against the collaborators.
//!
//! Front-ends run [`execute`] on a worker thread; the CLI and tests use
//! [`drive`] to run a controller to quiescence on the current thread.

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::{RemovalError, RosterController, RosterOutcome, RosterRequest};
use crate::chain::ChainId;
use crate::source::Collaborators;

/// Guarantees exactly one `RemovalFinished` per removal, even if the
/// gateway panics or the job is dropped partway.
struct FinishGuard<'a> {
    deliver: &'a mut dyn FnMut(RosterOutcome),
    finished: bool,
}

impl<'a> FinishGuard<'a> {
    fn new(deliver: &'a mut dyn FnMut(RosterOutcome)) -> Self {
        Self {
            deliver,
            finished: false,
        }
    }

    fn progress(&mut self, outcome: RosterOutcome) {
        (self.deliver)(outcome);
    }

    fn finish(mut self, result: Result<crate::domain::Receipt, RemovalError>) {
        self.finished = true;
        (self.deliver)(RosterOutcome::RemovalFinished(result));
    }
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("removal job ended without a result");
            (self.deliver)(RosterOutcome::RemovalFinished(Err(RemovalError::Abandoned)));
        }
    }
}

/// Run one request, handing every outcome it produces to `deliver`.
pub fn execute(
    collaborators: &Collaborators,
    chain: ChainId,
    request: RosterRequest,
    deliver: &mut dyn FnMut(RosterOutcome),
) {
    match request {
        RosterRequest::LoadCompetition { competition_index } => {
            let result = collaborators.competitions.competition(chain, competition_index);
            deliver(RosterOutcome::CompetitionLoaded(result));
        }
        RosterRequest::LoadAccountTeam {
            competition_index,
            account,
        } => {
            let result = collaborators
                .membership
                .account_team(chain, competition_index, &account);
            deliver(RosterOutcome::AccountTeamLoaded { account, result });
        }
        RosterRequest::LoadPage {
            seq,
            competition_index,
            leader,
            page,
            per_page,
        } => {
            let result = collaborators.stats.team_members_stats(
                chain,
                competition_index,
                &leader,
                page,
                per_page,
            );
            deliver(RosterOutcome::PageLoaded { seq, result });
        }
        RosterRequest::SubmitRemoval {
            competition_index,
            leader,
            member,
            notice,
        } => {
            let mut guard = FinishGuard::new(deliver);
            let gateway = &collaborators.membership;

            let tx = match gateway.remove_member(chain, competition_index, &leader, &member, &notice)
            {
                Ok(tx) => tx,
                Err(e) => {
                    guard.finish(Err(RemovalError::Submission(e)));
                    return;
                }
            };
            guard.progress(RosterOutcome::RemovalSubmitted { tx: tx.clone() });

            debug!(%tx, "waiting for removal receipt");
            let result = gateway
                .wait_for_receipt(chain, &tx)
                .map_err(RemovalError::Confirmation);
            guard.finish(result);
        }
    }
}

/// Execute `requests` and every follow-up they cause, applying outcomes to
/// `controller` in order, until nothing is left to do.
pub fn drive(
    controller: &mut RosterController,
    collaborators: &Collaborators,
    requests: impl IntoIterator<Item = RosterRequest>,
) {
    let chain = controller.chain();
    let mut queue: VecDeque<RosterRequest> = requests.into_iter().collect();
    while let Some(request) = queue.pop_front() {
        let mut outcomes = Vec::new();
        execute(collaborators, chain, request, &mut |outcome| outcomes.push(outcome));
        for outcome in outcomes {
            queue.extend(controller.apply(outcome));
        }
    }
}
