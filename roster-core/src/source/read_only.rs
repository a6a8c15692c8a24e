//! Gateway used when no signer is attached: the account's team comes from
//! indexed data and writes are refused.

use std::fmt;
use std::sync::Arc;

use super::{AccountTeamSource, GatewayError, MembershipGateway};
use crate::chain::ChainId;
use crate::domain::{AccountTeam, Address, CompetitionIndex, Receipt, TxHash, TxNotice};

#[derive(Clone)]
pub struct ReadOnlyGateway {
    teams: Arc<dyn AccountTeamSource>,
}

impl ReadOnlyGateway {
    pub fn new(teams: Arc<dyn AccountTeamSource>) -> Self {
        Self { teams }
    }
}

impl fmt::Debug for ReadOnlyGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyGateway")
            .field("teams", &self.teams.name())
            .finish()
    }
}

impl MembershipGateway for ReadOnlyGateway {
    fn name(&self) -> &str {
        "read_only"
    }

    fn account_team(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> Result<AccountTeam, GatewayError> {
        self.teams
            .team_of(chain, competition_index, account)
            .map_err(|e| GatewayError::Unreachable(e.to_string()))
    }

    fn remove_member(
        &self,
        _chain: ChainId,
        _competition_index: CompetitionIndex,
        _leader: &Address,
        _member: &Address,
        _notice: &TxNotice,
    ) -> Result<TxHash, GatewayError> {
        Err(GatewayError::Unsupported("remove_member requires a signer"))
    }

    fn wait_for_receipt(&self, _chain: ChainId, tx: &TxHash) -> Result<Receipt, GatewayError> {
        Err(GatewayError::UnknownTransaction(tx.clone()))
    }
}
