//! Role checks for the roster's manage affordances.

use crate::domain::{AccountTeam, Address, Competition, MemberStat, Team};

/// Whether the manage-team header and controls are shown to `account`.
///
/// Leaders manage their own team, unaffiliated accounts see the controls
/// relevant to joining, members of this team see them too. Members of other
/// teams never do, and nothing is shown once registration has closed.
pub fn compute_visibility(
    account: Option<&Address>,
    team: &Team,
    competition: &Competition,
    account_team: &AccountTeam,
) -> bool {
    let Some(account) = account else {
        return false;
    };
    competition.registration_active
        && (team.is_leader(account)
            || !account_team.has_team
            || account_team.leader.as_ref() == Some(team.leader_address()))
}

/// Whether a remove control is offered for `member`.
///
/// Only the leader removes, never themselves, and only while registration is open.
pub fn can_remove(
    account: Option<&Address>,
    member: &MemberStat,
    team: &Team,
    competition: &Competition,
) -> bool {
    let Some(account) = account else {
        return false;
    };
    team.is_leader(account) && !team.is_leader(&member.address) && competition.registration_active
}
