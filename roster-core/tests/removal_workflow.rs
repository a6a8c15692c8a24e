//! End-to-end roster scenarios against the simulated registry.
//!
//! Each scenario drives a controller to quiescence with `drive`, the same
//! way the CLI does, and checks what the view would observe.

use std::sync::Arc;

use roster_core::controller::{drive, execute, LoadTarget};
use roster_core::source::{Fault, SimulatedRegistry};
use roster_core::{
    Address, ChainId, Collaborators, Competition, CompetitionIndex, LoadState, RemovalError,
    RosterController, RosterEvent, RosterOutcome, RosterRequest, Team,
};

const CHAIN: ChainId = ChainId::ArbitrumTestnet;
const INDEX: CompetitionIndex = CompetitionIndex(0);

fn addr(n: u8) -> Address {
    format!("0x{:040x}", n).parse().unwrap()
}

/// Team led by `addr(1)` with members `addr(1)..=addr(size)`. PnL falls with
/// the address so ranks follow member numbers.
fn setup(size: u8, registration_active: bool) -> (Arc<SimulatedRegistry>, Collaborators, Team) {
    let registry = Arc::new(SimulatedRegistry::new());
    registry.add_competition(CHAIN, Competition::new(INDEX, registration_active));
    let team = Team::new(addr(1), INDEX, (1..=size).map(addr));
    registry.add_team(CHAIN, &team);
    for n in 1..=size {
        registry.set_pnl(CHAIN, INDEX, &addr(n), 1_000.0 - f64::from(n) * 10.0);
    }
    let collaborators = Collaborators::simulated(registry.clone());
    (registry, collaborators, team)
}

fn mounted(collaborators: &Collaborators, team: Team, account: u8) -> RosterController {
    let mut controller = RosterController::new(CHAIN, team, Some(addr(account)));
    let requests = controller.start();
    drive(&mut controller, collaborators, requests);
    controller
}

fn shown(controller: &RosterController) -> Vec<Address> {
    controller.roster().0.iter().map(|m| m.address.clone()).collect()
}

fn members_changed(events: &[RosterEvent]) -> usize {
    events
        .iter()
        .filter(|e| **e == RosterEvent::MembersChanged)
        .count()
}

#[test]
fn leader_removes_member_and_roster_refreshes() {
    // GIVEN team [L, A, B] viewed by its leader during registration
    let (registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);
    assert_eq!(shown(&controller), vec![addr(1), addr(2), addr(3)]);
    assert!(controller.show_manage_controls());

    // WHEN the leader removes A and the receipt succeeds
    let a = controller.roster().0[1].clone();
    let request = controller.remove_member(&a).expect("leader may remove A");
    drive(&mut controller, &collaborators, [request]);

    // THEN the re-fetched page excludes A and the owner is told exactly once
    assert_eq!(shown(&controller), vec![addr(1), addr(3)]);
    assert_eq!(controller.roster().1, &LoadState::Ready);
    assert!(!controller.is_removing());
    let events = controller.drain_events();
    assert_eq!(members_changed(&events), 1);
    assert!(matches!(
        events.as_slice(),
        [
            RosterEvent::RemovalSubmitted { .. },
            RosterEvent::RemovalConfirmed { .. },
            RosterEvent::MembersChanged,
        ]
    ));
    assert_eq!(registry.remove_calls(), 1);
}

#[test]
fn reverted_removal_leaves_roster_unchanged() {
    // GIVEN team [L, A, B] and a contract that will revert
    let (registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);
    registry.inject(Fault::RevertReceipt);
    let stats_before = registry.stats_calls();

    // WHEN the leader removes A
    let a = controller.roster().0[1].clone();
    let request = controller.remove_member(&a).unwrap();
    drive(&mut controller, &collaborators, [request]);

    // THEN nothing changes, the busy flag is released and no refresh happens
    assert_eq!(shown(&controller), vec![addr(1), addr(2), addr(3)]);
    assert!(!controller.is_removing());
    assert_eq!(registry.stats_calls(), stats_before);
    let events = controller.drain_events();
    assert_eq!(members_changed(&events), 0);
    assert!(events
        .iter()
        .any(|e| matches!(e, RosterEvent::RemovalFailed(RemovalError::Reverted { .. }))));
}

#[test]
fn second_removal_while_busy_is_rejected() {
    let (registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);
    let a = controller.roster().0[1].clone();
    let b = controller.roster().0[2].clone();

    // WHEN two removals are triggered before the first completes
    let first = controller.remove_member(&a).unwrap();
    let second = controller.remove_member(&b);

    // THEN the second is refused and only one contract call is made
    assert_eq!(second, Err(RemovalError::Busy));
    drive(&mut controller, &collaborators, [first]);
    assert_eq!(registry.remove_calls(), 1);
    assert_eq!(shown(&controller), vec![addr(1), addr(3)]);

    // AND the control is usable again afterwards
    assert!(controller.remove_member(&b).is_ok());
}

#[test]
fn rejected_submission_surfaces_and_releases_busy() {
    let (registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);
    registry.inject(Fault::RejectSubmission);

    let a = controller.roster().0[1].clone();
    let request = controller.remove_member(&a).unwrap();
    drive(&mut controller, &collaborators, [request]);

    assert!(!controller.is_removing());
    assert_eq!(shown(&controller).len(), 3);
    let events = controller.drain_events();
    assert!(matches!(
        events.as_slice(),
        [RosterEvent::RemovalFailed(RemovalError::Submission(_))]
    ));
}

#[test]
fn failed_confirmation_surfaces_and_releases_busy() {
    let (registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);
    registry.inject(Fault::FailConfirmation);

    let a = controller.roster().0[1].clone();
    let request = controller.remove_member(&a).unwrap();
    drive(&mut controller, &collaborators, [request]);

    assert!(!controller.is_removing());
    assert_eq!(controller.pending_tx(), None);
    let events = controller.drain_events();
    assert_eq!(members_changed(&events), 0);
    assert!(matches!(
        events.last(),
        Some(RosterEvent::RemovalFailed(RemovalError::Confirmation(_)))
    ));
}

#[test]
fn six_member_team_shows_one_member_on_page_two() {
    let (_registry, collaborators, team) = setup(6, true);
    let mut controller = mounted(&collaborators, team, 1);
    assert_eq!(controller.roster().0.len(), 5);
    assert_eq!(controller.pagination().page_count(), 2);

    let request = controller.next_page().expect("page 2 exists");
    drive(&mut controller, &collaborators, [request]);

    assert_eq!(shown(&controller), vec![addr(6)]);
    let rows = controller.rows();
    assert_eq!(rows[0].rank, 6);
}

#[test]
fn slow_earlier_page_does_not_overwrite_newer_one() {
    let (_registry, collaborators, team) = setup(12, true);
    let mut controller = mounted(&collaborators, team, 1);

    // GIVEN requests for page 2 then page 3 in flight
    let page_two = controller.set_page(2).unwrap();
    let page_three = controller.set_page(3).unwrap();

    // WHEN page 3 answers first and page 2 arrives late
    let mut outcomes = Vec::new();
    execute(&collaborators, CHAIN, page_three, &mut |o| outcomes.push(o));
    execute(&collaborators, CHAIN, page_two, &mut |o| outcomes.push(o));
    for outcome in outcomes {
        controller.apply(outcome);
    }

    // THEN the view keeps page 3
    assert_eq!(controller.pagination().page(), 3);
    assert_eq!(shown(&controller), vec![addr(11), addr(12)]);
}

#[test]
fn failed_load_is_distinct_from_empty_roster() {
    let (registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);

    registry.inject(Fault::FailStats);
    let request = controller.load_roster_page();
    drive(&mut controller, &collaborators, [request]);
    assert!(matches!(controller.roster().1, LoadState::Failed(_)));
    assert!(matches!(
        controller.drain_events().as_slice(),
        [RosterEvent::LoadFailed { target: LoadTarget::Roster, .. }]
    ));

    // A team the indexer knows nothing about loads fine, just empty.
    let ghost = Team::new(addr(50), INDEX, vec![addr(50)]);
    let controller = mounted(&collaborators, ghost, 50);
    assert_eq!(controller.roster(), (&[][..], &LoadState::Ready));
}

#[test]
fn closed_registration_hides_every_affordance() {
    let (_registry, collaborators, team) = setup(3, false);
    let mut controller = mounted(&collaborators, team, 1);
    assert!(!controller.show_manage_controls());
    assert!(controller.rows().iter().all(|row| !row.removable));

    let a = controller.roster().0[1].clone();
    assert_eq!(controller.remove_member(&a), Err(RemovalError::NotPermitted));
}

#[test]
fn member_of_another_team_sees_no_header() {
    let (registry, collaborators, team) = setup(3, true);
    registry.add_team(CHAIN, &Team::new(addr(20), INDEX, vec![addr(20), addr(21)]));

    let outsider = mounted(&collaborators, team.clone(), 21);
    assert_eq!(outsider.account_team().and_then(|t| t.leader.clone()), Some(addr(20)));
    assert!(!outsider.show_manage_controls());

    let own_member = mounted(&collaborators, team.clone(), 2);
    assert!(own_member.show_manage_controls());
    assert!(own_member.rows().iter().all(|row| !row.removable));

    let free_agent = mounted(&collaborators, team, 40);
    assert!(free_agent.show_manage_controls());
}

#[test]
fn refreshed_team_snapshot_clamps_page() {
    // GIVEN a six-member team viewed on page 2
    let (_registry, collaborators, team) = setup(6, true);
    let mut controller = mounted(&collaborators, team, 1);
    let request = controller.set_page(2).unwrap();
    drive(&mut controller, &collaborators, [request]);

    // WHEN the only member on page 2 is removed and the owner refreshes the team
    let last = controller.roster().0[0].clone();
    let request = controller.remove_member(&last).unwrap();
    drive(&mut controller, &collaborators, [request]);
    assert!(controller.roster().0.is_empty());
    assert_eq!(members_changed(&controller.drain_events()), 1);

    let refreshed = collaborators
        .teams
        .team(CHAIN, INDEX, &addr(1))
        .unwrap()
        .expect("team still exists");
    let request = controller.replace_team(refreshed).unwrap();
    assert!(matches!(request, RosterRequest::LoadPage { page: 1, .. }));
    drive(&mut controller, &collaborators, [request]);

    // THEN the view falls back to page 1 with the remaining five members
    assert_eq!(controller.pagination().page(), 1);
    assert_eq!(controller.pagination().page_count(), 1);
    assert_eq!(controller.roster().0.len(), 5);
}

#[test]
fn outcomes_after_abandonment_do_not_wedge_the_controller() {
    let (_registry, collaborators, team) = setup(3, true);
    let mut controller = mounted(&collaborators, team, 1);
    let a = controller.roster().0[1].clone();
    controller.remove_member(&a).unwrap();

    controller.apply(RosterOutcome::RemovalFinished(Err(RemovalError::Abandoned)));
    assert!(!controller.is_removing());
    assert!(matches!(
        controller.drain_events().as_slice(),
        [RosterEvent::RemovalFailed(RemovalError::Abandoned)]
    ));
}
