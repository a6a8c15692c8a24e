//! Property tests for roster invariants.
//!
//! 1. Page bounds: `1 <= page <= max(page_count, 1)` under any navigation
//! 2. Page sizes: every page holds at most five members and pages partition the team
//! 3. Visibility: matches the role formula for any account and team
//! 4. Removal: the leader row is never removable

use std::sync::Arc;

use proptest::prelude::*;
use roster_core::controller::{
    can_remove, compute_visibility, drive, Pagination, PER_PAGE,
};
use roster_core::domain::AccountTeam;
use roster_core::source::SimulatedRegistry;
use roster_core::{
    Address, ChainId, Collaborators, Competition, CompetitionIndex, MemberStat, RosterController,
    Team,
};

const INDEX: CompetitionIndex = CompetitionIndex(0);

fn addr(n: u8) -> Address {
    format!("0x{:040x}", n).parse().unwrap()
}

// ── Strategies ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Nav {
    Next,
    Prev,
    Jump(u32),
}

fn arb_nav() -> impl Strategy<Value = Nav> {
    prop_oneof![
        Just(Nav::Next),
        Just(Nav::Prev),
        (0u32..12).prop_map(Nav::Jump),
    ]
}

fn arb_team() -> impl Strategy<Value = Team> {
    (1u8..=30).prop_map(|size| Team::new(addr(1), INDEX, (1..=size).map(addr)))
}

// ── 1. Page bounds ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn page_stays_in_bounds(
        total in 0usize..60,
        navs in prop::collection::vec(arb_nav(), 0..30),
        shrink_to in 0usize..60,
    ) {
        let mut p = Pagination::new(total, PER_PAGE);
        let count = (total as u32).div_ceil(PER_PAGE);
        prop_assert_eq!(p.page_count(), count);
        prop_assert_eq!(p.shows_controls(), count > 1);

        for nav in navs {
            match nav {
                Nav::Next => { if p.has_next() { p.go_to(p.page() + 1); } }
                Nav::Prev => { if p.has_previous() { p.go_to(p.page() - 1); } }
                Nav::Jump(n) => { p.go_to(n); }
            }
            prop_assert!(p.page() >= 1);
            prop_assert!(p.page() <= p.page_count().max(1));
        }

        p.set_total(shrink_to);
        prop_assert!(p.page() >= 1);
        prop_assert!(p.page() <= p.page_count().max(1));
    }
}

// ── 2. Page sizes ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pages_partition_the_team(team in arb_team()) {
        let registry = Arc::new(SimulatedRegistry::new());
        registry.add_competition(ChainId::ArbitrumTestnet, Competition::new(INDEX, true));
        registry.add_team(ChainId::ArbitrumTestnet, &team);
        let collaborators = Collaborators::simulated(registry);

        let mut controller = RosterController::new(ChainId::ArbitrumTestnet, team.clone(), None);
        let requests = controller.start();
        drive(&mut controller, &collaborators, requests);

        let mut seen: Vec<Address> = Vec::new();
        let mut ranks: Vec<usize> = Vec::new();
        loop {
            let rows = controller.rows();
            prop_assert!(rows.len() <= PER_PAGE as usize);
            prop_assert!(!rows.is_empty());
            ranks.extend(rows.iter().map(|r| r.rank));
            seen.extend(rows.iter().map(|r| r.stat.address.clone()));
            match controller.next_page() {
                Some(request) => drive(&mut controller, &collaborators, [request]),
                None => break,
            }
        }

        prop_assert_eq!(seen.len(), team.members().len());
        prop_assert_eq!(ranks, (1..=team.members().len()).collect::<Vec<_>>());
        for member in team.members() {
            prop_assert!(seen.contains(member));
        }
    }
}

// ── 3. Visibility ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn visibility_matches_role_formula(
        registration_active in any::<bool>(),
        account in prop::option::of(1u8..6),
        has_team in any::<bool>(),
        account_leader in prop::option::of(1u8..6),
    ) {
        let team = Team::new(addr(1), INDEX, vec![addr(1), addr(2), addr(3)]);
        let competition = Competition::new(INDEX, registration_active);
        let account = account.map(addr);
        let account_team = AccountTeam { has_team, leader: account_leader.map(addr) };

        let expected = registration_active
            && account.as_ref().is_some_and(|a| {
                *a == addr(1) || !has_team || account_team.leader.as_ref() == Some(&addr(1))
            });
        prop_assert_eq!(
            compute_visibility(account.as_ref(), &team, &competition, &account_team),
            expected
        );
    }

    // ── 4. Removal ───────────────────────────────────────────────────

    #[test]
    fn leader_is_never_removable(
        viewer in 1u8..6,
        registration_active in any::<bool>(),
        pnl in -1e6..1e6_f64,
    ) {
        let team = Team::new(addr(1), INDEX, vec![addr(1), addr(2), addr(3)]);
        let competition = Competition::new(INDEX, registration_active);
        let leader = MemberStat { address: addr(1), pnl };
        prop_assert!(!can_remove(Some(&addr(viewer)), &leader, &team, &competition));

        let other = MemberStat { address: addr(2), pnl };
        prop_assert_eq!(
            can_remove(Some(&addr(viewer)), &other, &team, &competition),
            viewer == 1 && registration_active
        );
    }
}
