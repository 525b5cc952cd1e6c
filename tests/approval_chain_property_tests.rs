//! Property-based tests for approval chain visibility and revalidation
//!
//! This module uses proptest to verify that the chain logic behaves
//! correctly across arbitrary approval-state vectors. The sequential
//! gate and the edit revalidation rule are the two places a subtle bug
//! would silently corrupt the workflow, so both are checked against
//! independent reference predicates rather than against themselves.

use proptest::prelude::*;

use event_approval::event::{EventCategory, EventDetails, TimeStamp};
use event_approval::filter::{self, ListFilter};
use event_approval::proposal::{ApprovalStatus, EventProposal};
use event_approval::role::Role;

fn base_details(name: &str) -> EventDetails {
    EventDetails::new()
        .set_name(name)
        .set_club("Astronomy Club")
        .set_category(EventCategory::Technical)
        .set_venue("Observatory Lawn")
        .set_start_date(TimeStamp::new_with(2025, 11, 7, 19, 0, 0))
        .set_end_date(TimeStamp::new_with(2025, 11, 8, 2, 0, 0))
        .set_contact("Devika", "devika@campus.edu", "6666666666")
        .add_budget_line("telescope transport", 3_500)
        .set_expected_participants(60)
}

/// Strategy to generate a single step status
fn status_strategy() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::Pending),
        Just(ApprovalStatus::Approved),
        Just(ApprovalStatus::Rejected),
        Just(ApprovalStatus::Query),
    ]
}

/// Strategy to generate a full approval-state vector, one status per
/// hierarchy role
fn status_vector_strategy() -> impl Strategy<Value = Vec<ApprovalStatus>> {
    prop::collection::vec(status_strategy(), Role::hierarchy().len())
}

fn proposal_with(statuses: &[ApprovalStatus]) -> EventProposal {
    let mut proposal = EventProposal::new("user_owner".into(), base_details("Star Gazing")).unwrap();
    for (step, status) in proposal.approvals.iter_mut().zip(statuses) {
        step.status = *status;
    }
    proposal
}

/// Reference implementation of the pending-visibility rule, written
/// directly against the status vector.
fn reference_pending(statuses: &[ApprovalStatus], idx: usize) -> bool {
    statuses[..idx]
        .iter()
        .all(|s| *s == ApprovalStatus::Approved)
        && matches!(
            statuses[idx],
            ApprovalStatus::Pending | ApprovalStatus::Query
        )
}

proptest! {
    /// Property: a proposal appears in role R's pending list exactly when
    /// every role before R approved and R's own step awaits a decision.
    #[test]
    fn prop_pending_visibility_matches_predecessor_logic(
        statuses in status_vector_strategy()
    ) {
        let proposal = proposal_with(&statuses);

        for (idx, role) in Role::hierarchy().iter().enumerate() {
            prop_assert_eq!(
                filter::pending_for(&proposal, *role),
                reference_pending(&statuses, idx),
                "visibility mismatch for {} over {:?}",
                role,
                statuses
            );
        }
    }

    /// Property: oversight-only roles never have a pending list entry,
    /// whatever the chain looks like.
    #[test]
    fn prop_non_chain_roles_see_nothing(statuses in status_vector_strategy()) {
        let proposal = proposal_with(&statuses);
        prop_assert!(!filter::pending_for(&proposal, Role::Arsw));
    }

    /// Property: edit revalidation re-opens exactly the unsettled steps.
    ///
    /// Approved and queried steps must never change; every other
    /// non-owner step resets to pending with a cleared comment; the
    /// owner's step is never touched at all.
    #[test]
    fn prop_revalidation_reopens_exactly_the_unsettled_steps(
        statuses in status_vector_strategy()
    ) {
        let mut proposal = proposal_with(&statuses);
        for step in &mut proposal.approvals {
            step.comment = format!("decision note for {}", step.role);
        }
        let before = proposal.approvals.clone();

        proposal.reopen_unsettled_steps();

        for (old, new) in before.iter().zip(&proposal.approvals) {
            prop_assert_eq!(old.role, new.role);
            if old.role == Role::ClubSecretary {
                prop_assert_eq!(old, new, "owner step must never change");
            } else {
                match old.status {
                    ApprovalStatus::Approved | ApprovalStatus::Query => {
                        prop_assert_eq!(old, new, "settled step must survive an edit")
                    }
                    ApprovalStatus::Pending | ApprovalStatus::Rejected => {
                        prop_assert_eq!(new.status, ApprovalStatus::Pending);
                        prop_assert!(new.comment.is_empty());
                    }
                }
            }
        }
    }

    /// Property: CBOR round-trip preserves the whole document, chain
    /// state included.
    #[test]
    fn prop_cbor_roundtrip_preserves_chain(statuses in status_vector_strategy()) {
        let proposal = proposal_with(&statuses);

        let encoded = minicbor::to_vec(&proposal).unwrap();
        let decoded: EventProposal = minicbor::decode(&encoded).unwrap();

        prop_assert_eq!(proposal, decoded);
    }
}

// PAGINATION ENVELOPE PROPERTIES

proptest! {
    /// Property: pages partition the filtered set and the envelope is
    /// internally consistent for every page.
    #[test]
    fn prop_pagination_partitions_the_result_set(
        total in 0usize..60,
        limit in 1usize..20,
    ) {
        let items: Vec<EventProposal> = (0..total)
            .map(|i| {
                EventProposal::new(
                    "user_owner".into(),
                    base_details(&format!("event {i}")),
                )
                .unwrap()
            })
            .collect();

        let expected_pages = total.div_ceil(limit);
        let mut seen = 0usize;

        for page_no in 1..=expected_pages.max(1) {
            let page = filter::apply(
                items.clone(),
                &ListFilter {
                    limit: Some(limit),
                    page: Some(page_no),
                    ..ListFilter::default()
                },
            );

            prop_assert_eq!(page.pagination.total_count, total);
            prop_assert_eq!(page.pagination.total_pages, expected_pages);
            prop_assert_eq!(page.pagination.current_page, page_no);
            prop_assert_eq!(page.pagination.has_prev, page_no > 1 && expected_pages > 0);
            prop_assert_eq!(page.pagination.has_next, page_no < expected_pages);
            prop_assert!(page.applications.len() <= limit);

            // every page groups exactly its own applications
            let grouped: usize = page
                .grouped_by_semester
                .iter()
                .map(|(_, bucket)| bucket.len())
                .sum();
            prop_assert_eq!(grouped, page.applications.len());

            seen += page.applications.len();
        }

        prop_assert_eq!(seen, total);
    }
}
