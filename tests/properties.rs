//! Property tests over random decision sequences from a mixed pool of principals.

use membership_approval::error::{Error, TransitionError};
use membership_approval::identity::Principal;
use membership_approval::service::{ApplicationService, ListFilter, ListingService, SubmitRequest};
use membership_approval::state::{can_act, visibility, Application, MemberType, Status};
use membership_approval::storage::{ApplicationStore, MemoryStorage};
use proptest::prelude::*;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn principals() -> Vec<Principal> {
    vec![
        Principal::block_admin("b-haveli", "Asha", "Maharashtra", "Pune", "Haveli"),
        Principal::block_admin("b-mulshi", "Ravi", "Maharashtra", "Pune", "Mulshi"),
        Principal::district_admin("d-pune", "Vikram", "Maharashtra", "Pune"),
        Principal::district_admin("d-nashik", "Sunil", "Maharashtra", "Nashik"),
        Principal::state_admin("s-mh", "Meera", "Maharashtra"),
        Principal::state_admin("s-ka", "Anil", "Karnataka"),
        Principal::super_admin("root", "Root"),
        Principal::member("user-1", "Kiran"),
        Principal::member("user-2", "Neha"),
    ]
}

const LOCATIONS: [(&str, &str, &str); 4] = [
    ("Maharashtra", "Pune", "Haveli"),
    ("Maharashtra", "Pune", "Mulshi"),
    ("Maharashtra", "Nashik", "Sinnar"),
    ("Karnataka", "Mysuru", "Hunsur"),
];

/// (principal index, approve?) pairs.
fn arb_decisions() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0usize..9, any::<bool>()), 0..24)
}

fn seeded(location: usize) -> (ApplicationService, ListingService, Application) {
    let store: Arc<dyn ApplicationStore> = Arc::new(MemoryStorage::new());
    let service = ApplicationService::new(store.clone());
    let listing = ListingService::new(store);
    let (state, district, block) = LOCATIONS[location];
    let app = service
        .submit(
            &Principal::member("user-1", "Kiran"),
            SubmitRequest {
                member_type: MemberType::Business,
                state: state.to_string(),
                district: district.to_string(),
                block: block.to_string(),
                city: "Town".to_string(),
            },
        )
        .unwrap();
    (service, listing, app)
}

fn next_rank(status: Status) -> Option<u8> {
    status.rank().map(|r| r + 1)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Status only moves forward by exactly one stage, or to rejected, and
    /// terminal records never change again.
    #[test]
    fn status_moves_forward_one_stage_at_a_time(
        location in 0usize..4,
        decisions in arb_decisions(),
    ) {
        let pool = principals();
        let (service, _, app) = seeded(location);
        let mut current = app;

        for (who, approve) in decisions {
            let actor = &pool[who];
            let result = if approve {
                service.approve(actor, &current.application_id, None)
            } else {
                service.reject(actor, &current.application_id, None)
            };

            match result {
                Ok(next) => {
                    prop_assert!(!current.status.is_terminal());
                    prop_assert!(can_act(actor, &current));
                    if approve {
                        prop_assert_eq!(next.status.rank(), next_rank(current.status));
                    } else {
                        prop_assert_eq!(next.status, Status::Rejected);
                    }
                    prop_assert_eq!(next.version, current.version + 1);
                    prop_assert_eq!(next.approval_history.len(), current.approval_history.len() + 1);
                    prop_assert_eq!(&next.approval_history[..current.approval_history.len()], &current.approval_history[..]);
                    current = next;
                }
                Err(Error::Transition(TransitionError::TerminalState(status))) => {
                    prop_assert_eq!(status, current.status);
                    prop_assert!(current.status.is_terminal());
                }
                Err(Error::Transition(TransitionError::InvalidStage { .. })) => {
                    prop_assert!(can_act(actor, &current));
                }
                Err(Error::Forbidden(_)) => {
                    prop_assert!(!can_act(actor, &current));
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }

    /// A successful decision always comes from an admin of the pending level
    /// whose scope covers the application.
    #[test]
    fn only_jurisdictional_admin_of_pending_level_decides(
        location in 0usize..4,
        decisions in arb_decisions(),
    ) {
        let pool = principals();
        let (service, _, app) = seeded(location);
        let mut current = app;

        for (who, approve) in decisions {
            let actor = &pool[who];
            let before = current.status;
            let result = if approve {
                service.approve(actor, &current.application_id, None)
            } else {
                service.reject(actor, &current.application_id, None)
            };
            if let Ok(next) = result {
                prop_assert!(visibility(actor).matches(&current));
                prop_assert_eq!(actor.role().level(), before.pending_level());
                current = next;
            }
        }
    }

    /// Everything a principal lists satisfies its visibility predicate.
    #[test]
    fn listing_stays_inside_visibility(
        location in 0usize..4,
        who in 0usize..9,
    ) {
        let pool = principals();
        let (_, listing, app) = seeded(location);
        let viewer = &pool[who];

        let apps = listing.list(viewer, &ListFilter::default()).unwrap();
        prop_assert_eq!(apps.len(), usize::from(visibility(viewer).matches(&app)));
        for listed in &apps {
            prop_assert!(visibility(viewer).matches(listed));
        }

        let stats = listing.stats(viewer).unwrap();
        prop_assert_eq!(stats.total, apps.len());
    }
}
