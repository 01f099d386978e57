//! Property tests over random action sequences
//!
//! Every generated game starts from a seeded role assignment and then applies
//! a random mix of scans and exits, accepted or not. After each step the state
//! must still be well formed and consistent with what was accepted.

use gridfall::game::{
    assign_roles_with_rng, calculate_winners, resolve_exit, resolve_scan, validate_state,
    GameState, Role, HUNTER_COUNT, HUNT_LIMIT, ROSTER_SIZE, TARGET_COUNT,
};
use gridfall::settlement::{EconomicsConfig, PrizeDistribution, RemainderPolicy};
use gridfall::ParticipantId;
use proptest::prelude::*;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Clone)]
enum Step {
    Scan(usize, usize),
    Exit(usize),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..ROSTER_SIZE, 0..ROSTER_SIZE).prop_map(|(a, b)| Step::Scan(a, b)),
        1 => (0..ROSTER_SIZE).prop_map(Step::Exit),
    ]
}

fn roster() -> Vec<ParticipantId> {
    (0..ROSTER_SIZE)
        .map(|i| ParticipantId::from(format!("0x{:040x}", i + 1)))
        .collect()
}

fn seeded_state(seed: u64) -> GameState {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    assign_roles_with_rng(&roster(), &mut rng)
        .unwrap()
        .into_state()
}

proptest! {
    #[test]
    fn prop_assignment_always_two_hunters(seed in any::<u64>()) {
        let state = seeded_state(seed);
        prop_assert_eq!(state.participants_with_role(Role::Hunter).len(), HUNTER_COUNT);
        prop_assert_eq!(state.participants_with_role(Role::Target).len(), TARGET_COUNT);
    }

    #[test]
    fn prop_random_games_keep_invariants(
        seed in any::<u64>(),
        steps in prop::collection::vec(arb_step(), 0..40),
    ) {
        let mut state = seeded_state(seed);
        let players = roster();
        let mut accepted = 0usize;
        let mut eliminated_before = 0usize;

        for (ts, step) in steps.iter().enumerate() {
            let before = state.clone();
            let result = match *step {
                Step::Scan(a, b) => resolve_scan(&mut state, &players[a], &players[b], ts as u64),
                Step::Exit(a) => resolve_exit(&mut state, &players[a], ts as u64),
            };

            match result {
                Ok(resolution) => {
                    accepted += 1;
                    if let Some(removed) = resolution.eliminated {
                        prop_assert!(!before.is_eliminated(&removed));
                        prop_assert!(state.is_eliminated(&removed));
                    }
                }
                Err(_) => {
                    prop_assert_eq!(&state, &before, "rejected action mutated the state");
                }
            }

            // Eliminations are permanent
            for p in &players {
                if before.is_eliminated(p) {
                    prop_assert!(state.is_eliminated(p));
                }
            }
            let eliminated_now = ROSTER_SIZE - state.active_participants().len();
            prop_assert!(eliminated_now >= eliminated_before);
            eliminated_before = eliminated_now;

            prop_assert_eq!(state.action_history().len(), accepted);
            prop_assert!(validate_state(&state).is_ok());
        }

        for hunter in state.participants_with_role(Role::Hunter) {
            let remaining = state.hunts_remaining(&hunter).unwrap();
            prop_assert!(remaining <= HUNT_LIMIT);
            prop_assert_eq!(remaining + state.scans_by(&hunter), HUNT_LIMIT);
        }
        for target in state.participants_with_role(Role::Target) {
            prop_assert_eq!(state.hunts_remaining(&target), None);
        }

        let report = calculate_winners(&state);
        for winner in &report.winners {
            prop_assert!(!state.is_eliminated(winner));
            prop_assert!(state.move_count(winner) >= 1);
        }
        prop_assert_eq!(
            report.stats.survivor_count,
            report.winners.len() + report.stats.ineligible_survivors
        );
        prop_assert_eq!(report, calculate_winners(&state));
    }

    #[test]
    fn prop_self_scan_always_rejected(seed in any::<u64>(), who in 0..ROSTER_SIZE) {
        let mut state = seeded_state(seed);
        let players = roster();
        let p = &players[who];
        prop_assert!(resolve_scan(&mut state, p, p, 0).is_err());
        prop_assert!(state.action_history().is_empty());
    }

    #[test]
    fn prop_prize_split_conserves_pool(
        pool in any::<u64>(),
        winners in 0..=ROSTER_SIZE,
        fee in 0u8..=100,
        first_winner in any::<bool>(),
    ) {
        let economics = EconomicsConfig {
            protocol_fee_percent: fee,
            remainder_policy: if first_winner {
                RemainderPolicy::FirstWinner
            } else {
                RemainderPolicy::ProtocolFee
            },
            ..EconomicsConfig::default()
        };
        let players = roster();
        let winner_ids = &players[..winners];
        let pool = u128::from(pool);

        let split = PrizeDistribution::compute(pool, winner_ids, &economics);

        prop_assert_eq!(split.protocol_fee + split.total_paid(), pool);
        prop_assert_eq!(split.payouts.len(), winners);
        prop_assert!(split.payouts.iter().all(|p| p.amount >= split.share));
    }
}
