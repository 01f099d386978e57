//! Winner calculation and end-of-game reporting
//!
//! A participant wins iff it is still active and has made at least
//! [`MINIMUM_MOVES_REQUIRED`] accepted actions. Everything here is a pure
//! function of the final [`GameState`].

use super::types::{ActionKind, ActionRecord, GameState, Outcome, Role, MINIMUM_MOVES_REQUIRED};
use crate::common::types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-winner detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerDetail {
    pub address: ParticipantId,
    pub role: Role,
    pub moves: u32,
}

/// Aggregate statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerStats {
    pub total_participants: usize,
    pub eliminated_count: usize,
    pub survivor_count: usize,
    /// Survivors that never acted
    pub ineligible_survivors: usize,
    pub hunter_winners: usize,
    pub target_winners: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerReport {
    /// Winners in roster order
    pub winners: Vec<ParticipantId>,
    pub winner_details: Vec<WinnerDetail>,
    pub stats: WinnerStats,
    pub action_history: Vec<ActionRecord>,
    pub game_complete: bool,
}

impl WinnerReport {
    pub fn winner_count(&self) -> usize {
        self.winners.len()
    }

    pub fn is_winner(&self, participant: &ParticipantId) -> bool {
        self.winners.contains(participant)
    }
}

/// Determine the winner set of a final state
pub fn calculate_winners(state: &GameState) -> WinnerReport {
    let mut stats = WinnerStats {
        total_participants: state.roster().len(),
        ..WinnerStats::default()
    };
    let mut winner_details = Vec::new();

    for participant in state.roster() {
        if state.is_eliminated(participant) {
            stats.eliminated_count += 1;
            continue;
        }
        stats.survivor_count += 1;

        let moves = state.move_count(participant);
        if moves < MINIMUM_MOVES_REQUIRED {
            stats.ineligible_survivors += 1;
            continue;
        }

        // Roster entries always carry a role once the state is validated
        let Some(role) = state.role_of(participant) else {
            continue;
        };
        match role {
            Role::Hunter => stats.hunter_winners += 1,
            Role::Target => stats.target_winners += 1,
        }
        winner_details.push(WinnerDetail {
            address: participant.clone(),
            role,
            moves,
        });
    }

    let winners: Vec<ParticipantId> = winner_details.iter().map(|d| d.address.clone()).collect();

    tracing::debug!(
        winners = winners.len(),
        survivors = stats.survivor_count,
        ineligible = stats.ineligible_survivors,
        "winners calculated"
    );

    WinnerReport {
        winners,
        winner_details,
        stats,
        action_history: state.action_history().to_vec(),
        game_complete: true,
    }
}

/// Counts over the action history
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub total_actions: usize,
    pub scans: usize,
    pub exits: usize,
    /// Targets removed by a Hunter
    pub eliminations: usize,
    pub friendly_fires: usize,
}

impl ActionSummary {
    fn from_history(history: &[ActionRecord]) -> Self {
        history.iter().fold(
            Self {
                total_actions: history.len(),
                ..Self::default()
            },
            |mut summary, record| {
                match record.kind {
                    ActionKind::Scan => summary.scans += 1,
                    ActionKind::Exit => summary.exits += 1,
                }
                match record.outcome {
                    Outcome::Eliminated => summary.eliminations += 1,
                    Outcome::FriendlyFire => summary.friendly_fires += 1,
                    Outcome::NoEffect | Outcome::Exit => {}
                }
                summary
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub role: Role,
    pub eliminated: bool,
    pub moves: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunts_remaining: Option<u32>,
    pub is_winner: bool,
}

/// Detailed end-of-game document, kept off-chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub stats: WinnerStats,
    pub actions: ActionSummary,
    pub participants: BTreeMap<ParticipantId, ParticipantSummary>,
}

pub fn summarize(state: &GameState, report: &WinnerReport) -> GameSummary {
    let participants = state
        .roles()
        .iter()
        .map(|(participant, role)| {
            let summary = ParticipantSummary {
                role: *role,
                eliminated: state.is_eliminated(participant),
                moves: state.move_count(participant),
                hunts_remaining: state.hunts_remaining(participant),
                is_winner: report.is_winner(participant),
            };
            (participant.clone(), summary)
        })
        .collect();

    GameSummary {
        game_id: state.game_id().map(str::to_string),
        stats: report.stats.clone(),
        actions: ActionSummary::from_history(state.action_history()),
        participants,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::resolver::{resolve_exit, resolve_scan};
    use crate::game::types::ROSTER_SIZE;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::from(s)
    }

    /// p0 and p1 hunt; p2..p9 are Targets
    fn state() -> GameState {
        GameState::with_roles((0..ROSTER_SIZE).map(|i| {
            let role = if i < 2 { Role::Hunter } else { Role::Target };
            (pid(&format!("p{i}")), role)
        }))
        .unwrap()
    }

    #[test]
    fn test_seven_survivors_all_win() {
        let mut state = state();
        resolve_scan(&mut state, &pid("p0"), &pid("p2"), 1).unwrap();
        resolve_scan(&mut state, &pid("p1"), &pid("p3"), 2).unwrap();
        resolve_exit(&mut state, &pid("p4"), 3).unwrap();
        for (i, scanner) in ["p5", "p6", "p7", "p8", "p9"].iter().enumerate() {
            resolve_scan(&mut state, &pid(scanner), &pid("p0"), 10 + i as u64).unwrap();
        }

        let report = calculate_winners(&state);

        let expected: Vec<ParticipantId> =
            ["p0", "p1", "p5", "p6", "p7", "p8", "p9"].iter().map(|p| pid(p)).collect();
        assert_eq!(report.winners, expected);
        assert_eq!(report.stats.eliminated_count, 3);
        assert_eq!(report.stats.survivor_count, 7);
        assert_eq!(report.stats.ineligible_survivors, 0);
        assert_eq!(report.stats.hunter_winners, 2);
        assert_eq!(report.stats.target_winners, 5);
        assert!(report.game_complete);
    }

    #[test]
    fn test_idle_survivor_is_ineligible() {
        let mut state = state();
        resolve_scan(&mut state, &pid("p0"), &pid("p2"), 1).unwrap();
        resolve_scan(&mut state, &pid("p5"), &pid("p6"), 2).unwrap();

        let report = calculate_winners(&state);

        assert_eq!(report.winners, vec![pid("p0"), pid("p5")]);
        assert_eq!(report.stats.survivor_count, 9);
        assert_eq!(report.stats.ineligible_survivors, 7);
        assert!(!report.is_winner(&pid("p6")));
        assert_eq!(report.winner_details[1].moves, 1);
    }

    #[test]
    fn test_all_eliminated() {
        let mut state = state();
        for (i, participant) in state.roster().to_vec().iter().enumerate() {
            resolve_exit(&mut state, participant, i as u64).unwrap();
        }

        let report = calculate_winners(&state);

        assert!(report.winners.is_empty());
        assert_eq!(report.stats.survivor_count, 0);
        assert_eq!(report.stats.eliminated_count, ROSTER_SIZE);
    }

    #[test]
    fn test_fresh_game_has_no_winners() {
        let report = calculate_winners(&state());
        assert_eq!(report.winner_count(), 0);
        assert_eq!(report.stats.ineligible_survivors, ROSTER_SIZE);
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let mut state = state();
        resolve_scan(&mut state, &pid("p1"), &pid("p0"), 1).unwrap();
        resolve_scan(&mut state, &pid("p7"), &pid("p8"), 2).unwrap();

        let first = calculate_winners(&state);
        let second = calculate_winners(&state);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut state = state();
        resolve_scan(&mut state, &pid("p0"), &pid("p2"), 1).unwrap();
        resolve_scan(&mut state, &pid("p1"), &pid("p0"), 2).unwrap();
        resolve_scan(&mut state, &pid("p3"), &pid("p4"), 3).unwrap();
        resolve_exit(&mut state, &pid("p5"), 4).unwrap();

        let report = calculate_winners(&state);
        let summary = summarize(&state, &report);

        assert_eq!(
            summary.actions,
            ActionSummary {
                total_actions: 4,
                scans: 3,
                exits: 1,
                eliminations: 1,
                friendly_fires: 1,
            }
        );
        let hunter = &summary.participants[&pid("p0")];
        assert_eq!(hunter.hunts_remaining, Some(1));
        assert!(hunter.is_winner);
        let friendly = &summary.participants[&pid("p1")];
        assert!(friendly.eliminated);
        assert!(!friendly.is_winner);
        assert_eq!(summary.participants[&pid("p9")].hunts_remaining, None);
        assert_eq!(summary.participants.len(), ROSTER_SIZE);
    }
}
