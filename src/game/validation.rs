//! State-shape validation at the state-machine boundary
//!
//! States handed in by the confidential host are untrusted JSON. They are
//! normalized once and then checked here, before any rule logic runs, so the
//! resolver and calculator can rely on the invariants of a well-formed game.

use super::types::{
    ActionKind, ActionRecord, GameState, Outcome, Role, HUNTER_COUNT, HUNT_LIMIT, ROSTER_SIZE,
    TARGET_COUNT,
};
use crate::common::types::ParticipantId;
use crate::errors::StateError;
use std::collections::{BTreeMap, BTreeSet};

/// Fill in fields that older producers leave implicit.
///
/// - a missing roster is derived from the role map (identifier order)
/// - a Hunter without a hunt counter gets `HUNT_LIMIT` minus the scans it has
///   already recorded
pub fn normalize(state: &mut GameState) {
    if state.roster.is_empty() {
        state.roster = state.roles.keys().cloned().collect();
    }

    let hunters: Vec<ParticipantId> = state
        .roles
        .iter()
        .filter(|(_, role)| **role == Role::Hunter)
        .map(|(p, _)| p.clone())
        .collect();

    for hunter in hunters {
        if !state.hunts_remaining.contains_key(&hunter) {
            let remaining = HUNT_LIMIT.saturating_sub(state.scans_by(&hunter));
            state.hunts_remaining.insert(hunter, remaining);
        }
    }
}

/// Check every structural invariant of a game state
pub fn validate_state(state: &GameState) -> Result<(), StateError> {
    validate_roster(state)?;
    validate_role_counts(state)?;
    validate_known_keys(state)?;
    validate_hunt_counters(state)?;
    let replayed = validate_history(state)?;
    validate_move_counts(state)?;
    validate_elimination_flags(state, &replayed)
}

fn validate_roster(state: &GameState) -> Result<(), StateError> {
    if state.roster.iter().chain(state.roles.keys()).any(|p| p.is_blank()) {
        return Err(StateError::BlankParticipant);
    }

    if state.roster.len() != ROSTER_SIZE {
        return Err(StateError::RosterSize {
            expected: ROSTER_SIZE,
            actual: state.roster.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for participant in &state.roster {
        if !seen.insert(participant) {
            return Err(StateError::DuplicateRosterEntry(participant.clone()));
        }
        if !state.roles.contains_key(participant) {
            return Err(StateError::RosterRoleMismatch(participant.clone()));
        }
    }

    if let Some(extra) = state.roles.keys().find(|p| !seen.contains(p)) {
        return Err(StateError::RosterRoleMismatch(extra.clone()));
    }

    Ok(())
}

fn validate_role_counts(state: &GameState) -> Result<(), StateError> {
    let hunters = state.roles.values().filter(|r| **r == Role::Hunter).count();
    let targets = state.roles.len() - hunters;

    if hunters != HUNTER_COUNT || targets != TARGET_COUNT {
        return Err(StateError::RoleCounts { hunters, targets });
    }
    Ok(())
}

fn validate_known_keys(state: &GameState) -> Result<(), StateError> {
    check_keys("eliminated", &state.eliminated, state)?;
    check_keys("moveCount", &state.move_count, state)?;
    check_keys("huntsRemaining", &state.hunts_remaining, state)
}

fn check_keys<V>(
    field: &'static str,
    map: &BTreeMap<ParticipantId, V>,
    state: &GameState,
) -> Result<(), StateError> {
    match map.keys().find(|p| !state.contains(p)) {
        Some(unknown) => Err(StateError::UnknownEntry {
            field,
            participant: unknown.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_hunt_counters(state: &GameState) -> Result<(), StateError> {
    for (participant, role) in &state.roles {
        let counter = state.hunts_remaining.get(participant).copied();
        match role {
            Role::Target => {
                if counter.is_some() {
                    return Err(StateError::HuntCounterOnTarget(participant.clone()));
                }
            }
            Role::Hunter => {
                let remaining = counter.unwrap_or(0);
                let recorded = state.scans_by(participant);
                if remaining.checked_add(recorded) != Some(HUNT_LIMIT) {
                    return Err(StateError::HuntCounterMismatch {
                        participant: participant.clone(),
                        remaining,
                        recorded,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Replay the log against the rules, returning who it eliminated
fn validate_history(state: &GameState) -> Result<BTreeSet<ParticipantId>, StateError> {
    let mut eliminated = BTreeSet::new();

    for (index, record) in state.action_history.iter().enumerate() {
        let scanner_role = known_role(state, index, &record.scanner)?;
        if scanner_role != record.scanner_role {
            return Err(StateError::RecordRoleMismatch {
                index,
                participant: record.scanner.clone(),
            });
        }
        if eliminated.contains(&record.scanner) {
            return Err(malformed(index, "actor was already eliminated"));
        }

        match record.kind {
            ActionKind::Scan => check_scan_record(state, index, record, &eliminated)?,
            ActionKind::Exit => {
                if record.target.is_some() || record.target_role.is_some() {
                    return Err(malformed(index, "exit records carry no target"));
                }
                if record.outcome != Outcome::Exit {
                    return Err(malformed(index, "exit records must have outcome EXIT"));
                }
            }
        }

        if let Some(removed) = record.eliminated_participant() {
            eliminated.insert(removed.clone());
        }
    }

    Ok(eliminated)
}

fn check_scan_record(
    state: &GameState,
    index: usize,
    record: &ActionRecord,
    eliminated: &BTreeSet<ParticipantId>,
) -> Result<(), StateError> {
    let target = record
        .target
        .as_ref()
        .ok_or_else(|| malformed(index, "scan records need a target"))?;
    let target_role = known_role(state, index, target)?;

    if record.target_role != Some(target_role) {
        return Err(StateError::RecordRoleMismatch {
            index,
            participant: target.clone(),
        });
    }
    if target == &record.scanner {
        return Err(malformed(index, "scanner and target are the same participant"));
    }
    if eliminated.contains(target) {
        return Err(malformed(index, "target was already eliminated"));
    }

    let expected = match (record.scanner_role, target_role) {
        (Role::Target, _) => Outcome::NoEffect,
        (Role::Hunter, Role::Hunter) => Outcome::FriendlyFire,
        (Role::Hunter, Role::Target) => Outcome::Eliminated,
    };
    if record.outcome != expected {
        return Err(malformed(
            index,
            &format!("outcome {} should be {}", record.outcome, expected),
        ));
    }
    Ok(())
}

fn known_role(state: &GameState, index: usize, participant: &ParticipantId) -> Result<Role, StateError> {
    state.role_of(participant).ok_or_else(|| {
        tracing::debug!(index, %participant, "action record references unknown participant");
        StateError::UnknownEntry {
            field: "actionHistory",
            participant: participant.clone(),
        }
    })
}

fn validate_move_counts(state: &GameState) -> Result<(), StateError> {
    let mut expected: BTreeMap<&ParticipantId, u32> = BTreeMap::new();
    for record in &state.action_history {
        *expected.entry(&record.scanner).or_insert(0) += 1;
    }

    for participant in &state.roster {
        let recorded = state.move_count(participant);
        let expected = expected.get(participant).copied().unwrap_or(0);
        if recorded != expected {
            return Err(StateError::MoveCountMismatch {
                participant: participant.clone(),
                recorded,
                expected,
            });
        }
    }
    Ok(())
}

fn validate_elimination_flags(
    state: &GameState,
    replayed: &BTreeSet<ParticipantId>,
) -> Result<(), StateError> {
    for participant in &state.roster {
        let flagged = state.is_eliminated(participant);
        if flagged != replayed.contains(participant) {
            return Err(StateError::EliminationMismatch {
                participant: participant.clone(),
                flagged,
            });
        }
    }
    Ok(())
}

fn malformed(index: usize, reason: &str) -> StateError {
    StateError::MalformedRecord {
        index,
        reason: reason.to_string(),
    }
}
