//! Action resolution
//!
//! Validates one scan or exit against the current [`GameState`], applies its
//! effect and appends the action record. Every precondition is checked before
//! the first write, so a rejected action leaves the state exactly as it was.

use super::types::{Action, ActionKind, ActionRecord, GameState, Outcome, Role};
use crate::common::types::ParticipantId;
use crate::errors::GameError;
use serde::{Deserialize, Serialize};

/// Effect of one accepted action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Participant removed from play by this action, if any
    pub eliminated: Option<ParticipantId>,
    pub outcome: Outcome,
    /// The record appended to the action history
    pub record: ActionRecord,
}

/// Resolve a typed action
pub fn resolve_action(
    state: &mut GameState,
    action: &Action,
    timestamp_ms: u64,
) -> Result<Resolution, GameError> {
    match action {
        Action::Scan { scanner, target } => resolve_scan(state, scanner, target, timestamp_ms),
        Action::Exit { participant } => resolve_exit(state, participant, timestamp_ms),
    }
}

/// Resolve `scanner` scanning `target`.
///
/// Checks, in order: both participants known, scanner active, target active,
/// no self-scan, Hunter budget left. Targets never eliminate anyone; a Hunter
/// eliminates a Target, or itself when it scans the other Hunter.
pub fn resolve_scan(
    state: &mut GameState,
    scanner: &ParticipantId,
    target: &ParticipantId,
    timestamp_ms: u64,
) -> Result<Resolution, GameError> {
    let (scanner_role, target_role) = check_scan(state, scanner, target).map_err(rejected)?;

    let outcome = match (scanner_role, target_role) {
        (Role::Target, _) => Outcome::NoEffect,
        (Role::Hunter, Role::Hunter) => Outcome::FriendlyFire,
        (Role::Hunter, Role::Target) => Outcome::Eliminated,
    };

    if scanner_role == Role::Hunter {
        if let Some(remaining) = state.hunts_remaining.get_mut(scanner) {
            *remaining -= 1;
        }
    }

    let eliminated = outcome.eliminates().then(|| match outcome {
        Outcome::FriendlyFire => scanner.clone(),
        _ => target.clone(),
    });
    if let Some(ref removed) = eliminated {
        state.eliminated.insert(removed.clone(), true);
    }

    let record = ActionRecord {
        timestamp: timestamp_ms,
        scanner: scanner.clone(),
        target: Some(target.clone()),
        kind: ActionKind::Scan,
        outcome,
        scanner_role,
        target_role: Some(target_role),
    };
    commit(state, scanner, &record);

    tracing::debug!(%scanner, %target, %outcome, "scan resolved");

    Ok(Resolution {
        eliminated,
        outcome,
        record,
    })
}

/// Resolve a voluntary exit: unconditional self-elimination, whatever the role
pub fn resolve_exit(
    state: &mut GameState,
    participant: &ParticipantId,
    timestamp_ms: u64,
) -> Result<Resolution, GameError> {
    let role = check_exit(state, participant).map_err(rejected)?;

    state.eliminated.insert(participant.clone(), true);

    let record = ActionRecord {
        timestamp: timestamp_ms,
        scanner: participant.clone(),
        target: None,
        kind: ActionKind::Exit,
        outcome: Outcome::Exit,
        scanner_role: role,
        target_role: None,
    };
    commit(state, participant, &record);

    tracing::debug!(%participant, "exit resolved");

    Ok(Resolution {
        eliminated: Some(participant.clone()),
        outcome: Outcome::Exit,
        record,
    })
}

fn check_scan(
    state: &GameState,
    scanner: &ParticipantId,
    target: &ParticipantId,
) -> Result<(Role, Role), GameError> {
    let scanner_role = state
        .role_of(scanner)
        .ok_or_else(|| GameError::UnknownParticipant(scanner.clone()))?;
    let target_role = state
        .role_of(target)
        .ok_or_else(|| GameError::UnknownParticipant(target.clone()))?;

    if state.is_eliminated(scanner) {
        return Err(GameError::ScannerEliminated(scanner.clone()));
    }
    if state.is_eliminated(target) {
        return Err(GameError::TargetEliminated(target.clone()));
    }
    if scanner == target {
        return Err(GameError::SelfScan(scanner.clone()));
    }
    if scanner_role == Role::Hunter {
        // A missing counter fails closed; validated states always carry one.
        match state.hunts_remaining(scanner) {
            Some(remaining) if remaining > 0 => {}
            _ => return Err(GameError::HuntsExhausted(scanner.clone())),
        }
    }

    Ok((scanner_role, target_role))
}

fn check_exit(state: &GameState, participant: &ParticipantId) -> Result<Role, GameError> {
    let role = state
        .role_of(participant)
        .ok_or_else(|| GameError::UnknownParticipant(participant.clone()))?;

    if state.is_eliminated(participant) {
        return Err(GameError::AlreadyEliminated(participant.clone()));
    }
    Ok(role)
}

/// Count the move and append the record
fn commit(state: &mut GameState, actor: &ParticipantId, record: &ActionRecord) {
    *state.move_count.entry(actor.clone()).or_insert(0) += 1;
    state.action_history.push(record.clone());
}

fn rejected(err: GameError) -> GameError {
    tracing::info!(rule = err.kind(), participant = ?err.participant(), "action rejected");
    err
}
