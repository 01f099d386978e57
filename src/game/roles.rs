//! Role assignment
//!
//! Deals 2 Hunter and 8 Target roles over a fixed roster of 10 with an
//! unbiased Fisher-Yates shuffle driven by a cryptographically secure RNG.
//! Each call is independent: nothing about one game's roles is retained.

use super::types::{GameState, Role, HUNTER_COUNT, ROSTER_SIZE, TARGET_COUNT};
use crate::common::types::ParticipantId;
use crate::errors::GameError;
use rand::Rng;
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of dealing roles for one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    /// Hex-encoded 32 random bytes
    pub game_id: String,
    /// Participants in the order they were supplied
    pub roster: Vec<ParticipantId>,
    pub roles: BTreeMap<ParticipantId, Role>,
}

impl RoleAssignment {
    pub fn role_of(&self, participant: &ParticipantId) -> Option<Role> {
        self.roles.get(participant).copied()
    }

    /// Hunters in roster order
    pub fn hunters(&self) -> Vec<ParticipantId> {
        self.with_role(Role::Hunter)
    }

    /// Targets in roster order
    pub fn targets(&self) -> Vec<ParticipantId> {
        self.with_role(Role::Target)
    }

    fn with_role(&self, role: Role) -> Vec<ParticipantId> {
        self.roster
            .iter()
            .filter(|p| self.role_of(p) == Some(role))
            .cloned()
            .collect()
    }

    /// Initial game state: nobody eliminated, no moves, every Hunter holding a full hunt budget
    pub fn into_state(self) -> GameState {
        GameState::fresh(Some(self.game_id), self.roster, self.roles)
    }
}

/// Assign roles using the operating system CSPRNG
pub fn assign_roles(roster: &[ParticipantId]) -> Result<RoleAssignment, GameError> {
    assign_roles_with_rng(roster, &mut OsRng)
}

/// Assign roles with a caller-supplied cryptographically secure RNG
pub fn assign_roles_with_rng<R>(roster: &[ParticipantId], rng: &mut R) -> Result<RoleAssignment, GameError>
where
    R: RngCore + CryptoRng,
{
    check_roster(roster)?;

    let mut tokens = role_tokens();
    shuffle(&mut tokens, rng);

    let mut game_id = [0u8; 32];
    rng.fill_bytes(&mut game_id);

    let roles = roster.iter().cloned().zip(tokens).collect();

    tracing::debug!(participants = roster.len(), "roles assigned");

    Ok(RoleAssignment {
        game_id: hex::encode(game_id),
        roster: roster.to_vec(),
        roles,
    })
}

fn check_roster(roster: &[ParticipantId]) -> Result<(), GameError> {
    let unique = roster
        .iter()
        .filter(|p| !p.is_blank())
        .collect::<BTreeSet<_>>()
        .len();

    if roster.len() != ROSTER_SIZE || unique != ROSTER_SIZE {
        tracing::info!(provided = roster.len(), unique, "rejected roster");
        return Err(GameError::InvalidRosterSize {
            expected: ROSTER_SIZE,
            provided: roster.len(),
            unique,
        });
    }
    Ok(())
}

fn role_tokens() -> Vec<Role> {
    let mut tokens = vec![Role::Hunter; HUNTER_COUNT];
    tokens.extend(std::iter::repeat(Role::Target).take(TARGET_COUNT));
    tokens
}

/// Fisher-Yates from the last index down; `gen_range` samples each swap index without modulo bias
fn shuffle<T, R: RngCore>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
