use crate::common::types::{sha256_hex, ParticipantId};
use crate::errors::{GridfallResult, StateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Participants per game
pub const ROSTER_SIZE: usize = 10;
/// Hunters per game
pub const HUNTER_COUNT: usize = 2;
/// Targets per game
pub const TARGET_COUNT: usize = ROSTER_SIZE - HUNTER_COUNT;
/// Scans each Hunter may perform over the whole game
pub const HUNT_LIMIT: u32 = 2;
/// Accepted actions a survivor needs to qualify for a prize share
pub const MINIMUM_MOVES_REQUIRED: u32 = 1;

/// Secret role assigned at game start
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    #[serde(rename = "HUNTER", alias = "SENTINEL")]
    Hunter,
    #[serde(rename = "TARGET", alias = "ECHO")]
    Target,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Hunter => write!(f, "HUNTER"),
            Role::Target => write!(f, "TARGET"),
        }
    }
}

/// Kind of player action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActionKind {
    #[serde(rename = "SCAN", alias = "ping")]
    Scan,
    #[serde(rename = "EXIT", alias = "safeExit")]
    Exit,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Scan => write!(f, "SCAN"),
            ActionKind::Exit => write!(f, "EXIT"),
        }
    }
}

/// Resolved effect of an accepted action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Outcome {
    #[serde(rename = "NO_EFFECT", alias = "noEffect")]
    NoEffect,
    #[serde(rename = "ELIMINATED", alias = "eliminated")]
    Eliminated,
    #[serde(rename = "FRIENDLY_FIRE", alias = "friendlyFire")]
    FriendlyFire,
    #[serde(rename = "EXIT", alias = "safeExit")]
    Exit,
}

impl Outcome {
    /// Whether this outcome removes someone from play
    pub fn eliminates(&self) -> bool {
        !matches!(self, Outcome::NoEffect)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoEffect => write!(f, "NO_EFFECT"),
            Outcome::Eliminated => write!(f, "ELIMINATED"),
            Outcome::FriendlyFire => write!(f, "FRIENDLY_FIRE"),
            Outcome::Exit => write!(f, "EXIT"),
        }
    }
}

/// Typed player action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Scan {
        scanner: ParticipantId,
        target: ParticipantId,
    },
    Exit {
        participant: ParticipantId,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Scan { .. } => ActionKind::Scan,
            Action::Exit { .. } => ActionKind::Exit,
        }
    }

    /// Participant performing the action
    pub fn actor(&self) -> &ParticipantId {
        match self {
            Action::Scan { scanner, .. } => scanner,
            Action::Exit { participant } => participant,
        }
    }
}

/// Immutable entry of the action log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub timestamp: u64,
    /// Acting participant (the exiting participant for EXIT records)
    pub scanner: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ParticipantId>,
    #[serde(alias = "actionType")]
    pub kind: ActionKind,
    #[serde(alias = "result")]
    pub outcome: Outcome,
    pub scanner_role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<Role>,
}

impl ActionRecord {
    /// Participant this record removed from play, if any
    pub fn eliminated_participant(&self) -> Option<&ParticipantId> {
        match self.outcome {
            Outcome::NoEffect => None,
            Outcome::Eliminated => self.target.as_ref(),
            Outcome::FriendlyFire | Outcome::Exit => Some(&self.scanner),
        }
    }
}

/// The single mutable aggregate of one game.
///
/// Only the action resolver mutates a `GameState`; everything else reads it
/// through the accessors below. Maps are ordered so that serialization,
/// digests and iteration are deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) game_id: Option<String>,
    #[serde(default)]
    pub(crate) roster: Vec<ParticipantId>,
    pub(crate) roles: BTreeMap<ParticipantId, Role>,
    #[serde(default)]
    pub(crate) eliminated: BTreeMap<ParticipantId, bool>,
    #[serde(default)]
    pub(crate) move_count: BTreeMap<ParticipantId, u32>,
    #[serde(default, alias = "pingsRemaining")]
    pub(crate) hunts_remaining: BTreeMap<ParticipantId, u32>,
    #[serde(default)]
    pub(crate) action_history: Vec<ActionRecord>,
}

impl GameState {
    /// Fresh state for a roster whose roles are already decided.
    ///
    /// Every Hunter's hunt counter starts at [`HUNT_LIMIT`].
    pub(crate) fn fresh(
        game_id: Option<String>,
        roster: Vec<ParticipantId>,
        roles: BTreeMap<ParticipantId, Role>,
    ) -> Self {
        let hunts_remaining = roles
            .iter()
            .filter(|(_, role)| **role == Role::Hunter)
            .map(|(p, _)| (p.clone(), HUNT_LIMIT))
            .collect();

        Self {
            game_id,
            roster,
            roles,
            eliminated: BTreeMap::new(),
            move_count: BTreeMap::new(),
            hunts_remaining,
            action_history: Vec::new(),
        }
    }

    /// Build a fresh, validated state from an explicit role layout (in roster order)
    pub fn with_roles<I>(assignments: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = (ParticipantId, Role)>,
    {
        let mut roster = Vec::new();
        let mut roles = BTreeMap::new();
        for (participant, role) in assignments {
            if roles.insert(participant.clone(), role).is_some() {
                return Err(StateError::DuplicateRosterEntry(participant));
            }
            roster.push(participant);
        }

        let state = Self::fresh(None, roster, roles);
        super::validation::validate_state(&state)?;
        Ok(state)
    }

    /// Parse an untrusted JSON state, normalize legacy shapes and validate it
    pub fn from_json(json: &str) -> GridfallResult<Self> {
        let raw: GameState = serde_json::from_str(json)?;
        Ok(raw.into_validated()?)
    }

    /// Normalize and validate a state that arrived from outside the core
    pub fn into_validated(mut self) -> Result<Self, StateError> {
        super::validation::normalize(&mut self);
        super::validation::validate_state(&self)?;
        Ok(self)
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    /// Participants in roster order
    pub fn roster(&self) -> &[ParticipantId] {
        &self.roster
    }

    pub fn roles(&self) -> &BTreeMap<ParticipantId, Role> {
        &self.roles
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.roles.contains_key(participant)
    }

    pub fn role_of(&self, participant: &ParticipantId) -> Option<Role> {
        self.roles.get(participant).copied()
    }

    pub fn is_eliminated(&self, participant: &ParticipantId) -> bool {
        self.eliminated.get(participant).copied().unwrap_or(false)
    }

    pub fn move_count(&self, participant: &ParticipantId) -> u32 {
        self.move_count.get(participant).copied().unwrap_or(0)
    }

    /// Remaining scans for a Hunter; `None` for Targets
    pub fn hunts_remaining(&self, participant: &ParticipantId) -> Option<u32> {
        self.hunts_remaining.get(participant).copied()
    }

    pub fn action_history(&self) -> &[ActionRecord] {
        &self.action_history
    }

    /// Participants with the given role, in roster order
    pub fn participants_with_role(&self, role: Role) -> Vec<ParticipantId> {
        self.roster
            .iter()
            .filter(|p| self.role_of(p) == Some(role))
            .cloned()
            .collect()
    }

    /// Participants not yet eliminated, in roster order
    pub fn active_participants(&self) -> Vec<ParticipantId> {
        self.roster
            .iter()
            .filter(|p| !self.is_eliminated(p))
            .cloned()
            .collect()
    }

    /// Number of SCAN records initiated by `participant`
    pub fn scans_by(&self, participant: &ParticipantId) -> u32 {
        self.action_history
            .iter()
            .filter(|r| r.kind == ActionKind::Scan && &r.scanner == participant)
            .count() as u32
    }

    /// SHA-256 over the canonical JSON encoding of this state
    pub fn digest(&self) -> GridfallResult<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(sha256_hex(&bytes))
    }
}
