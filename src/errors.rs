//! Error types for the Gridfall game engine
//!
//! Every rejected operation maps to exactly one variant carrying enough detail
//! (which rule, which participant) to reproduce it in a test.

use crate::common::types::ParticipantId;
use thiserror::Error;

/// Root error type for all Gridfall operations
#[derive(Debug, Error)]
pub enum GridfallError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A game rule rejected the requested action
    #[error("Game rule violation: {0}")]
    Game(#[from] GameError),

    /// A supplied game state does not have a legal shape
    #[error("Invalid game state: {0}")]
    State(#[from] StateError),

    /// Deposit / payout bookkeeping errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Malformed host input
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rule violations raised by the role assignor and the action resolver.
///
/// All of these are terminal for the single action attempted and leave the
/// game state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Roster must contain exactly {expected} unique participants (got {provided} entries, {unique} unique)")]
    InvalidRosterSize {
        expected: usize,
        provided: usize,
        unique: usize,
    },

    #[error("Participant {0} is not in this game")]
    UnknownParticipant(ParticipantId),

    #[error("Scanner {0} is already eliminated")]
    ScannerEliminated(ParticipantId),

    #[error("Target {0} is already eliminated")]
    TargetEliminated(ParticipantId),

    #[error("Participant {0} cannot scan themself")]
    SelfScan(ParticipantId),

    #[error("Hunter {0} has no hunts remaining")]
    HuntsExhausted(ParticipantId),

    #[error("Participant {0} is already eliminated")]
    AlreadyEliminated(ParticipantId),
}

impl GameError {
    /// Stable machine-readable name of the violated rule
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::InvalidRosterSize { .. } => "InvalidRosterSize",
            GameError::UnknownParticipant(_) => "UnknownParticipant",
            GameError::ScannerEliminated(_) => "ScannerEliminated",
            GameError::TargetEliminated(_) => "TargetEliminated",
            GameError::SelfScan(_) => "SelfScan",
            GameError::HuntsExhausted(_) => "HuntsExhausted",
            GameError::AlreadyEliminated(_) => "AlreadyEliminated",
        }
    }

    /// Participant the violation is about, if any
    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            GameError::InvalidRosterSize { .. } => None,
            GameError::UnknownParticipant(p)
            | GameError::ScannerEliminated(p)
            | GameError::TargetEliminated(p)
            | GameError::SelfScan(p)
            | GameError::HuntsExhausted(p)
            | GameError::AlreadyEliminated(p) => Some(p),
        }
    }
}

/// Shape violations found while validating a state handed in from outside
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Roster must have {expected} participants, found {actual}")]
    RosterSize { expected: usize, actual: usize },

    #[error("Participant identifier must not be blank")]
    BlankParticipant,

    #[error("Participant {0} appears more than once in the roster")]
    DuplicateRosterEntry(ParticipantId),

    #[error("Participant {0} is in the roster but has no role, or has a role but is not in the roster")]
    RosterRoleMismatch(ParticipantId),

    #[error("Role counts must be 2 hunters / 8 targets, found {hunters} / {targets}")]
    RoleCounts { hunters: usize, targets: usize },

    #[error("Field {field} references unknown participant {participant}")]
    UnknownEntry {
        field: &'static str,
        participant: ParticipantId,
    },

    #[error("Target {0} must not carry a hunt counter")]
    HuntCounterOnTarget(ParticipantId),

    #[error("Hunter {participant} has {remaining} hunts remaining but {recorded} recorded scans")]
    HuntCounterMismatch {
        participant: ParticipantId,
        remaining: u32,
        recorded: u32,
    },

    #[error("Participant {participant} has move count {recorded} but {expected} recorded actions")]
    MoveCountMismatch {
        participant: ParticipantId,
        recorded: u32,
        expected: u32,
    },

    #[error("Action record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Action record {index} carries a role for {participant} that disagrees with the role map")]
    RecordRoleMismatch {
        index: usize,
        participant: ParticipantId,
    },

    #[error("Elimination flag for {participant} is {flagged} but the action history says otherwise")]
    EliminationMismatch {
        participant: ParticipantId,
        flagged: bool,
    },
}

/// Deposit / payout bookkeeping errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Game is not accepting players")]
    NotPending,

    #[error("Game not active")]
    NotActive,

    #[error("Game has not finished")]
    NotFinished,

    #[error("Incorrect deposit: expected {expected}, got {provided}")]
    IncorrectDeposit { expected: u128, provided: u128 },

    #[error("Participant {0} already joined")]
    AlreadyJoined(ParticipantId),

    #[error("Game is full")]
    GameFull,

    #[error("Need {required} players, only {joined} joined")]
    NotEnoughPlayers { required: usize, joined: usize },

    #[error("Participant {0} has not joined this game")]
    NotJoined(ParticipantId),

    #[error("Participant {0} is already eliminated")]
    AlreadyEliminated(ParticipantId),

    #[error("Winner {0} listed more than once")]
    DuplicateWinner(ParticipantId),

    #[error("Winner {0} was eliminated")]
    EliminatedWinner(ParticipantId),

    #[error("No prize to claim for {0}")]
    NoPrize(ParticipantId),

    #[error("Participant {0} already claimed")]
    AlreadyClaimed(ParticipantId),
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Malformed requests arriving at the host boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Malformed JSON: {0}")]
    Json(String),

    #[error("Scan action requires a target")]
    MissingTarget,

    #[error("Exit action must not name a target")]
    UnexpectedTarget,

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

impl From<serde_json::Error> for GridfallError {
    fn from(e: serde_json::Error) -> Self {
        GridfallError::Input(InputError::Json(e.to_string()))
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(e: toml::de::Error) -> Self {
        ConfigurationError::LoadFailed(e.to_string())
    }
}

impl GridfallError {
    /// Short machine-readable classification written to `error.json`
    pub fn kind(&self) -> &'static str {
        match self {
            GridfallError::Configuration(_) => "Configuration",
            GridfallError::Game(e) => e.kind(),
            GridfallError::State(_) => "InvalidState",
            GridfallError::Ledger(_) => "Ledger",
            GridfallError::Input(_) => "InvalidInput",
            GridfallError::Io(_) => "Io",
        }
    }
}

// Convenience type alias for Results
pub type GridfallResult<T> = Result<T, GridfallError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = GridfallError::Game(GameError::SelfScan(ParticipantId::from("0xabc")));

        assert!(err.to_string().contains("Game rule violation"));
        assert!(err.to_string().contains("0xabc"));
    }

    #[test]
    fn test_roster_size_details() {
        let err = GameError::InvalidRosterSize {
            expected: 10,
            provided: 10,
            unique: 9,
        };

        assert!(err.to_string().contains("exactly 10"));
        assert!(err.to_string().contains("9 unique"));
        assert_eq!(err.participant(), None);
    }

    #[test]
    fn test_error_kind_names_rule() {
        let err: GridfallError = GameError::HuntsExhausted(ParticipantId::from("h1")).into();
        assert_eq!(err.kind(), "HuntsExhausted");

        let err: GridfallError = LedgerError::GameFull.into();
        assert_eq!(err.kind(), "Ledger");
    }

    #[test]
    fn test_error_source() {
        let err: GridfallError = StateError::BlankParticipant.into();
        assert!(err.source().is_some());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: GridfallError = parse.unwrap_err().into();

        match err {
            GridfallError::Input(InputError::Json(_)) => {}
            other => panic!("Expected JSON input error, got {other:?}"),
        }
    }
}
