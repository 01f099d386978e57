//! Gridfall - hidden-role elimination game engine
//!
//! Ten participants, two secret Hunters and eight Targets. Hunters have a
//! limited number of scans to eliminate Targets; anyone may exit early for a
//! partial refund. Survivors who acted at least once split the prize pool.
//!
//! The [`game`] module is the deterministic state machine (roles, actions,
//! winners). [`settlement`] and [`session`] model the ledger that holds
//! deposits, and [`host`] is the JSON boundary used by the confidential
//! execution environment.

pub mod common;
pub mod config;
pub mod errors;
pub mod game;
pub mod host;
pub mod session;
pub mod settlement;

pub use common::types::ParticipantId;
pub use config::{ConfigLoader, GridfallConfig};
pub use errors::{GridfallError, GridfallResult};
pub use game::{
    assign_roles, calculate_winners, resolve_action, resolve_exit, resolve_scan, Action,
    GameState, Outcome, Role, WinnerReport,
};
pub use session::GameSession;
pub use settlement::{EconomicsConfig, Ledger, PrizeDistribution, RemainderPolicy};
