//! Game state machine: role assignment, action resolution, winner calculation

pub mod resolver;
pub mod roles;
pub mod types;
pub mod validation;
pub mod winners;

pub use resolver::{resolve_action, resolve_exit, resolve_scan, Resolution};
pub use roles::{assign_roles, assign_roles_with_rng, RoleAssignment};
pub use types::{
    Action, ActionKind, ActionRecord, GameState, Outcome, Role, HUNTER_COUNT, HUNT_LIMIT,
    MINIMUM_MOVES_REQUIRED, ROSTER_SIZE, TARGET_COUNT,
};
pub use validation::validate_state;
pub use winners::{calculate_winners, summarize, GameSummary, WinnerDetail, WinnerReport, WinnerStats};
