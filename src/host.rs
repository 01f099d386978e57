//! Confidential-execution host boundary
//!
//! The host runs one task per invocation: it reads `input.json` from the
//! input directory, runs the game core and writes JSON results to the output
//! directory. Requests are parsed and their game state validated before any
//! rule is applied.

use crate::common::types::{current_timestamp_ms, ParticipantId};
use crate::config::GridfallConfig;
use crate::errors::{GridfallError, GridfallResult, InputError};
use crate::game::resolver::resolve_action;
use crate::game::roles::{assign_roles_with_rng, RoleAssignment};
use crate::game::types::{Action, ActionKind, ActionRecord, GameState, Outcome, Role};
use crate::game::winners::{calculate_winners, summarize, GameSummary, WinnerDetail};
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const RESULT_FILE: &str = "result.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const COMPUTED_FILE: &str = "computed.json";
pub const ERROR_FILE: &str = "error.json";

/// Task kinds the host can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostTask {
    Roles,
    Action,
    Winners,
}

impl fmt::Display for HostTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostTask::Roles => write!(f, "roles"),
            HostTask::Action => write!(f, "action"),
            HostTask::Winners => write!(f, "winners"),
        }
    }
}

impl FromStr for HostTask {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roles" => Ok(HostTask::Roles),
            "action" => Ok(HostTask::Action),
            "winners" => Ok(HostTask::Winners),
            other => Err(InputError::UnknownTask(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolesRequest {
    pub players: Vec<ParticipantId>,
}

/// Action as submitted by a participant
#[derive(Debug, Clone, Deserialize)]
pub struct ActionInput {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(alias = "player")]
    pub scanner: ParticipantId,
    #[serde(default)]
    pub target: Option<ParticipantId>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl ActionInput {
    pub fn to_action(&self) -> Result<Action, InputError> {
        match (self.kind, &self.target) {
            (ActionKind::Scan, Some(target)) => Ok(Action::Scan {
                scanner: self.scanner.clone(),
                target: target.clone(),
            }),
            (ActionKind::Scan, None) => Err(InputError::MissingTarget),
            (ActionKind::Exit, None) => Ok(Action::Exit {
                participant: self.scanner.clone(),
            }),
            (ActionKind::Exit, Some(_)) => Err(InputError::UnexpectedTarget),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub game_state: GameState,
    pub action: ActionInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnersRequest {
    pub game_state: GameState,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RolesResponse {
    pub game_id: String,
    pub role_assignments: BTreeMap<ParticipantId, Role>,
    pub hunters: Vec<ParticipantId>,
    pub targets: Vec<ParticipantId>,
    pub total_players: usize,
    pub hunter_count: usize,
    pub target_count: usize,
    /// Initial confidential state, hunt counters included
    pub game_state: GameState,
}

impl From<RoleAssignment> for RolesResponse {
    fn from(assignment: RoleAssignment) -> Self {
        let hunters = assignment.hunters();
        let targets = assignment.targets();
        Self {
            game_id: assignment.game_id.clone(),
            role_assignments: assignment.roles.clone(),
            total_players: assignment.roster.len(),
            hunter_count: hunters.len(),
            target_count: targets.len(),
            hunters,
            targets,
            game_state: assignment.into_state(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub eliminated_player: Option<ParticipantId>,
    pub outcome: Outcome,
    pub game_state: GameState,
    pub processed_action: ActionRecord,
    /// SHA-256 of the updated state, for on-chain commitment
    pub state_digest: String,
}

/// Minimal result relayed on-chain
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnersOutput {
    pub winners: Vec<ParticipantId>,
    pub winner_count: usize,
}

/// Off-chain analysis document
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnersSummary {
    pub summary: GameSummary,
    pub winner_details: Vec<WinnerDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutput {
    Roles(RolesResponse),
    Action(ActionResponse),
    Winners {
        output: WinnersOutput,
        summary: WinnersSummary,
    },
}

pub fn handle_roles(input: &str) -> GridfallResult<RolesResponse> {
    handle_roles_with_rng(input, &mut OsRng)
}

pub fn handle_roles_with_rng<R>(input: &str, rng: &mut R) -> GridfallResult<RolesResponse>
where
    R: RngCore + CryptoRng,
{
    let request: RolesRequest = serde_json::from_str(input)?;
    let assignment = assign_roles_with_rng(&request.players, rng)?;
    Ok(assignment.into())
}

/// Resolve one action; `now_ms` stamps actions that carry no timestamp
pub fn handle_action(input: &str, now_ms: u64) -> GridfallResult<ActionResponse> {
    let request: ActionRequest = serde_json::from_str(input)?;
    let action = request.action.to_action()?;
    let mut state = request.game_state.into_validated()?;

    let timestamp = request.action.timestamp.unwrap_or(now_ms);
    tracing::debug!(actor = %action.actor(), kind = %action.kind(), timestamp, "processing action");
    let resolution = resolve_action(&mut state, &action, timestamp)?;
    let state_digest = state.digest()?;

    Ok(ActionResponse {
        success: true,
        eliminated_player: resolution.eliminated,
        outcome: resolution.outcome,
        game_state: state,
        processed_action: resolution.record,
        state_digest,
    })
}

pub fn handle_winners(input: &str) -> GridfallResult<(WinnersOutput, WinnersSummary)> {
    let request: WinnersRequest = serde_json::from_str(input)?;
    let state = request.game_state.into_validated()?;

    let report = calculate_winners(&state);
    let summary = summarize(&state, &report);

    let output = WinnersOutput {
        winner_count: report.winner_count(),
        winners: report.winners,
    };
    Ok((
        output,
        WinnersSummary {
            summary,
            winner_details: report.winner_details,
        },
    ))
}

/// Run `task` against a raw JSON request
pub fn process(task: HostTask, input: &str) -> GridfallResult<HostOutput> {
    match task {
        HostTask::Roles => handle_roles(input).map(HostOutput::Roles),
        HostTask::Action => handle_action(input, current_timestamp_ms()).map(HostOutput::Action),
        HostTask::Winners => {
            handle_winners(input).map(|(output, summary)| HostOutput::Winners { output, summary })
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorOutput<'a> {
    success: bool,
    error: String,
    kind: &'a str,
}

#[derive(Serialize)]
struct ComputedOutput<'a> {
    #[serde(rename = "deterministic-output-path")]
    deterministic_output_path: &'a Path,
}

/// Read the request from `input_dir`, run `task` and write its results into
/// `output_dir`. Returns the path of the deterministic result file.
///
/// On failure `error.json` is written and the error is returned.
pub fn run_task(
    task: HostTask,
    input_dir: &Path,
    output_dir: &Path,
    config: &GridfallConfig,
) -> GridfallResult<PathBuf> {
    tracing::info!(%task, input = %input_dir.display(), "running host task");

    match execute(task, input_dir, output_dir, config) {
        Ok(path) => {
            tracing::info!(%task, result = %path.display(), "host task complete");
            Ok(path)
        }
        Err(err) => {
            tracing::error!(%task, kind = err.kind(), "host task failed: {}", err);
            let report = ErrorOutput {
                success: false,
                error: err.to_string(),
                kind: err.kind(),
            };
            if let Err(write_err) = write_json(&output_dir.join(ERROR_FILE), &report, true) {
                tracing::error!("failed to write {}: {}", ERROR_FILE, write_err);
            }
            Err(err)
        }
    }
}

fn execute(
    task: HostTask,
    input_dir: &Path,
    output_dir: &Path,
    config: &GridfallConfig,
) -> GridfallResult<PathBuf> {
    let input = fs::read_to_string(input_dir.join(&config.host.input_file))?;
    let pretty = config.host.pretty_output;
    let result_path = output_dir.join(RESULT_FILE);

    match process(task, &input)? {
        HostOutput::Roles(response) => write_json(&result_path, &response, pretty)?,
        HostOutput::Action(response) => write_json(&result_path, &response, pretty)?,
        HostOutput::Winners { output, summary } => {
            write_json(&result_path, &output, pretty)?;
            write_json(&output_dir.join(SUMMARY_FILE), &summary, pretty)?;
        }
    }

    let computed = ComputedOutput {
        deterministic_output_path: &result_path,
    };
    write_json(&output_dir.join(COMPUTED_FILE), &computed, false)?;

    Ok(result_path)
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<(), GridfallError> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{GameError, StateError};
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    fn players() -> Vec<String> {
        (0..10).map(|i| format!("0x{:040x}", i + 1)).collect()
    }

    fn started_state() -> GameState {
        let input = json!({ "players": players() }).to_string();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        handle_roles_with_rng(&input, &mut rng).unwrap().game_state
    }

    #[test]
    fn test_task_names() {
        assert_eq!("winners".parse::<HostTask>(), Ok(HostTask::Winners));
        assert_eq!(
            "deal".parse::<HostTask>(),
            Err(InputError::UnknownTask("deal".to_string()))
        );
        assert_eq!(HostTask::Action.to_string(), "action");
    }

    #[test]
    fn test_roles_response_shape() {
        let input = json!({ "players": players() }).to_string();
        let response = handle_roles(&input).unwrap();

        assert_eq!(response.total_players, 10);
        assert_eq!(response.hunter_count, 2);
        assert_eq!(response.target_count, 8);
        assert_eq!(response.game_state.game_id(), Some(response.game_id.as_str()));

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("roleAssignments").is_some());
        assert!(value["gameState"].get("huntsRemaining").is_some());
    }

    #[test]
    fn test_roles_rejects_nine_players() {
        let mut nine = players();
        nine.pop();
        let err = handle_roles(&json!({ "players": nine }).to_string()).unwrap_err();
        assert!(matches!(err, GridfallError::Game(GameError::InvalidRosterSize { .. })));
    }

    #[test]
    fn test_action_scan() {
        let state = started_state();
        let hunter = state.participants_with_role(Role::Hunter)[0].clone();
        let target = state.participants_with_role(Role::Target)[0].clone();
        let input = json!({
            "gameState": state,
            "action": { "type": "SCAN", "scanner": hunter, "target": target, "timestamp": 42 }
        })
        .to_string();

        let response = handle_action(&input, 999).unwrap();

        assert!(response.success);
        assert_eq!(response.eliminated_player, Some(target));
        assert_eq!(response.outcome, Outcome::Eliminated);
        assert_eq!(response.processed_action.timestamp, 42);
        assert_eq!(response.state_digest, response.game_state.digest().unwrap());
    }

    #[test]
    fn test_legacy_action_names() {
        let state = started_state();
        let target = state.participants_with_role(Role::Target)[0].clone();
        let input = json!({
            "gameState": state,
            "action": { "type": "safeExit", "scanner": target }
        })
        .to_string();

        let response = handle_action(&input, 7).unwrap();
        assert_eq!(response.outcome, Outcome::Exit);
        assert_eq!(response.processed_action.timestamp, 7);
    }

    #[test]
    fn test_malformed_actions_rejected_before_rules() {
        let state = started_state();
        let someone = state.roster()[0].clone();

        let missing_target = json!({
            "gameState": state,
            "action": { "type": "SCAN", "scanner": someone }
        });
        assert!(matches!(
            handle_action(&missing_target.to_string(), 1),
            Err(GridfallError::Input(InputError::MissingTarget))
        ));

        let unknown_kind = json!({
            "gameState": state,
            "action": { "type": "TELEPORT", "scanner": someone }
        });
        assert!(matches!(
            handle_action(&unknown_kind.to_string(), 1),
            Err(GridfallError::Input(InputError::Json(_)))
        ));

        assert!(matches!(
            handle_action("{\"gameState\":", 1),
            Err(GridfallError::Input(InputError::Json(_)))
        ));
    }

    #[test]
    fn test_invalid_state_rejected() {
        let mut state = serde_json::to_value(started_state()).unwrap();
        state["roles"] = json!({ "0xa": "HUNTER" });
        state["roster"] = json!([]);

        let err = handle_winners(&json!({ "gameState": state }).to_string()).unwrap_err();
        assert!(matches!(err, GridfallError::State(StateError::RosterSize { .. })));
    }

    #[test]
    fn test_winners_of_fresh_game() {
        let input = json!({ "gameState": started_state() }).to_string();
        let (output, summary) = handle_winners(&input).unwrap();

        assert_eq!(output.winner_count, 0);
        assert!(output.winners.is_empty());
        assert_eq!(summary.summary.stats.ineligible_survivors, 10);
    }
}
