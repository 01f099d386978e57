//! Game session
//!
//! Drives one game from deposits to claims by pairing the [`Ledger`] with the
//! confidential [`GameState`]. Every method takes `&mut self`, so at most one
//! action is in flight at a time.

use crate::common::types::ParticipantId;
use crate::errors::{GridfallResult, LedgerError};
use crate::game::resolver::{resolve_exit, resolve_scan, Resolution};
use crate::game::roles::{assign_roles_with_rng, RoleAssignment};
use crate::game::types::GameState;
use crate::game::winners::{calculate_winners, WinnerReport};
use crate::settlement::{EconomicsConfig, Ledger, PrizeDistribution};
use rand_core::{CryptoRng, OsRng, RngCore};

/// Settled outcome of a finished game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub report: WinnerReport,
    pub distribution: PrizeDistribution,
}

/// Result of an accepted exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReceipt {
    pub resolution: Resolution,
    pub refund: u128,
}

pub struct GameSession {
    ledger: Ledger,
    state: Option<GameState>,
}

impl GameSession {
    pub fn new(economics: EconomicsConfig) -> Self {
        Self {
            ledger: Ledger::new(economics),
            state: None,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Confidential state; `None` until the game starts
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn join(&mut self, participant: &ParticipantId, deposit: u128) -> GridfallResult<()> {
        Ok(self.ledger.join(participant, deposit)?)
    }

    /// Start the game and deal roles with the operating system CSPRNG
    pub fn start(&mut self) -> GridfallResult<RoleAssignment> {
        self.start_with_rng(&mut OsRng)
    }

    pub fn start_with_rng<R>(&mut self, rng: &mut R) -> GridfallResult<RoleAssignment>
    where
        R: RngCore + CryptoRng,
    {
        // Work on a copy so a failed deal leaves the ledger pending
        let mut ledger = self.ledger.clone();
        ledger.start()?;
        let assignment = assign_roles_with_rng(ledger.players(), rng)?;

        self.ledger = ledger;
        self.state = Some(assignment.clone().into_state());
        Ok(assignment)
    }

    pub fn scan(
        &mut self,
        scanner: &ParticipantId,
        target: &ParticipantId,
        timestamp_ms: u64,
    ) -> GridfallResult<Resolution> {
        self.ledger.check_active()?;
        let state = self.active_state()?;

        let mut next = state.clone();
        let resolution = resolve_scan(&mut next, scanner, target, timestamp_ms)?;
        let mut ledger = self.ledger.clone();
        if let Some(ref removed) = resolution.eliminated {
            ledger.record_elimination(removed)?;
        }

        self.commit(ledger, next);
        Ok(resolution)
    }

    pub fn exit(&mut self, participant: &ParticipantId, timestamp_ms: u64) -> GridfallResult<ExitReceipt> {
        self.ledger.check_active()?;
        let state = self.active_state()?;

        let mut next = state.clone();
        let resolution = resolve_exit(&mut next, participant, timestamp_ms)?;
        let mut ledger = self.ledger.clone();
        let refund = ledger.record_exit(participant)?;

        self.commit(ledger, next);
        Ok(ExitReceipt { resolution, refund })
    }

    /// Compute winners and settle the pool
    pub fn end(&mut self) -> GridfallResult<GameResult> {
        let state = self.active_state()?;
        let report = calculate_winners(state);
        let distribution = self.ledger.end(&report.winners)?;
        Ok(GameResult {
            report,
            distribution,
        })
    }

    pub fn claim(&mut self, participant: &ParticipantId) -> GridfallResult<u128> {
        Ok(self.ledger.claim(participant)?)
    }

    fn active_state(&self) -> Result<&GameState, LedgerError> {
        self.state.as_ref().ok_or(LedgerError::NotActive)
    }

    fn commit(&mut self, ledger: Ledger, state: GameState) {
        self.ledger = ledger;
        self.state = Some(state);
    }
}
