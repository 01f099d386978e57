//! Settlement
//!
//! Prize accounting for one game and an in-memory model of the ledger that
//! holds deposits. Amounts are integers in the ledger's smallest unit.
//!
//! Refunds are paid at the moment of exit and shrink the pool. At game end
//! the protocol fee is taken from what is left, and the rest is split equally
//! among the winners. `fee + sum(payouts) == pool` holds for every split.

use crate::common::types::ParticipantId;
use crate::errors::LedgerError;
use crate::game::types::ROSTER_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Where the integer-division remainder of the equal split goes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Added to the protocol fee
    #[default]
    ProtocolFee,
    /// Added to the first winner in roster order
    FirstWinner,
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemainderPolicy::ProtocolFee => write!(f, "protocol_fee"),
            RemainderPolicy::FirstWinner => write!(f, "first_winner"),
        }
    }
}

impl FromStr for RemainderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "protocol_fee" => Ok(RemainderPolicy::ProtocolFee),
            "first_winner" => Ok(RemainderPolicy::FirstWinner),
            other => Err(format!("unknown remainder policy '{other}'")),
        }
    }
}

/// Deposit and payout parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EconomicsConfig {
    /// Fixed deposit per participant (0.1 ETH in wei by default)
    pub deposit_amount: u64,
    pub protocol_fee_percent: u8,
    /// Share of the deposit returned on voluntary exit
    pub exit_refund_percent: u8,
    #[serde(default)]
    pub remainder_policy: RemainderPolicy,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            deposit_amount: 100_000_000_000_000_000,
            protocol_fee_percent: 5,
            exit_refund_percent: 50,
            remainder_policy: RemainderPolicy::ProtocolFee,
        }
    }
}

impl EconomicsConfig {
    pub fn deposit(&self) -> u128 {
        u128::from(self.deposit_amount)
    }

    /// Refund paid to a participant leaving early
    pub fn exit_refund(&self) -> u128 {
        percent_of(self.deposit(), self.exit_refund_percent)
    }
}

/// Floor of `amount * percent / 100`; `percent` is at most 100 after validation
fn percent_of(amount: u128, percent: u8) -> u128 {
    amount / 100 * u128::from(percent) + amount % 100 * u128::from(percent) / 100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub participant: ParticipantId,
    pub amount: u128,
}

/// End-of-game split of the pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrizeDistribution {
    pub pool: u128,
    /// Protocol fee including any remainder routed to it
    pub protocol_fee: u128,
    /// Equal share before remainder handling
    pub share: u128,
    pub remainder: u128,
    pub payouts: Vec<Payout>,
}

impl PrizeDistribution {
    /// Split `pool` among `winners` (roster order)
    pub fn compute(pool: u128, winners: &[ParticipantId], economics: &EconomicsConfig) -> Self {
        if winners.is_empty() {
            return Self {
                pool,
                protocol_fee: pool,
                share: 0,
                remainder: 0,
                payouts: Vec::new(),
            };
        }

        // Percentages above 100 take the whole pool and nothing more
        let fee = percent_of(pool, economics.protocol_fee_percent.min(100));
        let distributable = pool - fee;
        let count = winners.len() as u128;
        let share = distributable / count;
        let remainder = distributable % count;

        let mut payouts: Vec<Payout> = winners
            .iter()
            .map(|participant| Payout {
                participant: participant.clone(),
                amount: share,
            })
            .collect();

        let protocol_fee = match economics.remainder_policy {
            RemainderPolicy::ProtocolFee => fee + remainder,
            RemainderPolicy::FirstWinner => {
                if let Some(first) = payouts.first_mut() {
                    first.amount += remainder;
                }
                fee
            }
        };

        Self {
            pool,
            protocol_fee,
            share,
            remainder,
            payouts,
        }
    }

    pub fn total_paid(&self) -> u128 {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    pub fn payout_for(&self, participant: &ParticipantId) -> Option<u128> {
        self.payouts
            .iter()
            .find(|p| &p.participant == participant)
            .map(|p| p.amount)
    }
}

/// Ledger lifecycle phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerPhase {
    Pending,
    Active,
    Finished,
}

/// In-memory model of the ledger that escrows deposits and pays prizes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    economics: EconomicsConfig,
    phase: LedgerPhase,
    players: Vec<ParticipantId>,
    eliminated: BTreeSet<ParticipantId>,
    pool: u128,
    refunds_paid: u128,
    protocol_fee: u128,
    claimable: BTreeMap<ParticipantId, u128>,
    claimed: BTreeSet<ParticipantId>,
}

impl Ledger {
    pub fn new(economics: EconomicsConfig) -> Self {
        Self {
            economics,
            phase: LedgerPhase::Pending,
            players: Vec::new(),
            eliminated: BTreeSet::new(),
            pool: 0,
            refunds_paid: 0,
            protocol_fee: 0,
            claimable: BTreeMap::new(),
            claimed: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> LedgerPhase {
        self.phase
    }

    /// Joined participants in join order
    pub fn players(&self) -> &[ParticipantId] {
        &self.players
    }

    pub fn pool(&self) -> u128 {
        self.pool
    }

    pub fn refunds_paid(&self) -> u128 {
        self.refunds_paid
    }

    pub fn protocol_fee(&self) -> u128 {
        self.protocol_fee
    }

    pub fn economics(&self) -> &EconomicsConfig {
        &self.economics
    }

    pub fn has_joined(&self, participant: &ParticipantId) -> bool {
        self.players.contains(participant)
    }

    pub fn is_eliminated(&self, participant: &ParticipantId) -> bool {
        self.eliminated.contains(participant)
    }

    pub fn players_remaining(&self) -> usize {
        self.players.len() - self.eliminated.len()
    }

    pub fn claimable(&self, participant: &ParticipantId) -> u128 {
        if self.claimed.contains(participant) {
            return 0;
        }
        self.claimable.get(participant).copied().unwrap_or(0)
    }

    /// Accept a participant's deposit
    pub fn join(&mut self, participant: &ParticipantId, deposit: u128) -> Result<(), LedgerError> {
        if self.phase != LedgerPhase::Pending {
            return Err(LedgerError::NotPending);
        }
        if deposit != self.economics.deposit() {
            return Err(LedgerError::IncorrectDeposit {
                expected: self.economics.deposit(),
                provided: deposit,
            });
        }
        if self.has_joined(participant) {
            return Err(LedgerError::AlreadyJoined(participant.clone()));
        }
        if self.players.len() >= ROSTER_SIZE {
            return Err(LedgerError::GameFull);
        }

        self.players.push(participant.clone());
        self.pool += deposit;
        tracing::debug!(%participant, joined = self.players.len(), "participant joined");
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), LedgerError> {
        if self.phase != LedgerPhase::Pending {
            return Err(LedgerError::NotPending);
        }
        if self.players.len() != ROSTER_SIZE {
            return Err(LedgerError::NotEnoughPlayers {
                required: ROSTER_SIZE,
                joined: self.players.len(),
            });
        }
        self.phase = LedgerPhase::Active;
        tracing::info!(pool = %self.pool, "game started");
        Ok(())
    }

    /// Actions are accepted only while the game is running
    pub fn check_active(&self) -> Result<(), LedgerError> {
        if self.phase != LedgerPhase::Active {
            return Err(LedgerError::NotActive);
        }
        Ok(())
    }

    /// Pay the exit refund out of the pool and return it
    pub fn record_exit(&mut self, participant: &ParticipantId) -> Result<u128, LedgerError> {
        self.check_active_player(participant)?;

        let refund = self.economics.exit_refund().min(self.pool);
        self.eliminated.insert(participant.clone());
        self.pool -= refund;
        self.refunds_paid += refund;
        tracing::info!(
            %participant,
            %refund,
            remaining = self.players_remaining(),
            "exit refunded"
        );
        Ok(refund)
    }

    /// Mark a participant removed by a scan; no refund is due
    pub fn record_elimination(&mut self, participant: &ParticipantId) -> Result<(), LedgerError> {
        self.check_active_player(participant)?;
        self.eliminated.insert(participant.clone());
        tracing::debug!(%participant, remaining = self.players_remaining(), "participant eliminated");
        Ok(())
    }

    /// Close the game, take the protocol fee and record each winner's share
    pub fn end(&mut self, winners: &[ParticipantId]) -> Result<PrizeDistribution, LedgerError> {
        if self.phase != LedgerPhase::Active {
            return Err(LedgerError::NotActive);
        }
        let mut seen = BTreeSet::new();
        for winner in winners {
            if !self.has_joined(winner) {
                return Err(LedgerError::NotJoined(winner.clone()));
            }
            if self.is_eliminated(winner) {
                return Err(LedgerError::EliminatedWinner(winner.clone()));
            }
            if !seen.insert(winner) {
                return Err(LedgerError::DuplicateWinner(winner.clone()));
            }
        }

        let distribution = PrizeDistribution::compute(self.pool, winners, &self.economics);
        self.protocol_fee = distribution.protocol_fee;
        self.claimable = distribution
            .payouts
            .iter()
            .map(|p| (p.participant.clone(), p.amount))
            .collect();
        self.phase = LedgerPhase::Finished;

        tracing::info!(
            winners = winners.len(),
            fee = %distribution.protocol_fee,
            share = %distribution.share,
            "game ended"
        );
        Ok(distribution)
    }

    /// Pay a winner's recorded share, exactly once
    pub fn claim(&mut self, participant: &ParticipantId) -> Result<u128, LedgerError> {
        if self.phase != LedgerPhase::Finished {
            return Err(LedgerError::NotFinished);
        }
        if self.claimed.contains(participant) {
            return Err(LedgerError::AlreadyClaimed(participant.clone()));
        }
        let amount = match self.claimable.get(participant) {
            Some(amount) if *amount > 0 => *amount,
            _ => return Err(LedgerError::NoPrize(participant.clone())),
        };

        self.claimed.insert(participant.clone());
        tracing::debug!(%participant, %amount, "prize claimed");
        Ok(amount)
    }

    fn check_active_player(&self, participant: &ParticipantId) -> Result<(), LedgerError> {
        self.check_active()?;
        if !self.has_joined(participant) {
            return Err(LedgerError::NotJoined(participant.clone()));
        }
        if self.is_eliminated(participant) {
            return Err(LedgerError::AlreadyEliminated(participant.clone()));
        }
        Ok(())
    }
}
