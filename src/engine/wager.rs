//! Wager manager — balance, bet bounds, optimistic deduction and refunds.
//!
//! The bet is deducted when a spin is committed, before the outcome is
//! known. A spin that never settles is reversed through `refund`, so its
//! net effect on the balance is zero.

use tracing::{debug, info};

use crate::config::WagerConfig;
use crate::types::{SpinOutcome, ValidationError};

/// Balance and bet for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerState {
    pub balance: u64,
    pub bet: u64,
    pub min_bet: u64,
    pub max_bet: u64,
    pub step: u64,
    /// Amount deducted by the last `commit` that is neither settled nor
    /// refunded yet.
    pub committed: Option<u64>,
}

impl WagerState {
    pub fn new(balance: u64, bet: u64, min_bet: u64, max_bet: u64) -> Self {
        Self {
            balance,
            bet,
            min_bet,
            max_bet,
            step: 10,
            committed: None,
        }
    }

    /// Highest bet currently allowed. Never below `min_bet`, so the range
    /// stays valid when the balance drops under the minimum.
    pub fn bet_ceiling(&self) -> u64 {
        self.max_bet.min(self.balance).max(self.min_bet)
    }
}

impl From<&WagerConfig> for WagerState {
    fn from(cfg: &WagerConfig) -> Self {
        Self {
            step: cfg.bet_step,
            ..Self::new(cfg.initial_balance, cfg.initial_bet, cfg.min_bet, cfg.max_bet)
        }
    }
}

/// Balance change to show after a wager operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Debited(u64),
    Credited(u64),
    Unchanged,
}

pub struct WagerManager {
    state: WagerState,
}

impl WagerManager {
    pub fn new(state: WagerState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WagerState {
        &self.state
    }

    pub fn balance(&self) -> u64 {
        self.state.balance
    }

    pub fn bet(&self) -> u64 {
        self.state.bet
    }

    /// Move the bet by `delta`, clamped into `[min_bet, bet_ceiling]`.
    ///
    /// Returns the new bet, or `BetAtLimit` when clamping leaves it
    /// unchanged. Callers must only invoke this while idle.
    pub fn adjust_bet(&mut self, delta: i64) -> Result<u64, ValidationError> {
        let s = &mut self.state;
        let target = if delta.is_negative() {
            s.bet.saturating_sub(delta.unsigned_abs())
        } else {
            s.bet.saturating_add(delta.unsigned_abs())
        };
        let clamped = target.clamp(s.min_bet, s.bet_ceiling());
        if clamped == s.bet {
            return Err(ValidationError::BetAtLimit { bet: s.bet });
        }
        debug!(from = s.bet, to = clamped, "Bet adjusted");
        s.bet = clamped;
        Ok(clamped)
    }

    pub fn increase_bet(&mut self) -> Result<u64, ValidationError> {
        let step = self.signed_step();
        self.adjust_bet(step)
    }

    pub fn decrease_bet(&mut self) -> Result<u64, ValidationError> {
        let step = self.signed_step();
        self.adjust_bet(-step)
    }

    // Steps beyond i64::MAX saturate; the clamp absorbs the difference.
    fn signed_step(&self) -> i64 {
        i64::try_from(self.state.step).unwrap_or(i64::MAX)
    }

    pub fn can_afford(&self) -> bool {
        self.state.balance >= self.state.bet
    }

    /// Deduct the current bet ahead of the outcome.
    pub fn commit(&mut self) -> Result<u64, ValidationError> {
        let s = &mut self.state;
        let remaining = s
            .balance
            .checked_sub(s.bet)
            .ok_or(ValidationError::InsufficientBalance {
                needed: s.bet,
                available: s.balance,
            })?;
        s.balance = remaining;
        s.committed = Some(s.bet);
        info!(bet = s.bet, balance = s.balance, "Wager committed");
        Ok(s.bet)
    }

    /// Apply a received outcome. Credits the payout on a win.
    pub fn settle(&mut self, outcome: &SpinOutcome) -> BalanceChange {
        let s = &mut self.state;
        s.committed = None;
        let credit = outcome.credited();
        if credit == 0 {
            return BalanceChange::Unchanged;
        }
        s.balance = s.balance.saturating_add(credit);
        info!(payout = credit, balance = s.balance, "Winnings credited");
        BalanceChange::Credited(credit)
    }

    /// Reverse the last `commit`. A second call does nothing.
    pub fn refund(&mut self) -> BalanceChange {
        let s = &mut self.state;
        match s.committed.take() {
            Some(amount) => {
                s.balance = s.balance.saturating_add(amount);
                info!(amount, balance = s.balance, "Wager refunded");
                BalanceChange::Credited(amount)
            }
            None => BalanceChange::Unchanged,
        }
    }

    /// Pull the bet back inside its bounds after the balance moved.
    /// Returns the new bet if it changed.
    pub fn clamp_bet(&mut self) -> Option<u64> {
        let s = &mut self.state;
        let clamped = s.bet.clamp(s.min_bet, s.bet_ceiling());
        if clamped == s.bet {
            return None;
        }
        debug!(from = s.bet, to = clamped, "Bet clamped to balance");
        s.bet = clamped;
        Some(clamped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
