//! Shared types for the SPINDECK client.
//!
//! These types form the data model used across the engine, the outcome
//! sources and the presentation layer, so that none of them depend on
//! each other directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

/// A reel symbol. Carried on the wire as its emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "🍒")]
    Cherry,
    #[serde(rename = "🔔")]
    Bell,
    #[serde(rename = "💎")]
    Diamond,
    #[serde(rename = "🍋")]
    Lemon,
    #[serde(rename = "🍀")]
    Clover,
    #[serde(rename = "🎰")]
    Jackpot,
}

impl Symbol {
    /// The full symbol alphabet, in outcome-source order.
    pub const ALL: &'static [Symbol] = &[
        Symbol::Cherry,
        Symbol::Bell,
        Symbol::Diamond,
        Symbol::Lemon,
        Symbol::Clover,
        Symbol::Jackpot,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Bell => "🔔",
            Symbol::Diamond => "💎",
            Symbol::Lemon => "🍋",
            Symbol::Clover => "🍀",
            Symbol::Jackpot => "🎰",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

// ---------------------------------------------------------------------------
// Spin outcome
// ---------------------------------------------------------------------------

/// The result of one spin as decided by the outcome source.
///
/// `reels` is column-major: one entry per reel, each holding the visible
/// symbols top to bottom. The middle row is the payline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub reels: Vec<Vec<Symbol>>,
    pub win: bool,
    #[serde(default)]
    pub payout: u64,
}

impl SpinOutcome {
    /// Amount credited back to the player on settlement.
    pub fn credited(&self) -> u64 {
        if self.win {
            self.payout
        } else {
            0
        }
    }

    /// The payline symbols (middle row, left to right).
    pub fn payline(&self) -> Vec<Symbol> {
        self.reels
            .iter()
            .filter_map(|reel| reel.get(reel.len() / 2).copied())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Stage of the single active spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpinPhase {
    Idle,
    Committed,
    AwaitingOutcome,
    Settling,
    Settled,
}

impl fmt::Display for SpinPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinPhase::Idle => write!(f, "Idle"),
            SpinPhase::Committed => write!(f, "Committed"),
            SpinPhase::AwaitingOutcome => write!(f, "AwaitingOutcome"),
            SpinPhase::Settling => write!(f, "Settling"),
            SpinPhase::Settled => write!(f, "Settled"),
        }
    }
}

/// Handle for a committed spin, handed to whoever dispatches the outcome
/// request and the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinTicket {
    pub id: Uuid,
    pub bet: u64,
}

/// Discrete user intents accepted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Spin,
    IncreaseBet,
    DecreaseBet,
    Quit,
}

// ---------------------------------------------------------------------------
// Session history
// ---------------------------------------------------------------------------

/// How a spin ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinResult {
    Settled(SpinOutcome),
    Refunded { reason: String },
}

/// One finished spin, kept for the session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinRecord {
    pub id: Uuid,
    pub bet: u64,
    pub result: SpinResult,
    pub balance_after: u64,
    pub timestamp: DateTime<Utc>,
}

impl SpinRecord {
    /// Net balance change caused by this spin.
    pub fn net(&self) -> i64 {
        match &self.result {
            SpinResult::Settled(outcome) => outcome.credited() as i64 - self.bet as i64,
            SpinResult::Refunded { .. } => 0,
        }
    }
}

impl fmt::Display for SpinRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            SpinResult::Settled(outcome) => write!(
                f,
                "Spin {}: bet=${} {} net={:+} balance=${}",
                self.id,
                self.bet,
                if outcome.win { "WIN" } else { "LOSS" },
                self.net(),
                self.balance_after,
            ),
            SpinResult::Refunded { reason } => write!(
                f,
                "Spin {}: bet=${} REFUNDED ({reason}) balance=${}",
                self.id, self.bet, self.balance_after,
            ),
        }
    }
}

/// Totals over every finished spin in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub spins: usize,
    pub wins: usize,
    pub refunds: usize,
    pub wagered: u64,
    pub won: u64,
    pub final_balance: u64,
}

impl SessionSummary {
    pub fn from_records(records: &[SpinRecord], final_balance: u64) -> Self {
        let mut summary = Self {
            final_balance,
            ..Self::default()
        };
        for record in records {
            summary.spins += 1;
            match &record.result {
                SpinResult::Settled(outcome) => {
                    summary.wagered += record.bet;
                    summary.won += outcome.credited();
                    if outcome.win {
                        summary.wins += 1;
                    }
                }
                SpinResult::Refunded { .. } => summary.refunds += 1,
            }
        }
        summary
    }

    /// Winnings minus settled wagers.
    pub fn net(&self) -> i64 {
        self.won as i64 - self.wagered as i64
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session: spins={} wins={} refunds={} wagered=${} won=${} net={:+} balance=${}",
            self.spins,
            self.wins,
            self.refunds,
            self.wagered,
            self.won,
            self.net(),
            self.final_balance,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Locally rejected requests. Never mutate state beyond a notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient balance: need ${needed}, have ${available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("Already spinning")]
    AlreadySpinning,

    #[error("Bet already at its limit (${bet})")]
    BetAtLimit { bet: u64 },

    #[error("Bet cannot change while a spin is in progress ({phase})")]
    SpinInProgress { phase: SpinPhase },
}

/// Failures retrieving an outcome. Recovered by refunding the wager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Outcome request failed: {0}")]
    Request(String),

    #[error("Outcome source rejected the spin ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed outcome: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
