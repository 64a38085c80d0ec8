//! Outcome sources.
//!
//! Defines the `OutcomeSource` trait and provides implementations for:
//! - HTTP — the remote outcome service (`POST /spin`)
//! - Offline — an in-process generator for play without a server
//!
//! Every outcome, whatever its source, passes through `validate` before
//! the engine settles it.

pub mod http;
pub mod offline;

use async_trait::async_trait;

use crate::config::OutcomeConfig;
use crate::types::{SpinOutcome, TransportError};

/// Abstraction over whoever decides a spin's result.
///
/// Exactly one call is made per committed spin. Implementors must not
/// retry on their own; a failure refunds the wager.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomeSource: Send + Sync {
    /// Request the outcome of a spin wagering `bet`.
    async fn fetch_outcome(&self, bet: u64) -> Result<SpinOutcome, TransportError>;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}

/// Expected reel grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub reel_count: usize,
    pub symbols_per_reel: usize,
}

impl Default for GridShape {
    fn default() -> Self {
        Self {
            reel_count: 3,
            symbols_per_reel: 3,
        }
    }
}

impl From<&OutcomeConfig> for GridShape {
    fn from(cfg: &OutcomeConfig) -> Self {
        Self {
            reel_count: cfg.reel_count,
            symbols_per_reel: cfg.symbols_per_reel,
        }
    }
}

/// Check an outcome against the grid and the win/payout contract.
///
/// A loss carrying a non-zero payout is rejected. A win with a zero
/// payout is accepted as-is.
pub fn validate(outcome: SpinOutcome, shape: GridShape) -> Result<SpinOutcome, TransportError> {
    if outcome.reels.len() != shape.reel_count {
        return Err(TransportError::Malformed(format!(
            "expected {} reels, got {}",
            shape.reel_count,
            outcome.reels.len()
        )));
    }
    if let Some((i, reel)) = outcome
        .reels
        .iter()
        .enumerate()
        .find(|(_, reel)| reel.len() != shape.symbols_per_reel)
    {
        return Err(TransportError::Malformed(format!(
            "reel {i} has {} symbols, expected {}",
            reel.len(),
            shape.symbols_per_reel
        )));
    }
    if !outcome.win && outcome.payout != 0 {
        return Err(TransportError::Malformed(format!(
            "losing outcome carries payout {}",
            outcome.payout
        )));
    }
    Ok(outcome)
}
