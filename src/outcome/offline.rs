//! Offline outcome source.
//!
//! Generates outcomes in-process so the client can be played without a
//! remote service. Each reel shows symbols drawn uniformly from the full
//! alphabet; only the middle row (the payline) is evaluated:
//! - every reel matching pays 10x the bet
//! - at least two matching pays 3x the bet

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::{GridShape, OutcomeSource};
use crate::types::{SpinOutcome, Symbol, TransportError};

const SOURCE_NAME: &str = "offline";

const FULL_LINE_MULTIPLIER: u64 = 10;
const PAIR_MULTIPLIER: u64 = 3;

pub struct OfflineOutcomeSource {
    shape: GridShape,
    rng: Mutex<StdRng>,
}

impl OfflineOutcomeSource {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic source for reproducible sessions.
    pub fn with_seed(shape: GridShape, seed: u64) -> Self {
        Self {
            shape,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw_reels(&self) -> Result<Vec<Vec<Symbol>>, TransportError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| TransportError::Request("offline generator poisoned".into()))?;
        let reels = (0..self.shape.reel_count)
            .map(|_| {
                (0..self.shape.symbols_per_reel)
                    .filter_map(|_| Symbol::ALL.choose(&mut *rng).copied())
                    .collect()
            })
            .collect();
        Ok(reels)
    }
}

/// Size of the largest group of identical symbols on the payline.
pub fn payline_matches(payline: &[Symbol]) -> usize {
    let mut counts: HashMap<Symbol, usize> = HashMap::new();
    for sym in payline {
        *counts.entry(*sym).or_default() += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}

/// Payout multiplier for `matches` identical symbols on a payline of
/// `reel_count` reels. A single symbol never pays, so a one-reel line
/// cannot win.
pub fn multiplier(matches: usize, reel_count: usize) -> u64 {
    if matches < 2 {
        0
    } else if matches == reel_count {
        FULL_LINE_MULTIPLIER
    } else {
        PAIR_MULTIPLIER
    }
}

/// Score a drawn grid for a given bet.
pub fn evaluate(reels: Vec<Vec<Symbol>>, bet: u64) -> SpinOutcome {
    let mut outcome = SpinOutcome {
        reels,
        win: false,
        payout: 0,
    };
    let matches = payline_matches(&outcome.payline());
    let payout = bet.saturating_mul(multiplier(matches, outcome.reels.len()));
    outcome.win = payout > 0;
    outcome.payout = payout;
    outcome
}

#[async_trait]
impl OutcomeSource for OfflineOutcomeSource {
    async fn fetch_outcome(&self, bet: u64) -> Result<SpinOutcome, TransportError> {
        if bet == 0 {
            return Err(TransportError::Rejected {
                status: 400,
                message: "Invalid bet amount".into(),
            });
        }
        let reels = self.draw_reels()?;
        let outcome = evaluate(reels, bet);
        debug!(bet, win = outcome.win, payout = outcome.payout, "Offline outcome drawn");
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}
