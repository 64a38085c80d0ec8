//! Spin lifecycle state machine.
//!
//! Moves a single spin through Idle → Committed → AwaitingOutcome →
//! Settling → Settled → Idle. It owns the wager manager and the presenter
//! but does no I/O and never waits: the orchestrator feeds it completion
//! signals and acts on what it returns.
//!
//! Settlement is a join. It needs both the outcome and the animation's
//! "all reels stopped" signal, in either order. Signals tagged with any
//! spin id other than the active one are dropped.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::wager::{BalanceChange, WagerManager, WagerState};
use crate::outcome::{self, GridShape};
use crate::presentation::{AudioCue, BalanceDirection, Presenter};
use crate::types::{
    SessionSummary, SpinOutcome, SpinPhase, SpinRecord, SpinResult, SpinTicket, TransportError,
    ValidationError,
};

pub const STATUS_READY: &str = "Press SPIN to Play";
pub const STATUS_SPINNING: &str = "Spinning...";
pub const STATUS_ALREADY_SPINNING: &str = "Already spinning!";
pub const STATUS_INSUFFICIENT: &str = "Insufficient Balance!";
pub const STATUS_ERROR: &str = "Error! Please try again.";
pub const STATUS_LOSS: &str = "😢 Try Again!";
pub const STATUS_CANCELLED: &str = "Spin cancelled, wager refunded.";

pub fn win_status(payout: u64) -> String {
    format!("🎉 You Win ${payout}! 🎉")
}

/// What the driver should do after feeding a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Nothing until another signal arrives.
    Wait,
    /// Outcome and animation have joined and the final reels are shown.
    /// Call `reveal` once the reveal pause has elapsed.
    Reveal,
    /// The spin ended without settling (wager refunded).
    Finished,
}

#[derive(Debug)]
struct ActiveSpin {
    ticket: SpinTicket,
    outcome: Option<SpinOutcome>,
    animation_done: bool,
}

pub struct SpinMachine {
    wager: WagerManager,
    presenter: Box<dyn Presenter>,
    shape: GridShape,
    phase: SpinPhase,
    active: Option<ActiveSpin>,
    history: Vec<SpinRecord>,
}

impl SpinMachine {
    pub fn new(wager: WagerManager, presenter: Box<dyn Presenter>, shape: GridShape) -> Self {
        Self {
            wager,
            presenter,
            shape,
            phase: SpinPhase::Idle,
            active: None,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn wager(&self) -> &WagerState {
        self.wager.state()
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn active_ticket(&self) -> Option<SpinTicket> {
        self.active.as_ref().map(|a| a.ticket)
    }

    pub fn history(&self) -> &[SpinRecord] {
        &self.history
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_records(&self.history, self.wager.balance())
    }

    /// Initial status line.
    pub fn announce(&mut self) {
        self.presenter.set_status(STATUS_READY);
    }

    // -- Bet adjustment ---------------------------------------------------

    pub fn increase_bet(&mut self) -> Result<u64, ValidationError> {
        self.change_bet(WagerManager::increase_bet)
    }

    pub fn decrease_bet(&mut self) -> Result<u64, ValidationError> {
        self.change_bet(WagerManager::decrease_bet)
    }

    fn change_bet(
        &mut self,
        change: fn(&mut WagerManager) -> Result<u64, ValidationError>,
    ) -> Result<u64, ValidationError> {
        if self.phase != SpinPhase::Idle {
            return Err(ValidationError::SpinInProgress { phase: self.phase });
        }
        let bet = change(&mut self.wager)?;
        self.presenter.flash_bet(bet);
        Ok(bet)
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Idle → Committed. Deducts the bet and locks input.
    pub fn request_spin(&mut self) -> Result<SpinTicket, ValidationError> {
        if self.phase != SpinPhase::Idle {
            self.presenter.set_status(STATUS_ALREADY_SPINNING);
            return Err(ValidationError::AlreadySpinning);
        }
        if !self.wager.can_afford() {
            self.presenter.set_status(STATUS_INSUFFICIENT);
            self.presenter.error_notice(STATUS_INSUFFICIENT);
            let s = self.wager.state();
            return Err(ValidationError::InsufficientBalance {
                needed: s.bet,
                available: s.balance,
            });
        }

        let bet = self.wager.commit()?;
        let ticket = SpinTicket {
            id: Uuid::new_v4(),
            bet,
        };
        self.phase = SpinPhase::Committed;
        self.active = Some(ActiveSpin {
            ticket,
            outcome: None,
            animation_done: false,
        });

        self.presenter.set_input_locked(true);
        self.presenter
            .flash_balance(BalanceDirection::Decrease, self.wager.balance());
        self.presenter.play_audio(AudioCue::Spin);
        self.presenter.set_status(STATUS_SPINNING);

        info!(spin_id = %ticket.id, bet, balance = self.wager.balance(), "Spin committed");
        Ok(ticket)
    }

    /// Committed → AwaitingOutcome. Call once the outcome request and the
    /// animation have both been started.
    pub fn dispatch(&mut self, id: Uuid) -> bool {
        if self.phase != SpinPhase::Committed || !self.is_active(id) {
            warn!(spin_id = %id, phase = %self.phase, "Dispatch for a spin that is not committed");
            return false;
        }
        self.phase = SpinPhase::AwaitingOutcome;
        self.presenter.start_reel_motion(self.shape.reel_count);
        debug!(spin_id = %id, "Outcome requested, reels spinning");
        true
    }

    /// The outcome request finished, successfully or not.
    pub fn outcome_received(
        &mut self,
        id: Uuid,
        result: Result<SpinOutcome, TransportError>,
    ) -> Next {
        if !self.is_active(id) {
            debug!(spin_id = %id, "Ignoring outcome for inactive spin");
            return Next::Wait;
        }
        if !matches!(self.phase, SpinPhase::Committed | SpinPhase::AwaitingOutcome) {
            warn!(spin_id = %id, phase = %self.phase, "Duplicate outcome ignored");
            return Next::Wait;
        }

        match result.and_then(|o| outcome::validate(o, self.shape)) {
            Ok(outcome) => {
                debug!(spin_id = %id, win = outcome.win, payout = outcome.payout, "Outcome received");
                if let Some(active) = self.active.as_mut() {
                    active.outcome = Some(outcome);
                }
                self.phase = SpinPhase::Settling;
                self.try_join()
            }
            Err(error) => {
                self.fail(error);
                Next::Finished
            }
        }
    }

    /// Every reel has visually stopped.
    pub fn animation_completed(&mut self, id: Uuid) -> Next {
        let Some(active) = self.active.as_mut().filter(|a| a.ticket.id == id) else {
            debug!(spin_id = %id, "Ignoring animation signal for inactive spin");
            return Next::Wait;
        };
        active.animation_done = true;
        match self.phase {
            SpinPhase::Settling => self.try_join(),
            _ => Next::Wait,
        }
    }

    /// Settling → Settled → Idle. Applies the held outcome to the balance
    /// and fires the win/loss effects.
    pub fn reveal(&mut self, id: Uuid) -> Option<SpinRecord> {
        let joined = matches!(
            &self.active,
            Some(a) if a.ticket.id == id && a.outcome.is_some() && a.animation_done
        );
        if self.phase != SpinPhase::Settling || !joined {
            debug!(spin_id = %id, phase = %self.phase, "Reveal ignored, spin not joined");
            return None;
        }
        let active = self.active.take()?;
        let outcome = active.outcome?;
        self.phase = SpinPhase::Settled;

        let change = self.wager.settle(&outcome);
        if outcome.win {
            if let BalanceChange::Credited(_) = change {
                self.presenter
                    .flash_balance(BalanceDirection::Increase, self.wager.balance());
            }
            self.presenter.play_audio(AudioCue::Win);
            self.presenter.set_status(&win_status(outcome.payout));
            self.presenter.celebrate();
            self.presenter.highlight_payline();
        } else {
            self.presenter.play_audio(AudioCue::Loss);
            self.presenter.set_status(STATUS_LOSS);
            self.presenter.loss_effect();
        }
        if let Some(bet) = self.wager.clamp_bet() {
            self.presenter.flash_bet(bet);
        }

        let record = SpinRecord {
            id,
            bet: active.ticket.bet,
            result: SpinResult::Settled(outcome),
            balance_after: self.wager.balance(),
            timestamp: Utc::now(),
        };
        info!(
            spin_id = %id,
            bet = record.bet,
            net = record.net(),
            balance = record.balance_after,
            "Spin settled"
        );
        self.history.push(record.clone());
        self.finish();
        Some(record)
    }

    // -- Internal helpers ------------------------------------------------

    fn is_active(&self, id: Uuid) -> bool {
        self.active.as_ref().is_some_and(|a| a.ticket.id == id)
    }

    /// Render the final reels once both halves of the join are present.
    fn try_join(&mut self) -> Next {
        let Some(active) = self.active.as_ref() else {
            return Next::Wait;
        };
        match (&active.outcome, active.animation_done) {
            (Some(outcome), true) => {
                self.presenter.render_reels(&outcome.reels);
                Next::Reveal
            }
            _ => Next::Wait,
        }
    }

    /// Transport failure: refund, report, back to Idle.
    fn fail(&mut self, error: TransportError) {
        let Some(ticket) = self.active_ticket() else {
            return;
        };
        warn!(spin_id = %ticket.id, error = %error, "Spin failed, refunding wager");
        self.presenter.set_status(STATUS_ERROR);
        self.presenter.error_notice(&error.to_string());
        self.refund_active(error.to_string());
    }

    /// Give up on the active spin without waiting for it: refund the bet,
    /// record the spin as refunded and return to Idle. Any outcome or
    /// animation signal that arrives later is stale and ignored.
    pub fn abandon(&mut self, reason: &str) -> Option<SpinRecord> {
        let ticket = self.active_ticket()?;
        warn!(spin_id = %ticket.id, phase = %self.phase, reason, "Abandoning spin, refunding wager");
        self.presenter.set_status(STATUS_CANCELLED);
        self.refund_active(reason.to_string())
    }

    fn refund_active(&mut self, reason: String) -> Option<SpinRecord> {
        let active = self.active.take()?;
        if let BalanceChange::Credited(_) = self.wager.refund() {
            self.presenter
                .flash_balance(BalanceDirection::Increase, self.wager.balance());
        }
        let record = SpinRecord {
            id: active.ticket.id,
            bet: active.ticket.bet,
            result: SpinResult::Refunded { reason },
            balance_after: self.wager.balance(),
            timestamp: Utc::now(),
        };
        self.history.push(record.clone());
        self.finish();
        Some(record)
    }

    fn finish(&mut self) {
        self.phase = SpinPhase::Idle;
        self.presenter.set_input_locked(false);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
