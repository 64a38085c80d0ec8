//! Presentation effects.
//!
//! Defines the `Presenter` trait the engine drives, plus a recording
//! implementation used for headless runs and tests. All calls are
//! fire-and-forget: the engine never waits on them.

pub mod terminal;

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::types::Symbol;

/// Audio cues the engine can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    Spin,
    Win,
    Loss,
}

impl fmt::Display for AudioCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioCue::Spin => write!(f, "spin"),
            AudioCue::Win => write!(f, "win"),
            AudioCue::Loss => write!(f, "loss"),
        }
    }
}

/// Which way the balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceDirection {
    Increase,
    Decrease,
}

/// Abstraction over the rendering collaborator.
///
/// Implementors draw reels, play sounds and show notices. None of these
/// calls may fail from the engine's point of view.
pub trait Presenter: Send {
    /// Show the final symbols, one column per reel.
    fn render_reels(&mut self, reels: &[Vec<Symbol>]);

    /// Start placeholder motion on every reel.
    fn start_reel_motion(&mut self, reel_count: usize);

    fn play_audio(&mut self, cue: AudioCue);

    fn set_status(&mut self, text: &str);

    /// Balance display changed; `balance` is the new value.
    fn flash_balance(&mut self, direction: BalanceDirection, balance: u64);

    /// Bet display changed; `bet` is the new value.
    fn flash_bet(&mut self, bet: u64);

    fn highlight_payline(&mut self);

    fn celebrate(&mut self);

    fn loss_effect(&mut self);

    fn error_notice(&mut self, text: &str);

    /// Enable or disable the spin and bet controls.
    fn set_input_locked(&mut self, locked: bool);
}

// ---------------------------------------------------------------------------
// Recording presenter
// ---------------------------------------------------------------------------

/// One presentation call, as captured by `RecordingPresenter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RenderReels(Vec<Vec<Symbol>>),
    StartReelMotion(usize),
    PlayAudio(AudioCue),
    SetStatus(String),
    FlashBalance(BalanceDirection, u64),
    FlashBet(u64),
    HighlightPayline,
    Celebrate,
    LossEffect,
    ErrorNotice(String),
    InputLocked(bool),
}

/// Presenter that records every effect in order.
///
/// Clones share the same log, so a test can keep one handle and give
/// the other to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    effects: Arc<Mutex<Vec<Effect>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// The most recent status text, if any.
    pub fn last_status(&self) -> Option<String> {
        self.effects().into_iter().rev().find_map(|e| match e {
            Effect::SetStatus(s) => Some(s),
            _ => None,
        })
    }

    pub fn clear(&self) {
        if let Ok(mut effects) = self.effects.lock() {
            effects.clear();
        }
    }

    fn push(&self, effect: Effect) {
        if let Ok(mut effects) = self.effects.lock() {
            effects.push(effect);
        }
    }
}

impl Presenter for RecordingPresenter {
    fn render_reels(&mut self, reels: &[Vec<Symbol>]) {
        self.push(Effect::RenderReels(reels.to_vec()));
    }

    fn start_reel_motion(&mut self, reel_count: usize) {
        self.push(Effect::StartReelMotion(reel_count));
    }

    fn play_audio(&mut self, cue: AudioCue) {
        self.push(Effect::PlayAudio(cue));
    }

    fn set_status(&mut self, text: &str) {
        self.push(Effect::SetStatus(text.to_string()));
    }

    fn flash_balance(&mut self, direction: BalanceDirection, balance: u64) {
        self.push(Effect::FlashBalance(direction, balance));
    }

    fn flash_bet(&mut self, bet: u64) {
        self.push(Effect::FlashBet(bet));
    }

    fn highlight_payline(&mut self) {
        self.push(Effect::HighlightPayline);
    }

    fn celebrate(&mut self) {
        self.push(Effect::Celebrate);
    }

    fn loss_effect(&mut self) {
        self.push(Effect::LossEffect);
    }

    fn error_notice(&mut self, text: &str) {
        self.push(Effect::ErrorNotice(text.to_string()));
    }

    fn set_input_locked(&mut self, locked: bool) {
        self.push(Effect::InputLocked(locked));
    }
}
