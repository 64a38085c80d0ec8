//! Terminal presenter.
//!
//! Renders the slot machine to stdout: the reel grid, balance and bet
//! changes, status lines and notices. Audio cues ring the terminal bell
//! when sound is enabled.

use std::io::{self, Write};

use tracing::debug;

use super::{AudioCue, BalanceDirection, Presenter};
use crate::types::Symbol;

pub struct TerminalPresenter<W: Write + Send = io::Stdout> {
    out: W,
    sound: bool,
    /// Payline row of the last rendered grid, for highlighting.
    payline: Vec<Symbol>,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout(sound: bool) -> Self {
        Self::new(io::stdout(), sound)
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W, sound: bool) -> Self {
        Self {
            out,
            sound,
            payline: Vec::new(),
        }
    }

    /// Print the initial balance/bet banner.
    pub fn show_table(&mut self, balance: u64, bet: u64) {
        self.line(&format!("Balance: ${balance}   Bet: ${bet}"));
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Output errors are not the engine's concern; a closed stdout just
    // means nobody is watching.
    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            debug!(error = %e, "Terminal write failed");
        }
    }

    /// Explicit CR so lines stay aligned in raw mode.
    fn line(&mut self, text: &str) {
        self.emit(&format!("{text}\r\n"));
    }
}

/// Lay out column-major reels as rows of glyphs.
fn grid_rows(reels: &[Vec<Symbol>]) -> Vec<String> {
    let rows = reels.iter().map(Vec::len).max().unwrap_or(0);
    (0..rows)
        .map(|r| {
            reels
                .iter()
                .map(|reel| reel.get(r).map(|s| s.glyph()).unwrap_or(" "))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn render_reels(&mut self, reels: &[Vec<Symbol>]) {
        let rows = grid_rows(reels);
        let mid = rows.len() / 2;
        for (i, row) in rows.iter().enumerate() {
            let marker = if i == mid { ">" } else { " " };
            self.line(&format!("{marker} {row}"));
        }
        self.payline = reels
            .iter()
            .filter_map(|reel| reel.get(reel.len() / 2).copied())
            .collect();
    }

    fn start_reel_motion(&mut self, reel_count: usize) {
        let blur = vec!["~~"; reel_count].join(" | ");
        self.line(&format!("  {blur}"));
    }

    fn play_audio(&mut self, cue: AudioCue) {
        debug!(cue = %cue, "Audio cue");
        if self.sound && cue == AudioCue::Win {
            self.emit("\x07");
        }
    }

    fn set_status(&mut self, text: &str) {
        self.line(text);
    }

    fn flash_balance(&mut self, direction: BalanceDirection, balance: u64) {
        let arrow = match direction {
            BalanceDirection::Increase => "▲",
            BalanceDirection::Decrease => "▼",
        };
        self.line(&format!("Balance: ${balance} {arrow}"));
    }

    fn flash_bet(&mut self, bet: u64) {
        self.line(&format!("Bet: ${bet}"));
    }

    fn highlight_payline(&mut self) {
        let glyphs: Vec<&str> = self.payline.iter().map(|s| s.glyph()).collect();
        self.line(&format!("*** {} ***", glyphs.join(" ")));
    }

    fn celebrate(&mut self) {
        self.line("✨ ✨ ✨ ✨ ✨");
    }

    fn loss_effect(&mut self) {
        debug!("Loss effect");
    }

    fn error_notice(&mut self, text: &str) {
        self.line(&format!("!! {text}"));
    }

    fn set_input_locked(&mut self, locked: bool) {
        debug!(locked, "Input lock changed");
    }
}
