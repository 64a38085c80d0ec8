//! Keyboard input.
//!
//! Space or Enter spins, `+`/`=` raises the bet, `-`/`_` lowers it, and
//! `q`, Esc or Ctrl+C quits. On a terminal, keys are read one at a time in
//! raw mode through crossterm's event stream. When stdin is piped, it is
//! read line by line instead, which lets a session be scripted.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::Input;

pub fn parse_key(key: char) -> Option<Input> {
    match key {
        ' ' => Some(Input::Spin),
        '+' | '=' => Some(Input::IncreaseBet),
        '-' | '_' => Some(Input::DecreaseBet),
        'q' | 'Q' => Some(Input::Quit),
        _ => None,
    }
}

/// Map a terminal key event. Only presses count.
pub fn map_key_event(ev: KeyEvent) -> Option<Input> {
    if ev.kind != KeyEventKind::Press {
        return None;
    }
    match (ev.code, ev.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Input::Quit),
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => Some(Input::Quit),
        (KeyCode::Enter, _) => Some(Input::Spin),
        (KeyCode::Esc, _) => Some(Input::Quit),
        (KeyCode::Char(c), _) => parse_key(c),
        _ => None,
    }
}

/// Every input on one line of piped text. An empty line is Enter.
pub fn parse_line(line: &str) -> Vec<Input> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return vec![Input::Spin];
    }
    line.chars()
        .filter_map(|key| {
            let input = parse_key(key);
            if input.is_none() {
                debug!(?key, "Unbound key ignored");
            }
            input
        })
        .collect()
}

/// Keeps the terminal in raw mode while alive.
pub struct RawModeGuard(());

impl RawModeGuard {
    pub fn enable() -> anyhow::Result<Self> {
        use anyhow::Context;
        enable_raw_mode().context("enable raw mode")?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

/// Forward key presses from the terminal until the receiver goes away
/// or the event stream ends. A stream end is forwarded as `Quit`.
pub fn spawn_key_reader(tx: mpsc::Sender<Input>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(ev) = events.next().await {
            let ev = match ev {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(error = %e, "Terminal event error");
                    break;
                }
            };
            let Event::Key(key) = ev else {
                continue;
            };
            if let Some(input) = map_key_event(key) {
                if tx.send(input).await.is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(Input::Quit).await;
    })
}

/// Read piped stdin on a dedicated thread and forward parsed inputs.
///
/// Blocking reads live on their own OS thread so they never hold up the
/// runtime's shutdown. EOF is forwarded as `Quit`.
pub fn spawn_line_reader(tx: mpsc::Sender<Input>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            for input in parse_line(&line) {
                if tx.blocking_send(input).is_err() {
                    return;
                }
            }
        }
        let _ = tx.blocking_send(Input::Quit);
    })
}
