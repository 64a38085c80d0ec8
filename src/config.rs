//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The outcome source URL may be overridden by an environment variable
//! named in the config, resolved at runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub wager: WagerConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    pub outcome: OutcomeConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WagerConfig {
    pub initial_balance: u64,
    pub initial_bet: u64,
    pub min_bet: u64,
    pub max_bet: u64,
    #[serde(default = "default_bet_step")]
    pub bet_step: u64,
}

fn default_bet_step() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnimationConfig {
    /// Delay between consecutive reels starting to spin.
    pub reel_stagger_ms: u64,
    /// How long each reel spins once started.
    pub spin_duration_ms: u64,
    /// Pause between showing the final symbols and applying the result.
    pub reveal_pause_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            reel_stagger_ms: 300,
            spin_duration_ms: 2000,
            reveal_pause_ms: 300,
        }
    }
}

impl AnimationConfig {
    pub fn reel_stagger(&self) -> Duration {
        Duration::from_millis(self.reel_stagger_ms)
    }

    pub fn spin_duration(&self) -> Duration {
        Duration::from_millis(self.spin_duration_ms)
    }

    pub fn reveal_pause(&self) -> Duration {
        Duration::from_millis(self.reveal_pause_ms)
    }
}

/// Where outcomes come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeMode {
    Http,
    Offline,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutcomeConfig {
    pub mode: OutcomeMode,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of an env var that, when set, overrides `base_url`.
    #[serde(default)]
    pub base_url_env: Option<String>,
    /// No timeout is applied unless this is set.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_grid")]
    pub reel_count: usize,
    #[serde(default = "default_grid")]
    pub symbols_per_reel: usize,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_grid() -> usize {
    3
}

impl OutcomeConfig {
    /// The effective base URL after env-var override.
    pub fn resolved_base_url(&self) -> String {
        self.base_url_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .unwrap_or_else(|| self.base_url.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresentationConfig {
    /// Ring the terminal bell for audio cues.
    pub sound: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self { sound: true }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bet bounds and grid sizes the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        let w = &self.wager;
        if w.min_bet == 0 {
            bail!("wager.min_bet must be greater than 0");
        }
        if w.min_bet > w.max_bet {
            bail!("wager.min_bet ({}) exceeds wager.max_bet ({})", w.min_bet, w.max_bet);
        }
        if !(w.min_bet..=w.max_bet).contains(&w.initial_bet) {
            bail!(
                "wager.initial_bet ({}) outside [{}, {}]",
                w.initial_bet,
                w.min_bet,
                w.max_bet
            );
        }
        if w.bet_step == 0 {
            bail!("wager.bet_step must be greater than 0");
        }
        if w.bet_step > w.max_bet {
            bail!(
                "wager.bet_step ({}) exceeds wager.max_bet ({})",
                w.bet_step,
                w.max_bet
            );
        }
        if self.outcome.reel_count == 0 || self.outcome.symbols_per_reel == 0 {
            bail!("outcome grid must have at least one reel and one symbol per reel");
        }
        if self.outcome.mode == OutcomeMode::Offline && self.outcome.reel_count < 2 {
            bail!(
                "offline play needs at least 2 reels to form a payline, got {}",
                self.outcome.reel_count
            );
        }
        Ok(())
    }
}
