//! SPINDECK — slot machine client
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the outcome source and terminal presenter into the spin engine,
//! and runs the input loop until the player quits.

use anyhow::Result;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use spindeck::config::{self, OutcomeMode};
use spindeck::engine::machine::SpinMachine;
use spindeck::engine::orchestrator::SpinOrchestrator;
use spindeck::engine::wager::{WagerManager, WagerState};
use spindeck::input;
use spindeck::outcome::http::HttpOutcomeClient;
use spindeck::outcome::offline::OfflineOutcomeSource;
use spindeck::outcome::{GridShape, OutcomeSource};
use spindeck::presentation::terminal::TerminalPresenter;
use spindeck::types::Input;

const BANNER: &str = r#"
 ____  ____ ___ _   _ ____  _____ ____ _  __
/ ___||  _ \_ _| \ | |  _ \| ____/ ___| |/ /
\___ \| |_) | ||  \| | | | |  _|| |   | ' /
 ___) |  __/| || |\  | |_| | |__| |___| . \
|____/|_|  |___|_| \_|____/|_____\____|_|\_\

  Enter / Space: spin    + / -: bet    q: quit
"#;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        balance = cfg.wager.initial_balance,
        bet = cfg.wager.initial_bet,
        min_bet = cfg.wager.min_bet,
        max_bet = cfg.wager.max_bet,
        "SPINDECK starting up"
    );

    // -- Initialise components -------------------------------------------

    let shape = GridShape::from(&cfg.outcome);
    let source: Arc<dyn OutcomeSource> = match cfg.outcome.mode {
        OutcomeMode::Http => {
            let base_url = cfg.outcome.resolved_base_url();
            info!(base_url = %base_url, "Using HTTP outcome service");
            Arc::new(HttpOutcomeClient::new(
                &base_url,
                cfg.outcome.request_timeout(),
            )?)
        }
        OutcomeMode::Offline => {
            info!("Using offline outcome generator");
            Arc::new(OfflineOutcomeSource::new(shape))
        }
    };

    let wager = WagerState::from(&cfg.wager);
    let mut presenter = TerminalPresenter::stdout(cfg.presentation.sound);
    presenter.show_table(wager.balance, wager.bet);

    let machine = SpinMachine::new(WagerManager::new(wager), Box::new(presenter), shape);
    let mut orchestrator = SpinOrchestrator::new(machine, source, cfg.animation.clone());

    // -- Input ------------------------------------------------------------

    let (tx, rx) = mpsc::channel::<Input>(32);
    // Raw mode swallows SIGINT, so Ctrl+C arrives as a key press there.
    let raw_mode = if std::io::stdin().is_terminal() {
        let guard = input::RawModeGuard::enable()?;
        input::spawn_key_reader(tx.clone());
        Some(guard)
    } else {
        // Detached: the thread stays blocked on stdin until the process exits.
        input::spawn_line_reader(tx.clone());
        None
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down");
                let _ = tx.send(Input::Quit).await;
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    // -- Main loop --------------------------------------------------------

    let summary = orchestrator.run(rx).await;
    drop(raw_mode);

    for record in orchestrator.machine().history() {
        info!("{record}");
    }
    println!("\n{summary}");
    info!(
        spins = summary.spins,
        net = summary.net(),
        balance = summary.final_balance,
        "SPINDECK shut down"
    );

    Ok(())
}

/// Initialise the tracing subscriber. Logs go to stderr, leaving stdout
/// to the reel display.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spindeck=info"));

    let json_logging = std::env::var("SPINDECK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
