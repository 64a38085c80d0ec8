//! End-to-end spin lifecycle tests.
//!
//! Drives `SpinOrchestrator` on a paused clock with a scripted outcome
//! source and a recording presenter, and checks balances, notices and
//! the ordering of settlement against the animation.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use spindeck::config::AnimationConfig;
use spindeck::engine::machine::SpinMachine;
use spindeck::engine::orchestrator::SpinOrchestrator;
use spindeck::engine::wager::{WagerManager, WagerState};
use spindeck::outcome::GridShape;
use spindeck::presentation::{AudioCue, BalanceDirection, Effect, RecordingPresenter};
use spindeck::types::{Input, SessionSummary, SpinPhase, SpinResult, TransportError};

use crate::mock_source::{loss, win, MockSource};

struct Harness {
    tx: mpsc::Sender<Input>,
    handle: JoinHandle<(SpinOrchestrator, SessionSummary)>,
    presenter: RecordingPresenter,
    source: MockSource,
}

impl Harness {
    fn start(balance: u64, bet: u64, source: MockSource) -> Self {
        let presenter = RecordingPresenter::new();
        let machine = SpinMachine::new(
            WagerManager::new(WagerState::new(balance, bet, 10, 500)),
            Box::new(presenter.clone()),
            GridShape::default(),
        );
        let mut orchestrator = SpinOrchestrator::new(
            machine,
            std::sync::Arc::new(source.clone()),
            AnimationConfig::default(),
        );
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move {
            let summary = orchestrator.run(rx).await;
            (orchestrator, summary)
        });
        Self {
            tx,
            handle,
            presenter,
            source,
        }
    }

    async fn send(&self, input: Input) {
        self.tx.send(input).await.unwrap();
    }

    async fn quit(self) -> (SpinOrchestrator, SessionSummary, RecordingPresenter, MockSource) {
        self.tx.send(Input::Quit).await.unwrap();
        let (orch, summary) = self.handle.await.unwrap();
        (orch, summary, self.presenter, self.source)
    }

    fn saw(&self, effect: &Effect) -> bool {
        self.presenter.effects().contains(effect)
    }

    fn rendered(&self) -> bool {
        self.presenter
            .effects()
            .iter()
            .any(|e| matches!(e, Effect::RenderReels(_)))
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_winning_spin() {
    let source = MockSource::new();
    source.push(win(200));
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(5)).await;
    let (orch, summary, rec, source) = h.quit().await;

    assert_eq!(source.requests(), vec![50]);
    assert_eq!(summary.final_balance, 1150);
    assert_eq!(orch.machine().phase(), SpinPhase::Idle);
    assert_eq!(rec.last_status().as_deref(), Some("🎉 You Win $200! 🎉"));

    let effects = rec.effects();
    assert!(effects.contains(&Effect::FlashBalance(BalanceDirection::Decrease, 950)));
    assert!(effects.contains(&Effect::FlashBalance(BalanceDirection::Increase, 1150)));
    assert!(effects.contains(&Effect::PlayAudio(AudioCue::Win)));
    assert!(effects.contains(&Effect::HighlightPayline));
    assert!(effects.contains(&Effect::Celebrate));
    assert_eq!(effects.last(), Some(&Effect::InputLocked(false)));
}

#[tokio::test(start_paused = true)]
async fn test_losing_spin() {
    let source = MockSource::new();
    source.push(loss());
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(5)).await;
    let (_, summary, rec, _) = h.quit().await;

    assert_eq!(summary.final_balance, 950);
    assert_eq!(summary.wins, 0);
    assert_eq!(rec.last_status().as_deref(), Some("😢 Try Again!"));
    let effects = rec.effects();
    assert!(effects.contains(&Effect::PlayAudio(AudioCue::Loss)));
    assert!(effects.contains(&Effect::LossEffect));
    assert!(!effects.contains(&Effect::Celebrate));
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_balance_is_rejected_locally() {
    let h = Harness::start(5, 50, MockSource::new());

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(1)).await;
    let (orch, summary, rec, source) = h.quit().await;

    assert!(source.requests().is_empty());
    assert_eq!(summary.final_balance, 5);
    assert_eq!(summary.spins, 0);
    assert_eq!(orch.machine().phase(), SpinPhase::Idle);
    assert!(rec
        .effects()
        .contains(&Effect::ErrorNotice("Insufficient Balance!".into())));
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_refunds_wager() {
    let source = MockSource::new();
    source.push(Err(TransportError::Request("connection refused".into())));
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(5)).await;
    let (orch, summary, rec, _) = h.quit().await;

    assert_eq!(summary.final_balance, 1000);
    assert_eq!(summary.refunds, 1);
    assert_eq!(orch.machine().phase(), SpinPhase::Idle);
    assert_eq!(rec.last_status().as_deref(), Some("Error! Please try again."));
    assert!(rec
        .effects()
        .iter()
        .any(|e| matches!(e, Effect::ErrorNotice(t) if t.contains("connection refused"))));
    match &orch.machine().history()[0].result {
        SpinResult::Refunded { reason } => assert!(reason.contains("connection refused")),
        other => panic!("expected refund, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_malformed_outcome_refunds_wager() {
    let source = MockSource::new();
    let mut bad = win(200).unwrap();
    bad.reels.pop();
    source.push(Ok(bad));
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(5)).await;
    let (_, summary, rec, _) = h.quit().await;

    assert_eq!(summary.final_balance, 1000);
    assert_eq!(summary.refunds, 1);
    assert!(!rec.effects().iter().any(|e| matches!(e, Effect::RenderReels(_))));
}

// ---------------------------------------------------------------------------
// Join ordering
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_slow_outcome_holds_settlement() {
    let source = MockSource::new();
    source.push(win(200));
    source.set_delay(Duration::from_millis(5000));
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;

    // Reels stopped at 2600ms, outcome still pending.
    sleep(Duration::from_millis(4000)).await;
    assert!(!h.rendered());
    assert_eq!(h.presenter.last_status().as_deref(), Some("Spinning..."));

    // Outcome in at 5000ms, reveal pause until 5300ms.
    sleep(Duration::from_millis(1150)).await;
    assert!(h.rendered());
    assert_eq!(h.presenter.last_status().as_deref(), Some("Spinning..."));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.presenter.last_status().as_deref(), Some("🎉 You Win $200! 🎉"));

    let (_, summary, _, _) = h.quit().await;
    assert_eq!(summary.final_balance, 1150);
}

#[tokio::test(start_paused = true)]
async fn test_fast_outcome_waits_for_animation() {
    let source = MockSource::new();
    source.push(loss());
    source.set_delay(Duration::from_millis(100));
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;

    sleep(Duration::from_millis(1000)).await;
    assert!(!h.rendered());
    assert!(!h.saw(&Effect::LossEffect));

    // Last reel stops at 2600ms; result applied at 2900ms.
    sleep(Duration::from_millis(1750)).await;
    assert!(h.rendered());
    assert!(!h.saw(&Effect::LossEffect));

    sleep(Duration::from_millis(200)).await;
    assert!(h.saw(&Effect::LossEffect));

    let (_, summary, _, _) = h.quit().await;
    assert_eq!(summary.final_balance, 950);
}

// ---------------------------------------------------------------------------
// Single active spin
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_inputs_during_spin_change_nothing() {
    let source = MockSource::new();
    source.push(loss());
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_millis(500)).await;
    h.send(Input::Spin).await;
    h.send(Input::IncreaseBet).await;
    h.send(Input::DecreaseBet).await;
    sleep(Duration::from_millis(500)).await;
    assert!(h.saw(&Effect::SetStatus("Already spinning!".into())));
    assert!(!h.presenter.effects().iter().any(|e| matches!(e, Effect::FlashBet(_))));

    sleep(Duration::from_secs(3)).await;
    let (orch, summary, _, source) = h.quit().await;

    assert_eq!(source.requests(), vec![50]);
    assert_eq!(summary.spins, 1);
    assert_eq!(summary.final_balance, 950);
    assert_eq!(orch.machine().wager().bet, 50);
}

#[tokio::test(start_paused = true)]
async fn test_quit_mid_spin_settles_first() {
    let source = MockSource::new();
    source.push(win(120));
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_millis(100)).await;
    let (orch, summary, _, _) = h.quit().await;

    assert_eq!(orch.machine().phase(), SpinPhase::Idle);
    assert_eq!(summary.spins, 1);
    assert_eq!(summary.final_balance, 1070);
}

#[tokio::test(start_paused = true)]
async fn test_quit_with_hung_request_refunds_and_exits() {
    let source = MockSource::new();
    source.set_hang();
    let h = Harness::start(1000, 50, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_millis(100)).await;
    let (orch, summary, rec, source) = tokio::time::timeout(Duration::from_secs(3600), h.quit())
        .await
        .expect("quit must not wait on a request that never answers");

    assert_eq!(source.requests(), vec![50]);
    assert_eq!(summary.final_balance, 1000);
    assert_eq!(summary.refunds, 1);
    assert_eq!(orch.machine().phase(), SpinPhase::Idle);
    assert!(rec.effects().contains(&Effect::FlashBalance(BalanceDirection::Increase, 1000)));
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_spins_with_clamp() {
    let source = MockSource::new();
    source.push(loss()).push(loss());
    // Bet 40 with balance 60: after the first loss the balance is 20,
    // so the bet is pulled down to 20 and the second spin drains it.
    let h = Harness::start(60, 40, source);

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(4)).await;
    assert!(h.saw(&Effect::FlashBet(20)));

    h.send(Input::Spin).await;
    sleep(Duration::from_secs(4)).await;
    h.send(Input::Spin).await;
    sleep(Duration::from_millis(100)).await;
    let (orch, summary, rec, source) = h.quit().await;

    assert_eq!(source.requests(), vec![40, 20]);
    assert_eq!(summary.spins, 2);
    assert_eq!(summary.final_balance, 0);
    assert_eq!(orch.machine().wager().bet, 10);
    assert_eq!(rec.last_status().as_deref(), Some("Insufficient Balance!"));
}
