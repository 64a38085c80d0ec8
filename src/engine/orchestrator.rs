//! Spin orchestrator — the async driver around `SpinMachine`.
//!
//! Runs a single-task loop that multiplexes user input with in-flight
//! work. For each committed spin it starts the outcome request and the
//! reel animation together, and feeds their completions back into the
//! machine. Once the machine reports the join, a reveal timer runs before
//! the outcome is applied.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AnimationConfig;
use crate::engine::animation::ReelAnimation;
use crate::engine::machine::{Next, SpinMachine};
use crate::outcome::OutcomeSource;
use crate::types::{Input, SessionSummary, SpinOutcome, SpinTicket, TransportError};

/// A finished piece of in-flight work, tagged with its spin.
#[derive(Debug)]
enum Completion {
    Outcome(Uuid, Result<SpinOutcome, TransportError>),
    Animation(Uuid, usize),
    Reveal(Uuid),
}

type InFlight = FuturesUnordered<BoxFuture<'static, Completion>>;

const QUIT_GRACE: Duration = Duration::from_secs(1);
const QUIT_ABANDON_REASON: &str = "outcome still pending at quit";

pub struct SpinOrchestrator {
    machine: SpinMachine,
    source: Arc<dyn OutcomeSource>,
    animation: AnimationConfig,
}

impl SpinOrchestrator {
    pub fn new(
        machine: SpinMachine,
        source: Arc<dyn OutcomeSource>,
        animation: AnimationConfig,
    ) -> Self {
        Self {
            machine,
            source,
            animation,
        }
    }

    pub fn machine(&self) -> &SpinMachine {
        &self.machine
    }

    /// Process input until `Quit` or the channel closes.
    ///
    /// A spin still in flight at that point is given a bounded time to
    /// settle and is refunded otherwise, so the balance is never left
    /// mid-spin and a hung outcome request cannot block shutdown.
    pub async fn run(&mut self, mut inputs: mpsc::Receiver<Input>) -> SessionSummary {
        info!(source = self.source.name(), "Orchestrator running");
        self.machine.announce();
        let mut inflight = InFlight::new();

        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(Input::Quit) | None => break,
                    Some(input) => self.handle_input(input, &mut inflight),
                },
                Some(done) = inflight.next(), if !inflight.is_empty() => {
                    self.handle_completion(done, &mut inflight);
                }
            }
        }

        self.wind_down(&mut inflight).await;

        let summary = self.machine.summary();
        info!(
            spins = summary.spins,
            wins = summary.wins,
            refunds = summary.refunds,
            balance = summary.final_balance,
            "Orchestrator stopped"
        );
        summary
    }

    /// Let the active spin finish, but no longer than it could still
    /// legitimately take. A spin still unresolved at the deadline is
    /// abandoned and refunded. Work left over from spins that already
    /// ended is dropped.
    async fn wind_down(&mut self, inflight: &mut InFlight) {
        if self.machine.active_ticket().is_none() {
            return;
        }
        let limit = self.quit_limit();
        let deadline = Instant::now() + limit;
        info!(
            phase = %self.machine.phase(),
            limit_ms = limit.as_millis() as u64,
            "Waiting for the active spin to finish"
        );

        while self.machine.active_ticket().is_some() {
            tokio::select! {
                biased;
                Some(done) = inflight.next(), if !inflight.is_empty() => {
                    self.handle_completion(done, inflight);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.machine.abandon(QUIT_ABANDON_REASON);
                }
            }
        }
    }

    /// Full animation plus reveal pause, with some slack.
    fn quit_limit(&self) -> Duration {
        let reels = ReelAnimation::from_config(self.machine.shape().reel_count, &self.animation);
        reels.total() + self.animation.reveal_pause() + QUIT_GRACE
    }

    fn handle_input(&mut self, input: Input, inflight: &mut InFlight) {
        debug!(?input, "Input received");
        let result = match input {
            Input::Spin => match self.machine.request_spin() {
                Ok(ticket) => {
                    self.launch(ticket, inflight);
                    return;
                }
                Err(e) => Err(e),
            },
            Input::IncreaseBet => self.machine.increase_bet().map(drop),
            Input::DecreaseBet => self.machine.decrease_bet().map(drop),
            Input::Quit => Ok(()),
        };
        if let Err(e) = result {
            info!(?input, reason = %e, "Input rejected");
        }
    }

    /// Start the outcome request and the animation for a committed spin.
    fn launch(&mut self, ticket: SpinTicket, inflight: &mut InFlight) {
        let SpinTicket { id, bet } = ticket;

        let source = Arc::clone(&self.source);
        inflight.push(
            async move { Completion::Outcome(id, source.fetch_outcome(bet).await) }.boxed(),
        );

        let reel_count = self.machine.shape().reel_count;
        let stops = ReelAnimation::from_config(reel_count, &self.animation).start();
        inflight.push(async move { Completion::Animation(id, stops.all_settled().await) }.boxed());

        self.machine.dispatch(id);
    }

    fn handle_completion(&mut self, done: Completion, inflight: &mut InFlight) {
        let next = match done {
            Completion::Outcome(id, result) => (id, self.machine.outcome_received(id, result)),
            Completion::Animation(id, reels) => {
                debug!(spin_id = %id, reels, "Reels settled");
                (id, self.machine.animation_completed(id))
            }
            Completion::Reveal(id) => {
                if self.machine.reveal(id).is_none() {
                    warn!(spin_id = %id, "Reveal timer fired for a spin that is not settling");
                }
                return;
            }
        };

        if let (id, Next::Reveal) = next {
            let pause = self.animation.reveal_pause();
            inflight.push(
                async move {
                    tokio::time::sleep(pause).await;
                    Completion::Reveal(id)
                }
                .boxed(),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
