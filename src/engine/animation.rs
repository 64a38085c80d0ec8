//! Reel animation timing.
//!
//! Produces one stop signal per reel. Reel `i` stops at
//! `start + i * stagger + duration`, whether or not the outcome has
//! arrived. The engine only cares about the last one.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::config::AnimationConfig;

/// Timing parameters for one spin's reel animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelAnimation {
    pub reel_count: usize,
    pub stagger: Duration,
    pub duration: Duration,
}

/// A reel has visually come to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelStop {
    pub reel: usize,
    /// Offset from the animation start.
    pub at: Duration,
}

impl ReelAnimation {
    pub fn new(reel_count: usize, stagger: Duration, duration: Duration) -> Self {
        Self {
            reel_count,
            stagger,
            duration,
        }
    }

    pub fn from_config(reel_count: usize, cfg: &AnimationConfig) -> Self {
        Self::new(reel_count, cfg.reel_stagger(), cfg.spin_duration())
    }

    /// Offset at which `reel` stops.
    pub fn stop_offset(&self, reel: usize) -> Duration {
        self.stagger.saturating_mul(reel as u32) + self.duration
    }

    /// Time until every reel has stopped.
    pub fn total(&self) -> Duration {
        match self.reel_count {
            0 => Duration::ZERO,
            n => self.stop_offset(n - 1),
        }
    }

    /// Start the clock now. The returned sequence cannot be restarted.
    pub fn start(self) -> ReelStops {
        let started = Instant::now();
        let inner = stream::unfold(0usize, move |reel| async move {
            if reel >= self.reel_count {
                return None;
            }
            let at = self.stop_offset(reel);
            tokio::time::sleep_until(started + at).await;
            trace!(reel, at_ms = at.as_millis() as u64, "Reel stopped");
            Some((ReelStop { reel, at }, reel + 1))
        })
        .boxed();
        ReelStops { inner }
    }
}

/// Lazy, finite sequence of reel stops for one started animation.
pub struct ReelStops {
    inner: BoxStream<'static, ReelStop>,
}

impl ReelStops {
    /// Wait for every reel to stop. Returns how many did.
    pub async fn all_settled(mut self) -> usize {
        let mut stopped = 0;
        while self.inner.next().await.is_some() {
            stopped += 1;
        }
        stopped
    }
}

impl Stream for ReelStops {
    type Item = ReelStop;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ReelStop>> {
        self.inner.as_mut().poll_next(cx)
    }
}
