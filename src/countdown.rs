//! Next-bake countdown.
//!
//! A cancellable ticker that recomputes the time remaining until the next
//! bake can count, publishing it over a watch channel for the UI. The task
//! holds timestamps only; it must never capture a signer, so a disconnect
//! can tear it down without touching credentials.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::progression;

pub struct NextBakeCountdown {
    remaining_rx: watch::Receiver<Duration>,
    handle: JoinHandle<()>,
}

impl NextBakeCountdown {
    /// Start ticking against the given last-bake timestamp.
    pub fn start(last_bake_timestamp: Option<i64>) -> Self {
        let initial = progression::time_until_next_bake(last_bake_timestamp, Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let (tx, remaining_rx) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                let remaining = progression::time_until_next_bake(last_bake_timestamp, Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if tx.send(remaining).is_err() {
                    // Every receiver is gone; nothing left to tick for.
                    break;
                }
            }
        });

        debug!("next-bake countdown started");
        Self { remaining_rx, handle }
    }

    /// Watch the remaining time. Zero means a bake can count now.
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.remaining_rx.clone()
    }

    pub fn remaining(&self) -> Duration {
        *self.remaining_rx.borrow()
    }

    /// Stop the ticker. Also happens on drop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for NextBakeCountdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_bake_today_means_zero_remaining() {
        let countdown = NextBakeCountdown::start(None);
        assert_eq!(countdown.remaining(), Duration::ZERO);
        countdown.abort();
    }

    #[tokio::test]
    async fn bake_just_now_leaves_a_positive_countdown() {
        let countdown = NextBakeCountdown::start(Some(Utc::now().timestamp()));
        let remaining = countdown.remaining();
        assert!(remaining > Duration::ZERO);
        assert!(remaining <= Duration::from_secs(24 * 60 * 60));
    }

    #[tokio::test]
    async fn abort_stops_the_ticker() {
        let countdown = NextBakeCountdown::start(None);
        countdown.abort();
        // Aborted task winds down without hanging the runtime.
        tokio::task::yield_now().await;
    }
}
