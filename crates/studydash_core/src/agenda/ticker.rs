//! Cancellable background ticker driving countdown refreshes.
//!
//! # Responsibility
//! - Invoke a callback on a fixed cadence from a dedicated thread.
//!
//! # Invariants
//! - `stop()` and `Drop` both cancel and join the worker thread.
//! - No callback runs after `stop()` or `Drop` returns.

use crossbeam::channel::{bounded, select, tick, Sender};
use log::{info, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_CADENCE: Duration = Duration::from_secs(60);

/// Scoped handle to a running ticker thread.
#[derive(Debug)]
pub struct CountdownTicker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    cadence: Duration,
}

impl CountdownTicker {
    /// Spawns the ticker; the first callback fires one `cadence` after start.
    pub fn start<F>(cadence: Duration, mut on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let cadence_ms = cadence.as_millis();
        let handle = thread::Builder::new()
            .name("studydash-countdown".to_string())
            .spawn(move || {
                let ticks = tick(cadence);
                let mut fired: u64 = 0;
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticks) -> _ => {
                            on_tick();
                            fired += 1;
                        }
                    }
                }
                info!(
                    "event=ticker_stop module=agenda status=ok cadence_ms={cadence_ms} ticks={fired}"
                );
            })?;

        info!("event=ticker_start module=agenda status=ok cadence_ms={cadence_ms}");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            cadence,
        })
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels the ticker and waits for the worker to exit. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender also wakes the worker if the send fails.
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("event=ticker_stop module=agenda status=error error_code=callback_panicked");
            }
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_ticker(cadence: Duration) -> (CountdownTicker, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ticker = CountdownTicker::start(cadence, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (ticker, count)
    }

    #[test]
    fn ticker_fires_until_stopped() {
        let (mut ticker, count) = counting_ticker(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(60));
        ticker.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        assert!(!ticker.is_running());

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn dropping_ticker_cancels_it() {
        let (ticker, count) = counting_ticker(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        drop(ticker);

        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn stop_before_first_tick_never_fires() {
        let (mut ticker, count) = counting_ticker(Duration::from_secs(3600));
        ticker.stop();
        ticker.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
