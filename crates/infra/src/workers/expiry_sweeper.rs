use std::io;
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::engine::Sweep;

/// Sweeper runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweeperStats {
    pub sweeps_run: u64,
    pub reservations_expired: u64,
    /// Per-reservation failures plus sweeps that could not scan at all.
    pub failures: u64,
    pub last_sweep_at: Option<DateTime<Utc>>,
}

/// Handle to control and join a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl SweeperHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// A sweep in progress finishes first; the wait between sweeps is cut short.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            if j.join().is_err() {
                error!("expiry sweeper thread panicked");
            }
        }
    }

    pub fn stats(&self) -> SweeperStats {
        lock(&self.stats).clone()
    }
}

/// Periodic expiry sweep.
///
/// Runs on its own thread, independent of request handling, with a fixed
/// delay of `interval` between the end of one sweep and the start of the next.
#[derive(Debug)]
pub struct ExpirySweeper;

impl ExpirySweeper {
    pub fn spawn<E>(name: &str, target: Arc<E>, interval: Duration) -> io::Result<SweeperHandle>
    where
        E: Sweep + ?Sized + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SweeperStats::default()));
        let worker_stats = stats.clone();
        let worker_name = name.to_string();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                sweeper_loop(
                    &worker_name,
                    target.as_ref(),
                    interval,
                    shutdown_rx,
                    &worker_stats,
                )
            })?;

        Ok(SweeperHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn lock(stats: &Mutex<SweeperStats>) -> MutexGuard<'_, SweeperStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn sweeper_loop<E>(
    name: &str,
    target: &E,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
    stats: &Mutex<SweeperStats>,
) where
    E: Sweep + ?Sized,
{
    info!(worker = name, interval_ms = interval.as_millis() as u64, "expiry sweeper started");

    loop {
        // The wait doubles as the shutdown check.
        match shutdown_rx.recv_timeout(interval) {
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        debug!(worker = name, "running reservation expiry sweep");
        let result = target.sweep_now();

        let mut s = lock(stats);
        s.sweeps_run += 1;
        s.last_sweep_at = Some(Utc::now());
        match result {
            Ok(report) => {
                s.reservations_expired += report.expired as u64;
                s.failures += report.failed as u64;
                if report.expired > 0 || report.failed > 0 {
                    info!(
                        worker = name,
                        expired = report.expired,
                        failed = report.failed,
                        "expiry sweep finished"
                    );
                } else {
                    debug!(worker = name, "expiry sweep found nothing to expire");
                }
            }
            Err(e) => {
                s.failures += 1;
                error!(worker = name, error = ?e, "expiry sweep failed");
            }
        }
    }

    info!(worker = name, "expiry sweeper stopped");
}
