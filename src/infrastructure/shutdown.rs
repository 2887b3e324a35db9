//! Graceful Shutdown
//!
//! Stops the accept loop and the heartbeat together, then gives in-flight
//! connection handlers a bounded time to finish.
//!
//! Shutdown is a one-way latch: once [`ShutdownController::shutdown`] has
//! run, every current and future call to [`ShutdownController::wait`]
//! resolves. Listeners and background tasks that start after the signal
//! still stop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// Shutdown coordinator shared by the listener, handlers and heartbeat.
///
/// Cloning is cheap and every clone observes the same latch and the same
/// handler count.
#[derive(Clone)]
pub struct ShutdownController {
    /// Latched by the first `shutdown()` call
    initiated: Arc<AtomicBool>,
    /// Connection handlers currently holding a [`HandlerGuard`]
    active_handlers: Arc<AtomicUsize>,
    /// Wakes tasks already parked in `wait()`
    shutdown_tx: broadcast::Sender<()>,
    /// Fired when the last handler finishes after shutdown began
    drained: Arc<Notify>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            initiated: Arc::new(AtomicBool::new(false)),
            active_handlers: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            drained: Arc::new(Notify::new()),
        }
    }

    /// Resolve once shutdown has begun, immediately if it already has.
    ///
    /// The receiver is registered before the latch is read, and
    /// `shutdown()` sets the latch before sending, so a signal racing with
    /// this call is seen by one of the two checks.
    pub async fn wait(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Begin shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        if !self.initiated.swap(true, Ordering::SeqCst) {
            tracing::info!("shutting down");
            let _ = self.shutdown_tx.send(());
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.initiated.load(Ordering::SeqCst)
    }

    /// Number of connection handlers still running.
    pub fn active_handlers(&self) -> usize {
        self.active_handlers.load(Ordering::SeqCst)
    }

    /// Count a connection handler for as long as the guard lives.
    ///
    /// Take the guard before spawning the handler task so a drain that
    /// starts right after the accept still waits for it.
    pub fn handler_guard(&self) -> HandlerGuard {
        self.active_handlers.fetch_add(1, Ordering::SeqCst);
        HandlerGuard {
            controller: self.clone(),
        }
    }

    fn handler_finished(&self) {
        let prev = self.active_handlers.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 && self.is_shutdown() {
            self.drained.notify_waiters();
        }
    }

    /// Wait until every handler has finished, up to `timeout`.
    ///
    /// Returns `false` if handlers were still running when the timeout hit.
    /// The `notified()` future is created before the count is read, so the
    /// last guard dropping in between is not missed.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let drained = self.drained.notified();
        if self.active_handlers() == 0 {
            return true;
        }

        tokio::select! {
            _ = drained => true,
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    "drain timeout: {} connection handlers still active",
                    self.active_handlers()
                );
                false
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one connection handler counted as active until dropped.
pub struct HandlerGuard {
    controller: ShutdownController,
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.controller.handler_finished();
    }
}

/// Resolve on Ctrl+C or SIGTERM, then trigger `controller`.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    controller.shutdown();
}
