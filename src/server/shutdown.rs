//! Graceful shutdown handling
//!
//! The service is in one of two states:
//! - `Serving` - accepting and answering connections
//! - `Draining` - no longer accepting, waiting for in-flight requests
//!
//! SIGTERM and SIGINT move it from `Serving` to `Draining`. The transition
//! happens once; later signals are logged and otherwise ignored.

use tokio::sync::watch;
use tracing::{info, warn};

/// Lifecycle state observed by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Serving,
    Draining,
}

/// Receiving half of the shutdown channel
///
/// Cloned and handed to every component that has to react to draining.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<ServiceState>,
}

impl ShutdownSignal {
    /// Wait until the service starts draining
    pub async fn wait(&mut self) {
        while *self.receiver.borrow_and_update() == ServiceState::Serving {
            if self.receiver.changed().await.is_err() {
                // Controller dropped, treat as shutdown
                break;
            }
        }
    }

    /// Current state (non-blocking)
    pub fn state(&self) -> ServiceState {
        *self.receiver.borrow()
    }

    /// Check if draining has started (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        self.state() == ServiceState::Draining
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    sender: watch::Sender<ServiceState>,
}

impl ShutdownController {
    /// Move from `Serving` to `Draining`
    ///
    /// Returns `true` if this call performed the transition and `false` if
    /// the service was already draining.
    pub fn shutdown(&self) -> bool {
        let transitioned = self.sender.send_if_modified(|state| match state {
            ServiceState::Serving => {
                *state = ServiceState::Draining;
                true
            }
            ServiceState::Draining => false,
        });

        if transitioned {
            info!("Shutdown signal sent");
        }
        transitioned
    }

    pub fn state(&self) -> ServiceState {
        *self.sender.borrow()
    }
}

/// Create a new shutdown channel in the `Serving` state
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(ServiceState::Serving);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Registered SIGTERM/SIGINT handlers
///
/// Registration happens at startup so a failure is a startup error rather
/// than a silently missing handler.
#[cfg(unix)]
pub struct TerminationSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next SIGTERM or SIGINT and return its name
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Ctrl+C handler (Windows)
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to wait for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "CTRL_C"
    }
}

/// Forward termination signals to the shutdown controller
///
/// The first signal starts draining. Any later signal arrives while the
/// drain is already running and is only logged.
pub async fn forward_signals(mut signals: TerminationSignals, controller: ShutdownController) {
    loop {
        let signal = signals.recv().await;
        if controller.shutdown() {
            info!(signal = signal, "Signal received: closing HTTP server");
        } else {
            warn!(signal = signal, "Signal received while already draining, ignoring");
        }
    }
}
