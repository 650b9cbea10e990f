//! # Shutdown Coordination
//!
//! `Running -> Draining -> Stopped`, published on a watch channel. The reader
//! holds a [`ShutdownSignal`] and stops pulling from the broker once the state
//! leaves `Running`; the pipeline marks `Stopped` after every worker returned.

use std::fmt;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Draining => f.write_str("draining"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: watch::Sender<PipelineState>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PipelineState::Running);
        Self { state }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            state: self.state.subscribe(),
        }
    }

    /// Move `Running -> Draining`. Returns `false` if draining had already begun.
    pub fn begin_drain(&self) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if *state == PipelineState::Running {
                *state = PipelineState::Draining;
                true
            } else {
                false
            }
        });
        if transitioned {
            info!("Pipeline draining");
        }
        transitioned
    }

    pub fn mark_stopped(&self) {
        self.state.send_replace(PipelineState::Stopped);
        info!("Pipeline stopped");
    }
}

/// Cancellation handle given to the read loop
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: watch::Receiver<PipelineState>,
}

impl ShutdownSignal {
    /// Resolves once the pipeline leaves `Running`, or the coordinator is gone
    pub async fn cancelled(&mut self) {
        let _ = self
            .state
            .wait_for(|state| *state != PipelineState::Running)
            .await;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow() != PipelineState::Running
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn wait_for_termination() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
