//! User interrupt plumbing.
//!
//! A background task waits for Ctrl-C and flips a shared flag. The runner
//! holds an [`InterruptSignal`] and races it against the running child.

use std::io;
use tokio::sync::watch;
use tracing::debug;
#[cfg(not(unix))]
use tracing::warn;

/// Sending half, held by whoever observes the interrupt.
#[derive(Debug)]
pub struct InterruptTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into every consumer.
#[derive(Debug, Clone)]
pub struct InterruptSignal {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (InterruptTrigger, InterruptSignal) {
    let (tx, rx) = watch::channel(false);
    (InterruptTrigger { tx }, InterruptSignal { rx })
}

impl InterruptTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl InterruptSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = channel();
        signal
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt has fired. Pends forever if the trigger is
    /// dropped without firing.
    pub async fn triggered(&mut self) {
        let closed = self.rx.wait_for(|fired| *fired).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Installs the Ctrl-C handler and spawns a task that fires the returned
/// signal on the first interrupt.
///
/// On Unix the SIGINT handler is registered before this returns, so an
/// interrupt arriving before the task is first polled is still caught. Must be
/// called from within a Tokio runtime.
#[cfg(unix)]
pub fn listen_for_ctrl_c() -> io::Result<InterruptSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let (trigger, interrupt) = channel();

    tokio::spawn(async move {
        if sigint.recv().await.is_some() {
            debug!("SIGINT received");
            trigger.trigger();
        }
    });

    Ok(interrupt)
}

#[cfg(not(unix))]
pub fn listen_for_ctrl_c() -> io::Result<InterruptSignal> {
    let (trigger, interrupt) = channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                debug!("Ctrl-C received");
                trigger.trigger();
            }
            Err(e) => {
                warn!("Unable to listen for Ctrl-C: {}", e);
                // Hold the trigger so waiters keep pending instead of firing.
                std::future::pending::<()>().await;
            }
        }
    });

    Ok(interrupt)
}
