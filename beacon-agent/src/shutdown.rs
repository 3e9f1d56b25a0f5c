//! Signal handling: lifecycle notifications and graceful shutdown.

use beacon_core::{LifecycleEvent, LifecycleSignal};
use std::future::Future;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

/// Install SIGTERM and SIGINT handlers.
///
/// The returned future completes when either arrives.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    })
}

/// Spawns a task that turns SIGUSR1 into a `Suspending` notification.
pub fn spawn_suspend_handler(lifecycle: LifecycleSignal) -> std::io::Result<JoinHandle<()>> {
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    Ok(tokio::spawn(async move {
        while sigusr1.recv().await.is_some() {
            tracing::info!("Received SIGUSR1, flushing pending events");
            lifecycle.notify(LifecycleEvent::Suspending);
        }
    }))
}
