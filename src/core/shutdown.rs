//! # OS termination signals.
//!
//! The scheduler treats a termination signal like an explicit
//! `Scheduler::shutdown`, and records which signal it was as the reason of
//! the `ShutdownRequested` notice.

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl_c")
}

/// Signal name, or pending forever if handlers could not be installed.
pub(crate) async fn signal_or_never() -> &'static str {
    match termination().await {
        Ok(name) => name,
        Err(err) => {
            tracing::warn!(target: "loopvisor", error = %err, "signal handlers unavailable, only explicit shutdown stops the run");
            std::future::pending().await
        }
    }
}
