//! Background sweepers and the shutdown sequence: idempotent cleanup
//! triggered once by SIGINT/SIGTERM or normal exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strongbox_core::{
    SESSION_SWEEP_INTERVAL_SECS, SESSION_TTL_SECS, UPLOAD_SESSION_IDLE_TIMEOUT_SECS,
    UPLOAD_SWEEP_INTERVAL_SECS,
};

use crate::context::AppContext;

static CLEANUP_RAN: AtomicBool = AtomicBool::new(false);

/// Spawn the session-store and upload-session sweepers as detached
/// background loops. Returns their handles so shutdown can abort them.
pub fn spawn_sweepers(ctx: Arc<AppContext>) -> Vec<tokio::task::JoinHandle<()>> {
    let session_ctx = Arc::clone(&ctx);
    let session_sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            session_ctx
                .auth
                .sessions()
                .sweep_expired(Duration::from_secs(SESSION_TTL_SECS));
            tracing::debug!("session sweep complete");
        }
    });

    let upload_ctx = Arc::clone(&ctx);
    let upload_sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(UPLOAD_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let reaped = upload_ctx
                .upload
                .sweep_idle(Duration::from_secs(UPLOAD_SESSION_IDLE_TIMEOUT_SECS))
                .await;
            if reaped > 0 {
                tracing::info!(reaped, "swept idle upload sessions");
            }
        }
    });

    vec![session_sweeper, upload_sweeper]
}

/// Wait for SIGINT or SIGTERM (Unix) / Ctrl-C (any platform), then run the
/// idempotent cleanup sequence exactly once.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Run the cleanup sequence once: idempotent regardless of how many times
/// it is invoked across signal handlers and normal shutdown paths.
pub fn run_cleanup_once(reason: &str) {
    if CLEANUP_RAN.swap(true, Ordering::SeqCst) {
        return;
    }
    tracing::info!(reason, "running shutdown cleanup");
}
