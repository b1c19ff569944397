//! Liveness and readiness probes
//!
//! `GET /healthz` answers as soon as the process is up. `GET /readyz` answers
//! 200 once startup has finished and 503 before that. Readiness does not
//! depend on leadership: a standby replica waiting for the lease is ready.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::{error, info};

/// Build the probe router around a shared readiness flag
pub fn health_routes(ready: Arc<AtomicBool>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .with_state(ready)
}

async fn readyz(State(ready): State<Arc<AtomicBool>>) -> (StatusCode, &'static str) {
    if ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Mark the process ready, then wait for `pending` (e.g. leader election)
pub async fn ready_while<F: Future>(ready: &AtomicBool, pending: F) -> F::Output {
    ready.store(true, Ordering::SeqCst);
    pending.await
}

/// Serve the probes on `addr` until the process exits
pub async fn start_health_server(addr: SocketAddr, ready: Arc<AtomicBool>) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => {
            info!(addr = %addr, "Health probe server started");
            l
        }
        Err(e) => {
            error!(error = %e, addr = %addr, "Failed to bind health probe address");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, health_routes(ready)).await {
        error!(error = %e, "Health probe server error");
    }
}
