use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use loginguard_core::GateDecision;

use crate::client_ip::ClientIp;
use crate::error::AppError;
use crate::state::AppState;

/// Rejects login attempts from addresses inside a failed-login block before
/// any credential is checked.
pub async fn login_gate(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match state.throttle.check(&ip) {
        GateDecision::Allowed => Ok(next.run(req).await),
        GateDecision::Blocked {
            retry_after_secs,
            retry_after_minutes,
        } => {
            tracing::warn!("Rejected login from blocked address {ip} ({retry_after_minutes} min left)");
            Err(AppError::TooManyAttempts {
                retry_after_secs,
                retry_after_minutes,
            })
        }
    }
}
