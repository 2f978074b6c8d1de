use axum::extract::State;
use axum::Json;

use crate::auth::jwt;
use crate::auth::middleware::AuthUser;
use crate::auth::password::{verify_password, DUMMY_PASSWORD_HASH};
use crate::client_ip::ClientIp;
use crate::dto::*;
use crate::error::AppError;
use crate::state::AppState;

/// Verifies credentials and feeds the outcome to the login throttle.
///
/// The gate check has already run in `login_gate`; here every credential
/// failure is recorded against the client address and a success clears it.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state.config.find_user(&body.username).cloned();

    // Unknown users are checked against a dummy hash so both failures take as long.
    let hash = user
        .as_ref()
        .map_or(DUMMY_PASSWORD_HASH, |u| u.password_hash.as_str())
        .to_string();
    let password = body.password;

    let valid = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let user = match user {
        Some(user) if valid => user,
        Some(user) => {
            tracing::warn!("Failed login from {ip} for user: {}", user.username);
            state.throttle.record_failure(&ip);
            return Err(AppError::Auth("Invalid credentials".to_string()));
        }
        None => {
            tracing::warn!("Failed login from {ip}: unknown user {}", body.username);
            state.throttle.record_failure(&ip);
            return Err(AppError::Auth("Invalid credentials".to_string()));
        }
    };

    state.throttle.record_success(&ip);
    tracing::info!("Login succeeded for user: {} from {ip}", user.username);

    let (token, expires_at) = jwt::create_token(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_ttl_hours,
        &user.username,
    )?;

    Ok(Json(LoginResponse { token, expires_at }))
}

pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse { username: user.sub })
}
