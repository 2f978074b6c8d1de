mod auth_handlers;

use std::sync::Arc;

use axum::body::Body;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor};
use tower_governor::GovernorLayer;

use crate::middleware::login_gate::login_gate;
use crate::state::AppState;

/// Routes that attempt authentication.
///
/// A coarse per-IP request ceiling wraps them, keyed like
/// [`ClientIp`](crate::client_ip::ClientIp): forwarding headers only count
/// when `trust_forwarded_for` is set. The login gate runs inside it, before
/// the handler.
pub fn auth_router(state: &AppState) -> anyhow::Result<Router<AppState>> {
    let routes = Router::new().route(
        "/auth/login",
        post(auth_handlers::login).route_layer(from_fn_with_state(state.clone(), login_gate)),
    );

    let rate_limit_rpm = state.config.rate_limit.login_requests_per_minute.max(1);
    let period_per_request = u64::from((60 / rate_limit_rpm).max(1));

    let routes = if state.config.rate_limit.trust_forwarded_for {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(period_per_request)
            .burst_size(rate_limit_rpm)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?;
        routes.layer(GovernorLayer::<_, _, Body>::new(Arc::new(governor_config)))
    } else {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(period_per_request)
            .burst_size(rate_limit_rpm)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?;
        routes.layer(GovernorLayer::<_, _, Body>::new(Arc::new(governor_config)))
    };

    Ok(routes)
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/me", get(auth_handlers::me))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::password::hash_password;
    use crate::config::{ServerConfig, UserConfig};

    const PASSWORD: &str = "correct horse battery staple";

    fn test_state(trust_forwarded_for: bool) -> AppState {
        test_state_with_limit(trust_forwarded_for, 60)
    }

    fn test_state_with_limit(trust_forwarded_for: bool, login_requests_per_minute: u32) -> AppState {
        let mut config = ServerConfig::default();
        config.rate_limit.login_requests_per_minute = login_requests_per_minute;
        config.auth.jwt_secret = "test-secret-0123456789abcdef0123456789".to_string();
        config.rate_limit.trust_forwarded_for = trust_forwarded_for;
        config.users.push(UserConfig {
            username: "alice".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
        });
        AppState::new(config)
    }

    fn app(state: &AppState) -> Router {
        Router::new()
            .nest("/api", auth_router(state).unwrap().merge(protected_router()))
            .with_state(state.clone())
    }

    fn login_request(peer: [u8; 4], username: &str, password: &str) -> Request<Body> {
        let body = serde_json::json!({ "username": username, "password": password });
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .extension(ConnectInfo(SocketAddr::from((peer, 40000))))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// A login with an incomplete body: rejected after the request limit and
    /// the gate, without touching the throttle.
    fn incomplete_login_request(peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", forwarded_for)
            .extension(ConnectInfo(SocketAddr::from((peer, 40000))))
            .body(Body::from("{}"))
            .unwrap()
    }

    async fn count_rate_limited(app: &Router, requests: Vec<Request<Body>>) -> usize {
        let mut limited = 0;
        for req in requests {
            let response = app.clone().oneshot(req).await.unwrap();
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                limited += 1;
            }
        }
        limited
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(state: &AppState, req: Request<Body>) -> Response {
        app(state).oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn valid_login_returns_token() {
        let state = test_state(false);
        let response = send(&state, login_request([1, 2, 3, 4], "alice", PASSWORD)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert!(state.throttle.record("1.2.3.4").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_recorded() {
        let state = test_state(false);
        let response = send(&state, login_request([1, 2, 3, 4], "alice", "nope")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid credentials");
        assert_eq!(state.throttle.record("1.2.3.4").unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn unknown_user_is_recorded() {
        let state = test_state(false);
        let response = send(&state, login_request([1, 2, 3, 4], "mallory", PASSWORD)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.throttle.record("1.2.3.4").unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn third_failure_blocks_even_correct_password() {
        let state = test_state(false);
        for _ in 0..3 {
            let response = send(&state, login_request([1, 2, 3, 4], "alice", "nope")).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = send(&state, login_request([1, 2, 3, 4], "alice", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3600");
        assert_eq!(
            body_json(response).await["error"],
            "Too many failed attempts. Try again in 60 minutes."
        );

        // The blocked attempt neither counted nor reset anything.
        let record = state.throttle.record("1.2.3.4").unwrap();
        assert_eq!(record.strike, 1);
        assert_eq!(record.attempts, 0);
        assert!(record.block_expires_at.is_some());
    }

    #[tokio::test]
    async fn block_is_per_address() {
        let state = test_state(false);
        for _ in 0..3 {
            send(&state, login_request([1, 2, 3, 4], "alice", "nope")).await;
        }

        let response = send(&state, login_request([5, 6, 7, 8], "alice", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let state = test_state(false);
        for _ in 0..2 {
            send(&state, login_request([1, 2, 3, 4], "alice", "nope")).await;
        }
        let response = send(&state, login_request([1, 2, 3, 4], "alice", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.throttle.record("1.2.3.4").unwrap().attempts, 0);

        // Two more failures do not block; the count started over.
        for _ in 0..2 {
            send(&state, login_request([1, 2, 3, 4], "alice", "nope")).await;
        }
        assert!(state.throttle.check("1.2.3.4").is_allowed());
    }

    #[tokio::test]
    async fn forwarded_for_is_used_when_trusted() {
        let state = test_state(true);
        let mut req = login_request([10, 0, 0, 1], "alice", "nope");
        req.headers_mut()
            .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        send(&state, req).await;

        assert!(state.throttle.record("203.0.113.9").is_some());
        assert!(state.throttle.record("10.0.0.1").is_none());
    }

    #[tokio::test]
    async fn forwarded_for_is_ignored_by_default() {
        let state = test_state(false);
        let mut req = login_request([10, 0, 0, 1], "alice", "nope");
        req.headers_mut()
            .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        send(&state, req).await;

        assert!(state.throttle.record("10.0.0.1").is_some());
        assert!(state.throttle.record("203.0.113.9").is_none());
    }

    #[tokio::test]
    async fn me_requires_valid_token() {
        let state = test_state(false);
        let response = send(&state, login_request([1, 2, 3, 4], "alice", PASSWORD)).await;
        let token = body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let req = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = send(&state, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["username"], "alice");

        let req = Request::builder()
            .uri("/api/auth/me")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_limit_keys_on_peer_when_forwarded_for_untrusted() {
        let state = test_state_with_limit(false, 2);
        let app = app(&state);
        let requests = (0..6)
            .map(|i| incomplete_login_request([10, 0, 0, 1], &format!("198.51.100.{i}")))
            .collect();

        // Burst of two, then every rotated header still lands in the peer's bucket.
        assert_eq!(count_rate_limited(&app, requests).await, 4);
        assert!(state.throttle.is_empty());
    }

    #[tokio::test]
    async fn request_limit_keys_on_forwarded_for_when_trusted() {
        let state = test_state_with_limit(true, 2);
        let app = app(&state);
        let requests = (0..6)
            .map(|i| incomplete_login_request([10, 0, 0, 1], &format!("198.51.100.{i}")))
            .collect();

        assert_eq!(count_rate_limited(&app, requests).await, 0);
    }

    #[tokio::test]
    async fn request_limit_applies_per_peer() {
        let state = test_state_with_limit(false, 2);
        let app = app(&state);
        let requests = vec![
            incomplete_login_request([10, 0, 0, 1], "198.51.100.1"),
            incomplete_login_request([10, 0, 0, 1], "198.51.100.1"),
            incomplete_login_request([10, 0, 0, 2], "198.51.100.1"),
            incomplete_login_request([10, 0, 0, 2], "198.51.100.1"),
        ];

        assert_eq!(count_rate_limited(&app, requests).await, 0);
    }

    #[tokio::test]
    async fn unknown_user_costs_a_password_check() {
        let state = test_state(false);
        let started = std::time::Instant::now();
        let response = send(&state, login_request([1, 2, 3, 4], "mallory", PASSWORD)).await;
        let unknown_elapsed = started.elapsed();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        // An argon2 verification with default cost is never this fast.
        assert!(unknown_elapsed >= std::time::Duration::from_millis(1));
    }
}
