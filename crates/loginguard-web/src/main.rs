use axum::http::{header, Method};
use loginguard_web::config::ServerConfig;
use loginguard_web::state::AppState;
use loginguard_web::{api, sweeper};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "loginguard_web=debug,loginguard_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let sweep_interval = config.sweep_interval();

    let state = AppState::new(config);

    // Evict lapsed, idle throttle records so the registry stays bounded.
    sweeper::spawn_sweeper(state.throttle.clone(), sweep_interval);
    tracing::info!("Login throttle sweep every {}s", sweep_interval.as_secs());

    // CORS: same-origin only by default (no cross-origin requests allowed)
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = axum::Router::new()
        .nest("/api", api::auth_router(&state)?.merge(api::protected_router()))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("loginguard-web listening on http://{}", bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
