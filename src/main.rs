use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use proctor_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::cors::permissive_cors,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Timeout sweep: sessions that outlive their allotted duration become
    // abandoned. The sweep, not the request path, owns that transition.
    {
        let state = app_state.clone();
        let grace = config.abandon_grace_seconds;
        tokio::spawn(async move {
            loop {
                if let Err(e) = state.session_service.sweep_abandoned(grace).await {
                    tracing::error!("Abandoned-session sweep error: {:?}", e);
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let participant_api = Router::new()
        .route(
            "/api/participant/assignment/:token",
            get(routes::participant_routes::get_assignment),
        )
        .route(
            "/api/participant/session/start",
            post(routes::session_routes::start_participant_session),
        )
        .route(
            "/api/public/session/start",
            post(routes::session_routes::start_public_session),
        )
        .layer(axum::middleware::from_fn_with_state(
            proctor_backend::middleware::rate_limit::new_rps_state(config.participant_rps),
            proctor_backend::middleware::rate_limit::rps_middleware,
        ));

    let session_api = Router::new()
        .route(
            "/api/test-session/:session_token",
            get(routes::session_routes::get_session),
        )
        .route(
            "/api/test-session/:session_token/save-answers",
            post(routes::session_routes::save_answers),
        )
        .route(
            "/api/test-session/:session_token/submit",
            post(routes::session_routes::submit_session),
        )
        .route(
            "/api/test-session/:session_token/update-time",
            post(routes::session_routes::update_time),
        )
        .route(
            "/api/test-session/:session_token/cheat/log",
            post(routes::cheat_routes::log_cheat_event),
        )
        .route(
            "/api/test-session/:session_token/cheat/detections",
            get(routes::cheat_routes::get_detections),
        )
        .route(
            "/api/test-session/:session_token/photo/capture",
            post(routes::photo_routes::capture_photo),
        )
        .route(
            "/api/test-session/:session_token/photos",
            get(routes::photo_routes::get_photos),
        )
        .layer(axum::middleware::from_fn_with_state(
            proctor_backend::middleware::rate_limit::new_rps_state(config.session_rps),
            proctor_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(participant_api)
        .merge(session_api)
        .with_state(app_state)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
