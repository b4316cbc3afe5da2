use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

async fn setup() -> Option<(Router, PgPool)> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping session API test");
        return None;
    };
    std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    std::env::set_var("DATABASE_URL", &url);
    let _ = proctor_backend::config::init_config();

    let pool = proctor_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let app_state = proctor_backend::AppState::new(pool.clone());
    let app = Router::new()
        .route(
            "/api/public/session/start",
            post(proctor_backend::routes::session_routes::start_public_session),
        )
        .route(
            "/api/test-session/:session_token",
            get(proctor_backend::routes::session_routes::get_session),
        )
        .route(
            "/api/test-session/:session_token/save-answers",
            post(proctor_backend::routes::session_routes::save_answers),
        )
        .route(
            "/api/test-session/:session_token/submit",
            post(proctor_backend::routes::session_routes::submit_session),
        )
        .route(
            "/api/test-session/:session_token/update-time",
            post(proctor_backend::routes::session_routes::update_time),
        )
        .route(
            "/api/test-session/:session_token/cheat/detections",
            get(proctor_backend::routes::cheat_routes::get_detections),
        )
        .with_state(app_state);

    Some((app, pool))
}

async fn seed_test(pool: &PgPool, duration_minutes: i32, question_count: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO tests (id, name, code, description, duration_minutes, question_count, is_active)
        VALUES ($1, $2, $3, NULL, $4, $5, TRUE)
        "#,
    )
    .bind(id)
    .bind("Logic Test")
    .bind(format!("LT-{}", id))
    .bind(duration_minutes)
    .bind(question_count)
    .execute(pool)
    .await
    .expect("seed test");
    id
}

async fn seed_public_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(r#"INSERT INTO public_users (id, name, email) VALUES ($1, $2, $3)"#)
        .bind(id)
        .bind("Alice")
        .bind(format!("alice_{}@example.com", id))
        .execute(pool)
        .await
        .expect("seed public user");
    id
}

async fn post_json(app: &Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

async fn post_empty(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

#[tokio::test]
async fn public_session_lifecycle_end_to_end() {
    let Some((app, pool)) = setup().await else {
        return;
    };

    let test_id = seed_test(&pool, 10, 1).await;
    let user_id = seed_public_user(&pool).await;

    // Start is an idempotent find-or-create: a retry gets the same session.
    let start_body = json!({ "public_user_id": user_id, "test_id": test_id });
    let (status, body) = post_json(&app, "/api/public/session/start", start_body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["session"]["session_token"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(token.starts_with("SESSION-"));
    assert_eq!(body["data"]["session"]["status"], "in_progress");
    assert_eq!(body["data"]["test"]["duration_minutes"], 10);

    let (status, body) = post_json(&app, "/api/public/session/start", start_body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["session"]["session_token"].as_str().unwrap(),
        token
    );

    // Concurrent duplicate starts settle on one persisted session.
    let state = proctor_backend::AppState::new(pool.clone());
    let test = state.session_service.get_test(test_id).await.unwrap();
    let owner = proctor_backend::models::owner::SessionOwner::PublicUser(user_id);
    let (a, b) = tokio::join!(
        state.session_service.start(owner, &test, None),
        state.session_service.start(owner, &test, None),
    );
    assert_eq!(a.unwrap().session_token, b.unwrap().session_token);
    let active_count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM test_sessions
        WHERE owner_id = $1 AND test_id = $2 AND status = 'in_progress'
        "#,
    )
    .bind(user_id)
    .bind(test_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(active_count, 1);

    // Autosave upserts by question id; replaying the payload changes nothing.
    let answers = json!({ "answers": { "q1": { "selected": 2 } } });
    let save_uri = format!("/api/test-session/{}/save-answers", token);
    let (status, body) = post_json(&app, &save_uri, answers.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["metadata"]["last_saved_at"].is_string());

    let (status, _) = post_json(&app, &save_uri, answers.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let answer_count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM test_session_answers a
        JOIN test_sessions s ON a.test_session_id = s.id
        WHERE s.session_token = $1
        "#,
    )
    .bind(&token)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(answer_count, 1);

    // Heartbeat refreshes elapsed time only.
    let (status, body) = post_empty(&app, &format!("/api/test-session/{}/update-time", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["time_spent_seconds"].as_i64().unwrap() >= 0);

    // Submit completes the session and freezes it.
    let (status, body) = post_empty(&app, &format!("/api/test-session/{}/submit", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["completed_at"].is_string());
    assert!(body["data"]["metadata"]["submitted_at"].is_string());

    // All answers in, submitted far below 30% of the duration: the post-submit
    // timing check records a too-fast anomaly without reopening the session.
    let (status, body) =
        get_json(&app, &format!("/api/test-session/{}/cheat/detections", token)).await;
    assert_eq!(status, StatusCode::OK);
    let detections = body["data"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0]["detection_type"], "time_anomaly");
    assert_eq!(detections[0]["severity"], 3);
    assert_eq!(detections[0]["detection_data"]["anomaly_type"], "too_fast");

    // Terminal sessions reject every mutation with session_not_active.
    for (uri, payload) in [
        (format!("/api/test-session/{}/save-answers", token), Some(answers.clone())),
        (format!("/api/test-session/{}/submit", token), None),
        (format!("/api/test-session/{}/update-time", token), None),
    ] {
        let (status, body) = match payload {
            Some(p) => post_json(&app, &uri, p).await,
            None => post_empty(&app, &uri).await,
        };
        assert_eq!(status, StatusCode::CONFLICT, "{} should be frozen", uri);
        assert_eq!(body["error"], "session_not_active");
    }

    // Session detail still serves the frozen state and its answers.
    let (status, body) = get_json(&app, &format!("/api/test-session/{}", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session"]["status"], "completed");
    assert_eq!(body["data"]["answers"].as_array().unwrap().len(), 1);

    // Unknown tokens are a dedicated kind.
    let (status, body) = get_json(&app, "/api/test-session/SESSION-DOESNOTEXIST00").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
}
