//! Axum-based API Gateway for BreezI. Config-driven via BreeziConfig.
//! Persona chat, community moderation, diaries, time capsules, and emotion
//! reports are all served from one sled-backed store; the retention sweep
//! runs at startup and then once per day.

mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use breezi_core::{
    BreeziConfig, ChatService, DiaryService, EmotionAggregator, KvStore, ModerationEngine,
    NotificationQueue, OpenAiBridge, PersonaCatalog, PersonaRouter, RetentionScheduler,
    TimeCapsuleScheduler,
};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BreeziConfig::from_env();
    let store = match KvStore::open_path(&config.data_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(target: "breezi::gateway", error = %e, path = %config.data_path, "failed to open store");
            std::process::exit(1);
        }
    };

    let catalog = Arc::new(PersonaCatalog::default());
    let llm_timeout = Duration::from_secs(config.llm_timeout_secs);
    let llm = OpenAiBridge::from_env(llm_timeout)
        .map(|bridge| Arc::new(bridge) as Arc<dyn breezi_core::LanguageModel>);
    if llm.is_none() {
        tracing::warn!(target: "breezi::gateway", "no API key configured; chat runs on fallback replies");
    }
    let routing_llm = if config.llm_routing_enabled { llm.clone() } else { None };

    let notifications = NotificationQueue::new(store.clone());
    let router = PersonaRouter::new(catalog.clone(), routing_llm, llm_timeout);
    let state = AppState {
        chat: Arc::new(ChatService::new(store.clone(), catalog, router, llm.clone())),
        moderation: Arc::new(ModerationEngine::new(store.clone(), notifications.clone())),
        retention: Arc::new(RetentionScheduler::new(store.clone(), config.retention_days)),
        capsules: Arc::new(TimeCapsuleScheduler::new(store.clone())),
        emotion: Arc::new(EmotionAggregator::new(store.clone())),
        diary: Arc::new(DiaryService::new(store.clone())),
        notifications,
        llm,
        admin_id: config.admin_id.clone(),
    };

    spawn_retention_loop(state.retention.clone());

    let app = build_router(state);

    let addr = std::env::var("BREEZI_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    tracing::info!(target: "breezi::gateway", %addr, "gateway listening");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target: "breezi::gateway", error = %e, %addr, "bind failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(target: "breezi::gateway", error = %e, "server error");
    }
    if let Err(e) = store.flush() {
        tracing::error!(target: "breezi::gateway", error = %e, "final flush failed");
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat/rooms", get(handlers::list_rooms))
        .route("/chat/:room_id/send", post(handlers::send_message))
        .route("/chat/:room_id/history", get(handlers::chat_history))
        .route("/reports", post(handlers::submit_report))
        .route("/admin/reports", get(handlers::list_reports))
        .route("/admin/reports/:report_id/process", post(handlers::process_report))
        .route("/diary", post(handlers::save_diary).get(handlers::list_diary))
        .route("/emotion/report", get(handlers::emotion_report))
        .route("/capsules", get(handlers::list_capsules))
        .route("/capsules/:capsule_id/open", post(handlers::open_capsule))
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/:notification_id/read", post(handlers::mark_notification_read))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the retention sweep immediately, then every 24 hours.
fn spawn_retention_loop(retention: Arc<RetentionScheduler>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            match retention.sweep(chrono::Utc::now()) {
                Ok(summary) if summary.withdrawals_removed > 0 => {
                    tracing::info!(target: "breezi::gateway", ?summary, "retention sweep done");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(target: "breezi::gateway", error = %e, "retention sweep failed");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app(dir: &tempfile::TempDir) -> Router {
        let store = KvStore::open_path(dir.path()).unwrap();
        let catalog = Arc::new(PersonaCatalog::default());
        let notifications = NotificationQueue::new(store.clone());
        let router = PersonaRouter::new(catalog.clone(), None, Duration::from_secs(1));
        build_router(AppState {
            chat: Arc::new(ChatService::new(store.clone(), catalog, router, None)),
            moderation: Arc::new(ModerationEngine::new(store.clone(), notifications.clone())),
            retention: Arc::new(RetentionScheduler::new(store.clone(), 365)),
            capsules: Arc::new(TimeCapsuleScheduler::new(store.clone())),
            emotion: Arc::new(EmotionAggregator::new(store.clone())),
            diary: Arc::new(DiaryService::new(store)),
            notifications,
            llm: None,
            admin_id: "admin".to_string(),
        })
    }

    #[tokio::test]
    async fn health_reports_version_and_llm_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let req = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["llm_configured"], false);
    }

    #[tokio::test]
    async fn admin_routes_reject_other_users() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let req = Request::builder()
            .method("GET")
            .uri("/admin/reports?admin_id=mallory")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn send_message_persists_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let req = Request::builder()
            .method("POST")
            .uri("/chat/group/send")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"user_id":"u1","message":"요즘 너무 힘들어"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["persona_id"], "char_1");
        assert_eq!(json["crisis"], false);

        let req = Request::builder()
            .method("GET")
            .uri("/chat/group/history?user_id=u1")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn process_report_maps_core_errors_to_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        // Unknown action string fails validation before the report lookup.
        let req = Request::builder()
            .method("POST")
            .uri("/admin/reports/r1/process")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"admin_id":"admin","action":"nuke"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = Request::builder()
            .method("POST")
            .uri("/admin/reports/r1/process")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"admin_id":"admin","action":"warn"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
