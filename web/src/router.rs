use crate::{
    controller::{health_check_controller, notification_controller},
    params, sse, AppState,
};
use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
        info(
            title = "Push Channel API",
            description = "Server-Sent Events subscriptions and notification dispatch",
            version = "1.0.0",
        ),
        paths(
            health_check_controller::health_check,
            notification_controller::create,
            sse::handler::sse_handler,
        ),
        components(
            schemas(
                params::notification::NotificationParams,
                params::notification::NotificationSummary,
            )
        ),
        tags(
            (name = "push_channel", description = "Server push notification channel")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(notification_routes(app_state.clone()))
        .merge(sse_routes(app_state))
        .route("/api-docs/openapi.json", get(openapi))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn notification_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/notifications", post(notification_controller::create))
        .with_state(app_state)
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse/events", get(sse::handler::sse_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use futures::StreamExt;
    use serde_json::{json, Value};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config::from_args(["push_channel", "--sse-keep-alive-secs", "0"]);
        AppState::with_manager(config, Arc::new(::sse::Manager::new()))
    }

    fn subscribe(user_id: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/sse/events?userId={user_id}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check_returns_ok() -> Result<()> {
        let app = define_routes(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribe_responds_with_event_stream_headers() -> Result<()> {
        let app_state = test_state();
        let app = define_routes(app_state.clone());

        let response = app.oneshot(subscribe("user1")).await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "keep-alive");
        assert_eq!(app_state.sse_manager.registry().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_subscriber_receives_targeted_frame() -> Result<()> {
        let app_state = test_state();
        let app = define_routes(app_state.clone());

        let response = app.oneshot(subscribe("user2")).await?;
        app_state
            .sse_manager
            .send_to_targets("user2", &json!({ "message": "hi" }));

        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.expect("a frame")?;

        assert_eq!(frame, "data: {\"message\":\"hi\"}\n\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_multi_user_subscription_registers_joined_key() -> Result<()> {
        let app_state = test_state();
        let app = define_routes(app_state.clone());

        let _response = app.oneshot(subscribe("user1,user2")).await?;

        let registry = app_state.sse_manager.registry();
        assert_eq!(registry.connection_count_for_user("user1,user2"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_dropping_body_deregisters_connection() -> Result<()> {
        let app_state = test_state();
        let app = define_routes(app_state.clone());

        let response = app.oneshot(subscribe("user1")).await?;
        assert_eq!(app_state.sse_manager.registry().len(), 1);

        drop(response);

        assert!(app_state.sse_manager.registry().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_user_id_is_bad_request() -> Result<()> {
        let app_state = test_state();
        let app = define_routes(app_state.clone());

        let response = app
            .oneshot(Request::builder().uri("/sse/events").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app_state.sse_manager.registry().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_user_id_is_unprocessable() -> Result<()> {
        let app = define_routes(test_state());

        let response = app.oneshot(subscribe(",")).await?;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }

    #[tokio::test]
    async fn test_post_notification_reaches_subscriber() -> Result<()> {
        let app_state = test_state();
        let app = define_routes(app_state.clone());

        let subscription = app.clone().oneshot(subscribe("user1")).await?;

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/notifications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "user_ids": ["user1"], "payload": { "n": 1 } }).to_string(),
                    ))?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let summary: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(summary["data"], json!({ "attempted": 1, "delivered": 1 }));

        let mut body = subscription.into_body().into_data_stream();
        let frame = body.next().await.expect("a frame")?;
        assert_eq!(frame, "data: {\"n\":1}\n\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_openapi_document_lists_sse_path() -> Result<()> {
        let app = define_routes(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())?,
            )
            .await?;

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let doc: Value = serde_json::from_slice(&bytes)?;
        assert!(doc["paths"]["/sse/events"].is_object());
        Ok(())
    }
}
