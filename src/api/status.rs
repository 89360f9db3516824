use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::AppError;
use crate::services::status_registry::{BatchOutcome, StatusView, UpdateStatusRequest};

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchUpdateStatusRequest {
    pub updates: Vec<UpdateStatusRequest>,
}

/// Upserts the revocation status for a single certificate serial
async fn update_status(
    State(state): State<AppState>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    state.registry.update_status(&request).await?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        message: "status updated successfully".to_string(),
    }))
}

/// Returns the current status of a serial, `unknown` if never written
async fn check_status(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<StatusView>, AppError> {
    let view = state.registry.check_status(&serial).await?;

    Ok(Json(view))
}

/// Applies a sequence of status updates independently and reports per-item
/// outcomes; a failing item never aborts the rest
async fn batch_update_status(
    State(state): State<AppState>,
    Json(request): Json<BatchUpdateStatusRequest>,
) -> Json<BatchOutcome> {
    Json(state.registry.batch_update_status(&request.updates).await)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status/update", post(update_status))
        .route("/status/batch-update", post(batch_update_status))
        .route("/status/:serial", get(check_status))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::services::status_registry::testing::InMemoryStore;
    use crate::services::status_registry::StatusRegistry;

    fn app() -> Router {
        let state = AppState {
            registry: StatusRegistry::new(InMemoryStore::default()),
            // Lazy pool: never connected, only /health would touch it.
            pool: PgPoolOptions::new()
                .connect_lazy("postgres://localhost/certstatus")
                .unwrap(),
        };
        router().with_state(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_uri(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn update_endpoint_acknowledges_success() {
        let (status, body) = send(
            app(),
            post_json(
                "/status/update",
                json!({"serial_number": "ABC123", "status": "good"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("status updated successfully"));
    }

    #[tokio::test]
    async fn update_endpoint_rejects_unrecognized_status() {
        let (status, body) = send(
            app(),
            post_json(
                "/status/update",
                json!({"serial_number": "ABC123", "status": "expired"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["message"],
            json!("invalid status (must be: good, revoked, or unknown)")
        );
    }

    #[tokio::test]
    async fn update_endpoint_rejects_empty_serial() {
        let (status, body) = send(
            app(),
            post_json("/status/update", json!({"serial_number": ""})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("serial number is required"));
    }

    #[tokio::test]
    async fn check_endpoint_defaults_to_unknown() {
        let (status, body) = send(app(), get_uri("/status/no-such-serial")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("unknown"));
        assert!(body.get("revoked_at").is_none());
        assert!(body.get("revocation_reason").is_none());
    }

    #[tokio::test]
    async fn revoked_update_reads_back_through_the_api() {
        let app = app();

        let (status, _) = send(
            app.clone(),
            post_json(
                "/status/update",
                json!({
                    "serial_number": "ABC123",
                    "status": "revoked",
                    "revoked_at": "2026-01-01T00:00:00Z",
                    "revocation_reason": "key-compromise"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, get_uri("/status/ABC123")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("revoked"));
        assert_eq!(body["revoked_at"], json!("2026-01-01T00:00:00Z"));
        assert_eq!(body["revocation_reason"], json!("key-compromise"));
    }

    #[tokio::test]
    async fn batch_endpoint_reports_per_item_outcomes() {
        let (status, body) = send(
            app(),
            post_json(
                "/status/batch-update",
                json!({"updates": [
                    {"serial_number": "A", "status": "good"},
                    {"serial_number": "", "status": "good"},
                    {"serial_number": "B", "status": "revoked"}
                ]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success_count"], json!(2));
        assert_eq!(body["failure_count"], json!(1));
        assert_eq!(body["errors"], json!(["serial number is required"]));
    }
}
