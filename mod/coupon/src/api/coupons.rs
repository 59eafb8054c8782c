use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use coupond_core::ServiceError;

use crate::engine::ClaimEngine;
use crate::identity;
use crate::model::{ClaimOutcome, CreateCouponsRequest, ListQuery, StatusFilter};

type EngineState = Arc<ClaimEngine>;

/// Name of the non-authoritative marker cookie set on a successful
/// claim. The server never reads it back — gating lives in the ledger —
/// it only lets the frontend disable its button optimistically.
const CLAIM_COOKIE: &str = "couponClaimed";

pub fn router(engine: Arc<ClaimEngine>) -> Router {
    Router::new()
        .route("/claim", post(claim_coupon))
        .route("/create", post(create_coupons))
        .route("/", get(list_coupons))
        .route("/dashboard-stats", get(dashboard_stats))
        .with_state(engine)
}

// ---------------------------------------------------------------------------
// POST /claim
// ---------------------------------------------------------------------------

async fn claim_coupon(
    State(engine): State<EngineState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let forwarded = headers
        .get(identity::FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());
    let identity = identity::resolve_identity(forwarded, Some(peer))?;

    let response = match engine.claim(&identity)? {
        ClaimOutcome::Allocated(coupon) => {
            let cookie = format!(
                "{CLAIM_COOKIE}=true; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
                engine.claim_window_secs()
            );
            (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie)],
                Json(serde_json::json!({
                    "message": "Coupon claimed successfully",
                    "data": coupon,
                })),
            )
                .into_response()
        }
        ClaimOutcome::Rejected { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "message": "You have already claimed a coupon. Please try again later.",
                "timeRemaining": retry_after_secs,
            })),
        )
            .into_response(),
        ClaimOutcome::Exhausted => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "message": "No available coupons",
            })),
        )
            .into_response(),
    };

    Ok(response)
}

// ---------------------------------------------------------------------------
// POST /create
// ---------------------------------------------------------------------------

async fn create_coupons(
    State(engine): State<EngineState>,
    Json(req): Json<CreateCouponsRequest>,
) -> Result<Response, ServiceError> {
    let created = engine.create_coupons(req.count)?;
    let response = (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": format!("Successfully created {} coupons", created.len()),
            "data": created,
        })),
    )
        .into_response();
    Ok(response)
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

async fn list_coupons(
    State(engine): State<EngineState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let coupons = engine.list(StatusFilter::parse(query.status.as_deref()))?;
    Ok(Json(serde_json::json!({ "data": coupons })))
}

// ---------------------------------------------------------------------------
// GET /dashboard-stats
// ---------------------------------------------------------------------------

async fn dashboard_stats(
    State(engine): State<EngineState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let stats = engine.stats()?;
    Ok(Json(serde_json::json!({
        "data": { "coupons": stats },
    })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use coupond_sql::{SQLStore, SqliteStore};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = Arc::new(ClaimEngine::new(db, 3600).unwrap());
        router(engine).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn claim_request(client: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/claim")
            .header(identity::FORWARDED_FOR, client)
            .body(Body::empty())
            .unwrap()
    }

    fn create_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/create")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn claim_sets_cookie_and_returns_coupon() {
        let app = test_app();
        app.clone()
            .oneshot(create_request(r#"{"count":2}"#))
            .await
            .unwrap();

        let response = app.oneshot(claim_request("203.0.113.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("couponClaimed=true"));
        assert!(cookie.contains("Max-Age=3600"));

        let json = body_json(response).await;
        assert_eq!(json["message"], "Coupon claimed successfully");
        assert_eq!(json["data"]["isClaimed"], true);
        assert!(json["data"]["code"].as_str().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn repeat_claim_is_429_with_time_remaining() {
        let app = test_app();
        app.clone()
            .oneshot(create_request(r#"{"count":2}"#))
            .await
            .unwrap();

        let first = app.clone().oneshot(claim_request("203.0.113.9")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(claim_request("203.0.113.9")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(second).await;
        let remaining = json["timeRemaining"].as_i64().unwrap();
        assert!(remaining > 3595 && remaining <= 3600);
    }

    #[tokio::test]
    async fn exhausted_pool_is_404() {
        let app = test_app();
        let response = app.oneshot(claim_request("203.0.113.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["message"], "No available coupons");
    }

    #[tokio::test]
    async fn claim_without_forwarding_header_uses_peer() {
        let app = test_app();
        app.clone()
            .oneshot(create_request(r#"{"count":1}"#))
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/claim")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_clamps_and_reports_count() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(create_request(r#"{"count":500}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Successfully created 100 coupons");
        assert_eq!(json["data"].as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn create_defaults_to_one() {
        let app = test_app();
        let response = app.oneshot(create_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = test_app();
        app.clone()
            .oneshot(create_request(r#"{"count":3}"#))
            .await
            .unwrap();
        app.clone().oneshot(claim_request("1.1.1.1")).await.unwrap();

        let get = |uri: &str| {
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };

        let all = body_json(app.clone().oneshot(get("/")).await.unwrap()).await;
        assert_eq!(all["data"].as_array().unwrap().len(), 3);

        let claimed =
            body_json(app.clone().oneshot(get("/?status=claimed")).await.unwrap()).await;
        assert_eq!(claimed["data"].as_array().unwrap().len(), 1);

        // Unrecognized filter means no filter.
        let bogus = body_json(app.oneshot(get("/?status=bogus")).await.unwrap()).await;
        assert_eq!(bogus["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dashboard_stats_shape() {
        let app = test_app();
        app.clone()
            .oneshot(create_request(r#"{"count":4}"#))
            .await
            .unwrap();
        app.clone().oneshot(claim_request("1.1.1.1")).await.unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/dashboard-stats")
            .body(Body::empty())
            .unwrap();
        let json = body_json(app.oneshot(request).await.unwrap()).await;

        let coupons = &json["data"]["coupons"];
        assert_eq!(coupons["total"], 4);
        assert_eq!(coupons["claimed"], 1);
        assert_eq!(coupons["unclaimed"], 3);
        assert_eq!(coupons["activeClaimCount"], 1);
    }
}
