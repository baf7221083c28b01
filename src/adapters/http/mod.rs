//! Ticket Intake HTTP Adapter
//!
//! axum 0.7 router exposing `POST /ticket` and `GET /ticket/:id`
//! on top of the ticket service.

pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::ports::repository::TicketRepository;
use crate::usecases::ticket_service::TicketService;

/// Build the intake router.
pub fn router<R: TicketRepository>(service: Arc<TicketService<R>>) -> Router {
    Router::new()
        .route("/ticket", post(routes::create_ticket::<R>))
        .route("/ticket/:id", get(routes::get_ticket::<R>))
        .with_state(service)
}

/// Serve the intake API until shutdown is broadcast.
#[instrument(skip(service, shutdown_rx))]
pub async fn serve<R: TicketRepository>(
    service: Arc<TicketService<R>>,
    bind_address: String,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Ticket API started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::RepositoryImpl;
    use crate::config::SettlementConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn temp_dir() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("http_test_{}", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    async fn app(dir: &str) -> Router {
        let repo = Arc::new(RepositoryImpl::from_data_dir(dir).await.unwrap());
        router(Arc::new(TicketService::new(repo, &SettlementConfig::default())))
    }

    fn post_ticket(body: &serde_json::Value) -> Request<Body> {
        Request::post("/ticket")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn ticket_json(spec: &str) -> serde_json::Value {
        let selection = |odd: f64| {
            serde_json::json!({
                "sport_type": "football",
                "league": "Serie A",
                "home_team": "Home",
                "away_team": "Away",
                "event_date": "2026-05-01T18:00:00Z",
                "market_type": "1X2",
                "selected_outcome": "1",
                "odd_value": odd,
                "stake": 30.0
            })
        };
        serde_json::json!({
            "user_id": 42,
            "total_stake": 30.0,
            "ticket_type": "system",
            "system_combination": spec,
            "selections": [selection(1.5), selection(2.0), selection(1.8)]
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_fetch_ticket() {
        let dir = temp_dir();
        let app = app(&dir).await;

        let response = app.clone().oneshot(post_ticket(&ticket_json("2"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["ticket_id"].as_u64().unwrap();

        let response = app
            .oneshot(Request::get(format!("/ticket/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let view = body_json(response).await;
        assert_eq!(view["combinations"].as_array().unwrap().len(), 3);
        assert_eq!(view["settlement"]["num_combinations"], 3);
        assert_eq!(view["status"], "pending");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_bad_spec_is_bad_request() {
        let dir = temp_dir();
        let app = app(&dir).await;

        let response = app.oneshot(post_ticket(&ticket_json("5"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("choice size 5"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_bad_request() {
        let dir = temp_dir();
        let app = app(&dir).await;

        let response = app
            .clone()
            .oneshot(post_ticket(&serde_json::json!({ "user_id": "not a number" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));

        let no_content_type = Request::post("/ticket")
            .body(Body::from(ticket_json("2").to_string()))
            .unwrap();
        let response = app.oneshot(no_content_type).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_not_found() {
        let dir = temp_dir();
        let app = app(&dir).await;

        let response = app
            .oneshot(Request::get("/ticket/99").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
