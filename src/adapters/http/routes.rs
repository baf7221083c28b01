//! Ticket intake route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<TicketService<R>>`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::domain::ticket::TicketId;
use crate::ports::repository::{CombinationRecord, NewTicket, TicketRecord, TicketRepository};
use crate::usecases::ticket_service::{TicketError, TicketService};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub ticket_id: TicketId,
}

/// A stored ticket together with its committed combinations.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: TicketRecord,
    pub combinations: Vec<CombinationRecord>,
}

/// JSON error body with the status it maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(ticket_id: TicketId) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("ticket {ticket_id} not found"),
        }
    }

    fn internal(err: &anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub type AppState<R> = Arc<TicketService<R>>;

/// POST /ticket
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn create_ticket<R: TicketRepository>(
    State(service): State<AppState<R>>,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(ticket) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    })?;
    let ticket_id = service.process_ticket(&ticket).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { ticket_id })))
}

/// GET /ticket/:id
#[instrument(skip_all)]
pub async fn get_ticket<R: TicketRepository>(
    State(service): State<AppState<R>>,
    Path(ticket_id): Path<TicketId>,
) -> Result<Json<TicketView>, ApiError> {
    let repo = service.repository();

    let ticket = repo
        .load_ticket(ticket_id)
        .await
        .map_err(|e| {
            error!(ticket_id, error = %e, "Failed to load ticket");
            ApiError::internal(&e)
        })?
        .ok_or_else(|| ApiError::not_found(ticket_id))?;

    let combinations = repo.load_combinations(ticket_id).await.map_err(|e| {
        error!(ticket_id, error = %e, "Failed to load combinations");
        ApiError::internal(&e)
    })?;

    Ok(Json(TicketView {
        ticket,
        combinations,
    }))
}
