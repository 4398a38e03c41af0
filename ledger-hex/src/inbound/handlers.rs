//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use ledger_types::{
    AppError, CreateUserRequest, LedgerRepository, NewTransactionRequest, PageQuery,
    TransactionId, TransactionListQuery, UpdateUserStatusRequest, UserFilter, UserId,
};

use crate::LedgerService;

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository> {
    pub service: LedgerService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InsufficientBalance { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Register a new user with balances for all supported currencies.
#[tracing::instrument(skip(state))]
pub async fn create_user<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users with optional filters.
#[tracing::instrument(skip(state))]
pub async fn list_users<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(filter): Query<UserFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.service.list_users(&filter).await?;
    Ok(Json(users))
}

/// Get user by ID, including balances.
#[tracing::instrument(skip(state), fields(user_id = %id))]
pub async fn get_user<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let user = state.service.get_user(user_id).await?;
    Ok(Json(user))
}

/// Update user status (ACTIVE/BLOCKED).
#[tracing::instrument(skip(state), fields(user_id = %id))]
pub async fn update_user<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let user = state.service.update_user_status(user_id, req.status).await?;
    Ok(Json(user))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// Create a deposit (positive amount) or withdrawal (negative amount).
#[tracing::instrument(skip(state), fields(user_id = %id, amount = %req.amount))]
pub async fn create_transaction<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<NewTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let transaction = state.service.create_transaction(user_id, req).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// List one user's transactions.
#[tracing::instrument(skip(state), fields(user_id = %id))]
pub async fn list_user_transactions<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let transactions = state
        .service
        .list_transactions(Some(user_id), page.skip, page.limit)
        .await?;
    Ok(Json(transactions))
}

/// List transactions with optional user filter.
#[tracing::instrument(skip(state))]
pub async fn list_transactions<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<TransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state
        .service
        .list_transactions(query.user_id, query.skip, query.limit)
        .await?;
    Ok(Json(transactions))
}

/// Get transaction by ID.
#[tracing::instrument(skip(state), fields(transaction_id = %id))]
pub async fn get_transaction<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id: TransactionId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid transaction ID".into()))?;

    let transaction = state.service.get_transaction(transaction_id).await?;
    Ok(Json(transaction))
}

/// Reverse a transaction: refund withdrawals or deduct deposits.
#[tracing::instrument(skip(state), fields(user_id = %id, transaction_id = %tx_id))]
pub async fn reverse_transaction<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path((id, tx_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;
    let transaction_id: TransactionId = tx_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid transaction ID".into()))?;

    let transaction = state
        .service
        .reverse_transaction(user_id, transaction_id)
        .await?;
    Ok(Json(transaction))
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default = "default_weeks")]
    pub weeks: u32,
}

fn default_weeks() -> u32 {
    52
}

/// Generate and return the weekly report synchronously.
#[tracing::instrument(skip(state))]
pub async fn weekly_report<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = state.service.generate_weekly_report(query.weeks).await?;
    Ok(Json(reports))
}

/// Dispatch weekly report generation on a background task.
#[tracing::instrument(skip(state))]
pub async fn weekly_report_background<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<ReportQuery>,
) -> impl IntoResponse {
    let weeks = query.weeks;
    tokio::spawn(async move {
        match state.service.generate_weekly_report(weeks).await {
            Ok(reports) => {
                tracing::info!(weeks_with_activity = reports.len(), "background report done")
            }
            Err(e) => tracing::error!(error = %e, "background report failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "Report generation started",
            "weeks": weeks,
        })),
    )
}
