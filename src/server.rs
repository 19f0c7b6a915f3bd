use crate::config::ServerConfig;
use crate::errors::LedgerError;
use crate::file_journal::FileJournal;
use crate::journal::{InMemoryJournal, Journal};
use crate::models::{Account, CreateAccountRequest, TransactionRecord, UpdateAccountRequest};
use crate::service::{parse_account_number, AccountService};
use crate::store::LedgerStore;
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn run(config: ServerConfig) -> Result<()> {
    tracing::info!("Server mode: binding to {}", config.bind);

    let journal: Arc<dyn Journal> = match &config.journal {
        Some(path) => {
            tracing::info!("Journal file: {}", path.display());
            Arc::new(FileJournal::open(path.clone()).await?)
        }
        None => {
            tracing::warn!("No journal configured, ledger will not survive a restart");
            Arc::new(InMemoryJournal::new())
        }
    };

    // Rebuild state from previous runs
    let store = Arc::new(LedgerStore::restore(&config.ledger, journal).await?);

    let app = router(AccountService::new(store), !config.no_cors)
        .layer(GlobalConcurrencyLimitLayer::new(config.max_connections.max(1)));

    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!(
        "Listening on {}, max {} concurrent requests",
        listener.local_addr()?,
        config.max_connections
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

pub fn router(service: AccountService, cors: bool) -> Router {
    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route("/api/accounts/search", get(search_accounts))
        .route("/api/accounts/filter", get(filter_accounts))
        .route(
            "/api/accounts/:account_number",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route(
            "/api/accounts/:account_number/transactions",
            get(account_transactions),
        )
        .route("/api/accounts/:account_number/deposit", post(deposit))
        .route("/api/accounts/:account_number/withdraw", post(withdraw))
        .with_state(service)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Error body returned for every failed request
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::DuplicateAccount(_) => StatusCode::CONFLICT,
            LedgerError::Validation(_)
            | LedgerError::MissingAmount
            | LedgerError::MalformedAmount(_)
            | LedgerError::InvalidAmount
            | LedgerError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            LedgerError::Journal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.0.is_client_error() {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
        } else {
            tracing::error!(status = %status, error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct AmountParams {
    amount: Option<String>,
}

#[derive(Deserialize)]
struct SearchParams {
    name: Option<String>,
}

#[derive(Deserialize)]
struct FilterParams {
    #[serde(rename = "type")]
    account_type: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value.ok_or_else(|| {
        ApiError(LedgerError::Validation(format!(
            "{} query parameter is required",
            name
        )))
    })
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError(LedgerError::Validation(rejection.body_text())))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/accounts
async fn list_accounts(State(service): State<AccountService>) -> Json<Vec<Account>> {
    Json(service.list().await)
}

/// POST /api/accounts
async fn create_account(
    State(service): State<AccountService>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let request = json_body(payload)?;
    let account = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/accounts/search?name=X
async fn search_accounts(
    State(service): State<AccountService>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let name = required(params.name, "name")?;
    Ok(Json(service.search_by_name(&name).await))
}

/// GET /api/accounts/filter?type=X
async fn filter_accounts(
    State(service): State<AccountService>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let account_type = required(params.account_type, "type")?;
    Ok(Json(service.filter_by_type(&account_type).await?))
}

/// GET /api/accounts/{accountNumber}
async fn get_account(
    State(service): State<AccountService>,
    Path(raw): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let account_number = parse_account_number(&raw)?;
    Ok(Json(service.get(account_number).await?))
}

/// PUT /api/accounts/{accountNumber}
async fn update_account(
    State(service): State<AccountService>,
    Path(raw): Path<String>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let account_number = parse_account_number(&raw)?;
    let request = json_body(payload)?;
    Ok(Json(service.update(account_number, request).await?))
}

/// DELETE /api/accounts/{accountNumber}
async fn delete_account(
    State(service): State<AccountService>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let account_number = parse_account_number(&raw)?;
    service.delete(account_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/accounts/{accountNumber}/transactions
async fn account_transactions(
    State(service): State<AccountService>,
    Path(raw): Path<String>,
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    let account_number = parse_account_number(&raw)?;
    Ok(Json(service.history(account_number).await?))
}

/// POST /api/accounts/{accountNumber}/deposit?amount=X
async fn deposit(
    State(service): State<AccountService>,
    Path(raw): Path<String>,
    Query(params): Query<AmountParams>,
) -> Result<Json<Account>, ApiError> {
    let account_number = parse_account_number(&raw)?;
    let account = service
        .deposit(account_number, params.amount.as_deref())
        .await?;
    Ok(Json(account))
}

/// POST /api/accounts/{accountNumber}/withdraw?amount=X
async fn withdraw(
    State(service): State<AccountService>,
    Path(raw): Path<String>,
    Query(params): Query<AmountParams>,
) -> Result<Json<Account>, ApiError> {
    let account_number = parse_account_number(&raw)?;
    let account = service
        .withdraw(account_number, params.amount.as_deref())
        .await?;
    Ok(Json(account))
}
