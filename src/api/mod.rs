//! HTTP surface of the bank. Also bootstraps the core services, so the server
//! binary and the integration tests run the exact same wiring.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    account::{Account, AccountDraft},
    config::Config,
    customer::{Customer, CustomerDraft, SequentialCustomerIds},
    engine::{BankError, Confirmation, TransactionEngine, TransferConfirmation},
    ledger::TransactionRecord,
    registration::{AccountRegistry, CustomerRegistry},
    store::{Store, in_memory_store::InMemoryStore},
    validation::{Operation, parse_account_number, parse_amount},
};
use error::ApiError;
use statement_csv::write_statement;

pub mod error;
pub mod statement_csv;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TransactionEngine>,
    pub accounts: Arc<AccountRegistry>,
    pub customers: Arc<CustomerRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let ids = Arc::new(SequentialCustomerIds::starting_at(config.customer_id_start));
        Self {
            engine: Arc::new(TransactionEngine::new(store.clone(), config.lock_timeout())),
            accounts: Arc::new(AccountRegistry::new(store.clone())),
            customers: Arc::new(CustomerRegistry::new(store, ids)),
        }
    }

    pub fn in_memory(config: &Config) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), config)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/customers", post(create_customer))
        .route("/api/accounts", get(list_accounts))
        .route("/api/accounts/CREATE", post(create_account))
        .route("/api/accounts/:acc_no", get(get_account))
        .route("/api/accounts/:acc_no/balance", get(get_balance))
        .route("/api/transactions/credit/:acc_no/:amount", post(credit))
        .route("/api/transactions/debit/:acc_no/:amount", post(debit))
        .route("/api/transactions/transfer/:from/:to/:amount", post(transfer))
        .route("/api/transactions/statement/:acc_no", get(statement))
        .route("/api/transactions/statement/:acc_no/csv", get(statement_csv))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let app = router(AppState::in_memory(&config));
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind `{}`", config.bind))?;
    info!(addr = %config.bind, "bank server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

// Store and lock calls block the thread, keep them off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, BankError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => Ok(result?),
        Err(err) => Err(ApiError::Internal(err.to_string())),
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn create_customer(
    State(state): State<AppState>,
    body: Result<Json<CustomerDraft>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Json(draft) = body?;
    let customer = blocking(move || state.customers.create_customer(draft)).await?;
    Ok(Json(customer))
}

async fn create_account(
    State(state): State<AppState>,
    body: Result<Json<AccountDraft>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(draft) = body?;
    let account = blocking(move || state.accounts.create_account(draft)).await?;
    Ok(Json(account))
}

async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    let accounts = blocking(move || state.accounts.list_accounts()).await?;
    Ok(Json(accounts))
}

async fn get_account(
    State(state): State<AppState>,
    Path(acc_no): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let acc_no = parse_account_number(&acc_no)?;
    let account = blocking(move || state.accounts.get_account(acc_no)).await?;
    Ok(Json(account))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(acc_no): Path<String>,
) -> Result<Json<Decimal>, ApiError> {
    let acc_no = parse_account_number(&acc_no)?;
    let balance = blocking(move || state.accounts.balance(acc_no)).await?;
    Ok(Json(balance))
}

async fn credit(
    State(state): State<AppState>,
    Path((acc_no, amount)): Path<(String, String)>,
) -> Result<Json<Confirmation>, ApiError> {
    let acc_no = parse_account_number(&acc_no)?;
    let amount = parse_amount(&amount, Operation::Credit)?;
    let confirmation = blocking(move || state.engine.credit(acc_no, amount)).await?;
    Ok(Json(confirmation))
}

async fn debit(
    State(state): State<AppState>,
    Path((acc_no, amount)): Path<(String, String)>,
) -> Result<Json<Confirmation>, ApiError> {
    let acc_no = parse_account_number(&acc_no)?;
    let amount = parse_amount(&amount, Operation::Debit)?;
    let confirmation = blocking(move || state.engine.debit(acc_no, amount)).await?;
    Ok(Json(confirmation))
}

async fn transfer(
    State(state): State<AppState>,
    Path((from, to, amount)): Path<(String, String, String)>,
) -> Result<Json<TransferConfirmation>, ApiError> {
    let from = parse_account_number(&from)?;
    let to = parse_account_number(&to)?;
    let amount = parse_amount(&amount, Operation::Transfer)?;
    let confirmation = blocking(move || state.engine.transfer(from, to, amount)).await?;
    Ok(Json(confirmation))
}

async fn statement(
    State(state): State<AppState>,
    Path(acc_no): Path<String>,
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    let acc_no = parse_account_number(&acc_no)?;
    let records = blocking(move || state.engine.statement(acc_no)).await?;
    Ok(Json(records))
}

async fn statement_csv(
    State(state): State<AppState>,
    Path(acc_no): Path<String>,
) -> Result<Response, ApiError> {
    let acc_no = parse_account_number(&acc_no)?;
    let records = blocking(move || state.engine.statement(acc_no)).await?;

    let mut body = Vec::new();
    write_statement(&mut body, records)?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"statement-{acc_no}.csv\""),
        ),
    ];
    Ok((headers, body).into_response())
}
