use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use dedupe_api::{
    AddAccountRequest, AddContactRequest, CheckAccountRequest, CheckContactRequest, DedupeApi,
    API_CONTRACT_VERSION,
};
use dedupe_core::CheckError;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";

#[derive(Debug, Clone)]
struct ServiceState {
    api: DedupeApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    service_contract_version: &'static str,
    code: &'static str,
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MigrateRequest {
    dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Parser)]
#[command(name = "dedupe-service")]
#[command(about = "Local HTTP service for the Dedupe Kernel")]
struct Args {
    #[arg(long, default_value = "./dedupe_kernel.sqlite3")]
    db: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        (status, Json(self)).into_response()
    }
}

impl ServiceState {
    fn error(message: impl Into<String>) -> ServiceError {
        ServiceError {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            code: "BAD_REQUEST",
            error: message.into(),
        }
    }

    fn check_error(err: &CheckError) -> ServiceError {
        ServiceError {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            code: err.code(),
            error: err.to_string(),
        }
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/db/schema-version", post(db_schema_version))
        .route("/v1/db/migrate", post(db_migrate))
        .route("/v1/accounts/add", post(accounts_add))
        .route("/v1/contacts/add", post(contacts_add))
        .route("/v1/suppression/account", post(suppression_account))
        .route("/v1/suppression/contact", post(suppression_contact))
        .route("/v1/check/account", post(check_account))
        .route("/v1/check/contact", post(check_contact))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = ServiceState { api: DedupeApi::new(args.db) };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!(bind = %args.bind, "dedupe-service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn db_schema_version(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<dedupe_store_sqlite::SchemaStatus>>, ServiceError> {
    let status = state.api.schema_status().map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(status)))
}

async fn db_migrate(
    State(state): State<ServiceState>,
    Json(request): Json<MigrateRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_api::MigrateResult>>, ServiceError> {
    let result =
        state.api.migrate(request.dry_run).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(result)))
}

async fn accounts_add(
    State(state): State<ServiceState>,
    Json(request): Json<AddAccountRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_core::AccountRecord>>, ServiceError> {
    let record =
        state.api.add_account(request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(record)))
}

async fn contacts_add(
    State(state): State<ServiceState>,
    Json(request): Json<AddContactRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_core::ContactRecord>>, ServiceError> {
    let record =
        state.api.add_contact(request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(record)))
}

async fn suppression_account(
    State(state): State<ServiceState>,
    Json(request): Json<AddAccountRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_core::AccountRecord>>, ServiceError> {
    let entry =
        state.api.suppress_account(request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(entry)))
}

async fn suppression_contact(
    State(state): State<ServiceState>,
    Json(request): Json<AddContactRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_core::ContactRecord>>, ServiceError> {
    let entry =
        state.api.suppress_contact(request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(entry)))
}

async fn check_account(
    State(state): State<ServiceState>,
    Json(request): Json<CheckAccountRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_api::CheckAccountResult>>, ServiceError> {
    let result = state
        .api
        .check_account(request)
        .map_err(|err| ServiceState::check_error(&err))?;
    info!(
        account_id = %result.account_id,
        is_duplicate = result.is_duplicate,
        is_suppressed = result.is_suppressed,
        "account check completed"
    );
    Ok(Json(envelope(result)))
}

async fn check_contact(
    State(state): State<ServiceState>,
    Json(request): Json<CheckContactRequest>,
) -> Result<Json<ServiceEnvelope<dedupe_api::CheckContactResult>>, ServiceError> {
    let result = state
        .api
        .check_contact(request)
        .map_err(|err| ServiceState::check_error(&err))?;
    info!(
        contact_id = %result.contact_id,
        is_duplicate = result.is_duplicate,
        is_suppressed = result.is_suppressed,
        "contact check completed"
    );
    Ok(Json(envelope(result)))
}
