//! Record endpoints.
//!
//! Each handler is one independent request: validate at the boundary, make a
//! single gateway call, map the outcome to a status.

use crate::dtos::{ListParams, RecordPatch, RecordPayload};
use crate::models::Record;
use crate::services::record_operation;
use crate::startup::AppState;
use crate::utils::{ValidatedJson, ValidatedQuery};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use service_core::error::AppError;

fn record_not_found(id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Record {} not found", id))
}

fn outcome<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::Conflict(_)) => "conflict",
        Err(AppError::StoreUnavailable(_)) => "unavailable",
        Err(_) => "error",
    }
}

fn observe<T>(operation: &'static str, result: Result<T, AppError>) -> Result<T, AppError> {
    record_operation(operation, outcome(&result));
    result
}

pub async fn create_record(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RecordPayload>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = observe(
        "create",
        state
            .gateway
            .insert(payload.into_fields())
            .await
            .map_err(AppError::from),
    )?;

    tracing::info!(record_id = %record.id, "Record created");

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    let result = match state.gateway.find_by_id(&id).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(record_not_found(&id)),
        Err(e) => Err(AppError::from(e)),
    };

    observe("get", result).map(Json)
}

pub async fn list_records(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<Json<Vec<Record>>, AppError> {
    let page = params.page();

    let result = async {
        let records: Vec<Record> = state.gateway.find(page).await?.try_collect().await?;
        Ok::<_, crate::services::GatewayError>(records)
    }
    .await
    .map_err(AppError::from);

    let records = observe("list", result)?;

    tracing::debug!(
        limit = page.limit,
        offset = page.offset,
        returned = records.len(),
        "Listed records"
    );

    Ok(Json(records))
}

/// Full replacement: afterwards the record holds exactly the payload's fields.
pub async fn replace_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<RecordPayload>,
) -> Result<Json<Record>, AppError> {
    let result = match state.gateway.replace(&id, payload.into_fields()).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(record_not_found(&id)),
        Err(e) => Err(AppError::from(e)),
    };

    let record = observe("replace", result)?;
    tracing::info!(record_id = %record.id, "Record replaced");

    Ok(Json(record))
}

/// Partial update: non-null fields are set, the rest are kept. An empty patch
/// returns the record unchanged.
pub async fn patch_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<RecordPatch>,
) -> Result<Json<Record>, AppError> {
    let result = match state.gateway.update_fields(&id, patch.into_set_fields()).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(record_not_found(&id)),
        Err(e) => Err(AppError::from(e)),
    };

    let record = observe("patch", result)?;
    tracing::info!(record_id = %record.id, "Record updated");

    Ok(Json(record))
}

/// 204 when the record was removed, 404 when it was already gone.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let result = match state.gateway.delete(&id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(record_not_found(&id)),
        Err(e) => Err(AppError::from(e)),
    };

    let status = observe("delete", result)?;
    tracing::info!(record_id = %id, "Record deleted");

    Ok(status)
}
