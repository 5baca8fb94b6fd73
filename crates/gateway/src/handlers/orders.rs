//! Order search and patch handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use shelfwise_common::db::repository::OrderPatch;
use shelfwise_common::errors::{AppError, Result};
use shelfwise_common::query::OrderQueryRequest;
use shelfwise_common::reports::{self, ReportPage};

/// Search orders. The view flags pick the report shape; filters, sorter,
/// fuzzy term, and pagination apply within it.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<OrderQueryRequest>,
) -> Result<Json<ReportPage>> {
    let page = reports::dispatch(state.db.read(), &request, state.cutoff.as_ref()).await?;
    Ok(Json(page))
}

#[derive(Serialize)]
pub struct BasicResponse {
    pub msg: String,
}

/// Patch a general order: tracking note, review flags, sensitivity
pub async fn patch_general_order(
    State(state): State<AppState>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<BasicResponse>> {
    if patch.cdl.is_some() {
        return Err(AppError::Validation {
            message: "CDL fields belong to the cdl-order patch endpoint".into(),
        });
    }
    state.repo.patch_order(patch).await?;
    Ok(Json(BasicResponse {
        msg: "Success".into(),
    }))
}

/// Patch a CDL order: everything a general patch does, plus the CDL fields
pub async fn patch_cdl_order(
    State(state): State<AppState>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<BasicResponse>> {
    state.repo.patch_order(patch).await?;
    Ok(Json(BasicResponse {
        msg: "Success".into(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCdlRequest {
    pub book_id: i32,
}

/// Flag an order for the CDL workflow
pub async fn create_cdl(
    State(state): State<AppState>,
    Json(request): Json<NewCdlRequest>,
) -> Result<(StatusCode, Json<BasicResponse>)> {
    state.repo.create_cdl(request.book_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BasicResponse {
            msg: "Success".into(),
        }),
    ))
}

/// Revoke CDL status from an order
pub async fn revoke_cdl(
    State(state): State<AppState>,
    Path(book_id): Path<i32>,
) -> Result<StatusCode> {
    state.repo.revoke_cdl(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckedRequest {
    #[validate(length(min = 1))]
    pub id: Vec<i32>,
    pub checked: bool,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Bulk-mark orders as checked
pub async fn set_checked(
    State(state): State<AppState>,
    Json(request): Json<CheckedRequest>,
) -> Result<Json<BasicResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;
    let updated = state
        .repo
        .set_checked(&request.id, request.checked, request.date)
        .await?;
    Ok(Json(BasicResponse {
        msg: format!("Updated {} orders", updated),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttentionRequest {
    #[validate(length(min = 1))]
    pub id: Vec<i32>,
    pub attention: bool,
}

/// Bulk-mark orders as attention-required
pub async fn set_attention(
    State(state): State<AppState>,
    Json(request): Json<AttentionRequest>,
) -> Result<Json<BasicResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;
    let updated = state
        .repo
        .set_attention(&request.id, request.attention)
        .await?;
    Ok(Json(BasicResponse {
        msg: format!("Updated {} orders", updated),
    }))
}

/// Delete the tracking note of an order
pub async fn delete_note(
    State(state): State<AppState>,
    Path(book_id): Path<i32>,
) -> Result<StatusCode> {
    if state.repo.delete_note(book_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound {
            resource_type: "tracking note".into(),
            id: book_id.to_string(),
        })
    }
}
