//! Vendor management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use shelfwise_common::db::models::Vendor;
use shelfwise_common::errors::{AppError, Result};

/// Wire form of a vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDto {
    pub vendor_code: String,
    /// true - local; false - non-local
    pub local: bool,
    pub notify_in: Option<i32>,
}

impl From<Vendor> for VendorDto {
    fn from(v: Vendor) -> Self {
        Self {
            vendor_code: v.vendor_code,
            local: v.local,
            notify_in: v.notify_in,
        }
    }
}

impl From<VendorDto> for Vendor {
    fn from(v: VendorDto) -> Self {
        Self {
            vendor_code: v.vendor_code,
            local: v.local,
            notify_in: v.notify_in,
        }
    }
}

/// List every vendor
pub async fn list_vendors(State(state): State<AppState>) -> Result<Json<Vec<VendorDto>>> {
    let vendors = state.repo.list_vendors().await?;
    Ok(Json(vendors.into_iter().map(Into::into).collect()))
}

/// Get one vendor by code
pub async fn get_vendor(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<VendorDto>> {
    let vendor = state
        .repo
        .find_vendor(&code)
        .await?
        .ok_or(AppError::VendorNotFound { code })?;
    Ok(Json(vendor.into()))
}

/// Create a vendor
pub async fn add_vendor(
    State(state): State<AppState>,
    Json(vendor): Json<VendorDto>,
) -> Result<(StatusCode, Json<VendorDto>)> {
    let created = state.repo.add_vendor(vendor.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update a vendor's turnaround and locality
pub async fn update_vendor(
    State(state): State<AppState>,
    Json(vendor): Json<VendorDto>,
) -> Result<Json<VendorDto>> {
    let updated = state.repo.update_vendor(vendor.into()).await?;
    Ok(Json(updated.into()))
}

/// Delete a vendor
pub async fn delete_vendor(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    state.repo.delete_vendor(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}
