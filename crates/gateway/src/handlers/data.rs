//! Metadata handler

use axum::{extract::State, Json};

use crate::AppState;
use shelfwise_common::db::repository::MetaData;
use shelfwise_common::errors::Result;

/// Distinct column values and vocabularies for the client filter pickers
pub async fn metadata(State(state): State<AppState>) -> Result<Json<MetaData>> {
    Ok(Json(state.repo.metadata().await?))
}
