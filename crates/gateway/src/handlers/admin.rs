//! Admin handlers for the runtime-mutable CDL vendor cutoff date

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::AppState;
use shelfwise_common::errors::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct CutoffBody {
    pub date: NaiveDate,
}

/// Current cutoff date
pub async fn get_cutoff(State(state): State<AppState>) -> Json<CutoffBody> {
    Json(CutoffBody {
        date: state.cutoff.get().await,
    })
}

/// Persist a new cutoff date; reports and the overview pick it up on their
/// next invocation
pub async fn set_cutoff(
    State(state): State<AppState>,
    Json(body): Json<CutoffBody>,
) -> Result<Json<CutoffBody>> {
    state.cutoff.set(body.date).await?;
    Ok(Json(CutoffBody { date: body.date }))
}

/// Re-read the backing file, for out-of-band edits
pub async fn reload_cutoff(State(state): State<AppState>) -> Result<Json<CutoffBody>> {
    let date = state.cutoff.reload().await?;
    Ok(Json(CutoffBody { date }))
}
