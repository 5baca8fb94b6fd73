//! Dashboard overview handler

use axum::{extract::State, Json};

use crate::AppState;
use shelfwise_common::errors::Result;
use shelfwise_common::stats::{self, Overview};

/// Pending counts and day-span aggregates for the dashboard.
///
/// The cutoff is read through the provider per request; an admin update
/// takes effect on the next call.
pub async fn overview(State(state): State<AppState>) -> Result<Json<Overview>> {
    let cutoff = state.cutoff.get().await;
    let overview = stats::overview(state.db.read(), cutoff).await?;
    Ok(Json(overview))
}
