//! Report export handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use shelfwise_common::errors::Result;
use shelfwise_common::reports::{export_statement, ExportReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    pub report_type: ExportReport,
}

/// The built, unexecuted SQL of an export shape. Export tooling streams the
/// full result straight into a file instead of paging through the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub sql: String,
    pub values: Vec<String>,
}

/// Build the export statement for a report shape
pub async fn statement(
    State(state): State<AppState>,
    Json(request): Json<StatementRequest>,
) -> Result<Json<StatementResponse>> {
    let stmt = export_statement(request.report_type, &state.config.report)?;
    let values = stmt
        .values
        .as_ref()
        .map(|vs| vs.iter().map(|v| format!("{:?}", v)).collect())
        .unwrap_or_default();
    Ok(Json(StatementResponse {
        sql: stmt.sql,
        values,
    }))
}
