//! Report assemblers
//!
//! Five named query shapes over the shared executor. Each shape is a join
//! graph, a table-resolution map, optional fixed filters/sorter, and an
//! optional raw suffix predicate:
//!
//! | report            | joins                                   | suffix              |
//! |-------------------|-----------------------------------------|---------------------|
//! | general           | orders ⟕ extra_info ⟕ notes             | -                   |
//! | cdl               | cdl ⋈ orders ⟕ extra_info ⟕ notes       | -                   |
//! | overdue rush-local| orders ⋈ extra_info ⋈ vendors ⟕ notes   | rush_local_overdue  |
//! | overdue cdl       | cdl ⋈ orders ⋈ extra_info ⟕ notes       | cdl_overdue         |
//! | shanghai          | orders ⋈ extra_info ⟕ notes             | 3-year window       |

pub mod rows;

pub use rows::{CdlOrderRecord, CdlReportRow, OrderRecord, OrderReportRow};

use std::time::Instant;

use chrono::NaiveDate;
use sea_orm::{
    ConnectionTrait, DbBackend, EntityTrait, Iterable, JoinType, QuerySelect, RelationTrait,
    Select, Statement,
};
use serde::{Deserialize, Serialize};

use crate::config::{CutoffProvider, ReportConfig};
use crate::db::models::{cdl_order, extra_info, order, tracking_note};
use crate::errors::Result;
use crate::query::executor::{apply_query, build_statement, fetch_page};
use crate::query::overdue::{avg_cdl_scan_days, cdl_overdue, created_within, rush_local_overdue};
use crate::query::registry::{QueryTable, TableResolutionMap};
use crate::query::{
    FieldFilter, FilterOp, FilterValue, OrderQueryRequest, OrderViews, PageEnvelope, SortCol,
};
use crate::tags::Tag;

/// Which assembler serves a search request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    General,
    CdlOrders,
    OverdueRushLocal,
    OverdueCdl,
}

impl ReportKind {
    /// View-flag dispatch. Precedence when several flags are set is part of
    /// the API contract: cdl_view + pending_cdl, then cdl_view, then
    /// pending_rush_local, then the general report.
    pub fn from_views(views: &OrderViews) -> Self {
        if views.cdl_view && views.pending_cdl {
            ReportKind::OverdueCdl
        } else if views.cdl_view {
            ReportKind::CdlOrders
        } else if views.pending_rush_local {
            ReportKind::OverdueRushLocal
        } else {
            ReportKind::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::General => "general",
            ReportKind::CdlOrders => "cdl",
            ReportKind::OverdueRushLocal => "overdue-rush-local",
            ReportKind::OverdueCdl => "overdue-cdl",
        }
    }
}

/// Report shapes exposed for bulk export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportReport {
    RushLocal,
    #[serde(rename = "CDLOrder")]
    CdlOrder,
    ShanghaiOrder,
}

// ---------------------------------------------------------------------------
// Join graphs and column lists
// ---------------------------------------------------------------------------

/// Select the flattened order/extra_info/notes column set; the note date is
/// aliased so it cannot collide with any order column
fn order_scope_columns<E: EntityTrait>(select: Select<E>) -> Select<E> {
    select
        .select_only()
        .columns(order::Column::iter())
        .columns([
            extra_info::Column::Tags,
            extra_info::Column::Checked,
            extra_info::Column::Attention,
            extra_info::Column::CheckAnyway,
            extra_info::Column::CdlFlag,
            extra_info::Column::OverrideReminderTime,
        ])
        .columns([
            tracking_note::Column::TrackingNote,
            tracking_note::Column::TakenBy,
        ])
        .column_as(tracking_note::Column::Date, "note_date")
}

fn cdl_scope_columns(select: Select<cdl_order::Entity>) -> Select<cdl_order::Entity> {
    order_scope_columns(select).columns(
        cdl_order::Column::iter().filter(|c| !matches!(c, cdl_order::Column::BookId)),
    )
}

fn general_base() -> Select<order::Entity> {
    order_scope_columns(
        order::Entity::find()
            .join(JoinType::LeftJoin, order::Relation::ExtraInfo.def())
            .join(JoinType::LeftJoin, order::Relation::TrackingNote.def()),
    )
}

fn rush_local_base() -> Select<order::Entity> {
    order_scope_columns(
        order::Entity::find()
            .join(JoinType::InnerJoin, order::Relation::ExtraInfo.def())
            .join(JoinType::InnerJoin, order::Relation::Vendor.def())
            .join(JoinType::LeftJoin, order::Relation::TrackingNote.def()),
    )
}

fn shanghai_base() -> Select<order::Entity> {
    order_scope_columns(
        order::Entity::find()
            .join(JoinType::InnerJoin, order::Relation::ExtraInfo.def())
            .join(JoinType::LeftJoin, order::Relation::TrackingNote.def()),
    )
}

fn cdl_base() -> Select<cdl_order::Entity> {
    cdl_scope_columns(
        cdl_order::Entity::find()
            .join(JoinType::InnerJoin, cdl_order::Relation::Order.def())
            .join(JoinType::LeftJoin, order::Relation::ExtraInfo.def())
            .join(JoinType::LeftJoin, order::Relation::TrackingNote.def()),
    )
}

fn overdue_cdl_base() -> Select<cdl_order::Entity> {
    cdl_scope_columns(
        cdl_order::Entity::find()
            .join(JoinType::InnerJoin, cdl_order::Relation::Order.def())
            .join(JoinType::InnerJoin, order::Relation::ExtraInfo.def())
            .join(JoinType::LeftJoin, order::Relation::TrackingNote.def()),
    )
}

// ---------------------------------------------------------------------------
// Resolution maps and fixed filters
// ---------------------------------------------------------------------------

fn general_map() -> TableResolutionMap {
    TableResolutionMap::new(
        vec![QueryTable::ExtraInfo, QueryTable::TrackingNote],
        QueryTable::Order,
    )
}

fn rush_local_map() -> TableResolutionMap {
    TableResolutionMap::new(
        vec![
            QueryTable::ExtraInfo,
            QueryTable::Vendor,
            QueryTable::TrackingNote,
        ],
        QueryTable::Order,
    )
}

fn cdl_map() -> TableResolutionMap {
    TableResolutionMap::new(
        vec![
            QueryTable::CdlOrder,
            QueryTable::ExtraInfo,
            QueryTable::TrackingNote,
        ],
        QueryTable::Order,
    )
}

fn rush_local_fixed_filters() -> [FieldFilter; 1] {
    [FieldFilter {
        op: FilterOp::In,
        col: "tags".into(),
        val: FilterValue::Many(vec![Tag::Rush.to_string(), Tag::Local.to_string()]),
    }]
}

fn shanghai_fixed_filters(cfg: &ReportConfig) -> [FieldFilter; 2] {
    [
        FieldFilter {
            op: FilterOp::Like,
            col: "sublibrary".into(),
            val: FilterValue::Single(cfg.campus_code.clone()),
        },
        FieldFilter {
            op: FilterOp::Like,
            col: "orderType".into(),
            val: FilterValue::Single(cfg.material_code.clone()),
        },
    ]
}

fn shanghai_default_sorter() -> SortCol {
    SortCol {
        col: "createdDate".into(),
        desc: true,
    }
}

/// How far back the Shanghai report reaches, in days
const SHANGHAI_WINDOW_DAYS: i64 = 1095;

// ---------------------------------------------------------------------------
// Assemblers
// ---------------------------------------------------------------------------

/// General orders: every order, joined metadata tolerated missing
pub async fn general_orders<C: ConnectionTrait>(
    db: &C,
    request: &OrderQueryRequest,
) -> Result<(Vec<OrderReportRow>, u64)> {
    let select = apply_query(general_base(), request, &[], None, &general_map(), None)?;
    timed_fetch(db, select, request, ReportKind::General.as_str()).await
}

/// CDL orders: the inner join restricts to orders under the CDL workflow
pub async fn cdl_orders<C: ConnectionTrait>(
    db: &C,
    request: &OrderQueryRequest,
) -> Result<(Vec<CdlReportRow>, u64)> {
    let select = apply_query(cdl_base(), request, &[], None, &cdl_map(), None)?;
    timed_fetch(db, select, request, ReportKind::CdlOrders.as_str()).await
}

/// Overdue Rush-Local orders: forced Rush+Local tag filter plus the
/// vendor-threshold overdue rule
pub async fn overdue_rush_local<C: ConnectionTrait>(
    db: &C,
    request: &OrderQueryRequest,
) -> Result<(Vec<OrderReportRow>, u64)> {
    let select = apply_query(
        rush_local_base(),
        request,
        &rush_local_fixed_filters(),
        None,
        &rush_local_map(),
        Some(rush_local_overdue()),
    )?;
    timed_fetch(db, select, request, ReportKind::OverdueRushLocal.as_str()).await
}

/// Overdue CDL orders: the scan-days threshold is recomputed from the
/// completed set on every invocation
pub async fn overdue_cdl<C: ConnectionTrait>(
    db: &C,
    request: &OrderQueryRequest,
    cutoff: NaiveDate,
) -> Result<(Vec<CdlReportRow>, u64)> {
    let threshold = avg_cdl_scan_days(db, cutoff).await?;
    let select = apply_query(
        overdue_cdl_base(),
        request,
        &[],
        None,
        &cdl_map(),
        Some(cdl_overdue(threshold)),
    )?;
    timed_fetch(db, select, request, ReportKind::OverdueCdl.as_str()).await
}

/// Shanghai report: campus/material coded orders from the last three years,
/// newest first unless the caller sorts otherwise
pub async fn shanghai_orders<C: ConnectionTrait>(
    db: &C,
    request: &OrderQueryRequest,
    cfg: &ReportConfig,
) -> Result<(Vec<OrderReportRow>, u64)> {
    let select = apply_query(
        shanghai_base(),
        request,
        &shanghai_fixed_filters(cfg),
        Some(&shanghai_default_sorter()),
        &general_map(),
        Some(created_within(SHANGHAI_WINDOW_DAYS)),
    )?;
    timed_fetch(db, select, request, "shanghai").await
}

async fn timed_fetch<C, E, R>(
    db: &C,
    select: Select<E>,
    request: &OrderQueryRequest,
    report: &str,
) -> Result<(Vec<R>, u64)>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: sea_orm::FromQueryResult + Sized + Send + Sync + 'static,
    R: sea_orm::FromQueryResult + Send + Sync + 'static,
{
    let started = Instant::now();
    let (rows, total) = fetch_page(db, select, request.page_index, request.page_size).await?;
    crate::metrics::record_report(started.elapsed().as_secs_f64(), report, rows.len());
    tracing::debug!(report, total, rows = rows.len(), "report page served");
    Ok((rows, total))
}

// ---------------------------------------------------------------------------
// Dispatch and export
// ---------------------------------------------------------------------------

/// One page of whichever report the view flags selected
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportPage {
    Orders(PageEnvelope<OrderRecord>),
    Cdl(PageEnvelope<CdlOrderRecord>),
}

fn envelope<T, R: Into<T>>(rows: Vec<R>, total: u64, request: &OrderQueryRequest) -> PageEnvelope<T> {
    PageEnvelope {
        page_index: request.page_index,
        page_limit: request.page_size,
        total_records: total,
        result: rows.into_iter().map(Into::into).collect(),
    }
}

/// Serve a search request through the assembler its view flags select.
///
/// The CDL cutoff is read through the provider on every call; it is
/// runtime-mutable and must not be captured.
pub async fn dispatch<C: ConnectionTrait>(
    db: &C,
    request: &OrderQueryRequest,
    cutoff: &CutoffProvider,
) -> Result<ReportPage> {
    match ReportKind::from_views(&request.views) {
        ReportKind::General => {
            let (rows, total) = general_orders(db, request).await?;
            Ok(ReportPage::Orders(envelope(rows, total, request)))
        }
        ReportKind::CdlOrders => {
            let (rows, total) = cdl_orders(db, request).await?;
            Ok(ReportPage::Cdl(envelope(rows, total, request)))
        }
        ReportKind::OverdueRushLocal => {
            let (rows, total) = overdue_rush_local(db, request).await?;
            Ok(ReportPage::Orders(envelope(rows, total, request)))
        }
        ReportKind::OverdueCdl => {
            let (rows, total) = overdue_cdl(db, request, cutoff.get().await).await?;
            Ok(ReportPage::Cdl(envelope(rows, total, request)))
        }
    }
}

/// Build the unexecuted statement of an export shape: the full matching set,
/// no pagination, ready for streaming into a file
pub fn export_statement(report: ExportReport, cfg: &ReportConfig) -> Result<Statement> {
    let request = OrderQueryRequest {
        page_size: -1,
        ..Default::default()
    };
    let statement = match report {
        ExportReport::RushLocal => build_statement(
            apply_query(
                rush_local_base(),
                &request,
                &rush_local_fixed_filters(),
                None,
                &rush_local_map(),
                Some(rush_local_overdue()),
            )?,
            DbBackend::Postgres,
        ),
        ExportReport::CdlOrder => build_statement(
            apply_query(cdl_base(), &request, &[], None, &cdl_map(), None)?,
            DbBackend::Postgres,
        ),
        ExportReport::ShanghaiOrder => build_statement(
            apply_query(
                shanghai_base(),
                &request,
                &shanghai_fixed_filters(cfg),
                Some(&shanghai_default_sorter()),
                &general_map(),
                Some(created_within(SHANGHAI_WINDOW_DAYS)),
            )?,
            DbBackend::Postgres,
        ),
    };
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn views(cdl_view: bool, pending_rush_local: bool, pending_cdl: bool) -> OrderViews {
        OrderViews {
            cdl_view,
            pending_rush_local,
            pending_cdl,
            prioritize: false,
        }
    }

    #[test]
    fn test_view_precedence() {
        assert_eq!(
            ReportKind::from_views(&views(true, false, true)),
            ReportKind::OverdueCdl
        );
        assert_eq!(
            ReportKind::from_views(&views(true, false, false)),
            ReportKind::CdlOrders
        );
        assert_eq!(
            ReportKind::from_views(&views(false, true, false)),
            ReportKind::OverdueRushLocal
        );
        assert_eq!(
            ReportKind::from_views(&views(false, false, false)),
            ReportKind::General
        );

        // every flag set: the cdl_view + pending_cdl pair still wins
        assert_eq!(
            ReportKind::from_views(&views(true, true, true)),
            ReportKind::OverdueCdl
        );
        // pending_cdl without cdl_view does not select the CDL shapes
        assert_eq!(
            ReportKind::from_views(&views(false, true, true)),
            ReportKind::OverdueRushLocal
        );
        assert_eq!(
            ReportKind::from_views(&views(false, false, true)),
            ReportKind::General
        );
    }

    #[test]
    fn test_general_shape_uses_outer_joins() {
        let sql = export_sql_of(general_base());
        assert!(sql.contains(r#"LEFT JOIN "extra_info""#));
        assert!(sql.contains(r#"LEFT JOIN "notes""#));
        assert!(!sql.contains("INNER JOIN"));
    }

    #[test]
    fn test_cdl_shape_inner_joins_orders() {
        let sql = export_sql_of(cdl_base());
        assert!(sql.contains(r#"FROM "cdl_info""#));
        assert!(sql.contains(r#"INNER JOIN "nyc_orders""#));
        assert!(sql.contains(r#"LEFT JOIN "extra_info""#));
    }

    #[test]
    fn test_overdue_cdl_shape_requires_extra_info() {
        let sql = export_sql_of(overdue_cdl_base());
        assert!(sql.contains(r#"INNER JOIN "extra_info""#));
    }

    #[test]
    fn test_note_date_is_aliased() {
        let sql = export_sql_of(general_base());
        assert!(sql.contains(r#""notes"."date" AS "note_date""#));
    }

    #[test]
    fn test_rush_local_export_statement() {
        let cfg = ReportConfig {
            campus_code: "XS".into(),
            material_code: "MN".into(),
            cutoff_path: "unused".into(),
        };
        let stmt = export_statement(ExportReport::RushLocal, &cfg).unwrap();
        let sql = &stmt.sql;
        assert!(sql.contains("tags"));
        assert!(sql.contains("notify_in"));
        // full set: no pagination on export
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("OFFSET"));
    }

    #[test]
    fn test_shanghai_shape() {
        let cfg = ReportConfig {
            campus_code: "XS".into(),
            material_code: "MN".into(),
            cutoff_path: "unused".into(),
        };
        let request = OrderQueryRequest {
            page_size: -1,
            ..Default::default()
        };
        let select = apply_query(
            shanghai_base(),
            &request,
            &shanghai_fixed_filters(&cfg),
            Some(&shanghai_default_sorter()),
            &general_map(),
            Some(created_within(SHANGHAI_WINDOW_DAYS)),
        )
        .unwrap();
        let sql = export_sql_of(select);
        assert!(sql.contains(r#""nyc_orders"."sublibrary" LIKE '%XS%'"#));
        assert!(sql.contains(r#""nyc_orders"."order_type" LIKE '%MN%'"#));
        assert!(sql.contains("<= 1095"));
        // default sorter: newest first, tie-broken on id
        assert!(sql.contains(r#"ORDER BY "nyc_orders"."created_date" DESC, "nyc_orders"."id" DESC"#));
    }

    fn export_sql_of<E: EntityTrait>(select: Select<E>) -> String {
        use sea_orm::sea_query::{PostgresQueryBuilder, QueryStatementWriter};
        use sea_orm::QueryTrait;
        select.into_query().to_string(PostgresQueryBuilder)
    }
}
