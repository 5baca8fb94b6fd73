//! Overview statistics aggregator
//!
//! Read-only aggregates for the dashboard: pending counts reuse the overdue
//! predicates without pagination; the day-span categories are raw aggregate
//! queries scoped to non-cancelled orders created after the cutoff date.
//! Every numeric aggregate is COALESCEd to 0 so the contract stays
//! non-nullable even on an empty store.

use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::{
    ConnectionTrait, DbBackend, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QuerySelect,
    RelationTrait, Statement,
};
use serde::Serialize;

use crate::db::models::{cdl_order, extra_info, order};
use crate::errors::Result;
use crate::query::overdue::{avg_cdl_scan_days, cdl_overdue, rush_local_overdue};
use crate::tags::Tag;

/// Dashboard overview figures
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub local_rush_pending: u64,
    pub cdl_pending: u64,

    pub avg_cdl_scan: i64,
    pub avg_cdl: i64,
    pub avg_rush_nyc: i64,
    pub avg_rush_local: i64,

    pub max_cdl_scan: i64,
    pub max_cdl: i64,
    pub max_rush_nyc: i64,
    pub max_rush_local: i64,

    pub min_cdl_scan: i64,
    pub min_cdl: i64,
    pub min_rush_nyc: i64,
    pub min_rush_local: i64,
}

/// avg/min/max of a day-span category
#[derive(Debug, Clone, Copy, Default)]
struct DaySpan {
    avg: i64,
    min: i64,
    max: i64,
}

fn has_tag_expr(tag: Tag) -> sea_orm::sea_query::SimpleExpr {
    Expr::col((extra_info::Entity, extra_info::Column::Tags)).like(format!("%[{}]%", tag))
}

/// Rush-Local orders currently in the overdue report
async fn local_rush_pending<C: ConnectionTrait>(db: &C) -> Result<u64> {
    let count = order::Entity::find()
        .join(JoinType::InnerJoin, order::Relation::ExtraInfo.def())
        .join(JoinType::InnerJoin, order::Relation::Vendor.def())
        .filter(has_tag_expr(Tag::Rush))
        .filter(has_tag_expr(Tag::Local))
        .filter(rush_local_overdue())
        .count(db)
        .await?;
    Ok(count)
}

/// CDL orders currently in the overdue report
async fn cdl_pending<C: ConnectionTrait>(db: &C, cutoff: NaiveDate) -> Result<u64> {
    let threshold = avg_cdl_scan_days(db, cutoff).await?;
    let count = cdl_order::Entity::find()
        .join(JoinType::InnerJoin, cdl_order::Relation::Order.def())
        .join(JoinType::InnerJoin, order::Relation::ExtraInfo.def())
        .filter(cdl_overdue(threshold))
        .count(db)
        .await?;
    Ok(count)
}

/// Arrival turnaround of CDL-workflow orders
const CDL_ARRIVAL_SQL: &str = r#"
SELECT COALESCE(AVG(o.arrival_date - o.created_date), 0)::FLOAT8 AS avg_days,
       COALESCE(MIN(o.arrival_date - o.created_date), 0)::BIGINT AS min_days,
       COALESCE(MAX(o.arrival_date - o.created_date), 0)::BIGINT AS max_days
FROM nyc_orders o
JOIN cdl_info c ON c.book_id = o.id
WHERE o.arrival_date IS NOT NULL
  AND o.created_date IS NOT NULL
  AND o.order_status <> 'VC'
  AND o.created_date > $1
"#;

/// Scan-vendor turnaround of completed CDL orders
const CDL_SCAN_SQL: &str = r#"
SELECT COALESCE(AVG(c.pdf_delivery_date - c.order_request_date), 0)::FLOAT8 AS avg_days,
       COALESCE(MIN(c.pdf_delivery_date - c.order_request_date), 0)::BIGINT AS min_days,
       COALESCE(MAX(c.pdf_delivery_date - c.order_request_date), 0)::BIGINT AS max_days
FROM cdl_info c
JOIN nyc_orders o ON o.id = c.book_id
WHERE c.pdf_delivery_date IS NOT NULL
  AND c.order_request_date IS NOT NULL
  AND o.order_status <> 'VC'
  AND o.created_date > $1
"#;

/// Arrival turnaround of Rush orders from NY vendors
const RUSH_NYC_SQL: &str = r#"
SELECT COALESCE(AVG(o.arrival_date - o.created_date), 0)::FLOAT8 AS avg_days,
       COALESCE(MIN(o.arrival_date - o.created_date), 0)::BIGINT AS min_days,
       COALESCE(MAX(o.arrival_date - o.created_date), 0)::BIGINT AS max_days
FROM nyc_orders o
JOIN extra_info e ON e.id = o.id
WHERE e.tags LIKE '%[Rush]%'
  AND e.tags LIKE '%[NY]%'
  AND o.arrival_date IS NOT NULL
  AND o.created_date IS NOT NULL
  AND o.order_status <> 'VC'
  AND o.created_date > $1
"#;

/// Arrival turnaround of Rush orders from local vendors
const RUSH_LOCAL_SQL: &str = r#"
SELECT COALESCE(AVG(o.arrival_date - o.created_date), 0)::FLOAT8 AS avg_days,
       COALESCE(MIN(o.arrival_date - o.created_date), 0)::BIGINT AS min_days,
       COALESCE(MAX(o.arrival_date - o.created_date), 0)::BIGINT AS max_days
FROM nyc_orders o
JOIN extra_info e ON e.id = o.id
WHERE e.tags LIKE '%[Rush]%'
  AND e.tags LIKE '%[Local]%'
  AND o.arrival_date IS NOT NULL
  AND o.created_date IS NOT NULL
  AND o.order_status <> 'VC'
  AND o.created_date > $1
"#;

async fn day_span<C: ConnectionTrait>(db: &C, sql: &str, cutoff: NaiveDate) -> Result<DaySpan> {
    let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, vec![cutoff.into()]);
    match db.query_one(stmt).await? {
        Some(row) => {
            let avg: f64 = row.try_get("", "avg_days")?;
            Ok(DaySpan {
                avg: avg as i64,
                min: row.try_get("", "min_days")?,
                max: row.try_get("", "max_days")?,
            })
        }
        None => Ok(DaySpan::default()),
    }
}

/// Assemble the dashboard overview
pub async fn overview<C: ConnectionTrait>(db: &C, cutoff: NaiveDate) -> Result<Overview> {
    let local_rush_pending = local_rush_pending(db).await?;
    let cdl_pending = cdl_pending(db, cutoff).await?;

    let cdl = day_span(db, CDL_ARRIVAL_SQL, cutoff).await?;
    let cdl_scan = day_span(db, CDL_SCAN_SQL, cutoff).await?;
    let rush_nyc = day_span(db, RUSH_NYC_SQL, cutoff).await?;
    let rush_local = day_span(db, RUSH_LOCAL_SQL, cutoff).await?;

    Ok(Overview {
        local_rush_pending,
        cdl_pending,

        avg_cdl_scan: cdl_scan.avg,
        avg_cdl: cdl.avg,
        avg_rush_nyc: rush_nyc.avg,
        avg_rush_local: rush_local.avg,

        max_cdl_scan: cdl_scan.max,
        max_cdl: cdl.max,
        max_rush_nyc: rush_nyc.max,
        max_rush_local: rush_local.max,

        min_cdl_scan: cdl_scan.min,
        min_cdl: cdl.min,
        min_rush_nyc: rush_nyc.min,
        min_rush_local: rush_local.min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn span_row(avg: f64, min: i64, max: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("avg_days", Value::Double(Some(avg))),
            ("min_days", Value::BigInt(Some(min))),
            ("max_days", Value::BigInt(Some(max))),
        ])
    }

    #[tokio::test]
    async fn test_day_span_parses_aggregates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![span_row(9.6, 2, 31)]])
            .into_connection();
        let cutoff = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();

        let span = day_span(&db, CDL_ARRIVAL_SQL, cutoff).await.unwrap();
        assert_eq!(span.avg, 9);
        assert_eq!(span.min, 2);
        assert_eq!(span.max, 31);
    }

    #[tokio::test]
    async fn test_overview_defaults_to_zero_on_empty_store() {
        let cutoff = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let count_row = |n: i64| BTreeMap::from([("num_items", Value::BigInt(Some(n)))]);
        let avg_row = BTreeMap::from([("avg_days", Value::Double(Some(0.0)))]);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // local_rush_pending count
            .append_query_results([vec![count_row(0)]])
            // cdl_pending: threshold aggregate, then count
            .append_query_results([vec![avg_row]])
            .append_query_results([vec![count_row(0)]])
            // four day-span categories, all empty
            .append_query_results([vec![span_row(0.0, 0, 0)]])
            .append_query_results([vec![span_row(0.0, 0, 0)]])
            .append_query_results([vec![span_row(0.0, 0, 0)]])
            .append_query_results([vec![span_row(0.0, 0, 0)]])
            .into_connection();

        let overview = overview(&db, cutoff).await.unwrap();
        assert_eq!(overview.local_rush_pending, 0);
        assert_eq!(overview.cdl_pending, 0);
        assert_eq!(overview.avg_cdl_scan, 0);
        assert_eq!(overview.min_rush_local, 0);
        assert_eq!(overview.max_cdl, 0);
    }

    #[test]
    fn test_span_queries_are_scoped_and_non_nullable() {
        for sql in [CDL_ARRIVAL_SQL, CDL_SCAN_SQL, RUSH_NYC_SQL, RUSH_LOCAL_SQL] {
            assert!(sql.contains("COALESCE"));
            assert!(sql.contains("o.order_status <> 'VC'"));
            assert!(sql.contains("o.created_date > $1"));
        }
        // bracketed-token guards, never bare substrings
        assert!(RUSH_NYC_SQL.contains("'%[NY]%'"));
        assert!(RUSH_LOCAL_SQL.contains("'%[Local]%'"));
    }
}
