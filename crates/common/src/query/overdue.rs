//! Business-rule suffix predicates
//!
//! The two overdue rules cannot be expressed through the generic filter
//! vocabulary: they mix date arithmetic against per-vendor thresholds with
//! the checked/override escape hatches. They are compiled once per report
//! invocation and ANDed onto the query after the user filters.

use chrono::NaiveDate;
use sea_orm::sea_query::{ExprTrait, SimpleExpr};
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, ConnectionTrait, DbBackend, Statement};

use crate::db::models::{cdl_order, extra_info, order, vendor};
use crate::errors::Result;
use crate::CANCELLED_STATUS;

/// Whole days elapsed since a DATE column
pub fn days_since(column: SimpleExpr) -> SimpleExpr {
    Expr::cust_with_expr("(CURRENT_DATE - $1)", column)
}

/// Rows created no more than `days` days ago (inclusive)
pub fn created_within(days: i64) -> Condition {
    Condition::all().add(
        days_since(Expr::col((order::Entity, order::Column::CreatedDate)).into()).lte(days),
    )
}

/// The checked/override escape tail shared by both overdue rules: a row
/// stays in the report while unchecked, or once a manual override window
/// has expired
fn unchecked_or_override_expired() -> Condition {
    Condition::any()
        .add(Expr::col((extra_info::Entity, extra_info::Column::Checked)).eq(false))
        .add(
            Condition::all()
                .add(
                    Expr::col((extra_info::Entity, extra_info::Column::OverrideReminderTime))
                        .is_not_null(),
                )
                .add(
                    Expr::col((extra_info::Entity, extra_info::Column::OverrideReminderTime))
                        .lt(Expr::cust("NOW()")),
                ),
        )
}

/// Rush-Local overdue rule.
///
/// check_anyway short-circuits the whole date clause; it does NOT bypass the
/// Rush+Local tag filter, which the report applies before this suffix.
/// The day comparison is strictly greater-than: an order is not overdue on
/// the notify_in-th day itself.
pub fn rush_local_overdue() -> Condition {
    Condition::any()
        .add(Expr::col((extra_info::Entity, extra_info::Column::CheckAnyway)).eq(true))
        .add(
            Condition::all()
                .add(Expr::col((order::Entity, order::Column::ArrivalDate)).is_null())
                .add(Expr::col((order::Entity, order::Column::OrderStatus)).ne(CANCELLED_STATUS))
                .add(
                    days_since(Expr::col((order::Entity, order::Column::CreatedDate)).into())
                        .gt(Expr::col((vendor::Entity, vendor::Column::NotifyIn))),
                )
                .add(unchecked_or_override_expired()),
        )
}

/// CDL overdue rule against a precomputed scan-days threshold
/// (see [`avg_cdl_scan_days`])
pub fn cdl_overdue(threshold_days: i64) -> Condition {
    Condition::any()
        .add(Expr::col((extra_info::Entity, extra_info::Column::CheckAnyway)).eq(true))
        .add(
            Condition::all()
                .add(Expr::col((cdl_order::Entity, cdl_order::Column::PdfDeliveryDate)).is_null())
                .add(
                    days_since(
                        Expr::col((cdl_order::Entity, cdl_order::Column::OrderRequestDate)).into(),
                    )
                    .gt(threshold_days),
                )
                .add(unchecked_or_override_expired()),
        )
}

/// Average scan turnaround in whole days over completed CDL orders requested
/// after the cutoff date.
///
/// Recomputed on every invocation: the cutoff is runtime-mutable and the
/// completed set grows continuously. 0 when no completed orders exist yet.
pub async fn avg_cdl_scan_days<C: ConnectionTrait>(db: &C, cutoff: NaiveDate) -> Result<i64> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT COALESCE(AVG(pdf_delivery_date - order_request_date), 0)::FLOAT8 AS avg_days
        FROM cdl_info
        WHERE pdf_delivery_date IS NOT NULL
          AND order_request_date IS NOT NULL
          AND order_request_date > $1
        "#,
        vec![cutoff.into()],
    );

    match db.query_one(stmt).await? {
        Some(row) => {
            let avg: f64 = row.try_get("", "avg_days")?;
            Ok(avg as i64)
        }
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{PostgresQueryBuilder, QueryStatementWriter};
    use sea_orm::{DatabaseBackend, EntityTrait, MockDatabase, QueryFilter, QueryTrait};
    use sea_orm::Value;
    use std::collections::BTreeMap;

    fn render(cond: Condition) -> String {
        order::Entity::find()
            .filter(cond)
            .into_query()
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn test_rush_local_day_comparison_is_strict() {
        let sql = render(rush_local_overdue());
        assert!(sql.contains(r#"(CURRENT_DATE - "nyc_orders"."created_date")"#));
        assert!(sql.contains(r#"> "vendors"."notify_in""#));
        assert!(!sql.contains(">="));
    }

    #[test]
    fn test_rush_local_check_anyway_short_circuits() {
        let sql = render(rush_local_overdue());
        // the whole date clause sits on the other side of an OR from
        // check_anyway, so an arrived order with check_anyway still matches
        assert!(sql.contains(r#""extra_info"."check_anyway" = TRUE OR"#));
        assert!(sql.contains(r#""nyc_orders"."arrival_date" IS NULL"#));
    }

    #[test]
    fn test_rush_local_excludes_cancelled() {
        let sql = render(rush_local_overdue());
        assert!(sql.contains(r#""nyc_orders"."order_status" <> 'VC'"#));
    }

    #[test]
    fn test_override_window() {
        let sql = render(rush_local_overdue());
        assert!(sql.contains(r#""extra_info"."checked" = FALSE"#));
        assert!(sql.contains(r#""extra_info"."override_reminder_time" IS NOT NULL"#));
        assert!(sql.contains(r#""extra_info"."override_reminder_time" < NOW()"#));
    }

    #[test]
    fn test_cdl_overdue_with_zero_threshold() {
        // no completed CDL orders yet: any positive-age request qualifies
        let sql = render(cdl_overdue(0));
        assert!(sql.contains(r#"(CURRENT_DATE - "cdl_info"."order_request_date")"#));
        assert!(sql.contains("> 0"));
        assert!(sql.contains(r#""cdl_info"."pdf_delivery_date" IS NULL"#));
    }

    #[test]
    fn test_created_within_is_inclusive() {
        let sql = render(created_within(1095));
        assert!(sql.contains(r#"(CURRENT_DATE - "nyc_orders"."created_date")"#));
        assert!(sql.contains("<= 1095"));
    }

    #[tokio::test]
    async fn test_avg_cdl_scan_days_reads_aggregate() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([(
                "avg_days",
                Value::Double(Some(12.8)),
            )])]])
            .into_connection();

        let cutoff = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        // fractional averages truncate toward zero
        assert_eq!(avg_cdl_scan_days(&db, cutoff).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_avg_cdl_scan_days_defaults_to_zero() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([(
                "avg_days",
                Value::Double(Some(0.0)),
            )])]])
            .into_connection();

        let cutoff = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(avg_cdl_scan_days(&db, cutoff).await.unwrap(), 0);
    }
}
