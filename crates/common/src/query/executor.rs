//! Query executor
//!
//! Applies the compiled pieces in a fixed order — filters, fuzzy, suffix,
//! sort + tie-break — then counts the full match BEFORE offset/limit so
//! `total_records` stays consistent with the page contents, whatever page
//! was asked for.

use sea_orm::{
    ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Select, Statement,
};

use crate::errors::Result;
use crate::query::compiler::{compile_filters, compile_fuzzy, compile_sorter};
use crate::query::registry::TableResolutionMap;
use crate::query::{FieldFilter, OrderQueryRequest, SortCol};
use sea_orm::Condition;

/// Apply fixed filters, request filters, fuzzy search, the raw suffix, and
/// ordering onto a base select. Pagination is NOT applied here; the caller
/// counts first.
pub fn apply_query<E: EntityTrait>(
    mut select: Select<E>,
    request: &OrderQueryRequest,
    fixed_filters: &[FieldFilter],
    default_sorter: Option<&SortCol>,
    map: &TableResolutionMap,
    suffix: Option<Condition>,
) -> Result<Select<E>> {
    select = select.filter(compile_filters(fixed_filters, map)?);
    select = select.filter(compile_filters(&request.filters, map)?);

    if let Some(term) = request.fuzzy.as_deref() {
        if !term.is_empty() {
            select = select.filter(compile_fuzzy(term));
        }
    }

    if let Some(suffix) = suffix {
        select = select.filter(suffix);
    }

    let sort = compile_sorter(request.sorter.as_ref(), default_sorter, map)?;
    for (expr, direction) in sort.orderings {
        select = select.order_by(expr, direction);
    }

    Ok(select)
}

/// Apply offset/limit. A zero page index skips the offset; a non-positive
/// page size (-1 by convention) returns every matching row.
pub fn paginate<E: EntityTrait>(
    mut select: Select<E>,
    page_index: u64,
    page_size: i64,
) -> Select<E> {
    if page_index > 0 && page_size > 0 {
        select = select.offset(page_index * page_size as u64);
    }
    if page_size > 0 {
        select = select.limit(page_size as u64);
    }
    select
}

/// Count the full match, then fetch the requested page.
///
/// Returns `(rows, total_records)`; the count ignores offset/limit so the
/// page-sum invariant holds across the whole result set.
pub async fn fetch_page<C, E, R>(
    db: &C,
    select: Select<E>,
    page_index: u64,
    page_size: i64,
) -> Result<(Vec<R>, u64)>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Sized + Send + Sync + 'static,
    R: FromQueryResult + Send + Sync + 'static,
{
    let total_records = select.clone().count(db).await?;

    let rows = paginate(select, page_index, page_size)
        .into_model::<R>()
        .all(db)
        .await?;

    Ok((rows, total_records))
}

/// Build the unexecuted statement for a select, for bulk export paths that
/// stream the result instead of materializing typed rows
pub fn build_statement<E: EntityTrait>(select: Select<E>, backend: DbBackend) -> Statement {
    select.build(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{PostgresQueryBuilder, QueryStatementWriter};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    use crate::db::models::order;
    use crate::query::registry::QueryTable;
    use crate::query::{FilterOp, FilterValue, OrderViews};

    fn map() -> TableResolutionMap {
        TableResolutionMap::new(vec![QueryTable::ExtraInfo], QueryTable::Order)
    }

    fn request(page_index: u64, page_size: i64) -> OrderQueryRequest {
        OrderQueryRequest {
            page_index,
            page_size,
            filters: Vec::new(),
            sorter: None,
            fuzzy: None,
            views: OrderViews::default(),
        }
    }

    fn render<E: EntityTrait>(select: Select<E>) -> String {
        select.into_query().to_string(PostgresQueryBuilder)
    }

    #[test]
    fn test_offset_is_page_index_times_page_size() {
        let sql = render(paginate(order::Entity::find(), 2, 10));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn test_page_zero_has_no_offset() {
        let sql = render(paginate(order::Entity::find(), 0, 10));
        assert!(sql.contains("LIMIT 10"));
        assert!(!sql.contains("OFFSET"));
    }

    #[test]
    fn test_unbounded_page_size_has_no_limit() {
        let sql = render(paginate(order::Entity::find(), 0, -1));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("OFFSET"));

        // a nonzero page index with -1 must not produce a negative offset
        let sql = render(paginate(order::Entity::find(), 3, -1));
        assert!(!sql.contains("OFFSET"));
    }

    #[test]
    fn test_apply_query_composes_everything() {
        let req = OrderQueryRequest {
            filters: vec![FieldFilter {
                op: FilterOp::Like,
                col: "title".into(),
                val: FilterValue::Single("atlas".into()),
            }],
            fuzzy: Some("978".into()),
            ..request(0, 10)
        };
        let fixed = [FieldFilter {
            op: FilterOp::In,
            col: "tags".into(),
            val: FilterValue::Many(vec!["Rush".into(), "Local".into()]),
        }];
        let select = apply_query(
            order::Entity::find(),
            &req,
            &fixed,
            None,
            &map(),
            Some(crate::query::overdue::rush_local_overdue()),
        )
        .unwrap();
        let sql = render(select);

        assert!(sql.contains(r#""extra_info"."tags" LIKE '%[Rush]%'"#));
        assert!(sql.contains(r#""extra_info"."tags" LIKE '%[Local]%'"#));
        assert!(sql.contains(r#""nyc_orders"."title" LIKE '%atlas%'"#));
        assert!(sql.contains(r#""nyc_orders"."barcode" LIKE '%978%'"#));
        assert!(sql.contains("check_anyway"));
        // deterministic ordering even without an explicit sorter
        assert!(sql.contains(r#"ORDER BY "nyc_orders"."id" ASC"#));
    }

    #[test]
    fn test_empty_fuzzy_term_is_ignored() {
        let req = OrderQueryRequest {
            fuzzy: Some(String::new()),
            ..request(0, 10)
        };
        let select = apply_query(order::Entity::find(), &req, &[], None, &map(), None).unwrap();
        assert!(!render(select).contains("LIKE"));
    }

    #[tokio::test]
    async fn test_fetch_page_counts_before_paginating() {
        #[derive(Debug, FromQueryResult)]
        struct IdRow {
            id: i32,
        }

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([(
                "num_items",
                Value::BigInt(Some(23)),
            )])]])
            .append_query_results([vec![
                BTreeMap::from([("id", Value::Int(Some(21)))]),
                BTreeMap::from([("id", Value::Int(Some(22)))]),
                BTreeMap::from([("id", Value::Int(Some(23)))]),
            ]])
            .into_connection();

        let select = order::Entity::find()
            .select_only()
            .column(order::Column::Id);
        let (rows, total): (Vec<IdRow>, u64) = fetch_page(&db, select, 2, 10).await.unwrap();

        // the count covers the whole match, not the page
        assert_eq!(total, 23);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, 21);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        let count_sql = format!("{:?}", log[0]);
        let page_sql = format!("{:?}", log[1]);
        assert!(count_sql.contains("COUNT"));
        assert!(!count_sql.contains("LIMIT"));
        assert!(page_sql.contains("LIMIT"));
        assert!(page_sql.contains("OFFSET"));
    }
}
