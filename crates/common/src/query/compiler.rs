//! Filter/sort/fuzzy compiler
//!
//! Turns the abstract query description into SeaORM condition trees and
//! orderings. Filters are commutative ANDs; the tags IN decomposition and
//! the fuzzy search each group their own sub-predicates before joining the
//! whole. Ordering always ends with the fixed tie-break key so rows with
//! equal sort values cannot drift between pages.

use sea_orm::sea_query::{ExprTrait, SimpleExpr};
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, Order, Value};

use crate::db::models::order;
use crate::errors::{AppError, Result};
use crate::query::registry::{ResolvedColumn, TableResolutionMap};
use crate::query::{FieldFilter, FilterOp, FilterValue, SortCol};

/// Columns searched by the fuzzy term, OR-combined
pub const FUZZY_COLUMNS: [order::Column; 5] = [
    order::Column::Barcode,
    order::Column::Bsn,
    order::Column::LibraryNote,
    order::Column::Title,
    order::Column::OrderNumber,
];

/// Compile a filter list into one AND-ed condition
pub fn compile_filters(filters: &[FieldFilter], map: &TableResolutionMap) -> Result<Condition> {
    let mut cond = Condition::all();
    for filter in filters {
        cond = cond.add(compile_filter(filter, map)?);
    }
    Ok(cond)
}

fn compile_filter(filter: &FieldFilter, map: &TableResolutionMap) -> Result<Condition> {
    let col = map.resolve(&filter.col)?;
    match filter.op {
        FilterOp::In => compile_in(filter, col),
        FilterOp::Like => compile_like(filter, col),
        FilterOp::Between => compile_between(filter, col),
    }
}

fn compile_in(filter: &FieldFilter, col: ResolvedColumn) -> Result<Condition> {
    let values = match &filter.val {
        FilterValue::Many(values) => values,
        _ => {
            return Err(AppError::InvalidFilter {
                message: format!("IN filter on {} requires a list value", filter.col),
            })
        }
    };

    // tags is not a scalar column: membership means "holds the bracketed
    // token", and listing several tags means the row holds ALL of them
    if col.name() == "tags" {
        let mut cond = Condition::all();
        for tag in values {
            cond = cond.add(col.expr().like(format!("%[{}]%", tag)));
        }
        return Ok(cond);
    }

    if values.is_empty() {
        // empty membership list matches nothing
        return Ok(Condition::all().add(Expr::cust("FALSE")));
    }

    let coerced: Vec<Value> = values
        .iter()
        .map(|v| col.coerce(v))
        .collect::<Result<_>>()?;
    Ok(Condition::all().add(col.expr().is_in(coerced)))
}

fn compile_like(filter: &FieldFilter, col: ResolvedColumn) -> Result<Condition> {
    match &filter.val {
        // a null pattern degrades to an IS NULL test
        FilterValue::Null => Ok(Condition::all().add(col.expr().is_null())),
        FilterValue::Single(value) => {
            Ok(Condition::all().add(col.expr().like(format!("%{}%", value))))
        }
        FilterValue::Many(_) => Err(AppError::InvalidFilter {
            message: format!("LIKE filter on {} takes a single value", filter.col),
        }),
    }
}

fn compile_between(filter: &FieldFilter, col: ResolvedColumn) -> Result<Condition> {
    match &filter.val {
        FilterValue::Many(range) if range.len() == 2 => {
            let low = col.coerce(&range[0])?;
            let high = col.coerce(&range[1])?;
            Ok(Condition::all().add(col.expr().between(low, high)))
        }
        _ => Err(AppError::InvalidFilter {
            message: format!("BETWEEN filter on {} requires a two-element range", filter.col),
        }),
    }
}

/// Compile the fuzzy term: one substring LIKE per fuzzy column, OR-combined
pub fn compile_fuzzy(term: &str) -> Condition {
    let mut cond = Condition::any();
    for column in FUZZY_COLUMNS {
        cond = cond.add(Expr::col((order::Entity, column)).like(format!("%{}%", term)));
    }
    cond
}

/// Orderings to apply, primary sort first
#[derive(Debug, Clone)]
pub struct CompiledSort {
    pub orderings: Vec<(SimpleExpr, Order)>,
}

/// Fixed tie-break key: the primary entity's id. Appended after the chosen
/// sort in the same direction; on its own when no sort was chosen, so
/// pagination stays deterministic either way.
fn tie_break() -> SimpleExpr {
    Expr::col((order::Entity, order::Column::Id)).into()
}

/// Compile the user sorter (falling back to the report's default sorter)
/// plus the fixed tie-break key
pub fn compile_sorter(
    sorter: Option<&SortCol>,
    default_sorter: Option<&SortCol>,
    map: &TableResolutionMap,
) -> Result<CompiledSort> {
    let chosen = sorter.or(default_sorter);
    let orderings = match chosen {
        Some(sort) => {
            let col = map.resolve(&sort.col).map_err(|e| match e {
                AppError::UnknownColumn { name } => AppError::InvalidSorter {
                    message: format!("unknown sort column: {}", name),
                },
                other => other,
            })?;
            let direction = if sort.desc { Order::Desc } else { Order::Asc };
            vec![(col.expr(), direction.clone()), (tie_break(), direction)]
        }
        None => vec![(tie_break(), Order::Asc)],
    };
    Ok(CompiledSort { orderings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{PostgresQueryBuilder, QueryStatementWriter};
    use sea_orm::{EntityTrait, QueryFilter, QueryTrait};

    use crate::query::registry::QueryTable;

    fn map() -> TableResolutionMap {
        TableResolutionMap::new(
            vec![QueryTable::ExtraInfo, QueryTable::TrackingNote],
            QueryTable::Order,
        )
    }

    fn filter(op: FilterOp, col: &str, val: FilterValue) -> FieldFilter {
        FieldFilter {
            op,
            col: col.to_string(),
            val,
        }
    }

    fn render(cond: Condition) -> String {
        order::Entity::find()
            .filter(cond)
            .into_query()
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn test_tags_in_requires_all_listed_tags() {
        let cond = compile_filters(
            &[filter(
                FilterOp::In,
                "tags",
                FilterValue::Many(vec!["Rush".into(), "Local".into()]),
            )],
            &map(),
        )
        .unwrap();
        let sql = render(cond);
        assert!(sql.contains(r#""extra_info"."tags" LIKE '%[Rush]%'"#));
        assert!(sql.contains(r#""extra_info"."tags" LIKE '%[Local]%'"#));
        assert!(sql.contains("AND"));
        assert!(!sql.contains("OR"));
    }

    #[test]
    fn test_in_on_scalar_column() {
        let cond = compile_filters(
            &[filter(
                FilterOp::In,
                "orderStatus",
                FilterValue::Many(vec!["VC".into(), "NW".into()]),
            )],
            &map(),
        )
        .unwrap();
        let sql = render(cond);
        assert!(sql.contains(r#""nyc_orders"."order_status" IN ('VC', 'NW')"#));
    }

    #[test]
    fn test_like_null_degrades_to_is_null() {
        let cond = compile_filters(
            &[filter(FilterOp::Like, "arrivalDate", FilterValue::Null)],
            &map(),
        )
        .unwrap();
        let sql = render(cond);
        assert!(sql.contains(r#""nyc_orders"."arrival_date" IS NULL"#));
    }

    #[test]
    fn test_like_substring_matches_both_ends() {
        let cond = compile_filters(
            &[filter(
                FilterOp::Like,
                "title",
                FilterValue::Single("history".into()),
            )],
            &map(),
        )
        .unwrap();
        assert!(render(cond).contains(r#""nyc_orders"."title" LIKE '%history%'"#));
    }

    #[test]
    fn test_between_is_inclusive_range() {
        let cond = compile_filters(
            &[filter(
                FilterOp::Between,
                "createdDate",
                FilterValue::Many(vec!["2023-01-01".into(), "2023-12-31".into()]),
            )],
            &map(),
        )
        .unwrap();
        let sql = render(cond);
        assert!(sql.contains(r#""nyc_orders"."created_date" BETWEEN '2023-01-01' AND '2023-12-31'"#));
    }

    #[test]
    fn test_between_wrong_arity_rejected() {
        let err = compile_filters(
            &[filter(
                FilterOp::Between,
                "createdDate",
                FilterValue::Many(vec!["2023-01-01".into()]),
            )],
            &map(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidFilter { .. }));
    }

    #[test]
    fn test_unknown_column_surfaces() {
        let err = compile_filters(
            &[filter(FilterOp::Like, "noSuchColumn", FilterValue::Null)],
            &map(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::UnknownColumn { .. }));
    }

    #[test]
    fn test_filters_commute() {
        let a = filter(FilterOp::Like, "title", FilterValue::Single("x".into()));
        let b = filter(FilterOp::Like, "barcode", FilterValue::Single("9".into()));

        let fragments = |sql: String| -> Vec<String> {
            let where_clause = sql.split(" WHERE ").nth(1).unwrap().to_string();
            let mut parts: Vec<String> =
                where_clause.split(" AND ").map(str::to_string).collect();
            parts.sort();
            parts
        };

        let ab = fragments(render(
            compile_filters(&[a.clone(), b.clone()], &map()).unwrap(),
        ));
        let ba = fragments(render(compile_filters(&[b, a], &map()).unwrap()));
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_fuzzy_ors_over_the_fixed_columns() {
        let sql = render(compile_fuzzy("9780"));
        for col in ["barcode", "bsn", "library_note", "title", "order_number"] {
            assert!(
                sql.contains(&format!(r#""nyc_orders"."{}" LIKE '%9780%'"#, col)),
                "missing fuzzy column {}: {}",
                col,
                sql
            );
        }
        assert_eq!(sql.matches(" OR ").count(), 4);
    }

    #[test]
    fn test_sorter_appends_tie_break_same_direction() {
        let sort = SortCol {
            col: "createdDate".into(),
            desc: true,
        };
        let compiled = compile_sorter(Some(&sort), None, &map()).unwrap();
        assert_eq!(compiled.orderings.len(), 2);
        assert!(matches!(compiled.orderings[0].1, Order::Desc));
        assert!(matches!(compiled.orderings[1].1, Order::Desc));
    }

    #[test]
    fn test_no_sorter_still_orders_by_id() {
        let compiled = compile_sorter(None, None, &map()).unwrap();
        assert_eq!(compiled.orderings.len(), 1);
        assert!(matches!(compiled.orderings[0].1, Order::Asc));
    }

    #[test]
    fn test_default_sorter_used_when_request_has_none() {
        let default = SortCol {
            col: "createdDate".into(),
            desc: true,
        };
        let compiled = compile_sorter(None, Some(&default), &map()).unwrap();
        assert_eq!(compiled.orderings.len(), 2);
        assert!(matches!(compiled.orderings[0].1, Order::Desc));

        // explicit sorter wins over the default
        let explicit = SortCol {
            col: "title".into(),
            desc: false,
        };
        let compiled = compile_sorter(Some(&explicit), Some(&default), &map()).unwrap();
        assert!(matches!(compiled.orderings[0].1, Order::Asc));
    }
}
