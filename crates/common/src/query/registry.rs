//! Static column registry
//!
//! Resolves user-supplied column names to typed SeaORM columns. Each report
//! shape declares a [`TableResolutionMap`]: the joined tables it exposes, in
//! order, plus a default table for everything else. Resolution normalizes
//! the wire-side camelCase name, walks the listed tables, and rejects
//! unknown names at this boundary instead of letting them reach the engine.

use convert_case::{Case, Casing};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, ColumnType, IdenStatic, Iterable, Value};
use sea_orm::sea_query::Expr;

use crate::db::models::{cdl_order, extra_info, order, tracking_note, vendor};
use crate::errors::{AppError, Result};

/// Logical tables addressable from a query description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTable {
    Order,
    ExtraInfo,
    TrackingNote,
    CdlOrder,
    Vendor,
}

impl QueryTable {
    pub fn name(&self) -> &'static str {
        match self {
            QueryTable::Order => "Order",
            QueryTable::ExtraInfo => "ExtraInfo",
            QueryTable::TrackingNote => "TrackingNote",
            QueryTable::CdlOrder => "CDLOrder",
            QueryTable::Vendor => "Vendor",
        }
    }

    /// Look up a snake_case column name among this table's typed columns
    fn find_column(&self, snake: &str) -> Option<ResolvedColumn> {
        match self {
            QueryTable::Order => order::Column::iter()
                .find(|c| c.as_str() == snake)
                .map(ResolvedColumn::Order),
            QueryTable::ExtraInfo => extra_info::Column::iter()
                .find(|c| c.as_str() == snake)
                .map(ResolvedColumn::ExtraInfo),
            QueryTable::TrackingNote => tracking_note::Column::iter()
                .find(|c| c.as_str() == snake)
                .map(ResolvedColumn::TrackingNote),
            QueryTable::CdlOrder => cdl_order::Column::iter()
                .find(|c| c.as_str() == snake)
                .map(ResolvedColumn::CdlOrder),
            QueryTable::Vendor => vendor::Column::iter()
                .find(|c| c.as_str() == snake)
                .map(ResolvedColumn::Vendor),
        }
    }
}

/// A column resolved to its owning entity
#[derive(Debug, Clone, Copy)]
pub enum ResolvedColumn {
    Order(order::Column),
    ExtraInfo(extra_info::Column),
    TrackingNote(tracking_note::Column),
    CdlOrder(cdl_order::Column),
    Vendor(vendor::Column),
}

// SeaORM's generated `Column` enums derive neither `PartialEq` nor `Eq`, so
// `ResolvedColumn` cannot derive them. Each column's `as_str()` is its unique
// static identifier, so comparing within the same variant reproduces exactly
// what a derived `PartialEq` would yield.
impl PartialEq for ResolvedColumn {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ResolvedColumn::Order(a), ResolvedColumn::Order(b)) => a.as_str() == b.as_str(),
            (ResolvedColumn::ExtraInfo(a), ResolvedColumn::ExtraInfo(b)) => a.as_str() == b.as_str(),
            (ResolvedColumn::TrackingNote(a), ResolvedColumn::TrackingNote(b)) => {
                a.as_str() == b.as_str()
            }
            (ResolvedColumn::CdlOrder(a), ResolvedColumn::CdlOrder(b)) => a.as_str() == b.as_str(),
            (ResolvedColumn::Vendor(a), ResolvedColumn::Vendor(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for ResolvedColumn {}

impl ResolvedColumn {
    /// Table-qualified expression for this column
    pub fn expr(&self) -> SimpleExpr {
        match self {
            ResolvedColumn::Order(c) => Expr::col((order::Entity, *c)).into(),
            ResolvedColumn::ExtraInfo(c) => Expr::col((extra_info::Entity, *c)).into(),
            ResolvedColumn::TrackingNote(c) => Expr::col((tracking_note::Entity, *c)).into(),
            ResolvedColumn::CdlOrder(c) => Expr::col((cdl_order::Entity, *c)).into(),
            ResolvedColumn::Vendor(c) => Expr::col((vendor::Entity, *c)).into(),
        }
    }

    /// The canonical snake_case column name
    pub fn name(&self) -> &str {
        match self {
            ResolvedColumn::Order(c) => c.as_str(),
            ResolvedColumn::ExtraInfo(c) => c.as_str(),
            ResolvedColumn::TrackingNote(c) => c.as_str(),
            ResolvedColumn::CdlOrder(c) => c.as_str(),
            ResolvedColumn::Vendor(c) => c.as_str(),
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            ResolvedColumn::Order(c) => c.def().get_column_type().clone(),
            ResolvedColumn::ExtraInfo(c) => c.def().get_column_type().clone(),
            ResolvedColumn::TrackingNote(c) => c.def().get_column_type().clone(),
            ResolvedColumn::CdlOrder(c) => c.def().get_column_type().clone(),
            ResolvedColumn::Vendor(c) => c.def().get_column_type().clone(),
        }
    }

    /// Bind a raw filter value with the type the column expects, so date and
    /// numeric comparisons stay well-typed at the engine
    pub fn coerce(&self, raw: &str) -> Result<Value> {
        let parse_err = |what: &str| AppError::InvalidFilter {
            message: format!("'{}' is not a valid {} for column {}", raw, what, self.name()),
        };
        match self.column_type() {
            ColumnType::Date => {
                let d = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| parse_err("date"))?;
                Ok(d.into())
            }
            ColumnType::DateTime | ColumnType::Timestamp | ColumnType::TimestampWithTimeZone => {
                // accept a bare date as midnight
                let dt = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                    .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
                    .or_else(|_| {
                        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                            .map(|d| d.and_time(chrono::NaiveTime::MIN))
                    })
                    .map_err(|_| parse_err("datetime"))?;
                Ok(dt.into())
            }
            ColumnType::Integer | ColumnType::BigInteger | ColumnType::SmallInteger => {
                let n: i64 = raw.parse().map_err(|_| parse_err("integer"))?;
                Ok(n.into())
            }
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => {
                let n: f64 = raw.parse().map_err(|_| parse_err("number"))?;
                Ok(n.into())
            }
            ColumnType::Boolean => match raw {
                "true" | "1" => Ok(true.into()),
                "false" | "0" => Ok(false.into()),
                _ => Err(parse_err("boolean")),
            },
            _ => Ok(raw.into()),
        }
    }
}

/// Ordered table list + default table for one report shape.
///
/// When a column name exists in more than one listed table, the LAST listed
/// table wins; the default table is only consulted after the list.
#[derive(Debug, Clone)]
pub struct TableResolutionMap {
    tables: Vec<QueryTable>,
    default: QueryTable,
}

impl TableResolutionMap {
    pub fn new(tables: Vec<QueryTable>, default: QueryTable) -> Self {
        Self { tables, default }
    }

    /// Normalize a wire-side column name to the canonical snake_case form
    pub fn normalize(name: &str) -> String {
        name.to_case(Case::Snake)
    }

    /// Resolve an external column name; unknown names are a client error,
    /// never silently dropped
    pub fn resolve(&self, external: &str) -> Result<ResolvedColumn> {
        let snake = Self::normalize(external);
        let mut hit = None;
        for table in &self.tables {
            if let Some(col) = table.find_column(&snake) {
                hit = Some(col);
            }
        }
        if hit.is_none() {
            hit = self.default.find_column(&snake);
        }
        hit.ok_or_else(|| AppError::UnknownColumn {
            name: external.to_string(),
        })
    }
}
