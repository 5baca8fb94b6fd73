//! Dynamic query compilation
//!
//! Takes a user-supplied query description (field filters, sort column,
//! fuzzy search, pagination, view selection) and compiles it into a
//! concrete, correct, paginated database query across the joined order
//! entities. Five report shapes share this machinery; see `crate::reports`.
//!
//! The pieces:
//! - [`registry`] resolves external column names to typed columns through a
//!   static per-report table map
//! - [`compiler`] turns filters, fuzzy terms, and sorters into SeaORM
//!   condition trees and orderings
//! - [`overdue`] builds the fixed date-arithmetic business predicates that
//!   the generic filter vocabulary cannot express
//! - [`executor`] applies everything, counts before paginating, and fetches
//!   the page

pub mod compiler;
pub mod executor;
pub mod overdue;
pub mod registry;

pub use compiler::{compile_filters, compile_fuzzy, compile_sorter, CompiledSort, FUZZY_COLUMNS};
pub use executor::{apply_query, build_statement, fetch_page};
pub use registry::{QueryTable, ResolvedColumn, TableResolutionMap};

use serde::{Deserialize, Serialize};

/// Filter operators accepted in the user request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// Membership test. `tags` decomposes into bracketed-token tests instead
    In,
    /// SQL LIKE, matched both ends; null value degrades to IS NULL
    Like,
    /// Inclusive range, two-element value
    Between,
}

/// Filter value: a list, a single scalar, or null
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FilterValue {
    Many(Vec<String>),
    Single(String),
    #[default]
    Null,
}

/// Filter on a column
///
/// `col` uses the wire-side camelCase name; resolution normalizes it and
/// maps it onto whichever joined table owns the column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub op: FilterOp,
    pub col: String,
    #[serde(default)]
    pub val: FilterValue,
}

/// Sort on a column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortCol {
    pub col: String,
    /// true - descending, false - ascending
    pub desc: bool,
}

/// View flags on the order table
///
/// At most one view is expected; when several are set the dispatch
/// precedence in `crate::reports::ReportKind::from_views` applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderViews {
    /// View CDL orders only
    pub cdl_view: bool,
    /// Rush Local orders that need to be checked
    pub pending_rush_local: bool,
    /// CDL orders that need to be checked
    pub pending_cdl: bool,
    /// Reserved; not implemented yet
    pub prioritize: bool,
}

/// Query request for orders
///
/// The result is the record set that fulfills filters AND sorter AND fuzzy
/// search, under the selected view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderQueryRequest {
    /// Zero-based page number
    pub page_index: u64,
    /// Rows per page; -1 returns every matching row
    pub page_size: i64,
    pub filters: Vec<FieldFilter>,
    pub sorter: Option<SortCol>,
    pub fuzzy: Option<String>,
    pub views: OrderViews,
}

impl Default for OrderQueryRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: 10,
            filters: Vec::new(),
            sorter: None,
            fuzzy: None,
            views: OrderViews::default(),
        }
    }
}

/// Pagination result envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub page_index: u64,
    pub page_limit: i64,
    pub total_records: u64,
    pub result: Vec<T>,
}
