//! DataTables server-side protocol support
//!
//! The admin UI's grid widget sends its state as flat query parameters
//! (`draw`, `start`, `length`, `search[value]`, `order[0][column]`, ...) and
//! expects the `{draw, recordsTotal, recordsFiltered, data}` envelope back.
//! This module holds the protocol types, the per-column capability registry,
//! and the predicate descriptors a repository folds into SQL. Everything here
//! is pure and store-free so the filter pipeline can be tested without a
//! database.

use serde::{Deserialize, Serialize};

/// Grid request parameters, flat-keyed exactly as the widget sends them.
///
/// `category_id` is the admin page's dropdown filter, carried alongside the
/// standard DataTables parameters. Unknown parameters (the `columns[...]`
/// blocks the widget also sends) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRequest {
    /// Opaque request-sequence token, echoed back verbatim.
    pub draw: Option<String>,
    /// Row offset of the requested page.
    pub start: Option<i64>,
    /// Page size; `-1` (or any non-positive value) means "all rows".
    pub length: Option<i64>,
    /// Free-text search box contents.
    #[serde(rename = "search[value]")]
    pub search_value: Option<String>,
    /// Index into the column registry of the requested sort column.
    #[serde(rename = "order[0][column]")]
    pub order_column: Option<usize>,
    /// Requested sort direction, "asc" or "desc".
    #[serde(rename = "order[0][dir]")]
    pub order_dir: Option<String>,
    /// Category dropdown filter; empty string means no restriction.
    pub category_id: Option<String>,
}

impl TableRequest {
    pub fn draw(&self) -> &str {
        self.draw.as_deref().unwrap_or("0")
    }

    pub fn offset(&self) -> i64 {
        self.start.unwrap_or(0).max(0)
    }

    /// Requested page size, or `None` when pagination is disabled
    /// (absent, zero, or the widget's `-1` "All" sentinel).
    pub fn page_length(&self) -> Option<i64> {
        match self.length {
            Some(n) if n > 0 => Some(n),
            _ => None,
        }
    }

    /// Search term, with absent and empty both meaning "no restriction".
    pub fn search_term(&self) -> Option<&str> {
        self.search_value.as_deref().filter(|s| !s.is_empty())
    }

    /// Category filter value, with absent and empty both meaning
    /// "no restriction". Kept as the raw string: a malformed value is bound
    /// verbatim and simply matches nothing.
    pub fn category_filter(&self) -> Option<&str> {
        self.category_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// One column of a grid, declaring what the endpoint lets it do.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    /// SQL expression selecting the column; `None` for synthetic columns
    /// that exist only in the response (e.g. `actions`).
    pub expr: Option<&'static str>,
    /// Expression used for ORDER BY when it differs from `expr`
    /// (e.g. text-stored price ordered numerically).
    pub order_expr: Option<&'static str>,
    pub orderable: bool,
    pub searchable: bool,
}

/// SQL expressions of every searchable column, in registry order.
pub fn searchable_exprs(columns: &[Column]) -> Vec<&'static str> {
    columns
        .iter()
        .filter(|c| c.searchable)
        .filter_map(|c| c.expr)
        .collect()
}

/// Build the ORDER BY clause for a request.
///
/// Only orderable registry columns are honored; anything else (out-of-range
/// index, non-orderable column, no order at all) falls back to the tie-breaker
/// alone, which is also always appended so offset pagination stays stable for
/// non-unique sort keys.
pub fn order_clause(columns: &[Column], req: &TableRequest, tie_breaker: &str) -> String {
    let requested = req
        .order_column
        .and_then(|idx| columns.get(idx))
        .filter(|c| c.orderable)
        .and_then(|c| c.order_expr.or(c.expr));

    match requested {
        Some(expr) => {
            let dir = match req.order_dir.as_deref() {
                Some("desc") => "DESC",
                _ => "ASC",
            };
            format!("ORDER BY {expr} {dir}, {tie_breaker}")
        }
        None => format!("ORDER BY {tie_breaker}"),
    }
}

/// A filter predicate, as an explicit descriptor rather than ad-hoc SQL.
///
/// Predicates in a list compose with AND; the substring variant composes its
/// columns with OR internally.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`. The value is bound as text; the database's column
    /// affinity decides whether it can ever match.
    Equality {
        column: &'static str,
        value: String,
    },
    /// Case-insensitive substring match against any of the columns.
    SubstringAny {
        columns: Vec<&'static str>,
        term: String,
    },
}

/// A WHERE clause with its positional bind values, ready to append to a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    /// `"WHERE ..."`, or empty when there are no predicates.
    pub where_clause: String,
    /// Bind values in placeholder order.
    pub binds: Vec<String>,
}

/// Fold predicates into a WHERE clause with `?` placeholders.
///
/// Substring matching relies on SQLite's ASCII-case-insensitive LIKE;
/// `%`/`_` in the term are deliberately not escaped (parity with the
/// original grid's behavior).
pub fn compile_predicates(predicates: &[Predicate]) -> CompiledFilter {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    for predicate in predicates {
        match predicate {
            Predicate::Equality { column, value } => {
                conditions.push(format!("{column} = ?"));
                binds.push(value.clone());
            }
            Predicate::SubstringAny { columns, term } => {
                let checks: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{c} LIKE '%' || ? || '%'"))
                    .collect();
                binds.extend(columns.iter().map(|_| term.clone()));
                conditions.push(format!("({})", checks.join(" OR ")));
            }
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    CompiledFilter {
        where_clause,
        binds,
    }
}

/// Response envelope the grid widget consumes.
#[derive(Debug, Clone, Serialize)]
pub struct TableResponse<T> {
    /// The request's `draw` token, echoed so the client can discard stale
    /// out-of-order responses.
    pub draw: String,
    /// Row count ignoring all filters.
    #[serde(rename = "recordsTotal")]
    pub records_total: i64,
    /// Row count after filters, before paging.
    #[serde(rename = "recordsFiltered")]
    pub records_filtered: i64,
    pub data: Vec<T>,
}

/// Row-scoped operation kinds the UI renders as controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowOp {
    Show,
    Edit,
    Delete,
}

/// One row-scoped operation descriptor. Markup is the UI's concern; the
/// endpoint only names the operation and the row it applies to.
#[derive(Debug, Clone, Serialize)]
pub struct RowAction {
    pub op: RowOp,
    pub id: i64,
}

/// The standard show/edit/delete action set for a row.
pub fn row_actions(id: i64) -> Vec<RowAction> {
    vec![
        RowAction { op: RowOp::Show, id },
        RowAction { op: RowOp::Edit, id },
        RowAction { op: RowOp::Delete, id },
    ]
}
