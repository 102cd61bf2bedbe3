//! Ledger is the external row store holding the coupons and claims tables.
//!
//! Rows are positional: the first row of a table is a header and data rows
//! start at row 2. Writes address a row by that position. The layout of the
//! cells is only known to `rows`.
pub mod local;
pub mod remote;
pub mod rows;

pub use self::local::LocalLedger;
pub use self::remote::SheetLedger;

use serde_json::Value;

use repos::types::RepoFuture;

pub type Row = Vec<Value>;

/// Position of the header row
pub const HEADER_ROW: usize = 1;
/// Position of the first data row
pub const FIRST_DATA_ROW: usize = 2;

/// Condition on the stored row that must still hold when a write lands.
/// A write whose guard does not match fails with `Error::Conflict`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGuard {
    /// Zero-based column of the guarded cell
    pub column: usize,
    /// The guard holds when the cell equals any of these
    pub accepted: Vec<Value>,
}

impl CellGuard {
    pub fn new(column: usize, expected: Value) -> Self {
        Self {
            column,
            accepted: vec![expected],
        }
    }

    pub fn any_of(column: usize, accepted: Vec<Value>) -> Self {
        Self { column, accepted }
    }

    /// Compares loosely: cells are compared as trimmed lowercase text,
    /// since spreadsheet apis do not round trip value types.
    pub fn holds(&self, row: &Row) -> bool {
        let stored = row.get(self.column).map(rows::cell_text).unwrap_or_default().to_lowercase();
        self.accepted
            .iter()
            .any(|expected| rows::cell_text(expected).to_lowercase() == stored)
    }
}

/// Lays `row` over `stored`. Null cells of `row` keep the stored cell.
pub fn merge_row(stored: &Row, row: Row) -> Row {
    row.into_iter()
        .enumerate()
        .map(|(column, value)| match value {
            Value::Null => stored.get(column).cloned().unwrap_or(Value::Null),
            value => value,
        }).collect()
}

pub trait Ledger {
    /// Returns every row of the table, header first
    fn fetch_all(&self, table: &str) -> RepoFuture<Vec<Row>>;

    /// Appends one row to the table
    fn insert(&self, table: &str, row: Row) -> RepoFuture<()>;

    /// Appends rows to the table in order
    fn insert_rows(&self, table: &str, rows: Vec<Row>) -> RepoFuture<()>;

    /// Rewrites a single cell of an existing row
    fn update_status(&self, table: &str, row_index: usize, column: usize, value: Value, guard: Option<CellGuard>) -> RepoFuture<()>;

    /// Rewrites a whole existing row, see `merge_row` for null cells
    fn update_row(&self, table: &str, row_index: usize, row: Row, guard: Option<CellGuard>) -> RepoFuture<()>;
}
