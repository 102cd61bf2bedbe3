//! Ledger served by a spreadsheet web app.
//!
//! Reads are `GET {url}?sheet=..&action=fetch`, writes are urlencoded form
//! posts. Every answer is `{"success": .., "data": .., "error": ..}`.
use failure::{Error as FailureError, Fail};
use futures::{future, stream, Future, Stream};
use reqwest;
use serde_json::{self, Value};

use errors::Error;
use repos::ledger::rows::cell_text;
use repos::ledger::{merge_row, CellGuard, Ledger, Row, FIRST_DATA_ROW};
use repos::types::{RepoFuture, RepoResult};

#[derive(Clone)]
pub struct SheetLedger {
    url: String,
    http_client: reqwest::async::Client,
}

#[derive(Debug, Deserialize)]
struct SheetResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<Row>>,
    #[serde(default)]
    error: Option<String>,
}

impl SheetResponse {
    fn into_rows(self) -> RepoResult<Vec<Row>> {
        if self.success {
            Ok(self.data.unwrap_or_default())
        } else {
            let reason = self.error.unwrap_or_else(|| "no reason given".to_string());
            Err(format_err!("Ledger rejected request: {}", reason)
                .context(Error::CollaboratorUnavailable)
                .into())
        }
    }
}

type FormParams = Vec<(&'static str, String)>;

fn insert_params(table: &str, row: &Row) -> RepoResult<FormParams> {
    Ok(vec![
        ("sheetName", table.to_string()),
        ("action", "insert".to_string()),
        ("rowData", serde_json::to_string(row)?),
    ])
}

/// Columns are one-based on the wire
fn cell_params(table: &str, row_index: usize, column: usize, value: &Value) -> FormParams {
    vec![
        ("sheetName", table.to_string()),
        ("action", "markDeleted".to_string()),
        ("rowIndex", row_index.to_string()),
        ("columnIndex", (column + 1).to_string()),
        ("value", cell_text(value)),
    ]
}

fn row_params(table: &str, row_index: usize, row: &Row) -> RepoResult<FormParams> {
    Ok(vec![
        ("sheetName", table.to_string()),
        ("action", "update".to_string()),
        ("rowIndex", row_index.to_string()),
        ("rowData", serde_json::to_string(row)?),
    ])
}

fn unavailable<E: Fail>(e: E) -> FailureError {
    e.context(Error::CollaboratorUnavailable).into()
}

fn stored_row<'a>(rows: &'a [Row], table: &str, row_index: usize) -> RepoResult<&'a Row> {
    let row = if row_index >= FIRST_DATA_ROW {
        rows.get(row_index - 1)
    } else {
        None
    };
    row.ok_or_else(|| {
        format_err!("Row {} does not exist in table {}", row_index, table)
            .context(Error::NotFound)
            .into()
    })
}

/// Checks a guard against rows freshly read from the sheet.
fn verify_guard(rows: &[Row], table: &str, row_index: usize, guard: &CellGuard) -> RepoResult<()> {
    let row = stored_row(rows, table, row_index)?;
    if guard.holds(row) {
        Ok(())
    } else {
        Err(format_err!("Guard {:?} does not hold for row {} of {}", guard, row_index, table)
            .context(Error::Conflict)
            .into())
    }
}

/// Params of a row update laid over the stored row, guard checked first
fn merged_row_params(rows: &[Row], table: &str, row_index: usize, row: Row, guard: Option<&CellGuard>) -> RepoResult<FormParams> {
    if let Some(guard) = guard {
        verify_guard(rows, table, row_index, guard)?;
    }
    let stored = stored_row(rows, table, row_index)?;
    row_params(table, row_index, &merge_row(stored, row))
}

impl SheetLedger {
    pub fn new(url: String, http_client: reqwest::async::Client) -> Self {
        Self { url, http_client }
    }

    fn read_response(response: reqwest::async::Response) -> RepoFuture<Vec<Row>> {
        let mut response = response;
        let status = response.status();
        if !status.is_success() {
            return Box::new(future::err(
                format_err!("Ledger answered with status {}", status)
                    .context(Error::CollaboratorUnavailable)
                    .into(),
            ));
        }

        Box::new(
            response
                .json::<SheetResponse>()
                .map_err(|e| unavailable(e.context("Received an invalid JSON from ledger")))
                .and_then(SheetResponse::into_rows),
        )
    }

    fn post(&self, params: FormParams) -> RepoFuture<()> {
        Box::new(
            self.http_client
                .post(self.url.as_str())
                .form(&params)
                .send()
                .map_err(unavailable)
                .and_then(SheetLedger::read_response)
                .map(|_| ()),
        )
    }

    /// Without a guard the write is posted right away. With one the row is
    /// re-read first, which narrows but does not close the race with other
    /// writers of the same sheet.
    fn guarded_post(&self, table: &str, row_index: usize, guard: Option<CellGuard>, params: FormParams) -> RepoFuture<()> {
        match guard {
            None => self.post(params),
            Some(guard) => {
                let ledger = self.clone();
                let table = table.to_string();
                Box::new(
                    self.fetch_all(&table)
                        .and_then(move |rows| verify_guard(&rows, &table, row_index, &guard))
                        .and_then(move |_| ledger.post(params)),
                )
            }
        }
    }
}

impl Ledger for SheetLedger {
    fn fetch_all(&self, table: &str) -> RepoFuture<Vec<Row>> {
        debug!("Fetch all rows of sheet {}.", table);
        let table_name = table.to_string();
        Box::new(
            self.http_client
                .get(self.url.as_str())
                .query(&[("sheet", table), ("action", "fetch")])
                .send()
                .map_err(unavailable)
                .and_then(SheetLedger::read_response)
                .map_err(move |e| {
                    error!("Fetching sheet {} failed: {}", table_name, e);
                    e
                }),
        )
    }

    fn insert(&self, table: &str, row: Row) -> RepoFuture<()> {
        debug!("Insert row {:?} into sheet {}.", row, table);
        match insert_params(table, &row) {
            Ok(params) => self.post(params),
            Err(e) => Box::new(future::err(e)),
        }
    }

    /// The sheet api appends one row per request, so rows are posted one after another.
    fn insert_rows(&self, table: &str, rows: Vec<Row>) -> RepoFuture<()> {
        let ledger = self.clone();
        let table = table.to_string();
        Box::new(stream::iter_ok::<_, FailureError>(rows).for_each(move |row| ledger.insert(&table, row)))
    }

    fn update_status(&self, table: &str, row_index: usize, column: usize, value: Value, guard: Option<CellGuard>) -> RepoFuture<()> {
        debug!("Update cell {}:{} of sheet {} to {}.", row_index, column, table, value);
        let params = cell_params(table, row_index, column, &value);
        self.guarded_post(table, row_index, guard, params)
    }

    /// Always re-reads the sheet, the posted row is merged with the stored one.
    fn update_row(&self, table: &str, row_index: usize, row: Row, guard: Option<CellGuard>) -> RepoFuture<()> {
        debug!("Update row {} of sheet {} to {:?}.", row_index, table, row);
        let ledger = self.clone();
        let table = table.to_string();
        Box::new(
            self.fetch_all(&table)
                .and_then(move |rows| merged_row_params(&rows, &table, row_index, row, guard.as_ref()))
                .and_then(move |params| ledger.post(params)),
        )
    }
}
