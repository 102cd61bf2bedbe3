//! Ledger kept in process memory, optionally mirrored to a JSON file.
//! Conditional writes are checked and applied under one lock.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use failure::{Error as FailureError, Fail};
use futures::future;
use futures_cpupool::CpuPool;
use serde_json::{self, Value};

use errors::Error;
use repos::ledger::{merge_row, CellGuard, Ledger, Row, FIRST_DATA_ROW};
use repos::types::{RepoFuture, RepoResult};

type Tables = HashMap<String, Vec<Row>>;

#[derive(Clone)]
pub struct LocalLedger {
    tables: Arc<Mutex<Tables>>,
    headers: Arc<HashMap<String, Row>>,
    path: Option<PathBuf>,
    cpu_pool: CpuPool,
}

impl LocalLedger {
    /// Ledger living only in memory
    pub fn in_memory(cpu_pool: CpuPool) -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            headers: Arc::new(HashMap::new()),
            path: None,
            cpu_pool,
        }
    }

    /// Ledger loaded from `path` if it exists and written back after every
    /// change. A batch of rows is one change.
    pub fn with_file<P: AsRef<Path>>(path: P, cpu_pool: CpuPool) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| e.context(format!("Can not read local ledger {:?}", path)))?;
            serde_json::from_str::<Tables>(&content).map_err(|e| e.context(format!("Can not parse local ledger {:?}", path)))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            headers: Arc::new(HashMap::new()),
            path: Some(path),
            cpu_pool,
        })
    }

    /// Header row written when a table is first created
    pub fn with_header(mut self, table: &str, header: Row) -> Self {
        let mut headers = (*self.headers).clone();
        headers.insert(table.to_string(), header);
        self.headers = Arc::new(headers);
        self
    }

    fn spawn<T, F>(&self, f: F) -> RepoFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> RepoResult<T> + Send + 'static,
    {
        let tables = self.tables.clone();
        let path = self.path.clone();
        Box::new(self.cpu_pool.spawn_fn(move || -> RepoResult<T> {
            let mut tables = tables.lock().map_err(|_| format_err!("Local ledger lock is poisoned"))?;
            let result = f(&mut *tables)?;
            if let Some(path) = path {
                persist(&path, &*tables)?;
            }
            Ok(result)
        }))
    }

    fn table_or_header<'a>(tables: &'a mut Tables, headers: &HashMap<String, Row>, table: &str) -> &'a mut Vec<Row> {
        tables
            .entry(table.to_string())
            .or_insert_with(|| vec![headers.get(table).cloned().unwrap_or_default()])
    }
}

fn persist(path: &Path, tables: &Tables) -> RepoResult<()> {
    let content = serde_json::to_string_pretty(tables)?;
    fs::write(path, content).map_err(|e| e.context(format!("Can not write local ledger {:?}", path)).into())
}

fn row_mut<'a>(tables: &'a mut Tables, table: &str, row_index: usize) -> RepoResult<&'a mut Row> {
    if row_index < FIRST_DATA_ROW {
        return Err(format_err!("Row {} of table {} is not a data row", row_index, table)
            .context(Error::NotFound)
            .into());
    }

    tables
        .get_mut(table)
        .and_then(|rows| rows.get_mut(row_index - 1))
        .ok_or_else(|| format_err!("Row {} does not exist in table {}", row_index, table).context(Error::NotFound).into())
}

fn check_guard(row: &Row, guard: &Option<CellGuard>) -> RepoResult<()> {
    match *guard {
        Some(ref guard) if !guard.holds(row) => Err(format_err!("Guard {:?} does not hold for row {:?}", guard, row)
            .context(Error::Conflict)
            .into()),
        _ => Ok(()),
    }
}

impl Ledger for LocalLedger {
    fn fetch_all(&self, table: &str) -> RepoFuture<Vec<Row>> {
        debug!("Fetch all rows of local table {}.", table);
        let tables = self.tables.clone();
        let table = table.to_string();
        Box::new(future::lazy(move || {
            let tables = tables.lock().map_err(|_| format_err!("Local ledger lock is poisoned"))?;
            Ok::<_, FailureError>(tables.get(&table).cloned().unwrap_or_default())
        }))
    }

    fn insert(&self, table: &str, row: Row) -> RepoFuture<()> {
        debug!("Insert row {:?} into local table {}.", row, table);
        let headers = self.headers.clone();
        let table = table.to_string();
        self.spawn(move |tables| {
            LocalLedger::table_or_header(tables, &headers, &table).push(row);
            Ok(())
        })
    }

    fn insert_rows(&self, table: &str, rows: Vec<Row>) -> RepoFuture<()> {
        debug!("Insert {} rows into local table {}.", rows.len(), table);
        let headers = self.headers.clone();
        let table = table.to_string();
        self.spawn(move |tables| {
            LocalLedger::table_or_header(tables, &headers, &table).extend(rows);
            Ok(())
        })
    }

    fn update_status(&self, table: &str, row_index: usize, column: usize, value: Value, guard: Option<CellGuard>) -> RepoFuture<()> {
        debug!("Update cell {}:{} of local table {} to {}.", row_index, column, table, value);
        let table = table.to_string();
        self.spawn(move |tables| {
            let row = row_mut(tables, &table, row_index)?;
            check_guard(row, &guard)?;
            if row.len() <= column {
                row.resize(column + 1, Value::Null);
            }
            row[column] = value;
            Ok(())
        })
    }

    fn update_row(&self, table: &str, row_index: usize, row: Row, guard: Option<CellGuard>) -> RepoFuture<()> {
        debug!("Update row {} of local table {} to {:?}.", row_index, table, row);
        let table = table.to_string();
        self.spawn(move |tables| {
            let stored = row_mut(tables, &table, row_index)?;
            check_guard(stored, &guard)?;
            *stored = merge_row(stored, row);
            Ok(())
        })
    }
}
