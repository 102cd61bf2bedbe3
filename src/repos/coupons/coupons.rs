//! Coupons repo, typed access to the coupons table of the ledger
use std::collections::HashSet;
use std::sync::Arc;

use chrono::FixedOffset;
use futures::Future;
use rust_decimal::Decimal;
use serde_json::Value;

use models::*;
use repos::ledger::rows::{self, COUPON_STATUS};
use repos::ledger::{CellGuard, Ledger};
use repos::types::RepoFuture;

pub trait CouponsRepo {
    /// Returns all coupons in ledger order, deleted ones included
    fn list(&self) -> RepoFuture<Vec<Coupon>>;

    /// Finds a coupon by its normalized code. A live row wins over a
    /// deleted row carrying the same code.
    fn find_by_code(&self, code: CouponCode) -> RepoFuture<Option<Coupon>>;

    /// Codes of every row of the table, whatever their status
    fn existing_codes(&self) -> RepoFuture<HashSet<String>>;

    /// Appends new coupons, one row each, in order
    fn create(&self, coupons: Vec<Coupon>) -> RepoFuture<Vec<Coupon>>;

    /// Writes the status of `updated` into its row, provided the stored
    /// status is still `expected`
    fn set_status(&self, updated: Coupon, expected: CouponStatus) -> RepoFuture<Coupon>;

    /// Rewrites the row of `updated`, provided the stored status is still `expected`
    fn update(&self, updated: Coupon, expected: CouponStatus) -> RepoFuture<Coupon>;
}

/// Coupons repository over any ledger
pub struct CouponsRepoImpl {
    ledger: Arc<Ledger>,
    table: String,
    default_reward: Decimal,
    /// Offset the date of timestamped created cells is taken in
    utc_offset: FixedOffset,
}

impl CouponsRepoImpl {
    pub fn new(ledger: Arc<Ledger>, table: String, default_reward: Decimal, utc_offset: FixedOffset) -> Self {
        Self {
            ledger,
            table,
            default_reward,
            utc_offset,
        }
    }
}

/// Blank status cells read as `unused`, so a guard on `unused` accepts them too.
fn status_guard(status: CouponStatus) -> CellGuard {
    let current = Value::String(status.as_str().to_string());
    match status {
        CouponStatus::Unused => CellGuard::any_of(COUPON_STATUS, vec![current, Value::String(String::new())]),
        _ => CellGuard::new(COUPON_STATUS, current),
    }
}

impl CouponsRepo for CouponsRepoImpl {
    fn list(&self) -> RepoFuture<Vec<Coupon>> {
        debug!("List all coupons of {}.", self.table);
        let default_reward = self.default_reward;
        let utc_offset = self.utc_offset;
        Box::new(
            self.ledger
                .fetch_all(&self.table)
                .map(move |rows| rows::decode_coupons(&rows, default_reward, utc_offset))
                .map_err(|e| e.context("List all coupons").into()),
        )
    }

    fn find_by_code(&self, code: CouponCode) -> RepoFuture<Option<Coupon>> {
        debug!("Find coupon by code {}.", code);
        Box::new(self.list().map(move |coupons| {
            let (live, deleted): (Vec<Coupon>, Vec<Coupon>) = coupons
                .into_iter()
                .filter(|coupon| coupon.code == code)
                .partition(|coupon| coupon.status != CouponStatus::Deleted);
            live.into_iter().next().or_else(|| deleted.into_iter().next())
        }))
    }

    fn existing_codes(&self) -> RepoFuture<HashSet<String>> {
        Box::new(
            self.ledger
                .fetch_all(&self.table)
                .map(|rows| rows::existing_codes(&rows))
                .map_err(|e| e.context("Read existing coupon codes").into()),
        )
    }

    fn create(&self, coupons: Vec<Coupon>) -> RepoFuture<Vec<Coupon>> {
        debug!("Create {} new coupons.", coupons.len());
        let rows = coupons.iter().map(rows::encode_coupon).collect();
        Box::new(
            self.ledger
                .insert_rows(&self.table, rows)
                .map(move |_| coupons)
                .map_err(|e| e.context("Create new coupons").into()),
        )
    }

    fn set_status(&self, updated: Coupon, expected: CouponStatus) -> RepoFuture<Coupon> {
        debug!("Set status of coupon {} from {} to {}.", updated.code, expected, updated.status);
        let status = Value::String(updated.status.as_str().to_string());
        let code = updated.code.clone();
        Box::new(
            self.ledger
                .update_status(&self.table, updated.row_index, COUPON_STATUS, status, Some(status_guard(expected)))
                .map(move |_| updated)
                .map_err(move |e| e.context(format!("Set status of coupon {}", code)).into()),
        )
    }

    fn update(&self, updated: Coupon, expected: CouponStatus) -> RepoFuture<Coupon> {
        debug!("Update coupon {} to {:?}.", updated.code, updated);
        let row = rows::encode_coupon(&updated);
        let code = updated.code.clone();
        Box::new(
            self.ledger
                .update_row(&self.table, updated.row_index, row, Some(status_guard(expected)))
                .map(move |_| updated)
                .map_err(move |e| e.context(format!("Update coupon {}", code)).into()),
        )
    }
}
