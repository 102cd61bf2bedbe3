//! Mapping between positional ledger rows and named records.
//!
//! Coupons: `[created, code, status, reward, claimedBy, claimedAt]`
//! Claims: `[timestamp, serial, code, name, phone, email]`
use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use failure::{Error as FailureError, Fail};
use rust_decimal::Decimal;
use serde_json::Value;

use models::*;
use repos::ledger::{Row, FIRST_DATA_ROW};
use repos::types::RepoResult;

pub const COUPON_CREATED: usize = 0;
pub const COUPON_CODE: usize = 1;
pub const COUPON_STATUS: usize = 2;
pub const COUPON_REWARD: usize = 3;
pub const COUPON_CLAIMED_BY: usize = 4;
pub const COUPON_CLAIMED_AT: usize = 5;

pub const CLAIM_TIMESTAMP: usize = 0;
pub const CLAIM_SERIAL: usize = 1;
pub const CLAIM_CODE: usize = 2;
pub const CLAIM_NAME: usize = 3;
pub const CLAIM_PHONE: usize = 4;
pub const CLAIM_EMAIL: usize = 5;

/// Header titles of a freshly created coupons table
pub const COUPONS_HEADER: [&str; 6] = ["Created", "Code", "Status", "Reward", "Claimed By", "Claimed At"];
/// Header titles of a freshly created claims table
pub const CLAIMS_HEADER: [&str; 6] = ["Timestamp", "Serial", "Code", "Name", "Phone", "Email"];

pub fn header_row(titles: &[&str]) -> Row {
    titles.iter().map(|title| Value::from(*title)).collect()
}

const CREATED_FORMAT: &str = "%Y-%m-%d";
/// Date forms a created cell may take once edited by hand in a sheet, US order first
const CREATED_FORMATS: [&str; 3] = [CREATED_FORMAT, "%m/%d/%Y", "%d.%m.%Y"];

/// Renders a cell as trimmed text, blank for null or missing cells
pub fn cell_text(value: &Value) -> String {
    match *value {
        Value::Null => String::new(),
        Value::String(ref s) => s.trim().to_string(),
        ref other => other.to_string(),
    }
}

fn cell(row: &Row, column: usize) -> String {
    row.get(column).map(cell_text).unwrap_or_default()
}

fn optional_cell(row: &Row, column: usize) -> Option<String> {
    Some(cell(row, column)).filter(|text| !text.is_empty())
}

/// Integral amounts are written as integers, like the admin sheet does.
pub fn decimal_cell(value: &Decimal) -> Value {
    let text = value.to_string();
    text.parse::<i64>()
        .map(Value::from)
        .or_else(|_| text.parse::<f64>().map(Value::from))
        .unwrap_or_else(|_| Value::String(text))
}

/// Spreadsheet apis serialize date cells as UTC timestamps of local midnight,
/// so timestamps are read back in the ledger's offset.
fn parse_created(text: &str, utc_offset: FixedOffset) -> Option<NaiveDate> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&utc_offset).naive_local().date());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(at.date());
    }
    CREATED_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .next()
}

fn parse_claimed_at(text: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|at| DateTime::<Utc>::from_utc(at, Utc)))
        .map_err(|e| e.context(format!("Invalid claim time: {}", text)).into())
}

fn parse_reward(text: &str, default_reward: Decimal) -> RepoResult<Decimal> {
    if text.is_empty() {
        return Ok(default_reward);
    }
    Decimal::from_str(text).map_err(|_| format_err!("Invalid reward amount: {}", text))
}

/// Decodes one data row. Rows without a code are padding and yield `None`.
/// An unreadable created cell leaves `created` empty, the row is still usable.
pub fn decode_coupon(row: &Row, row_index: usize, default_reward: Decimal, utc_offset: FixedOffset) -> RepoResult<Option<Coupon>> {
    let code = CouponCode::normalize(&cell(row, COUPON_CODE));
    if code.is_empty() {
        return Ok(None);
    }

    let created_text = cell(row, COUPON_CREATED);
    let created = parse_created(&created_text, utc_offset);
    if created.is_none() && !created_text.is_empty() {
        warn!("Unreadable created date {:?} in coupon row {}", created_text, row_index);
    }

    let claimed_at = match optional_cell(row, COUPON_CLAIMED_AT) {
        Some(text) => Some(parse_claimed_at(&text)?),
        None => None,
    };

    Ok(Some(Coupon {
        row_index,
        created,
        code,
        status: CouponStatus::from_str(&cell(row, COUPON_STATUS))?,
        reward: parse_reward(&cell(row, COUPON_REWARD), default_reward)?,
        claimed_by: optional_cell(row, COUPON_CLAIMED_BY),
        claimed_at,
    }))
}

/// Decodes a whole coupons table, header included. Rows that fail to decode
/// are logged and left out.
pub fn decode_coupons(rows: &[Row], default_reward: Decimal, utc_offset: FixedOffset) -> Vec<Coupon> {
    rows.iter()
        .enumerate()
        .skip(1)
        .filter_map(|(position, row)| {
            let row_index = position + FIRST_DATA_ROW - 1;
            match decode_coupon(row, row_index, default_reward, utc_offset) {
                Ok(coupon) => coupon,
                Err(e) => {
                    warn!("Skipping coupon row {}: {}", row_index, e);
                    None
                }
            }
        }).collect()
}

/// Every code present in a coupons table, whatever the state of its row
pub fn existing_codes(rows: &[Row]) -> HashSet<String> {
    rows.iter()
        .skip(1)
        .map(|row| CouponCode::normalize(&cell(row, COUPON_CODE)).0)
        .filter(|code| !code.is_empty())
        .collect()
}

/// A coupon without a created date encodes that cell as null, which leaves
/// the stored cell as it is on `Ledger::update_row`.
pub fn encode_coupon(coupon: &Coupon) -> Row {
    vec![
        coupon
            .created
            .map(|created| Value::String(created.format(CREATED_FORMAT).to_string()))
            .unwrap_or(Value::Null),
        Value::String(coupon.code.0.clone()),
        Value::String(coupon.status.as_str().to_string()),
        decimal_cell(&coupon.reward),
        Value::String(coupon.claimed_by.clone().unwrap_or_default()),
        Value::String(coupon.claimed_at.map(|at| at.to_rfc3339()).unwrap_or_default()),
    ]
}

pub fn decode_claim(row: &Row) -> RepoResult<Option<ConsumerClaim>> {
    let code = CouponCode::normalize(&cell(row, CLAIM_CODE));
    if code.is_empty() {
        return Ok(None);
    }

    let serial_text = cell(row, CLAIM_SERIAL);
    let serial = serial_text
        .parse::<f64>()
        .map(|serial| serial as u64)
        .map_err(|e| FailureError::from(e).context(format!("Invalid claim serial: {}", serial_text)))?;

    Ok(Some(ConsumerClaim {
        timestamp: cell(row, CLAIM_TIMESTAMP),
        serial,
        code,
        name: cell(row, CLAIM_NAME),
        phone: cell(row, CLAIM_PHONE),
        email: cell(row, CLAIM_EMAIL),
    }))
}

pub fn decode_claims(rows: &[Row]) -> Vec<ConsumerClaim> {
    rows.iter()
        .enumerate()
        .skip(1)
        .filter_map(|(position, row)| match decode_claim(row) {
            Ok(claim) => claim,
            Err(e) => {
                warn!("Skipping claim row {}: {}", position + 1, e);
                None
            }
        }).collect()
}

pub fn encode_claim(claim: &ConsumerClaim) -> Row {
    vec![
        Value::String(claim.timestamp.clone()),
        Value::from(claim.serial),
        Value::String(claim.code.0.clone()),
        Value::String(claim.name.clone()),
        Value::String(claim.phone.clone()),
        Value::String(claim.email.clone()),
    ]
}
