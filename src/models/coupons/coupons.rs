//! Model coupons
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use failure::Error as FailureError;
use rust_decimal::Decimal;
use validator::Validate;

use models::validation_rules::*;

/// Redeemable code, stored trimmed and upper-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CouponCode(pub String);

impl CouponCode {
    /// Normalizes a code typed by a consumer or read from the ledger
    pub fn normalize(raw: &str) -> Self {
        CouponCode(raw.trim().to_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CouponCode {
    fn from(value: String) -> Self {
        CouponCode::normalize(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    Unused,
    Used,
    Deleted,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match *self {
            CouponStatus::Unused => "unused",
            CouponStatus::Used => "used",
            CouponStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponStatus {
    type Err = FailureError;

    /// Blank cells are treated as `unused`, the state every coupon is issued in.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "unused" => Ok(CouponStatus::Unused),
            "used" => Ok(CouponStatus::Used),
            "deleted" => Ok(CouponStatus::Deleted),
            other => Err(format_err!("Unrecognized coupon status: {}", other)),
        }
    }
}

/// Coupon as stored in the coupons table of the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coupon {
    /// Position of the row in the ledger, header being row 1
    #[serde(skip_serializing)]
    pub row_index: usize,
    /// Empty when the ledger cell could not be read as a date
    pub created: Option<NaiveDate>,
    pub code: CouponCode,
    pub status: CouponStatus,
    pub reward: Decimal,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub const CODE_LENGTH: usize = 8;

    /// New unused coupon, not yet written to the ledger
    pub fn issue(code: CouponCode, reward: Decimal, created: NaiveDate) -> Self {
        Self {
            row_index: 0,
            created: Some(created),
            code,
            status: CouponStatus::Unused,
            reward,
            claimed_by: None,
            claimed_at: None,
        }
    }
}

/// Payload for generating a batch of coupons
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct NewCouponBatch {
    #[validate(range(min = "1", max = "500"))]
    pub batch_size: u32,
    #[validate(custom = "validate_non_negative_reward")]
    pub reward: Option<Decimal>,
}

/// Filters of the admin and tracking coupon lists
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CouponsSearch {
    /// Deleted coupons are only listed when asked for explicitly
    pub status: Option<CouponStatus>,
    /// Case-insensitive substring of the code or of the claimant name
    pub term: Option<String>,
}

impl CouponsSearch {
    pub fn matches(&self, coupon: &Coupon) -> bool {
        let status_matches = match self.status {
            Some(status) => status == coupon.status,
            None => coupon.status != CouponStatus::Deleted,
        };
        let term_matches = match self.term {
            None => true,
            Some(ref term) => {
                let term = term.to_lowercase();
                coupon.code.0.to_lowercase().contains(&term) || coupon
                    .claimed_by
                    .as_ref()
                    .map_or(false, |name| name.to_lowercase().contains(&term))
            }
        };

        status_matches && term_matches
    }
}

/// Coupon lookup outcome shown on the QR pre-filled form
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CouponPreview {
    pub coupon_code: String,
    pub valid: bool,
    pub reward: Option<Decimal>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(code: &str, status: CouponStatus, claimed_by: Option<&str>) -> Coupon {
        let mut coupon = Coupon::issue(
            CouponCode(code.to_string()),
            Decimal::from_str("100").unwrap(),
            NaiveDate::from_ymd(2025, 7, 1),
        );
        coupon.status = status;
        coupon.claimed_by = claimed_by.map(|name| name.to_string());
        coupon
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(CouponStatus::from_str(" Used ").unwrap(), CouponStatus::Used);
        assert_eq!(CouponStatus::from_str("").unwrap(), CouponStatus::Unused);
        assert!(CouponStatus::from_str("lost").is_err());
    }

    #[test]
    fn test_search_hides_deleted_by_default() {
        let deleted = coupon("AAAAAAAA", CouponStatus::Deleted, None);
        assert!(!CouponsSearch::default().matches(&deleted));

        let search = CouponsSearch {
            status: Some(CouponStatus::Deleted),
            term: None,
        };
        assert!(search.matches(&deleted));
    }

    #[test]
    fn test_search_term_matches_code_or_claimant() {
        let search = CouponsSearch {
            status: None,
            term: Some("ash".to_string()),
        };
        assert!(search.matches(&coupon("AAAAAAAA", CouponStatus::Used, Some("Asha"))));
        assert!(!search.matches(&coupon("AAAAAAAA", CouponStatus::Unused, None)));

        let search = CouponsSearch {
            status: Some(CouponStatus::Unused),
            term: Some("aa".to_string()),
        };
        assert!(search.matches(&coupon("AAAAAAAA", CouponStatus::Unused, None)));
        assert!(!search.matches(&coupon("AAAAAAAA", CouponStatus::Used, None)));
    }

    #[test]
    fn test_batch_size_bounds() {
        let batch = |batch_size| NewCouponBatch { batch_size, reward: None };
        assert!(batch(0).validate().is_err());
        assert!(batch(1).validate().is_ok());
        assert!(batch(500).validate().is_ok());
        assert!(batch(501).validate().is_err());

        let negative = NewCouponBatch {
            batch_size: 10,
            reward: Some(Decimal::from_str("-5").unwrap()),
        };
        assert!(negative.validate().is_err());
    }
}
