//! Model of the claims table, one record per successful redemption

use models::coupons::CouponCode;

/// Claim record as stored in the claims table of the ledger
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConsumerClaim {
    pub timestamp: String,
    pub serial: u64,
    pub code: CouponCode,
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Payload for appending a claim record
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewConsumerClaim {
    pub code: CouponCode,
    pub name: String,
    pub phone: String,
    pub email: String,
}
