//! Aggregates shown on the tracking dashboard
use rust_decimal::Decimal;

use models::coupons::{Coupon, CouponCode, CouponStatus};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CouponStatistics {
    pub total: usize,
    pub used: usize,
    pub unused: usize,
    pub total_rewards: Decimal,
}

/// Link encoded into the QR code printed on a coupon
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FormLink {
    pub code: CouponCode,
    pub form_link: String,
    pub reward: Decimal,
}

/// Tracking view of a coupon, joined with the claim record of its redemption
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TrackedCoupon {
    pub code: CouponCode,
    pub status: CouponStatus,
    pub claimed_by: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub claimed_at: Option<String>,
    pub reward: Decimal,
    pub form_link: String,
}

impl TrackedCoupon {
    pub fn is_used(&self) -> bool {
        self.status == CouponStatus::Used
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Redemption {
    pub code: CouponCode,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<String>,
    pub reward: Decimal,
}

impl<'a> From<&'a Coupon> for Redemption {
    fn from(coupon: &'a Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            claimed_by: coupon.claimed_by.clone(),
            claimed_at: coupon.claimed_at.map(|at| at.to_rfc3339()),
            reward: coupon.reward,
        }
    }
}
