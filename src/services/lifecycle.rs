//! Transitions a coupon may go through: `unused -> used` on redemption and
//! `unused -> deleted` on soft delete. Nothing leaves `used` or `deleted`.
use chrono::{DateTime, Utc};
use failure::Error as FailureError;

use errors::Error;
use models::*;

/// Redeems a coupon looked up by code.
///
/// A missing and a deleted coupon fail alike with `Error::NotFound`, a used one
/// with `Error::AlreadyRedeemed`. The reward of the result is the one recorded
/// on the coupon.
pub fn redeem(coupon: Option<&Coupon>, claimant: &Claimant, now: DateTime<Utc>) -> Result<Coupon, FailureError> {
    let coupon = match coupon {
        Some(coupon) if coupon.status != CouponStatus::Deleted => coupon,
        Some(coupon) => {
            return Err(format_err!("Coupon {} is deleted", coupon.code)
                .context(Error::NotFound)
                .into())
        }
        None => return Err(format_err!("No such coupon").context(Error::NotFound).into()),
    };

    if coupon.status == CouponStatus::Used {
        return Err(format_err!("Coupon {} was redeemed by {:?}", coupon.code, coupon.claimed_by)
            .context(Error::AlreadyRedeemed)
            .into());
    }

    let mut redeemed = coupon.clone();
    redeemed.status = CouponStatus::Used;
    redeemed.claimed_by = Some(claimant.name.clone());
    redeemed.claimed_at = Some(now);
    Ok(redeemed)
}

/// Soft deletes an unused coupon
pub fn mark_deleted(coupon: &Coupon) -> Result<Coupon, FailureError> {
    if coupon.status != CouponStatus::Unused {
        return Err(format_err!("Coupon {} can not be deleted", coupon.code)
            .context(Error::InvalidTransition {
                from: coupon.status.to_string(),
                to: CouponStatus::Deleted.to_string(),
            }).into());
    }

    let mut deleted = coupon.clone();
    deleted.status = CouponStatus::Deleted;
    Ok(deleted)
}
