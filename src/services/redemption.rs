//! Redemption Services, the consumer side of the coupon lifecycle

use chrono::Utc;
use failure::Error as FailureError;
use futures::future::{self, Loop};
use futures::{Future, IntoFuture};
use sentry::integrations::failure::capture_error;

use super::lifecycle;
use super::types::ServiceFuture;
use errors::{is_conflict, kind_of, Error};
use models::*;
use repos::ReposFactory;
use services::Service;

pub trait RedemptionService {
    /// Redeems coupon for claimant and records the claim.
    /// Lost races on the coupon row are retried from a fresh read.
    fn redeem_coupon(&self, code: CouponCode, claimant: Claimant) -> ServiceFuture<Coupon>;
    /// Validates the form, redeems and reports the outcome as a message
    fn redeem(&self, form: RedemptionForm) -> ServiceFuture<RedemptionResult>;
    /// Status of a coupon for a form pre-filled from a QR code link
    fn preview(&self, code: CouponCode) -> ServiceFuture<CouponPreview>;
}

/// Message shown to the consumer for a failed redemption
fn failure_message(err: &FailureError) -> &'static str {
    match kind_of(err) {
        Some(Error::NotFound) => INVALID_CODE_MESSAGE,
        Some(Error::AlreadyRedeemed) => ALREADY_USED_MESSAGE,
        Some(Error::Conflict) => BUSY_MESSAGE,
        _ => {
            error!("Redemption failed: {}", err);
            capture_error(err);
            NETWORK_ERROR_MESSAGE
        }
    }
}

impl<F: ReposFactory> RedemptionService for Service<F> {
    fn redeem_coupon(&self, code: CouponCode, claimant: Claimant) -> ServiceFuture<Coupon> {
        let retries = self.static_context.config.ledger.conflict_retries;
        let repo_factory = self.static_context.repo_factory.clone();
        let claims_repo = repo_factory.create_claims_repo();
        let new_claim = NewConsumerClaim {
            code: code.clone(),
            name: claimant.name.clone(),
            phone: claimant.phone.clone(),
            email: claimant.email.clone(),
        };

        let redeemed = future::loop_fn(0, move |attempt| {
            let coupons_repo = repo_factory.create_coupons_repo();
            let claimant = claimant.clone();
            let code = code.clone();
            coupons_repo
                .find_by_code(code.clone())
                .and_then(move |coupon| {
                    lifecycle::redeem(coupon.as_ref(), &claimant, Utc::now())
                        .into_future()
                        .and_then(move |redeemed| coupons_repo.update(redeemed, CouponStatus::Unused))
                }).then(move |result| match result {
                    Err(ref e) if is_conflict(e) && attempt < retries => {
                        warn!("Coupon {} changed during redemption, retrying.", code);
                        Ok(Loop::Continue(attempt + 1))
                    }
                    other => other.map(Loop::Break),
                })
        });

        Box::new(
            redeemed
                .and_then(move |coupon| {
                    info!("Coupon {} redeemed by {:?}.", coupon.code, coupon.claimed_by);
                    let at = coupon.claimed_at.unwrap_or_else(Utc::now);
                    claims_repo.create(new_claim, at).then(move |result| {
                        if let Err(e) = result {
                            error!("Coupon {} redeemed, but its claim was not recorded: {}", coupon.code, e);
                            capture_error(&e);
                        }
                        Ok(coupon)
                    })
                }).map_err(|e| e.context("Service Redemption, redeem endpoint error occurred.").into()),
        )
    }

    fn redeem(&self, form: RedemptionForm) -> ServiceFuture<RedemptionResult> {
        if let Err(e) = form.validate_in_order() {
            let message = match e.message {
                Some(ref message) => message.to_string(),
                None => e.code.to_string(),
            };
            return Box::new(future::ok(RedemptionResult::failed(message)));
        }

        Box::new(self.redeem_coupon(form.code(), form.claimant()).then(|result| {
            Ok::<_, FailureError>(match result {
                Ok(coupon) => RedemptionResult::redeemed(coupon.reward),
                Err(e) => RedemptionResult::failed(failure_message(&e)),
            })
        }))
    }

    fn preview(&self, code: CouponCode) -> ServiceFuture<CouponPreview> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .find_by_code(code.clone())
                .map(move |coupon| match coupon {
                    Some(ref coupon) if coupon.status == CouponStatus::Unused => CouponPreview {
                        coupon_code: coupon.code.to_string(),
                        valid: true,
                        reward: Some(coupon.reward),
                        message: format!(
                            "Coupon found! Please fill in your details to claim your \u{20b9}{} reward.",
                            coupon.reward
                        ),
                    },
                    Some(ref coupon) if coupon.status == CouponStatus::Used => CouponPreview {
                        coupon_code: coupon.code.to_string(),
                        valid: false,
                        reward: Some(coupon.reward),
                        message: ALREADY_USED_MESSAGE.to_string(),
                    },
                    _ => CouponPreview {
                        coupon_code: code.to_string(),
                        valid: false,
                        reward: None,
                        message: INVALID_CODE_MESSAGE.to_string(),
                    },
                }).map_err(|e| e.context("Service Redemption, preview endpoint error occurred.").into()),
        )
    }
}
