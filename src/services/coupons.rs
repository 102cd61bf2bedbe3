//! Coupons Services, admin operations on the coupons table

use chrono::Utc;
use failure::Error as FailureError;
use futures::future;
use futures::stream;
use futures::{Future, IntoFuture, Stream};
use rand;
use validator::Validate;

use super::generator::CodeGenerator;
use super::lifecycle;
use super::types::ServiceFuture;
use errors::{is_conflict, Error};
use models::*;
use repos::ReposFactory;
use services::Service;

pub trait CouponsService {
    /// Returns coupons matching the search, deleted ones only on request
    fn list_coupons(&self, search: CouponsSearch) -> ServiceFuture<Vec<Coupon>>;
    /// Returns coupon by code
    fn get_coupon(&self, code: CouponCode) -> ServiceFuture<Coupon>;
    /// Generates a batch of new unused coupons
    fn generate_coupons(&self, payload: NewCouponBatch) -> ServiceFuture<Vec<Coupon>>;
    /// Soft deletes coupon
    fn delete_coupon(&self, code: CouponCode) -> ServiceFuture<Coupon>;
    /// Soft deletes every unused coupon, returns how many were deleted
    fn clear_coupons(&self) -> ServiceFuture<usize>;
}

pub(crate) fn found(coupon: Option<Coupon>, code: &CouponCode) -> Result<Coupon, FailureError> {
    coupon.ok_or_else(|| format_err!("Coupon {} not found", code).context(Error::NotFound).into())
}

impl<F: ReposFactory> CouponsService for Service<F> {
    fn list_coupons(&self, search: CouponsSearch) -> ServiceFuture<Vec<Coupon>> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .list()
                .map(move |coupons| coupons.into_iter().filter(|coupon| search.matches(coupon)).collect::<Vec<_>>())
                .map_err(|e| e.context("Service Coupons, list endpoint error occurred.").into()),
        )
    }

    fn get_coupon(&self, code: CouponCode) -> ServiceFuture<Coupon> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .find_by_code(code.clone())
                .and_then(move |coupon| found(coupon, &code))
                .map_err(|e| e.context("Service Coupons, get_coupon endpoint error occurred.").into()),
        )
    }

    fn generate_coupons(&self, payload: NewCouponBatch) -> ServiceFuture<Vec<Coupon>> {
        let repo_factory = self.static_context.repo_factory.clone();
        let reward = payload.reward.unwrap_or_else(|| self.default_reward());

        let validation: Result<(), FailureError> = payload
            .validate()
            .map_err(|e| format_err!("Validation of {:?} failed", payload).context(Error::Validate(e)).into());

        Box::new(
            validation
                .into_future()
                .and_then(move |_| {
                    let coupons_repo = repo_factory.create_coupons_repo();
                    coupons_repo.existing_codes().and_then(move |existing| {
                        let today = Utc::today().naive_utc();
                        CodeGenerator::default()
                            .generate_batch(&mut rand::thread_rng(), payload.batch_size as usize, &existing)
                            .map(|codes| {
                                codes
                                    .into_iter()
                                    .map(|code| Coupon::issue(CouponCode(code), reward, today))
                                    .collect::<Vec<_>>()
                            }).into_future()
                            .and_then(move |coupons| coupons_repo.create(coupons))
                    })
                }).map(|coupons| {
                    info!("Generated {} coupons.", coupons.len());
                    coupons
                }).map_err(|e| e.context("Service Coupons, generate endpoint error occurred.").into()),
        )
    }

    fn delete_coupon(&self, code: CouponCode) -> ServiceFuture<Coupon> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .find_by_code(code.clone())
                .and_then(move |coupon| {
                    found(coupon, &code)
                        .and_then(|current| lifecycle::mark_deleted(&current).map(|deleted| (current.status, deleted)))
                        .into_future()
                        .and_then(move |(expected, deleted)| coupons_repo.set_status(deleted, expected))
                }).map(|coupon| {
                    info!("Coupon {} deleted.", coupon.code);
                    coupon
                }).map_err(|e| e.context("Service Coupons, delete_coupon endpoint error occurred.").into()),
        )
    }

    /// Rows redeemed while the clear is running are skipped.
    fn clear_coupons(&self) -> ServiceFuture<usize> {
        let repo_factory = self.static_context.repo_factory.clone();
        let coupons_repo = repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .list()
                .and_then(move |coupons| {
                    let unused = coupons
                        .into_iter()
                        .filter(|coupon| coupon.status == CouponStatus::Unused)
                        .collect::<Vec<_>>();
                    stream::iter_ok::<_, FailureError>(unused)
                        .and_then(move |current| {
                            let coupons_repo = repo_factory.create_coupons_repo();
                            lifecycle::mark_deleted(&current)
                                .into_future()
                                .and_then(move |deleted| coupons_repo.set_status(deleted, CouponStatus::Unused))
                                .then(move |result| match result {
                                    Ok(_) => Ok(1usize),
                                    Err(ref e) if is_conflict(e) => {
                                        warn!("Coupon {} changed while clearing, skipped.", current.code);
                                        Ok(0usize)
                                    }
                                    Err(e) => Err(e),
                                })
                        }).fold(0usize, |total, deleted| future::ok::<_, FailureError>(total + deleted))
                }).map(|total| {
                    info!("Cleared {} unused coupons.", total);
                    total
                }).map_err(|e| e.context("Service Coupons, clear endpoint error occurred.").into()),
        )
    }
}
