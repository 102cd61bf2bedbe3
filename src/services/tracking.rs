//! Tracking Services, read-only views over coupons and claims

use std::collections::HashMap;

use futures::Future;
use num_traits::Zero;
use rust_decimal::Decimal;
use url::form_urlencoded;

use super::types::ServiceFuture;
use models::*;
use repos::ReposFactory;
use services::Service;

const CSV_HEADER: [&str; 8] = [
    "Coupon Code",
    "Status",
    "Claimed By",
    "Phone",
    "Email",
    "Date Claimed",
    "Reward Amount",
    "Form Link",
];

pub trait TrackingService {
    /// Counts and rewards paid, deleted coupons left out
    fn statistics(&self) -> ServiceFuture<CouponStatistics>;
    /// Most recently redeemed coupons first
    fn recent_redemptions(&self, limit: usize) -> ServiceFuture<Vec<Redemption>>;
    /// Returns all claim records
    fn claims(&self) -> ServiceFuture<Vec<ConsumerClaim>>;
    /// Coupons matching the search, joined with their claim records
    fn tracked_coupons(&self, search: CouponsSearch) -> ServiceFuture<Vec<TrackedCoupon>>;
    /// Links for the QR codes of unused coupons
    fn form_links(&self) -> ServiceFuture<Vec<FormLink>>;
    /// Tracking table as CSV
    fn export_csv(&self) -> ServiceFuture<String>;
}

/// Link to the redemption form with the code pre-filled
pub fn form_link(public_url: &str, code: &CouponCode) -> String {
    let encoded: String = form_urlencoded::byte_serialize(code.0.as_bytes()).collect();
    format!("{}/redeem?code={}", public_url.trim_end_matches('/'), encoded)
}

pub fn statistics(coupons: &[Coupon]) -> CouponStatistics {
    let live = coupons.iter().filter(|coupon| coupon.status != CouponStatus::Deleted);
    live.fold(
        CouponStatistics {
            total: 0,
            used: 0,
            unused: 0,
            total_rewards: Decimal::zero(),
        },
        |mut stats, coupon| {
            stats.total += 1;
            match coupon.status {
                CouponStatus::Used => {
                    stats.used += 1;
                    stats.total_rewards = stats.total_rewards + coupon.reward;
                }
                _ => stats.unused += 1,
            }
            stats
        },
    )
}

/// Joins coupons with claims on the code. A later claim for the same code wins.
pub fn track(coupons: Vec<Coupon>, claims: Vec<ConsumerClaim>, public_url: &str) -> Vec<TrackedCoupon> {
    let claims_by_code = claims
        .into_iter()
        .map(|claim| (claim.code.clone(), claim))
        .collect::<HashMap<_, _>>();

    coupons
        .into_iter()
        .map(|coupon| {
            let claim = claims_by_code.get(&coupon.code);
            TrackedCoupon {
                form_link: form_link(public_url, &coupon.code),
                phone: claim.map(|claim| claim.phone.clone()),
                email: claim.map(|claim| claim.email.clone()),
                claimed_at: coupon
                    .claimed_at
                    .map(|at| at.to_rfc3339())
                    .or_else(|| claim.map(|claim| claim.timestamp.clone())),
                claimed_by: coupon.claimed_by,
                status: coupon.status,
                reward: coupon.reward,
                code: coupon.code,
            }
        }).collect()
}

fn csv_field(value: &str) -> String {
    if value.contains(|c: char| c == ',' || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Reward amounts are only shown for used coupons
pub fn to_csv(tracked: &[TrackedCoupon]) -> String {
    let mut lines = vec![CSV_HEADER.iter().map(|title| csv_field(title)).collect::<Vec<_>>().join(",")];
    for coupon in tracked {
        let reward = if coupon.is_used() { coupon.reward } else { Decimal::zero() };
        let row = [
            coupon.code.to_string(),
            coupon.status.to_string(),
            coupon.claimed_by.clone().unwrap_or_default(),
            coupon.phone.clone().unwrap_or_default(),
            coupon.email.clone().unwrap_or_default(),
            coupon.claimed_at.clone().unwrap_or_default(),
            format!("\u{20b9}{}", reward),
            coupon.form_link.clone(),
        ];
        lines.push(row.iter().map(|field| csv_field(field)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

impl<F: ReposFactory> TrackingService for Service<F> {
    fn statistics(&self) -> ServiceFuture<CouponStatistics> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .list()
                .map(|coupons| statistics(&coupons))
                .map_err(|e| e.context("Service Tracking, statistics endpoint error occurred.").into()),
        )
    }

    fn recent_redemptions(&self, limit: usize) -> ServiceFuture<Vec<Redemption>> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();

        Box::new(
            coupons_repo
                .list()
                .map(move |coupons| {
                    let mut used = coupons
                        .into_iter()
                        .filter(|coupon| coupon.status == CouponStatus::Used)
                        .collect::<Vec<_>>();
                    used.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
                    used.iter().take(limit).map(Redemption::from).collect::<Vec<_>>()
                }).map_err(|e| e.context("Service Tracking, recent_redemptions endpoint error occurred.").into()),
        )
    }

    fn claims(&self) -> ServiceFuture<Vec<ConsumerClaim>> {
        let claims_repo = self.static_context.repo_factory.create_claims_repo();

        Box::new(
            claims_repo
                .list()
                .map_err(|e| e.context("Service Tracking, claims endpoint error occurred.").into()),
        )
    }

    fn tracked_coupons(&self, search: CouponsSearch) -> ServiceFuture<Vec<TrackedCoupon>> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();
        let claims_repo = self.static_context.repo_factory.create_claims_repo();
        let public_url = self.public_url();

        Box::new(
            coupons_repo
                .list()
                .join(claims_repo.list())
                .map(move |(coupons, claims)| {
                    let coupons = coupons.into_iter().filter(|coupon| search.matches(coupon)).collect();
                    track(coupons, claims, &public_url)
                }).map_err(|e| e.context("Service Tracking, tracked_coupons endpoint error occurred.").into()),
        )
    }

    fn form_links(&self) -> ServiceFuture<Vec<FormLink>> {
        let coupons_repo = self.static_context.repo_factory.create_coupons_repo();
        let public_url = self.public_url();

        Box::new(
            coupons_repo
                .list()
                .map(move |coupons| {
                    coupons
                        .into_iter()
                        .filter(|coupon| coupon.status == CouponStatus::Unused)
                        .map(|coupon| FormLink {
                            form_link: form_link(&public_url, &coupon.code),
                            code: coupon.code,
                            reward: coupon.reward,
                        }).collect::<Vec<_>>()
                }).map_err(|e| e.context("Service Tracking, form_links endpoint error occurred.").into()),
        )
    }

    fn export_csv(&self) -> ServiceFuture<String> {
        Box::new(self.tracked_coupons(CouponsSearch::default()).map(|tracked| to_csv(&tracked)))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use services::redemption::RedemptionService;
    use services::tests::*;

    fn decimal(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn test_form_link_encodes_code() {
        let link = form_link("https://coupons.example.com/", &CouponCode("AB#C&D?%".to_string()));
        assert_eq!(link, "https://coupons.example.com/redeem?code=AB%23C%26D%3F%25");
    }

    #[test]
    fn test_statistics_leave_out_deleted() {
        let (mut core, service) = create_service(vec![
            coupon_row("AAAAAAAA", "unused", 100, "", ""),
            coupon_row("BBBBBBBB", "used", 100, "Asha", "2025-07-02T10:00:00+00:00"),
            coupon_row("CCCCCCCC", "used", 50, "Ravi", "2025-07-03T10:00:00+00:00"),
            coupon_row("DDDDDDDD", "deleted", 100, "", ""),
        ]);

        let stats = core.run(service.statistics()).unwrap();
        assert_eq!(
            stats,
            CouponStatistics {
                total: 3,
                used: 2,
                unused: 1,
                total_rewards: decimal("150"),
            }
        );
    }

    #[test]
    fn test_recent_redemptions_newest_first() {
        let (mut core, service) = create_service(vec![
            coupon_row("BBBBBBBB", "used", 100, "Asha", "2025-07-02T10:00:00+00:00"),
            coupon_row("CCCCCCCC", "used", 50, "Ravi", "2025-07-03T10:00:00+00:00"),
            coupon_row("AAAAAAAA", "unused", 100, "", ""),
        ]);

        let recent = core.run(service.recent_redemptions(1)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].code, CouponCode("CCCCCCCC".to_string()));
        assert_eq!(recent[0].claimed_by, Some("Ravi".to_string()));
    }

    #[test]
    fn test_form_links_only_for_unused() {
        let (mut core, service) = create_service(vec![
            coupon_row("AAAAAAAA", "unused", 100, "", ""),
            coupon_row("BBBBBBBB", "used", 100, "Asha", "2025-07-02T10:00:00+00:00"),
        ]);

        let links = core.run(service.form_links()).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].form_link, "https://coupons.example.com/redeem?code=AAAAAAAA");
    }

    #[test]
    fn test_export_joins_claims() {
        let (mut core, service) = create_service(vec![
            coupon_row("AAAAAAAA", "unused", 100, "", ""),
            coupon_row("WXWXWXWX", "unused", 100, "", ""),
        ]);
        let form = RedemptionForm {
            coupon_code: "WXWXWXWX".to_string(),
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            email: "a@b.com".to_string(),
        };
        assert!(core.run(service.redeem(form)).unwrap().success);

        let csv = core.run(service.export_csv()).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Coupon Code,Status,Claimed By,Phone,Email,Date Claimed,Reward Amount,Form Link"
        );
        assert!(lines[1].starts_with("AAAAAAAA,unused,,,,,\u{20b9}0,"));
        assert!(lines[2].starts_with("WXWXWXWX,used,Asha,9876543210,a@b.com,"));
        assert!(lines[2].contains(",\u{20b9}100,"));
    }

    #[test]
    fn test_csv_fields_are_quoted() {
        assert_eq!(csv_field("02/07/2025, 15:30:00"), "\"02/07/2025, 15:30:00\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }
}
