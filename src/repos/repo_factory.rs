use std::sync::Arc;

use chrono::FixedOffset;
use rust_decimal::Decimal;

use config::Config;
use repos::coupons::*;
use repos::ledger::Ledger;

/// Builds repos for each request, so services never see the ledger directly
pub trait ReposFactory: Clone + 'static {
    fn create_coupons_repo(&self) -> Box<CouponsRepo>;
    fn create_claims_repo(&self) -> Box<ClaimsRepo>;
}

#[derive(Clone)]
pub struct ReposFactoryImpl {
    ledger: Arc<Ledger>,
    coupons_table: String,
    claims_table: String,
    default_reward: Decimal,
    utc_offset: FixedOffset,
}

impl ReposFactoryImpl {
    pub fn new(ledger: Arc<Ledger>, config: &Config) -> Self {
        Self {
            ledger,
            coupons_table: config.ledger.coupons_table.clone(),
            claims_table: config.ledger.claims_table.clone(),
            default_reward: Decimal::new(i64::from(config.coupons.default_reward), 0),
            utc_offset: FixedOffset::east(config.coupons.claims_utc_offset_minutes * 60),
        }
    }
}

impl ReposFactory for ReposFactoryImpl {
    fn create_coupons_repo(&self) -> Box<CouponsRepo> {
        Box::new(CouponsRepoImpl::new(
            self.ledger.clone(),
            self.coupons_table.clone(),
            self.default_reward,
            self.utc_offset,
        )) as Box<CouponsRepo>
    }

    fn create_claims_repo(&self) -> Box<ClaimsRepo> {
        Box::new(ClaimsRepoImpl::new(self.ledger.clone(), self.claims_table.clone(), self.utc_offset)) as Box<ClaimsRepo>
    }
}
