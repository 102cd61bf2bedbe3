//! Services is a core layer for the app business logic like
//! validation, code generation and coupon lifecycle.

pub mod coupons;
pub mod generator;
pub mod lifecycle;
pub mod redemption;
pub mod system;
pub mod tracking;
pub mod types;

pub use self::coupons::*;
pub use self::redemption::*;
pub use self::system::*;
pub use self::tracking::*;

use rust_decimal::Decimal;

use controller::context::StaticContext;
use repos::ReposFactory;

/// Service
pub struct Service<F: ReposFactory> {
    pub static_context: StaticContext<F>,
}

impl<F: ReposFactory> Service<F> {
    /// Create a new service
    pub fn new(static_context: StaticContext<F>) -> Self {
        Self { static_context }
    }

    fn default_reward(&self) -> Decimal {
        Decimal::new(i64::from(self.static_context.config.coupons.default_reward), 0)
    }

    fn public_url(&self) -> String {
        self.static_context.config.server.public_url.clone()
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use futures_cpupool::CpuPool;
    use serde_json::Value;
    use tokio_core::reactor::Core;

    use config::{Config, Coupons, Ledger as LedgerConfig, LedgerBackend, Server};
    use controller::context::StaticContext;
    use repos::ledger::rows::{header_row, CLAIMS_HEADER, COUPONS_HEADER};
    use repos::{Ledger, LocalLedger, ReposFactoryImpl};
    use services::Service;

    pub const COUPONS_TABLE: &str = "Coupons";
    pub const CLAIMS_TABLE: &str = "User_Claimed_Coupon";

    pub fn create_config() -> Config {
        Config {
            server: Server {
                host: "127.0.0.1".to_string(),
                port: "8000".to_string(),
                thread_count: 1,
                public_url: "https://coupons.example.com".to_string(),
            },
            ledger: LedgerConfig {
                backend: LedgerBackend::Local,
                url: None,
                coupons_table: COUPONS_TABLE.to_string(),
                claims_table: CLAIMS_TABLE.to_string(),
                local_path: None,
                conflict_retries: 1,
            },
            coupons: Coupons {
                default_reward: 100,
                claims_utc_offset_minutes: 330,
            },
            logging: None,
            sentry: None,
        }
    }

    pub fn coupon_row(code: &str, status: &str, reward: u32, claimed_by: &str, claimed_at: &str) -> Value {
        json!(["2025-07-01", code, status, reward, claimed_by, claimed_at])
    }

    pub fn create_ledger(core: &mut Core, rows: Vec<Value>) -> LocalLedger {
        let ledger = LocalLedger::in_memory(CpuPool::new(1))
            .with_header(COUPONS_TABLE, header_row(&COUPONS_HEADER))
            .with_header(CLAIMS_TABLE, header_row(&CLAIMS_HEADER));
        for row in rows {
            if let Value::Array(row) = row {
                core.run(ledger.insert(COUPONS_TABLE, row)).unwrap();
            }
        }
        ledger
    }

    pub fn create_service_with_ledger(ledger: Arc<Ledger>) -> Service<ReposFactoryImpl> {
        let config = create_config();
        let repo_factory = ReposFactoryImpl::new(ledger, &config);
        Service::new(StaticContext::new(Arc::new(config), repo_factory))
    }

    pub fn create_service(rows: Vec<Value>) -> (Core, Service<ReposFactoryImpl>) {
        let mut core = Core::new().unwrap();
        let ledger = create_ledger(&mut core, rows);
        (core, create_service_with_ledger(Arc::new(ledger)))
    }
}
