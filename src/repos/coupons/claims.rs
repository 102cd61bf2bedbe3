//! Claims repo, appends one record per successful redemption
use std::cmp;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use futures::Future;

use models::*;
use repos::ledger::rows;
use repos::ledger::Ledger;
use repos::types::RepoFuture;

pub const CLAIM_TIME_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

pub trait ClaimsRepo {
    /// Returns all claim records in ledger order
    fn list(&self) -> RepoFuture<Vec<ConsumerClaim>>;

    /// Appends a claim record stamped with `at`
    fn create(&self, payload: NewConsumerClaim, at: DateTime<Utc>) -> RepoFuture<ConsumerClaim>;
}

pub struct ClaimsRepoImpl {
    ledger: Arc<Ledger>,
    table: String,
    utc_offset: FixedOffset,
}

impl ClaimsRepoImpl {
    pub fn new(ledger: Arc<Ledger>, table: String, utc_offset: FixedOffset) -> Self {
        Self { ledger, table, utc_offset }
    }
}

impl ClaimsRepo for ClaimsRepoImpl {
    fn list(&self) -> RepoFuture<Vec<ConsumerClaim>> {
        debug!("List all claims of {}.", self.table);
        Box::new(
            self.ledger
                .fetch_all(&self.table)
                .map(|rows| rows::decode_claims(&rows))
                .map_err(|e| e.context("List all claims").into()),
        )
    }

    /// The serial is the number of rows already in the table, header
    /// included, and at least 1.
    fn create(&self, payload: NewConsumerClaim, at: DateTime<Utc>) -> RepoFuture<ConsumerClaim> {
        debug!("Create claim {:?}.", payload);
        let ledger = self.ledger.clone();
        let table = self.table.clone();
        let timestamp = at.with_timezone(&self.utc_offset).format(CLAIM_TIME_FORMAT).to_string();

        Box::new(
            self.ledger
                .fetch_all(&self.table)
                .and_then(move |rows| {
                    let claim = ConsumerClaim {
                        timestamp,
                        serial: cmp::max(rows.len(), 1) as u64,
                        code: payload.code,
                        name: payload.name,
                        phone: payload.phone,
                        email: payload.email,
                    };
                    ledger.insert(&table, rows::encode_claim(&claim)).map(move |_| claim)
                }).map_err(|e| e.context("Create claim").into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use futures_cpupool::CpuPool;
    use tokio_core::reactor::Core;

    use super::*;
    use repos::ledger::LocalLedger;

    fn create_repo() -> ClaimsRepoImpl {
        let ledger = LocalLedger::in_memory(CpuPool::new(1)).with_header(
            "User_Claimed_Coupon",
            vec![
                json!("Timestamp"),
                json!("Serial"),
                json!("Code"),
                json!("Name"),
                json!("Phone"),
                json!("Email"),
            ],
        );
        ClaimsRepoImpl::new(Arc::new(ledger), "User_Claimed_Coupon".to_string(), FixedOffset::east(330 * 60))
    }

    fn payload(code: &str) -> NewConsumerClaim {
        NewConsumerClaim {
            code: CouponCode(code.to_string()),
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            email: "a@b.com".to_string(),
        }
    }

    #[test]
    fn test_first_claim_gets_serial_one_and_local_time() {
        let mut core = Core::new().unwrap();
        let repo = create_repo();
        let at = Utc.ymd(2025, 7, 2).and_hms(10, 0, 0);

        let claim = core.run(repo.create(payload("WXWXWXWX"), at)).unwrap();
        assert_eq!(claim.serial, 1);
        assert_eq!(claim.timestamp, "02/07/2025, 15:30:00");
    }

    #[test]
    fn test_serial_follows_row_count() {
        let mut core = Core::new().unwrap();
        let repo = create_repo();
        let at = Utc.ymd(2025, 7, 2).and_hms(10, 0, 0);

        core.run(repo.create(payload("AAAAAAAA"), at)).unwrap();
        let second = core.run(repo.create(payload("BBBBBBBB"), at)).unwrap();
        assert_eq!(second.serial, 2);

        let claims = core.run(repo.list()).unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[1].code, CouponCode("BBBBBBBB".to_string()));
    }
}
