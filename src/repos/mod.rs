//! Repos is a module responsible for reading and writing the ledger tables
pub mod coupons;
pub mod ledger;
pub mod repo_factory;
pub mod types;

pub use self::coupons::*;
pub use self::ledger::*;
pub use self::repo_factory::*;
pub use self::types::*;
