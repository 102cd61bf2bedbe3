//! Models contains all structures that are used in different
//! modules of the app

pub mod coupons;
pub mod redemption;
pub mod tracking;
pub mod validation_rules;

pub use self::coupons::*;
pub use self::redemption::*;
pub use self::tracking::*;
pub use self::validation_rules::*;
