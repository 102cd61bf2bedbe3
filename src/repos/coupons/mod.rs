pub mod claims;
pub mod coupons;

pub use self::claims::*;
pub use self::coupons::*;
