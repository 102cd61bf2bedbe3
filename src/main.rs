//! Coupons is a microservice issuing reward coupons and redeeming them for consumers.
//! This crate is for running the service from `coupons_lib`. See `coupons_lib` for details.

extern crate coupons_lib;

use std::process;

fn main() {
    let config = coupons_lib::config::Config::new().unwrap_or_else(|e| {
        eprintln!("Can't load app config: {}", e);
        process::exit(1);
    });

    // Prepare logger
    coupons_lib::logging::init(config.logging.as_ref());

    // Prepare sentry integration
    let _sentry = coupons_lib::sentry_integration::init(config.sentry.as_ref());

    coupons_lib::start_server(config, &None, || ());
}
