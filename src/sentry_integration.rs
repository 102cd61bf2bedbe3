//! Error reporting to sentry, enabled when a dsn is configured
use sentry;
use sentry::integrations::panic::register_panic_handler;
use sentry::internals::ClientInitGuard;

use config::SentryConfig;

/// Keep the returned guard alive for as long as events should be sent
pub fn init(sentry_config: Option<&SentryConfig>) -> Option<ClientInitGuard> {
    sentry_config.map(|config| {
        info!("Initialization of sentry error reporting.");
        let guard = sentry::init((
            config.dsn.clone(),
            sentry::ClientOptions {
                release: sentry_crate_release!(),
                ..Default::default()
            },
        ));
        register_panic_handler();
        guard
    })
}
