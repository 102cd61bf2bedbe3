//! System Services, liveness of the service itself

use futures::future;

use super::types::ServiceFuture;
use repos::ReposFactory;
use services::Service;

pub trait SystemService {
    /// Healthcheck endpoint, always returns OK status
    fn healthcheck(&self) -> ServiceFuture<String>;
}

impl<F: ReposFactory> SystemService for Service<F> {
    fn healthcheck(&self) -> ServiceFuture<String> {
        debug!("Healthcheck endpoint called.");
        Box::new(future::ok("Ok".to_string()))
    }
}
