use std::sync::Arc;

use config::Config;
use repos::ReposFactory;

/// Static context for all app
/// It's the same for all requests
#[derive(Clone)]
pub struct StaticContext<F: ReposFactory> {
    pub config: Arc<Config>,
    pub repo_factory: F,
}

impl<F: ReposFactory> StaticContext<F> {
    /// Create a new static context
    pub fn new(config: Arc<Config>, repo_factory: F) -> Self {
        Self { config, repo_factory }
    }
}
