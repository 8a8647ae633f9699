use std::sync::Arc;

use crate::calculator::Calculator;
use crate::config::Config;
use crate::identity::IdentityResolver;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub calculator: Arc<Calculator>,
    pub identity: Arc<dyn IdentityResolver>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        calculator: Calculator,
        identity: Arc<dyn IdentityResolver>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            calculator: Arc::new(calculator),
            identity,
            metrics,
        }
    }
}
