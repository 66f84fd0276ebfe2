pub mod commands;
pub mod config;
pub mod health;
pub mod observability;
pub mod pending;
pub mod store;
pub mod taxonomy;
pub mod validate;

use std::sync::Arc;

use commands::Dispatcher;
use config::BotConfig;
use store::TaskStore;

/// Shared application state passed to the command gateway and the health
/// endpoint.
pub struct AppContext {
    pub config: Arc<BotConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: Arc<BotConfig>, store: Arc<dyn TaskStore>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(store, config.command_prefix.clone()));
        Self {
            config,
            dispatcher,
            started_at: std::time::Instant::now(),
        }
    }
}
