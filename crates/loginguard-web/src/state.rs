use std::sync::Arc;

use loginguard_core::LoginThrottle;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Failed-login throttle, shared with the sweeper task.
    pub throttle: Arc<LoginThrottle>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            throttle: Arc::new(LoginThrottle::new()),
        }
    }
}
