use std::{sync::Arc, time::Duration};

use crate::{
    auth::TokenValidator,
    broadcast::{BroadcastEngine, MessageSource, SyntheticFeed},
    config::ServerConfig,
    registry::ConnectionRegistry,
    utils::rate_limit::ConnectionRateLimiter,
};

pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub engine: Arc<BroadcastEngine>,
    pub rate_limiter: ConnectionRateLimiter,
    pub admin_token: Option<String>,
    pub queue_capacity: usize,
    pub heartbeat_interval: Duration,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_source(config, Box::new(SyntheticFeed::default()))
    }

    pub fn with_source(config: &ServerConfig, source: Box<dyn MessageSource>) -> Self {
        let validator = match &config.auth_endpoint {
            Some(endpoint) => TokenValidator::remote(endpoint.clone()),
            None => TokenValidator::Permissive,
        };
        let registry = Arc::new(ConnectionRegistry::new(
            validator,
            config.max_overflow_strikes,
        ));
        let engine = Arc::new(BroadcastEngine::new(
            registry.clone(),
            source,
            config.tick_interval,
        ));

        Self {
            registry,
            engine,
            rate_limiter: ConnectionRateLimiter::new(
                config.rate_limit_count,
                config.rate_limit_window,
            ),
            admin_token: config.admin_token.clone(),
            queue_capacity: config.queue_capacity,
            heartbeat_interval: config.heartbeat_interval,
        }
    }
}
