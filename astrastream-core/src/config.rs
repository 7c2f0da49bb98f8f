//! Server configuration.
//!
//! Every knob has a default; `ServerConfig::from_env` overrides them from
//! `ASTRA_*` environment variables.

use std::{env, str::FromStr, time::Duration};

use crate::error::{StreamError, StreamResult};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (all interfaces)
    pub port: u16,

    /// Token expected in the `authorization` header of admin routes.
    /// Admin routes are not mounted when unset.
    pub admin_token: Option<String>,

    /// External endpoint used to validate client tokens.
    /// When unset any non-empty token is accepted.
    pub auth_endpoint: Option<String>,

    /// Interval between synthetic broadcast ticks
    pub tick_interval: Duration,

    /// Connection attempts allowed per IP within `rate_limit_window`
    pub rate_limit_count: u32,
    pub rate_limit_window: Duration,

    /// Disconnect clients with no inbound activity for this long
    pub idle_timeout: Option<Duration>,

    /// Outbound frames buffered per client before drops start
    pub queue_capacity: usize,

    /// Consecutive dropped frames before a client is disconnected
    pub max_overflow_strikes: u32,

    /// Interval between WebSocket ping frames
    pub heartbeat_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3113,
            admin_token: None,
            auth_endpoint: None,
            tick_interval: Duration::from_secs(5),
            rate_limit_count: 100,
            rate_limit_window: Duration::from_secs(60),
            idle_timeout: None,
            queue_capacity: 64,
            max_overflow_strikes: 16,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> StreamResult<Self> {
        let defaults = Self::default();

        Self {
            port: parse_var("ASTRA_PORT")?.unwrap_or(defaults.port),
            admin_token: non_empty_var("ASTRA_ADMIN_TOKEN"),
            auth_endpoint: non_empty_var("ASTRA_AUTH_ENDPOINT"),
            tick_interval: parse_var("ASTRA_TICK_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            rate_limit_count: parse_var("ASTRA_RATE_LIMIT_COUNT")?
                .unwrap_or(defaults.rate_limit_count),
            rate_limit_window: parse_var("ASTRA_RATE_LIMIT_SECONDS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            idle_timeout: parse_var("ASTRA_IDLE_TIMEOUT_SECONDS")?.map(Duration::from_secs),
            queue_capacity: parse_var("ASTRA_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            max_overflow_strikes: parse_var("ASTRA_MAX_OVERFLOW_STRIKES")?
                .unwrap_or(defaults.max_overflow_strikes),
            heartbeat_interval: parse_var("ASTRA_HEARTBEAT_SECONDS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
        }
        .validated()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = Some(endpoint.into());
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn rate_limit(mut self, count: u32, window: Duration) -> Self {
        self.rate_limit_count = count;
        self.rate_limit_window = window;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn max_overflow_strikes(mut self, strikes: u32) -> Self {
        self.max_overflow_strikes = strikes;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Rejects values that would stall the runtime (zero-length intervals,
    /// zero-capacity queues).
    pub fn validated(self) -> StreamResult<Self> {
        if self.tick_interval.is_zero() {
            return Err(StreamError::config("tick_interval", "must be greater than zero"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(StreamError::config(
                "heartbeat_interval",
                "must be greater than zero",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(StreamError::config("queue_capacity", "must be at least 1"));
        }
        if self.max_overflow_strikes == 0 {
            return Err(StreamError::config(
                "max_overflow_strikes",
                "must be at least 1",
            ));
        }
        if matches!(self.idle_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(StreamError::config("idle_timeout", "must be greater than zero"));
        }
        Ok(self)
    }
}

fn non_empty_var(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &'static str) -> StreamResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| StreamError::config(key, format!("{raw:?}: {e}"))),
        None => Ok(None),
    }
}
