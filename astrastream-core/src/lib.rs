pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod server;
pub mod state;
pub mod utils;
pub mod websocket;

pub use api::types::{ApiResponse, ApiResult, IntoApiResponse, api_response};
pub use auth::TokenValidator;
pub use broadcast::{BroadcastEngine, MessageSource, SyntheticFeed};
pub use config::ServerConfig;
pub use error::{StreamError, StreamResult};
pub use models::message::{MessageKind, StreamMessage};
pub use registry::ConnectionRegistry;
pub use server::Server;
