pub mod auth;
pub mod channel;
pub mod client;
pub mod control;
pub mod message;
