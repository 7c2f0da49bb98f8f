pub mod connection;
pub mod handler;
