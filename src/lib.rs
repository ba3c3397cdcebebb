pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod http;
pub mod menu;
pub mod routing;
pub mod services;
pub mod session;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use context::AppContext;
pub use error::ClientError;
