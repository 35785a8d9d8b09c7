pub mod clock;
pub mod config;
pub mod server;

pub use config::{Config, ConfigError};
