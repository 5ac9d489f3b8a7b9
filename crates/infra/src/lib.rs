//! Infrastructure layer: directory stores, identity provider adapters, config.

pub mod config;
pub mod directory;
pub mod identity;


pub use config::{ConfigError, Settings};
pub use directory::{InMemoryDirectory, PostgresDirectory};
pub use identity::InMemoryIdentityProvider;
