//! Directory store adapters (roles, CRM agents, portal users).

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;
