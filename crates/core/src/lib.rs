//! `gatehouse-core` — identifiers and the domain error model.
//!
//! This crate has no IO and no async; every other crate builds on it.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::SubjectId;
