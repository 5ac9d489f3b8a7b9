//! HTTP API: evaluates area guards for bearer-token requests.

pub mod app;
pub mod context;
pub mod middleware;
pub mod token;
