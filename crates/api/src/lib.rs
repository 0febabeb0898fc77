//! HTTP API: routing, request scoping and response mapping.

pub mod app;
pub mod context;
pub mod middleware;
