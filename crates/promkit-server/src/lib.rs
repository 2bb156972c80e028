//! promkit server library entry.
//!
//! Wires registry resolution, metric construction, the provider cache and the
//! inbound instrumentation middleware into an axum stack. Consumed by the
//! binary (`main.rs`), by host applications via `router::instrument`, and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod container;
pub mod middleware;
pub mod module;
pub mod obs;
pub mod ops;
pub mod router;
