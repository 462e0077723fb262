//! MeterLens HTTP gateway
//!
//! JSON API over a single analysis session, plus preview hosting.

pub mod api;
pub mod server;

pub use server::{GatewayState, build_router, start_server};
