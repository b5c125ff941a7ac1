//! # WaSender Gateway
//! HTTP API over the shared session and the bulk dispatch scheduler.

pub mod api;
pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start_server};
