//! # WaSender Core
//! Error taxonomy, configuration, domain types and the trait seams shared by
//! the session, the dispatch scheduler and the HTTP gateway.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::SenderConfig;
pub use error::{Result, SenderError};
