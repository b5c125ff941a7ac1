//! Trait seams between the session, the clients and the scheduler.

pub mod client;
pub mod session;

pub use client::MessagingClient;
pub use session::MessagingSession;
