//! Domain types shared across WaSender crates.

pub mod contact;
pub mod dispatch;
pub mod message;
pub mod session;

pub use contact::{ChatAddress, Contact, DEFAULT_CONTACT_NAME, normalize_number};
pub use dispatch::{
    DispatchJob, DispatchResult, DispatchStatus, JobId, JobReport, JobStatus, JobSummary,
    MessageTemplate,
};
pub use message::{Attachment, OutgoingMessage, SendReceipt};
pub use session::{ConnectionSnapshot, ConnectionState, PairingArtifact, SessionEvent};
