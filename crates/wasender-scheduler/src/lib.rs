//! # WaSender Scheduler
//!
//! Bulk dispatch: personalize, throttle and record one message per contact.
//!
//! ```text
//! BulkDispatchScheduler::submit(job)
//!   ├── validate + require a ready session
//!   ├── JobResultStore::create        (Queued)
//!   └── spawn ─► MediaResolver::resolve (once, optional)
//!               └── for each contact:
//!                     TemplateEngine::render → session.send → store.append
//!                     sleep(rand[min, max])  (not after the last one)
//! ```

pub mod engine;
pub mod media;
pub mod store;
pub mod template;

pub use engine::{BulkDispatchScheduler, JobHandle};
pub use media::MediaResolver;
pub use store::JobResultStore;
pub use template::TemplateEngine;
