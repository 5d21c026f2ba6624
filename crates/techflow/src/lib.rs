//! The TechFlow Assist demo: a support chat session and a support-log
//! dashboard built on [`techflow_core`].
//!
//! The crate includes a CLI tool for trying both features in the terminal.
//! You can also use it as a library to drive them from your own host app.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod dashboard;
mod demo;
mod session;

pub use dashboard::Dashboard;
pub use demo::demo_logs;
pub use session::{ChatSession, FALLBACK_REPLY, GREETING};

/// Re-exports of [`techflow_core`] crate.
pub mod core {
    pub use techflow_core::*;
}
