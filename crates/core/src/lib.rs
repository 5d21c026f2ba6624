//! Orchestration between a presentation layer and a generative-AI service.
//!
//! Two clients are provided: [`ConversationClient`] for the support chat
//! assistant and [`AnalysisClient`] for the support-log dashboard. Each call
//! issues exactly one provider request and returns a typed result.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod analysis;
pub mod chat;
pub mod conversation;
mod error;
mod model_client;

pub use analysis::{AnalysisClient, AnalysisResult, LogRecord, Topic};
pub use chat::ConversationClient;
pub use conversation::{Conversation, Message, Role};
pub use error::{Error, ErrorKind};
