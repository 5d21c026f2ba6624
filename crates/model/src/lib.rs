//! A provider-neutral protocol for talking to generative-AI services.
//!
//! This crate establishes the contract between the orchestration layer and
//! the concrete model providers (a remote service, or a scripted fake for
//! tests), so that the callers never depend on a specific vendor API.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
