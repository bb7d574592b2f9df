//! An abstraction layer for text-completion LLMs.
//!
//! The agent and the chains only ever need one thing from a model: send a
//! prompt, receive the completion as a stream of text deltas. This crate
//! pins down that protocol so that the hosted provider and the scripted
//! test provider are interchangeable.
//!
//! Nothing here talks to a network; see the provider crates for that.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
