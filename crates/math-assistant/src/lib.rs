//! A web assistant that solves math problems and searches Wikipedia.
//!
//! Questions are answered by a ReAct agent choosing between a Wikipedia
//! search, a calculator and a reasoning tool. Each browser session owns a
//! [`Session`] actor holding its conversation.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod server;
pub mod session;
pub mod tools;

pub use config::{AppConfig, ConfigError};
pub use session::{Session, SessionError, SessionSnapshot, SubmitOutcome};

/// Re-exports of [`math_assistant_core`] crate.
pub mod core {
    pub use math_assistant_core::*;
}
