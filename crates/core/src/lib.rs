//! Core logic including the agent loop, chains, tool dispatch and
//! conversations.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod chain;
pub mod conversation;
mod model_client;
pub mod prompt;
pub mod tool;

pub use agent::{
    Agent, AgentAction, AgentBuilder, AgentEvent, AgentInput, AgentOutput,
    AgentPolicy, AgentStep, EXCEPTION_TOOL, Error as AgentError,
    ITERATION_LIMIT_OUTPUT, ParseError, ParseErrorKind,
};
pub use model_client::{Completion, ModelClient, RetryPolicy};
