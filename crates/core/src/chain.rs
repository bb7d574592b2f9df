//! Chains: a prompt template plus a model call.

mod expr;
mod llm;
mod math;

use std::fmt::{self, Display};

use math_assistant_model::ModelProviderError;

pub use expr::evaluate;
pub use llm::LlmChain;
pub use math::MathChain;

use crate::prompt;

/// Errors returned by chains.
#[derive(Debug)]
pub enum Error {
    /// The prompt could not be rendered.
    Prompt(prompt::Error),
    /// The model request failed.
    Model(Box<dyn ModelProviderError>),
    /// The model output matched none of the expected shapes.
    UnknownFormat(String),
    /// The expression could not be evaluated.
    Evaluation {
        /// The expression as written by the model.
        expression: String,
        /// Why the evaluation failed.
        reason: String,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Prompt(err) => write!(f, "{err}"),
            Error::Model(err) => write!(f, "model request failed: {err}"),
            Error::UnknownFormat(output) => {
                write!(f, "unknown format from LLM: {output}")
            }
            Error::Evaluation { expression, reason } => write!(
                f,
                "failed to evaluate \"{expression}\": {reason}. Please try again with a valid numerical expression"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<prompt::Error> for Error {
    #[inline]
    fn from(err: prompt::Error) -> Self {
        Error::Prompt(err)
    }
}

impl From<Box<dyn ModelProviderError>> for Error {
    #[inline]
    fn from(err: Box<dyn ModelProviderError>) -> Self {
        Error::Model(err)
    }
}
