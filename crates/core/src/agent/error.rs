use std::fmt::{self, Display};

use math_assistant_model::ModelProviderError;

use crate::{prompt, tool};

const MISSING_ACTION: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
const MISSING_ACTION_INPUT: &str =
    "Invalid Format: Missing 'Action Input:' after 'Action:'";
const INVALID_OR_INCOMPLETE: &str = "Invalid or incomplete response";

/// Why the model output could not be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Neither an action nor a final answer.
    MissingAction,
    /// An action without its input.
    MissingActionInput,
    /// An action followed by a final answer.
    FinalAnswerAndAction,
    /// Anything else.
    Unparsable,
}

/// A model output that is neither a valid action nor a final answer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParseError {
    kind: ParseErrorKind,
    llm_output: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, llm_output: &str) -> Self {
        Self {
            kind,
            llm_output: llm_output.to_owned(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Returns the offending model output.
    #[inline]
    pub fn llm_output(&self) -> &str {
        &self.llm_output
    }

    /// Returns the observation fed back to the model so that it can
    /// correct itself.
    pub fn observation(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::MissingAction => MISSING_ACTION,
            ParseErrorKind::MissingActionInput => MISSING_ACTION_INPUT,
            ParseErrorKind::FinalAnswerAndAction
            | ParseErrorKind::Unparsable => INVALID_OR_INCOMPLETE,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseErrorKind::MissingAction | ParseErrorKind::MissingActionInput => {
                write!(f, "{}: `{}`", self.observation(), self.llm_output)
            }
            ParseErrorKind::FinalAnswerAndAction => write!(
                f,
                "Parsing LLM output produced both a final answer and a parse-able action: `{}`",
                self.llm_output
            ),
            ParseErrorKind::Unparsable => {
                write!(f, "Could not parse LLM output: `{}`", self.llm_output)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that abort an agent run or its construction.
#[derive(Debug)]
pub enum Error {
    /// The model request failed.
    Model(Box<dyn ModelProviderError>),
    /// The model output could not be parsed, and parsing errors are not
    /// handled.
    OutputParsing(ParseError),
    /// A tool failed, and tool errors are not handled.
    Tool {
        /// Name of the failing tool.
        tool: String,
        /// The tool's error.
        error: tool::Error,
    },
    /// The prompt could not be built or rendered.
    Prompt(prompt::Error),
    /// The builder was given an unusable configuration.
    InvalidConfig(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model(err) => write!(f, "model request failed: {err}"),
            Error::OutputParsing(err) => write!(f, "{err}"),
            Error::Tool { tool, error } => {
                write!(f, "tool {tool} failed: {}", error.reason())
            }
            Error::Prompt(err) => write!(f, "{err}"),
            Error::InvalidConfig(reason) => {
                write!(f, "invalid agent configuration: {reason}")
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations() {
        let err = ParseError::new(ParseErrorKind::MissingAction, "hmm");
        assert_eq!(err.observation(), MISSING_ACTION);
        assert_eq!(
            err.to_string(),
            "Invalid Format: Missing 'Action:' after 'Thought:': `hmm`"
        );
        let err = ParseError::new(ParseErrorKind::Unparsable, "x");
        assert_eq!(err.observation(), "Invalid or incomplete response");
    }
}
