use std::fmt::{self, Display};

/// Broad classes of tool failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The agent passed input the tool cannot work with.
    InvalidInput,
    /// The tool ran but could not produce a result.
    ExecutionError,
    /// A service the tool depends on could not be reached.
    Unavailable,
}

impl ErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::ExecutionError => "execution error",
            ErrorKind::Unavailable => "service unavailable",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A failed tool call. The reason is what the agent sees as the
/// observation when tool errors are handled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: String,
}

impl Error {
    /// Creates an error of `kind`. An empty reason falls back to the
    /// kind's description.
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        let mut reason = reason.into();
        if reason.is_empty() {
            reason = kind.describe().to_owned();
        }
        Self { kind, reason }
    }

    /// Shorthand for [`ErrorKind::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, reason)
    }

    /// Shorthand for [`ErrorKind::ExecutionError`].
    pub fn execution_error(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecutionError, reason)
    }

    /// Shorthand for [`ErrorKind::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, reason)
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason, never empty.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Error {}
