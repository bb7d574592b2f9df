//! Prompt templates with `{variable}` placeholders.
//!
//! Literal braces are written doubled, `{{` and `}}`.

use std::borrow::Cow;
use std::fmt::{self, Display};

/// The kind of template error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A `{` without its closing `}`.
    UnclosedBrace,
    /// A single `}` outside of a placeholder.
    UnmatchedBrace,
    /// A placeholder whose name is not an identifier.
    InvalidVariable,
    /// No value was given for a variable.
    MissingVariable,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnclosedBrace => write!(f, "Unclosed brace"),
            ErrorKind::UnmatchedBrace => write!(f, "Unmatched closing brace"),
            ErrorKind::InvalidVariable => write!(f, "Invalid variable name"),
            ErrorKind::MissingVariable => write!(f, "Missing variable"),
        }
    }
}

/// Describes a template error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    detail: String,
}

impl Error {
    fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for Error {}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
}

/// A parsed prompt template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Parses a template.
    pub fn new(template: &str) -> Result<Self, Error> {
        let mut segments = vec![];
        let mut input_variables: Vec<String> = vec![];
        let mut text = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '{' if chars.next_if(|(_, c)| *c == '{').is_some() => {
                    text.push('{');
                }
                '}' if chars.next_if(|(_, c)| *c == '}').is_some() => {
                    text.push('}');
                }
                '}' => {
                    return Err(Error::new(
                        ErrorKind::UnmatchedBrace,
                        format!("at byte {idx}"),
                    ));
                }
                '{' => {
                    let rest = &template[idx + 1..];
                    let Some(len) = rest.find('}') else {
                        return Err(Error::new(
                            ErrorKind::UnclosedBrace,
                            format!("at byte {idx}"),
                        ));
                    };
                    let name = &rest[..len];
                    if !is_identifier(name) {
                        return Err(Error::new(
                            ErrorKind::InvalidVariable,
                            format!("{{{name}}}"),
                        ));
                    }
                    // Skip the name and the closing brace.
                    for _ in 0..=name.chars().count() {
                        chars.next();
                    }

                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    if !input_variables.iter().any(|v| v == name) {
                        input_variables.push(name.to_owned());
                    }
                    segments.push(Segment::Variable(name.to_owned()));
                }
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            segments,
            input_variables,
        })
    }

    /// Returns the variables in order of first appearance.
    #[inline]
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Renders the template. Values for unknown variables are ignored.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String, Error> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let Some((_, value)) =
                        values.iter().find(|(key, _)| key == name)
                    else {
                        return Err(Error::new(
                            ErrorKind::MissingVariable,
                            name.clone(),
                        ));
                    };
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Fills in one variable ahead of time, returning a template over the
    /// remaining ones.
    pub fn partial(&self, name: &str, value: &str) -> Self {
        let mut segments: Vec<Segment> = vec![];
        for segment in &self.segments {
            let text = match segment {
                Segment::Variable(v) if v == name => Cow::Borrowed(value),
                Segment::Text(text) => Cow::Borrowed(text.as_str()),
                Segment::Variable(_) => {
                    segments.push(segment.clone());
                    continue;
                }
            };
            match segments.last_mut() {
                Some(Segment::Text(prev)) => prev.push_str(&text),
                _ => segments.push(Segment::Text(text.into_owned())),
            }
        }
        let input_variables = self
            .input_variables
            .iter()
            .filter(|v| *v != name)
            .cloned()
            .collect();
        Self {
            segments,
            input_variables,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
