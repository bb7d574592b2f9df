use std::sync::LazyLock;

use regex::Regex;

use super::AgentAction;
use super::error::{ParseError, ParseErrorKind};

const FINAL_ANSWER: &str = "Final Answer:";

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action regex must compile")
});

static ACTION_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:").expect("action regex must compile")
});

static ACTION_INPUT_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*Input\s*\d*\s*:")
        .expect("action input regex must compile")
});

/// What the model decided to do in one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Parsed {
    Action(AgentAction),
    Finish { output: String, log: String },
}

pub(crate) fn parse(text: &str) -> Result<Parsed, ParseError> {
    let final_answer_at = text.find(FINAL_ANSWER);
    let action = ACTION.captures(text);

    match (action, final_answer_at) {
        (Some(captures), Some(final_answer_at)) => {
            let action_at = captures.get(0).map_or(0, |m| m.start());
            // The model answered and then went on to hallucinate an action.
            if final_answer_at < action_at {
                let start = final_answer_at + FINAL_ANSWER.len();
                let end = text[start..]
                    .find("\n\n")
                    .map_or(text.len(), |idx| start + idx);
                return Ok(Parsed::Finish {
                    output: text[start..end].trim().to_owned(),
                    log: text[..end].to_owned(),
                });
            }
            Err(ParseError::new(ParseErrorKind::FinalAnswerAndAction, text))
        }
        (Some(captures), None) => {
            let tool = captures.get(1).map_or("", |m| m.as_str()).trim();
            let tool_input = captures
                .get(2)
                .map_or("", |m| m.as_str())
                .trim()
                .trim_matches('"');
            Ok(Parsed::Action(AgentAction {
                tool: tool.to_owned(),
                tool_input: tool_input.to_owned(),
                log: text.to_owned(),
            }))
        }
        (None, Some(final_answer_at)) => {
            let output = &text[final_answer_at + FINAL_ANSWER.len()..];
            // Only the text after the last marker counts.
            let output = output.rsplit(FINAL_ANSWER).next().unwrap_or(output);
            Ok(Parsed::Finish {
                output: output.trim().to_owned(),
                log: text.to_owned(),
            })
        }
        (None, None) => {
            let kind = if !ACTION_ONLY.is_match(text) {
                ParseErrorKind::MissingAction
            } else if !ACTION_INPUT_ONLY.is_match(text) {
                ParseErrorKind::MissingActionInput
            } else {
                ParseErrorKind::Unparsable
            };
            Err(ParseError::new(kind, text))
        }
    }
}
