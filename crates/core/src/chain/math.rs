use std::sync::LazyLock;

use regex::Regex;

use super::{Error, LlmChain, evaluate};
use crate::model_client::ModelClient;
use crate::prompt::PromptTemplate;

static MATH_PROMPT: LazyLock<PromptTemplate> = LazyLock::new(|| {
    PromptTemplate::new(include_str!("math_prompt.md"))
        .expect("math prompt must be a valid template")
});

static TEXT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```text(.*?)```").expect("text block regex must compile")
});

const STOP: &str = "```output";

/// Answers math problems by having the model write an expression, then
/// evaluating that expression locally.
#[derive(Clone)]
pub struct MathChain {
    llm: LlmChain,
}

impl MathChain {
    /// Creates a chain with the built-in prompt.
    pub fn new(model_client: ModelClient) -> Self {
        let llm = LlmChain::new(model_client, MATH_PROMPT.clone()).with_stop([STOP]);
        Self { llm }
    }

    /// Solves `question`, returning `Answer: {value}`.
    pub async fn run(&self, question: &str) -> Result<String, Error> {
        let output = self.llm.run(&[("question", question)]).await?;
        debug!("math chain output: {output:?}");
        process_output(&output)
    }
}

fn process_output(output: &str) -> Result<String, Error> {
    let output = output.trim();
    if let Some(captures) = TEXT_BLOCK.captures(output) {
        let expression = captures.get(1).map_or("", |m| m.as_str());
        return Ok(format!("Answer: {}", evaluate(expression)?));
    }
    if output.starts_with("Answer:") {
        return Ok(output.to_owned());
    }
    match output.rsplit_once("Answer:") {
        Some((_, answer)) => Ok(format!("Answer: {answer}")),
        None => Err(Error::UnknownFormat(output.to_owned())),
    }
}
