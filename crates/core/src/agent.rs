mod builder;
mod error;
mod event;
mod parser;
mod prompt;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use math_assistant_model::ModelRequest;
use tracing::Instrument;

use crate::model_client::ModelClient;
use crate::prompt::PromptTemplate;
use crate::tool::ToolRegistry;
pub use builder::AgentBuilder;
pub use error::{Error, ParseError, ParseErrorKind};
pub use event::AgentEvent;
use parser::Parsed;

/// The output when the agent runs out of iterations.
pub const ITERATION_LIMIT_OUTPUT: &str =
    "Agent stopped due to iteration limit or time limit.";

/// The pseudo tool recorded for outputs that failed to parse.
pub const EXCEPTION_TOOL: &str = "_Exception";

/// How the agent decides on its next step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentPolicy {
    /// Picks tools from their descriptions alone, writing a
    /// Thought/Action/Observation transcript.
    #[default]
    ZeroShotReact,
}

/// The input of [`Agent::invoke`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentInput {
    /// The question to answer.
    pub input: String,
}

impl AgentInput {
    /// Creates an input from a question.
    #[inline]
    pub fn new<S: Into<String>>(input: S) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A tool the model asked for, with the output that asked for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentAction {
    /// The tool name as written by the model.
    pub tool: String,
    /// The input for the tool.
    pub tool_input: String,
    /// The whole model output for this step.
    pub log: String,
}

/// One completed step of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentStep {
    /// What the model asked for.
    pub action: AgentAction,
    /// What was fed back.
    pub observation: String,
}

/// The output of [`Agent::invoke`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentOutput {
    /// The final answer.
    pub output: String,
    /// The intermediate steps, in order.
    pub steps: Vec<AgentStep>,
}

struct AgentConfig {
    policy: AgentPolicy,
    handle_parsing_errors: bool,
    handle_tool_errors: bool,
    max_iterations: usize,
}

struct Inner {
    model_client: ModelClient,
    tools: ToolRegistry,
    prompt: PromptTemplate,
    config: AgentConfig,
}

/// An agent that answers questions by letting the model call tools.
///
/// An agent holds no per-run state, so one instance can serve concurrent
/// runs. Clones share the same configuration.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<Inner>,
}

impl Agent {
    /// Returns the names of the registered tools, in prompt order.
    #[inline]
    pub fn tool_names(&self) -> Vec<&str> {
        self.inner.tools.names()
    }

    /// Returns the decision policy.
    #[inline]
    pub fn policy(&self) -> AgentPolicy {
        self.inner.config.policy
    }

    /// Returns the maximum number of steps per run.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.inner.config.max_iterations
    }

    /// Answers a question, returning the intermediate steps as well.
    pub async fn invoke(&self, input: AgentInput) -> Result<AgentOutput, Error> {
        self.execute(&input.input, &|_: AgentEvent| {}).await
    }

    /// Answers a question, reporting progress to `on_event`.
    pub async fn run(
        &self,
        question: &str,
        on_event: impl Fn(AgentEvent) + Send + Sync,
    ) -> Result<String, Error> {
        let output = self.execute(question, &on_event).await?;
        Ok(output.output)
    }

    async fn execute(
        &self,
        question: &str,
        on_event: &(dyn Fn(AgentEvent) + Send + Sync),
    ) -> Result<AgentOutput, Error> {
        let span =
            debug_span!("agent run", policy = ?self.inner.config.policy);
        self.iterate(question, on_event).instrument(span).await
    }

    async fn iterate(
        &self,
        question: &str,
        on_event: &(dyn Fn(AgentEvent) + Send + Sync),
    ) -> Result<AgentOutput, Error> {
        let config = &self.inner.config;
        let mut steps: Vec<AgentStep> = vec![];
        while steps.len() < config.max_iterations {
            let step = self.plan(question, &steps, on_event).await?;
            let action = match step {
                Ok(Parsed::Finish { output, log }) => {
                    debug!("finished after {} steps", steps.len());
                    on_event(AgentEvent::Finish {
                        output: output.clone(),
                        log,
                    });
                    return Ok(AgentOutput { output, steps });
                }
                Ok(Parsed::Action(action)) => action,
                Err(err) if config.handle_parsing_errors => {
                    warn!("invalid model output: {err}");
                    let observation = err.observation().to_owned();
                    on_event(AgentEvent::InvalidOutput {
                        log: err.llm_output().to_owned(),
                        observation: observation.clone(),
                    });
                    steps.push(AgentStep {
                        action: AgentAction {
                            tool: EXCEPTION_TOOL.to_owned(),
                            tool_input: observation.clone(),
                            log: err.llm_output().to_owned(),
                        },
                        observation,
                    });
                    continue;
                }
                Err(err) => return Err(Error::OutputParsing(err)),
            };

            on_event(AgentEvent::Action {
                tool: action.tool.clone(),
                input: action.tool_input.clone(),
                log: action.log.clone(),
            });
            let observation = self.take_action(&action).await?;
            on_event(AgentEvent::Observation {
                tool: action.tool.clone(),
                observation: observation.clone(),
            });
            steps.push(AgentStep {
                action,
                observation,
            });
        }

        warn!("stopped after {} steps", steps.len());
        on_event(AgentEvent::IterationLimit {
            iterations: steps.len(),
        });
        Ok(AgentOutput {
            output: ITERATION_LIMIT_OUTPUT.to_owned(),
            steps,
        })
    }

    /// Asks the model for the next step.
    async fn plan(
        &self,
        question: &str,
        steps: &[AgentStep],
        on_event: &(dyn Fn(AgentEvent) + Send + Sync),
    ) -> Result<Result<Parsed, ParseError>, Error> {
        let scratchpad = prompt::scratchpad(
            steps
                .iter()
                .map(|step| (step.action.log.as_str(), step.observation.as_str())),
        );
        let text = self.inner.prompt.format(&[
            ("input", question),
            ("agent_scratchpad", scratchpad.as_str()),
        ])?;
        let req = ModelRequest::from_prompt(text).with_stop(prompt::STOP);
        let completion = self
            .inner
            .model_client
            .complete(req, |delta| {
                on_event(AgentEvent::Delta {
                    text: delta.to_owned(),
                })
            })
            .await
            .map_err(Error::Model)?;
        trace!("model output: {:?}", completion.text);
        Ok(parser::parse(&completion.text))
    }

    async fn take_action(&self, action: &AgentAction) -> Result<String, Error> {
        let tools = &self.inner.tools;
        let Some(fut) = tools.execute(&action.tool, action.tool_input.clone())
        else {
            warn!("model asked for unknown tool {:?}", action.tool);
            return Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                action.tool,
                tools.names().join(", ")
            ));
        };

        match fut.await {
            Ok(observation) => Ok(observation),
            Err(error) if self.inner.config.handle_tool_errors => {
                warn!("tool {} failed: {error}", action.tool);
                Ok(format!("Error: {}", error.reason()))
            }
            Err(error) => Err(Error::Tool {
                tool: action.tool.clone(),
                error,
            }),
        }
    }
}
