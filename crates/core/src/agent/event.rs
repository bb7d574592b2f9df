use serde::{Deserialize, Serialize};

/// Progress reported while an agent runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A piece of model output as it streams in.
    Delta {
        /// The new text.
        text: String,
    },
    /// The model chose a tool.
    Action {
        /// The tool name as written by the model.
        tool: String,
        /// The tool input.
        input: String,
        /// The model output for this step.
        log: String,
    },
    /// A tool call finished.
    Observation {
        /// The tool name as written by the model.
        tool: String,
        /// What is fed back to the model.
        observation: String,
    },
    /// The model output could not be parsed and a correction is fed back.
    InvalidOutput {
        /// The model output for this step.
        log: String,
        /// What is fed back to the model.
        observation: String,
    },
    /// The model gave its final answer.
    Finish {
        /// The answer.
        output: String,
        /// The model output for this step.
        log: String,
    },
    /// The run was stopped before a final answer.
    IterationLimit {
        /// The number of steps taken.
        iterations: usize,
    },
}
