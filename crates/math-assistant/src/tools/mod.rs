//! The tools offered to the agent.

mod calculator;
mod reasoning;
mod wikipedia;

use math_assistant_core::chain;
use math_assistant_core::tool::{Error as ToolError, ErrorKind};
use math_assistant_core::{AgentBuilder, AgentPolicy, ModelClient};

pub use calculator::CalculatorTool;
pub use reasoning::ReasoningTool;
pub use wikipedia::{WikipediaConfig, WikipediaTool};

/// The built-in tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Wikipedia search.
    Search,
    /// Math problems solved through an evaluated expression.
    Calculator,
    /// Free-form reasoning by the model.
    Reasoning,
}

impl ToolKind {
    /// All built-in tools, in the order they are offered to the model.
    pub const ALL: [ToolKind; 3] =
        [ToolKind::Search, ToolKind::Calculator, ToolKind::Reasoning];

    /// Returns the name the model uses to pick the tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Search => "Wikipedia",
            ToolKind::Calculator => "Calculator",
            ToolKind::Reasoning => "Reasoning Tool",
        }
    }

    /// Returns the description the model reads when picking a tool.
    pub fn description(self) -> &'static str {
        match self {
            ToolKind::Search => {
                "Search and Solve Wikipedia for information on the topics mentioned"
            }
            ToolKind::Calculator => {
                "Tool for answering math problems that involve calculations. Only mathematically expressions are supported."
            }
            ToolKind::Reasoning => {
                "Reasoning Tool for answering logic-based and reasoning questions. Do not use this tool for numerical values. If the user asks for a numerical value, provide the result directly."
            }
        }
    }
}

/// Returns an agent builder with every built-in tool registered.
pub fn agent_builder(
    model_client: ModelClient,
    wikipedia: WikipediaConfig,
) -> AgentBuilder {
    let builder = AgentBuilder::with_model_client(model_client.clone())
        .policy(AgentPolicy::ZeroShotReact);
    ToolKind::ALL
        .into_iter()
        .fold(builder, |builder, kind| match kind {
            ToolKind::Search => {
                builder.with_tool(WikipediaTool::new(wikipedia.clone()))
            }
            ToolKind::Calculator => {
                builder.with_tool(CalculatorTool::new(model_client.clone()))
            }
            ToolKind::Reasoning => {
                builder.with_tool(ReasoningTool::new(model_client.clone()))
            }
        })
}

fn chain_error(err: chain::Error) -> ToolError {
    let kind = match &err {
        chain::Error::Model(_) => ErrorKind::Unavailable,
        _ => ErrorKind::ExecutionError,
    };
    ToolError::new(kind, err.to_string())
}
