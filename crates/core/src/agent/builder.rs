use std::sync::Arc;

use math_assistant_model::ModelProvider;

use super::{Agent, AgentConfig, AgentPolicy, Error, Inner, prompt};
use crate::model_client::ModelClient;
use crate::tool::{Tool, ToolRegistry};

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: ToolRegistry,
    duplicate_tools: Vec<String>,
    config: AgentConfig,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder with an existing model client, so that the
    /// agent can share it with its tools.
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            tools: ToolRegistry::default(),
            duplicate_tools: vec![],
            config: AgentConfig {
                policy: AgentPolicy::default(),
                handle_parsing_errors: true,
                handle_tool_errors: true,
                max_iterations: 15,
            },
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        let name = tool.name().to_owned();
        if !self.tools.register(tool) {
            self.duplicate_tools.push(name);
        }
        self
    }

    /// Sets the decision policy.
    #[inline]
    pub fn policy(mut self, policy: AgentPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Whether unparsable model output is fed back as an observation
    /// (the default) or ends the run with an error.
    #[inline]
    pub fn handle_parsing_errors(mut self, handle: bool) -> Self {
        self.config.handle_parsing_errors = handle;
        self
    }

    /// Whether tool errors are fed back as an observation (the default) or
    /// end the run with an error.
    #[inline]
    pub fn handle_tool_errors(mut self, handle: bool) -> Self {
        self.config.handle_tool_errors = handle;
        self
    }

    /// Sets the maximum number of steps per run. Defaults to 15.
    #[inline]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<Agent, Error> {
        let Self {
            model_client,
            tools,
            duplicate_tools,
            config,
        } = self;

        if let Some(name) = duplicate_tools.first() {
            return Err(Error::InvalidConfig(format!(
                "tool {name} is registered more than once"
            )));
        }
        if tools.is_empty() {
            return Err(Error::InvalidConfig("no tools registered".to_owned()));
        }
        if config.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be positive".to_owned(),
            ));
        }

        let prompt = match config.policy {
            AgentPolicy::ZeroShotReact => prompt::create_prompt(&tools)?,
        };
        debug!("built agent with tools {:?}", tools.names());
        Ok(Agent {
            inner: Arc::new(Inner {
                model_client,
                tools,
                prompt,
                config,
            }),
        })
    }
}
