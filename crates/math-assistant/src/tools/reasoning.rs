use std::sync::LazyLock;

use math_assistant_core::ModelClient;
use math_assistant_core::chain::LlmChain;
use math_assistant_core::prompt::PromptTemplate;
use math_assistant_core::tool::{Tool, ToolResult};

use super::{ToolKind, chain_error};

static REASONING_PROMPT: LazyLock<PromptTemplate> = LazyLock::new(|| {
    PromptTemplate::new(include_str!("reasoning_prompt.md"))
        .expect("reasoning prompt must be a valid template")
});

/// Answers logic questions with step-by-step explanations from the model.
pub struct ReasoningTool {
    chain: LlmChain,
}

impl ReasoningTool {
    /// Creates a new reasoning tool.
    #[inline]
    pub fn new(model_client: ModelClient) -> Self {
        Self {
            chain: LlmChain::new(model_client, REASONING_PROMPT.clone()),
        }
    }
}

impl Tool for ReasoningTool {
    fn name(&self) -> &str {
        ToolKind::Reasoning.name()
    }

    fn description(&self) -> &str {
        ToolKind::Reasoning.description()
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move {
            chain
                .run(&[("question", input.as_str())])
                .await
                .map_err(chain_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use math_assistant_model::{ModelMessage, ModelRequest};
    use math_assistant_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    #[tokio::test]
    async fn test_execute() {
        let provider = TestModelProvider::with_responses([PresetResponse::text(
            "1. Each box holds 4 apples.\n2. 3 boxes hold 12 apples.",
        )]);
        let tool = ReasoningTool::new(ModelClient::new(provider.clone()));
        assert_eq!(tool.name(), "Reasoning Tool");

        let answer = tool
            .execute("How many apples are in 3 boxes of 4?".to_owned())
            .await
            .unwrap();
        assert_eq!(
            answer,
            "1. Each box holds 4 apples.\n2. 3 boxes hold 12 apples."
        );

        let requests = provider.requests();
        let ModelRequest { messages, stop } = &requests[0];
        assert!(stop.is_empty());
        let [ModelMessage::User(prompt)] = messages.as_slice() else {
            panic!("unexpected messages: {messages:?}");
        };
        assert!(prompt.starts_with(
            "You are an agent tasked for solving user's mathematical problems."
        ));
        assert!(prompt.ends_with(
            "Question: How many apples are in 3 boxes of 4?\nAnswer: \n"
        ));
    }
}
