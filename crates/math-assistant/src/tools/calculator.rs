use math_assistant_core::ModelClient;
use math_assistant_core::chain::MathChain;
use math_assistant_core::tool::{Tool, ToolResult};

use super::{ToolKind, chain_error};

/// Solves math problems by evaluating an expression written by the model.
pub struct CalculatorTool {
    chain: MathChain,
}

impl CalculatorTool {
    /// Creates a new calculator tool.
    #[inline]
    pub fn new(model_client: ModelClient) -> Self {
        Self {
            chain: MathChain::new(model_client),
        }
    }
}

impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        ToolKind::Calculator.name()
    }

    fn description(&self) -> &str {
        ToolKind::Calculator.description()
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move { chain.run(&input).await.map_err(chain_error) }
    }
}
