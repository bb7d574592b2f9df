use std::pin::Pin;

use tracing::Instrument;

use super::{Tool, ToolResult};

pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Object-safe view of a [`Tool`], so that tools of different types can be
/// stored together.
pub(crate) trait DynTool: Send + Sync + 'static {
    fn tool_name(&self) -> &str;

    fn tool_description(&self) -> &str;

    fn call(&self, input: String) -> ToolFuture;
}

impl<T: Tool> DynTool for T {
    #[inline]
    fn tool_name(&self) -> &str {
        self.name()
    }

    #[inline]
    fn tool_description(&self) -> &str {
        self.description()
    }

    fn call(&self, input: String) -> ToolFuture {
        let span = debug_span!("tool execute", tool = self.name());
        trace!(parent: &span, "input: {input:?}");
        let fut = self.execute(input);
        Box::pin(
            async move {
                let result = fut.await;
                match &result {
                    Ok(output) => debug!(len = output.len(), "tool succeeded"),
                    Err(err) => debug!("tool failed: {err}"),
                }
                result
            }
            .instrument(span),
        )
    }
}
