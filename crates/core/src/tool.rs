//! Tool supports.

mod error;
mod object;
mod registry;

pub use error::{Error, ErrorKind};
pub(crate) use object::DynTool;
pub use registry::ToolRegistry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the agent.
///
/// Tools take free text in and give free text back. The description is
/// the only thing the model sees when deciding which tool to use, so it
/// should say what the tool is good for.
///
/// Implementations of this trait should be stateless. Shared clients or
/// chains can be held as immutable state set during initialization, and
/// cloned into the future when executing.
pub trait Tool: Send + Sync + 'static {
    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
