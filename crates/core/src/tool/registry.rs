use std::sync::Arc;

use super::{DynTool, Tool, ToolResult};

/// An ordered set of tools with unique names.
///
/// The order is the registration order, and it is the order the tools are
/// presented to the model in.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn DynTool>>,
}

impl ToolRegistry {
    /// Registers a tool.
    ///
    /// Returns `false`, leaving the registry unchanged, if a tool with the
    /// same name exists.
    pub fn register<T: Tool>(&mut self, tool: T) -> bool {
        if self.contains(tool.name()) {
            return false;
        }
        self.tools.push(Arc::new(tool));
        true
    }

    /// Returns `true` if a tool is registered under `name`.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if there are no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the tool names in order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.tool_name()).collect()
    }

    /// Returns one `name: description` line per tool.
    pub fn descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|tool| {
                format!("{}: {}", tool.tool_name(), tool.tool_description())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Executes the tool named `name`, or returns `None` if there is none.
    pub fn execute(
        &self,
        name: &str,
        input: String,
    ) -> Option<impl Future<Output = ToolResult> + Send + 'static> {
        let tool = self.get(name)?;
        debug!("dispatching to {name}");
        Some(tool.call(input))
    }

    fn get(&self, name: &str) -> Option<&Arc<dyn DynTool>> {
        self.tools.iter().find(|tool| tool.tool_name() == name)
    }
}
