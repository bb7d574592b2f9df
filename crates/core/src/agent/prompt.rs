use crate::prompt::{self, PromptTemplate};
use crate::tool::ToolRegistry;

const PREFIX: &str = "Answer the following questions as best you can. You have access to the following tools:";

const FORMAT_INSTRUCTIONS: &str = "Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question";

const SUFFIX: &str = "Begin!

Question: {input}
Thought:{agent_scratchpad}";

/// Where the model must stop so that it never writes observations itself.
pub(crate) const STOP: [&str; 2] = ["\nObservation:", "\n\tObservation:"];

/// Builds the zero-shot prompt over `input` and `agent_scratchpad`.
pub(crate) fn create_prompt(
    tools: &ToolRegistry,
) -> Result<PromptTemplate, prompt::Error> {
    let template = [PREFIX, "{tools}", FORMAT_INSTRUCTIONS, SUFFIX].join("\n\n");
    Ok(PromptTemplate::new(&template)?
        .partial("tools", &tools.descriptions())
        .partial("tool_names", &tools.names().join(", ")))
}

/// Renders the steps taken so far the way the model would have written
/// them, so that it continues with a new thought.
pub(crate) fn scratchpad<'a>(
    steps: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut thoughts = String::new();
    for (log, observation) in steps {
        thoughts.push_str(log);
        thoughts.push_str("\nObservation: ");
        thoughts.push_str(observation);
        thoughts.push_str("\nThought: ");
    }
    thoughts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratchpad() {
        assert_eq!(scratchpad(Vec::<(&str, &str)>::new()), "");
        assert_eq!(
            scratchpad([
                (" I should add.\nAction: Calculator\nAction Input: 2 + 2", "Answer: 4"),
                ("oops", "Invalid or incomplete response"),
            ]),
            " I should add.\nAction: Calculator\nAction Input: 2 + 2\nObservation: Answer: 4\nThought: oops\nObservation: Invalid or incomplete response\nThought: "
        );
    }
}
