use std::future::ready;
use std::sync::Mutex;

use math_assistant_model::{ModelMessage, ModelRequest};
use math_assistant_test_model::{
    PresetEvent, PresetResponse, TestModelProvider,
};

use super::*;
use crate::chain::MathChain;
use crate::tool::{self, Tool, ToolResult};

struct Calculator(MathChain);

impl Tool for Calculator {
    fn name(&self) -> &str {
        "Calculator"
    }

    fn description(&self) -> &str {
        "Useful for arithmetic."
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.0.clone();
        async move {
            chain.run(&input).await.map_err(|err| {
                tool::Error::execution_error(err.to_string())
            })
        }
    }
}

struct Echo;

impl Tool for Echo {
    fn name(&self) -> &str {
        "Echo"
    }

    fn description(&self) -> &str {
        "Repeats the input."
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(input))
    }
}

struct Broken;

impl Tool for Broken {
    fn name(&self) -> &str {
        "Broken"
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    fn execute(
        &self,
        _input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Err(tool::Error::unavailable("offline")))
    }
}

fn prompt_of(req: &ModelRequest) -> &str {
    match req.messages.as_slice() {
        [ModelMessage::User(prompt)] => prompt,
        other => panic!("unexpected messages: {other:?}"),
    }
}

fn echo_agent(provider: &TestModelProvider) -> AgentBuilder {
    AgentBuilder::with_model_provider(provider.clone())
        .with_tool(Echo)
        .with_tool(Broken)
}

#[tokio::test]
async fn test_pi_via_calculator() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::text(
            " I need the value of pi to 10 decimal places.\nAction: Calculator\nAction Input: pi rounded to 10 decimal places",
        ),
        PresetResponse::text("```text\nround(pi * 10**10) / 10**10\n```\n"),
        PresetResponse::text(
            " I now know the final answer\nFinal Answer: 3.1415926536",
        ),
    ]);
    let model_client = ModelClient::new(provider.clone());
    let agent = AgentBuilder::with_model_client(model_client.clone())
        .with_tool(Calculator(MathChain::new(model_client)))
        .build()
        .unwrap();

    let events = Mutex::new(vec![]);
    let output = agent
        .run(
            "What is the numerical value of pi to 10 decimal places? Please provide only the numerical result, without any code or explanations.",
            |event| {
                if !matches!(event, AgentEvent::Delta { .. }) {
                    events.lock().unwrap().push(event);
                }
            },
        )
        .await
        .unwrap();

    let value: f64 = output.parse().unwrap();
    assert!((value - 3.1415926536).abs() < 1e-10);

    let events = events.into_inner().unwrap();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        AgentEvent::Action { tool, input, .. }
            if tool == "Calculator" && input == "pi rounded to 10 decimal places"
    ));
    assert!(matches!(
        &events[1],
        AgentEvent::Observation { observation, .. }
            if observation.starts_with("Answer: 3.14159265")
    ));
    assert!(matches!(&events[2], AgentEvent::Finish { .. }));

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].stop, ["\nObservation:", "\n\tObservation:"]);
    assert_eq!(requests[1].stop, ["```output"]);
    assert!(
        prompt_of(&requests[2])
            .contains("Action Input: pi rounded to 10 decimal places\nObservation: Answer: 3.14159265")
    );
    assert!(prompt_of(&requests[2]).ends_with("\nThought: "));
}

#[tokio::test]
async fn test_prompt() {
    let provider =
        TestModelProvider::with_responses([PresetResponse::text("Final Answer: hi")]);
    let agent = echo_agent(&provider).build().unwrap();
    assert_eq!(agent.tool_names(), ["Echo", "Broken"]);

    let output = agent.invoke(AgentInput::new("Say hi")).await.unwrap();
    assert_eq!(output.output, "hi");
    assert!(output.steps.is_empty());

    let expected = "Answer the following questions as best you can. You have access to the following tools:

Echo: Repeats the input.
Broken: Always fails.

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [Echo, Broken]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: Say hi
Thought:";
    assert_eq!(prompt_of(&provider.requests()[0]), expected);
}

#[tokio::test]
async fn test_parsing_error_is_fed_back() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::text("The answer is obviously 4."),
        PresetResponse::text(" I now know the final answer\nFinal Answer: 4"),
    ]);
    let agent = echo_agent(&provider).build().unwrap();

    let output = agent.invoke(AgentInput::new("2 + 2?")).await.unwrap();
    assert_eq!(output.output, "4");
    assert_eq!(output.steps.len(), 1);
    let step = &output.steps[0];
    assert_eq!(step.action.tool, EXCEPTION_TOOL);
    assert_eq!(step.action.log, "The answer is obviously 4.");
    assert_eq!(
        step.observation,
        "Invalid Format: Missing 'Action:' after 'Thought:'"
    );
    assert!(prompt_of(&provider.requests()[1]).ends_with(
        "Thought:The answer is obviously 4.\nObservation: Invalid Format: Missing 'Action:' after 'Thought:'\nThought: "
    ));
}

#[tokio::test]
async fn test_parsing_error_not_handled() {
    let provider = TestModelProvider::with_responses([PresetResponse::text(
        "Action: Echo",
    )]);
    let agent = echo_agent(&provider)
        .handle_parsing_errors(false)
        .build()
        .unwrap();

    let err = agent.invoke(AgentInput::new("hi")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::OutputParsing(ref err) if err.kind() == ParseErrorKind::MissingActionInput
    ));
}

#[tokio::test]
async fn test_unknown_tool() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::text("Action: Search\nAction Input: pi"),
        PresetResponse::text("Final Answer: unknown"),
    ]);
    let agent = echo_agent(&provider).build().unwrap();

    let output = agent.invoke(AgentInput::new("hi")).await.unwrap();
    assert_eq!(
        output.steps[0].observation,
        "Search is not a valid tool, try one of [Echo, Broken]."
    );
}

#[tokio::test]
async fn test_tool_errors() {
    let script = || {
        [
            PresetResponse::text("Action: Broken\nAction Input: \"now\""),
            PresetResponse::text("Final Answer: gave up"),
        ]
    };

    let provider = TestModelProvider::with_responses(script());
    let agent = echo_agent(&provider).build().unwrap();
    let output = agent.invoke(AgentInput::new("hi")).await.unwrap();
    assert_eq!(output.steps[0].action.tool_input, "now");
    assert_eq!(output.steps[0].observation, "Error: offline");
    assert_eq!(output.output, "gave up");

    let provider = TestModelProvider::with_responses(script());
    let agent = echo_agent(&provider)
        .handle_tool_errors(false)
        .build()
        .unwrap();
    let err = agent.invoke(AgentInput::new("hi")).await.unwrap_err();
    assert!(matches!(err, Error::Tool { ref tool, .. } if tool == "Broken"));
}

#[tokio::test]
async fn test_iteration_limit() {
    let provider = TestModelProvider::with_responses(
        (0..3).map(|_| PresetResponse::text("Action: Echo\nAction Input: again")),
    );
    let agent = echo_agent(&provider).max_iterations(3).build().unwrap();

    let events = Mutex::new(vec![]);
    let output = agent
        .run("loop forever", |event| events.lock().unwrap().push(event))
        .await
        .unwrap();
    assert_eq!(output, ITERATION_LIMIT_OUTPUT);
    assert_eq!(provider.remaining(), 0);
    assert_eq!(
        events.into_inner().unwrap().last(),
        Some(&AgentEvent::IterationLimit { iterations: 3 })
    );
}

#[tokio::test]
async fn test_model_error() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::with_events([PresetEvent::Fail(
            "bad request".to_owned(),
        )]),
    ]);
    let agent = echo_agent(&provider).build().unwrap();
    let err = agent.invoke(AgentInput::new("hi")).await.unwrap_err();
    assert!(matches!(err, Error::Model(_)));
}

#[test]
fn test_builder_errors() {
    let provider = TestModelProvider::default();
    let cases = [
        AgentBuilder::with_model_provider(provider.clone()),
        echo_agent(&provider).with_tool(Echo),
        echo_agent(&provider).max_iterations(0),
    ];
    for builder in cases {
        assert!(matches!(builder.build(), Err(Error::InvalidConfig(_))));
    }
}
