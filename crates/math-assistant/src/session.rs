//! Chat sessions.
//!
//! Each session is an actor that owns its conversation. Questions are
//! answered one at a time; questions submitted while the agent is busy wait
//! in a queue.

use std::collections::VecDeque;
use std::fmt::{self, Debug};

use math_assistant_actor::{Actor, Message, define_actor};
use math_assistant_core::conversation::{
    Conversation, Message as ChatMessage, Role,
};
use math_assistant_core::{Agent, AgentError, AgentEvent};
use serde::Serialize;
use tokio::sync::oneshot;

/// The first message of every conversation.
pub const GREETING: &str = "Hello! I am an AI assistant. I can help you with math problems and data search. How can I help you today?";

/// Shown when an empty question is submitted.
pub const EMPTY_QUESTION_WARNING: &str =
    "Please enter a question to get an answer.";

/// Shown when no API key is configured.
pub const MISSING_KEY_NOTICE: &str =
    "Please set the GROQ_API_KEY environment variable to use this app.";

type EventCallback = Box<dyn Fn(AgentEvent) + Send + Sync>;
type Reply = oneshot::Sender<Result<SubmitOutcome, SessionError>>;

/// How a submission ended, when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The agent answered. Holds the appended assistant message.
    Answered(ChatMessage),
    /// The question was not accepted. Holds a warning.
    Rejected(String),
    /// The agent is not available. Holds a notice.
    Unavailable(String),
}

/// Errors returned by [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has ended.
    #[error("the session has ended")]
    Ended,
    /// The agent run failed.
    #[error("failed to answer: {0}")]
    Agent(#[from] AgentError),
}

/// What a session looks like at some point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// The conversation so far.
    pub messages: Vec<ChatMessage>,
    /// A notice to display, if the agent is unavailable.
    pub notice: Option<String>,
    /// Whether a question is being answered.
    pub busy: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingResponse,
}

struct Submission {
    question: String,
    on_event: EventCallback,
    reply: Reply,
}

impl Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("question", &self.question)
            .finish_non_exhaustive()
    }
}

struct SessionState {
    agent: Option<Agent>,
    conversation: Conversation,
    stage: Stage,
    pending: VecDeque<Submission>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.conversation.messages().to_vec(),
            notice: self
                .agent
                .is_none()
                .then(|| MISSING_KEY_NOTICE.to_owned()),
            busy: self.stage == Stage::AwaitingResponse,
        }
    }

    fn enqueue(&mut self, submission: Submission, actor: &Actor<Self>) {
        if submission.question.trim().is_empty() {
            submission
                .reply
                .send(Ok(SubmitOutcome::Rejected(
                    EMPTY_QUESTION_WARNING.to_owned(),
                )))
                .ok();
            return;
        }
        if self.agent.is_none() {
            warn!("question submitted without an API key");
            submission
                .reply
                .send(Ok(SubmitOutcome::Unavailable(
                    MISSING_KEY_NOTICE.to_owned(),
                )))
                .ok();
            return;
        }

        self.pending.push_back(submission);
        if self.stage == Stage::Idle {
            self.start_next(actor);
        } else {
            debug!("queued a question, {} waiting", self.pending.len());
        }
    }

    fn start_next(&mut self, actor: &Actor<Self>) {
        let Some(agent) = self.agent.clone() else {
            return;
        };
        let Some(Submission {
            question,
            on_event,
            reply,
        }) = self.pending.pop_front()
        else {
            return;
        };

        self.conversation.push(Role::User, question.as_str());
        self.stage = Stage::AwaitingResponse;

        let actor = actor.clone();
        tokio::spawn(async move {
            let result = agent.run(&question, move |event| on_event(event)).await;
            if actor.send(RunFinished { result, reply }).is_err() {
                debug!("session ended before the answer arrived");
            }
        });
    }
}

#[derive(Debug)]
struct RunFinished {
    result: Result<String, AgentError>,
    reply: Reply,
}

impl Message<SessionState> for RunFinished {
    fn handle(self, state: &mut SessionState, actor: &Actor<SessionState>) {
        let outcome = match self.result {
            Ok(answer) => {
                state.conversation.push(Role::Assistant, answer);
                let messages = state.conversation.messages();
                // The answer was just pushed, so the slice is never empty.
                Ok(SubmitOutcome::Answered(messages[messages.len() - 1].clone()))
            }
            Err(err) => {
                error!("agent run failed: {err}");
                Err(SessionError::Agent(err))
            }
        };
        self.reply.send(outcome).ok();

        state.stage = Stage::Idle;
        state.start_next(actor);
    }
}

define_actor! {
    /// A chat session, owning one conversation.
    ///
    /// Without an agent, the session only shows its greeting and answers
    /// every question with a notice.
    pub struct Session(SessionState);
}

impl Session {
    /// Starts a new session.
    pub fn new(label: &str, agent: Option<Agent>) -> Self {
        let state = SessionState {
            agent,
            conversation: Conversation::with_greeting(GREETING),
            stage: Stage::Idle,
            pending: VecDeque::new(),
        };
        Self::spawn(state, label)
    }

    /// Returns the current state of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.handle()
            .call(|state, _| state.snapshot())
            .await
            .map_err(|_| SessionError::Ended)
    }

    /// Submits a question and waits for its outcome.
    ///
    /// Progress of the agent run is reported to `on_event`. A non-empty
    /// question is appended verbatim, followed by the answer once the run
    /// succeeds.
    pub async fn submit(
        &self,
        question: &str,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Result<SubmitOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        let submission = Submission {
            question: question.to_owned(),
            on_event: Box::new(on_event),
            reply,
        };
        self.handle()
            .call(move |state, actor| state.enqueue(submission, actor))
            .await
            .map_err(|_| SessionError::Ended)?;
        rx.await.map_err(|_| SessionError::Ended)?
    }

    /// Ends the session. Pending questions are dropped.
    #[inline]
    pub fn end(&self) {
        self.handle().kill();
    }

    /// Returns `false` once the session has ended.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.handle().is_alive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use math_assistant_core::ModelClient;
    use math_assistant_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;
    use crate::tools::{WikipediaConfig, agent_builder};

    const PI_QUESTION: &str = "What is the numerical value of pi to 10 decimal places? Please provide only the numerical result, without any code or explanations.";

    fn agent_with(provider: &TestModelProvider) -> Agent {
        agent_builder(
            ModelClient::new(provider.clone()),
            WikipediaConfig::default(),
        )
        .build()
        .unwrap()
    }

    fn roles(snapshot: &SessionSnapshot) -> Vec<Role> {
        snapshot.messages.iter().map(ChatMessage::role).collect()
    }

    #[tokio::test]
    async fn test_greeting() {
        let session = Session::new("test", None);
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].role(), Role::Assistant);
        assert_eq!(snapshot.messages[0].content(), GREETING);
        assert_eq!(snapshot.notice.as_deref(), Some(MISSING_KEY_NOTICE));
        assert!(!snapshot.busy);
    }

    #[tokio::test]
    async fn test_pi_question() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::text(
                " I should calculate pi.\nAction: Calculator\nAction Input: pi to 10 decimal places",
            ),
            PresetResponse::text("```text\nround(pi * 10**10) / 10**10\n```"),
            PresetResponse::text(
                " I now know the final answer\nFinal Answer: 3.1415926536",
            ),
        ]);
        let session = Session::new("test", Some(agent_with(&provider)));

        let events = Arc::new(Mutex::new(vec![]));
        let outcome = session
            .submit(PI_QUESTION, {
                let events = Arc::clone(&events);
                move |event| events.lock().unwrap().push(event)
            })
            .await
            .unwrap();

        let SubmitOutcome::Answered(message) = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(message.role(), Role::Assistant);
        let value: f64 = message.content().parse().unwrap();
        assert!((value - 3.1415926536).abs() < 1e-10);

        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(
            roles(&snapshot),
            [Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(snapshot.messages[1].content(), PI_QUESTION);
        assert!(snapshot.notice.is_none());
        assert!(events.lock().unwrap().iter().any(|event| matches!(
            event,
            AgentEvent::Action { tool, .. } if tool == "Calculator"
        )));
    }

    #[tokio::test]
    async fn test_empty_question() {
        let provider = TestModelProvider::default();
        let session = Session::new("test", Some(agent_with(&provider)));
        for question in ["", "   \n\t"] {
            let outcome = session.submit(question, |_| {}).await.unwrap();
            assert_eq!(
                outcome,
                SubmitOutcome::Rejected(EMPTY_QUESTION_WARNING.to_owned())
            );
        }
        assert_eq!(session.snapshot().await.unwrap().messages.len(), 1);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_agent() {
        let session = Session::new("test", None);
        let outcome = session.submit("What is 2 + 2?", |_| {}).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Unavailable(MISSING_KEY_NOTICE.to_owned())
        );
        assert_eq!(session.snapshot().await.unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_queued_questions() {
        let mut provider = TestModelProvider::with_responses([
            PresetResponse::text("Final Answer: first"),
            PresetResponse::text("Final Answer: second"),
        ]);
        provider.set_delay(std::time::Duration::from_millis(5));
        let session = Session::new("test", Some(agent_with(&provider)));

        let (first, second) = tokio::join!(
            session.submit("one?", |_| {}),
            session.submit("two?", |_| {}),
        );
        assert!(matches!(first, Ok(SubmitOutcome::Answered(ref m)) if m.content() == "first"));
        assert!(matches!(second, Ok(SubmitOutcome::Answered(ref m)) if m.content() == "second"));

        let snapshot = session.snapshot().await.unwrap();
        let contents: Vec<_> =
            snapshot.messages.iter().map(ChatMessage::content).collect();
        assert_eq!(contents, [GREETING, "one?", "first", "two?", "second"]);
    }

    #[tokio::test]
    async fn test_agent_error() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::with_events([PresetEvent::Fail(
                "bad request".to_owned(),
            )]),
        ]);
        let session = Session::new("test", Some(agent_with(&provider)));

        let err = session.submit("hi", |_| {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Agent(AgentError::Model(_))));

        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(roles(&snapshot), [Role::Assistant, Role::User]);
        assert!(!snapshot.busy);
    }

    #[tokio::test]
    async fn test_end() {
        let session = Session::new("test", None);
        session.end();
        tokio::task::yield_now().await;
        assert!(matches!(
            session.submit("hi", |_| {}).await,
            Err(SessionError::Ended)
        ));
    }
}
