//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use math_assistant_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        if this.event_idx > this.events.len() {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(this.delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let idx = this.event_idx;
        this.event_idx += 1;
        match this.events.get(idx) {
            Some(PresetEvent::MessageDelta(msg)) => {
                Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                    msg.clone(),
                ))))
            }
            Some(PresetEvent::Fail(msg)) => {
                this.event_idx = this.events.len() + 1;
                Poll::Ready(Err(Error::new(msg.clone(), ErrorKind::Other)))
            }
            None => Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            )))),
        }
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Responses are consumed in the order
/// they were added, regardless of the request content. If the script runs out
/// of responses, an error will be returned.
///
/// Clones share the same script, so a provider can be handed to the code
/// under test while the test keeps a clone to inspect the recorded requests.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Creates a provider with the given responses queued.
    pub fn with_responses(
        responses: impl IntoIterator<Item = PresetResponse>,
    ) -> Self {
        let provider = Self::default();
        for response in responses {
            provider.add_response(response);
        }
        provider
    }

    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.lock_script().responses.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, failed attempts included.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_script().requests.clone()
    }

    /// Returns the number of responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lock_script().responses.len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test thread must not hide the script from the others.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_response(
        &self,
        req: &ModelRequest,
    ) -> Result<PresetResponse, Error> {
        let mut script = self.lock_script();
        script.requests.push(req.clone());

        let Some(failures) =
            script.responses.front().map(|response| response.failures)
        else {
            return Err(Error::new("no enough steps", ErrorKind::Other));
        };
        if let Some(failures) = failures {
            script.attempts += 1;
            if failures == 0 || script.attempts <= failures {
                return Err(Error::new(
                    "preset failure",
                    ErrorKind::RateLimitExceeded,
                ));
            }
        }

        script.attempts = 0;
        script
            .responses
            .pop_front()
            .ok_or_else(|| Error::new("no enough steps", ErrorKind::Other))
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn model_name(&self) -> &str {
        "test-model"
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let resp = self.next_response(req).map(|preset| TestModelResponse {
            events: preset.events,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        });
        ready(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> Result<String, Error> {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await?
                .unwrap();
            match event {
                ModelResponseEvent::Completed(_) => break,
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
            }
        }
        assert!(
            poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await?
                .is_none()
        );
        Ok(msg)
    }

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::text("Hello, world!"),
            PresetResponse::with_events([
                PresetEvent::MessageDelta("Sure, ".to_owned()),
                PresetEvent::MessageDelta("let me take a ".to_owned()),
                PresetEvent::MessageDelta("look.".to_owned()),
            ]),
        ]);

        let req = ModelRequest::from_prompt("Hi");
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "Hello, world!");

        let req = ModelRequest::from_prompt("Check my todo")
            .with_stop(["\nObservation:"]);
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(
            collect_response(resp).await.unwrap(),
            "Sure, let me take a look."
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], req);

        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::text("ok").with_failures(2),
            PresetResponse::text("never").with_failures(0),
        ]);
        let req = ModelRequest::from_prompt("Hi");

        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "ok");

        for _ in 0..5 {
            assert!(provider.send_request(&req).await.is_err());
        }
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test]
    async fn test_fail_event() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::with_events([
                PresetEvent::MessageDelta("partial".to_owned()),
                PresetEvent::Fail("stream broken".to_owned()),
            ]),
        ]);
        let resp = provider
            .send_request(&ModelRequest::from_prompt("Hi"))
            .await
            .unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.to_string(), "stream broken (other)");
    }
}
