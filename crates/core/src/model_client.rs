use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use backoff::ExponentialBackoff;
use math_assistant_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type ProviderError = Box<dyn ModelProviderError>;
type BoxedResponse = Pin<Box<dyn ErasedResponse>>;
type ConnectResult = Result<BoxedResponse, ProviderError>;
type BoxedConnectFuture = Pin<Box<dyn Future<Output = ConnectResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(&ModelRequest) -> BoxedConnectFuture + Send + Sync>;

trait ErasedResponse: Send {
    fn poll_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, ProviderError>>;
}

impl<R: ModelResponse> ErasedResponse for R {
    #[inline]
    fn poll_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, ProviderError>> {
        ModelResponse::poll_next_event(self, cx)
            .map_err(|err| Box::new(err) as ProviderError)
    }
}

/// How requests that fail with a transient error are retried.
///
/// Only establishing the response is retried. Once text has started
/// streaming, a failure is returned as is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between retries.
    pub max_interval: Duration,
}

impl RetryPolicy {
    fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

/// A fully received completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The generated text, without the stop sequence.
    pub text: String,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    model_name: Arc<str>,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    /// Creates a client with the default retry policy.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let model_name = Arc::from(provider.model_name());
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req: &ModelRequest| {
            let fut = provider.send_request(req);
            Box::pin(async move {
                match fut.await {
                    Ok(resp) => Ok(Box::pin(resp) as BoxedResponse),
                    Err(err) => Err(Box::new(err) as ProviderError),
                }
            }) as BoxedConnectFuture
        });
        Self {
            handler_fn,
            model_name,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Returns the name of the underlying model.
    #[inline]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Sends a request and collects the whole completion.
    ///
    /// `on_delta` is called with each piece of text as it arrives.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn complete(
        &self,
        req: ModelRequest,
        on_delta: impl Fn(&str) + Send + Sync,
    ) -> Result<Completion, ProviderError> {
        async {
            trace!("got a request: {req:?}");
            let mut resp = self.connect(&req).await.inspect_err(|err| {
                error!("got an error: {err}");
            })?;

            let mut text = String::new();
            let mut finish_reason = None;
            loop {
                let event = poll_fn(|cx| resp.as_mut().poll_event(cx))
                    .await
                    .inspect_err(|err| {
                        error!("got an error: {err}");
                    })?;
                let Some(event) = event else {
                    break;
                };
                trace!("got an event: {event:?}");

                match event {
                    ModelResponseEvent::MessageDelta(delta) => {
                        on_delta(&delta);
                        text.push_str(&delta);
                    }
                    ModelResponseEvent::Completed(reason) => {
                        finish_reason = Some(reason);
                    }
                }
            }

            if finish_reason == Some(ModelFinishReason::Length) {
                warn!("completion was truncated by the token limit");
            }
            trace!("finished a request");
            Ok(Completion {
                text,
                finish_reason,
            })
        }
        .instrument(trace_span!("model client req", model = %self.model_name))
        .await
    }

    async fn connect(&self, req: &ModelRequest) -> ConnectResult {
        let max_retries = self.retry_policy.max_retries;
        let mut attempt = 0;
        backoff::future::retry(self.retry_policy.to_backoff(), || {
            attempt += 1;
            let attempt = attempt;
            let fut = (self.handler_fn)(req);
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() && attempt <= max_retries {
                        warn!(attempt, "transient error, will retry: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}
