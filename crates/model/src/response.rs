use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed completion produced by a provider.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error this response fails with.
    type Error: ModelProviderError;

    /// Polls for the next piece of the completion.
    ///
    /// Text arrives as any number of [`ModelResponseEvent::MessageDelta`]
    /// events followed by a single [`ModelResponseEvent::Completed`].
    /// `Ok(None)` marks the end of the stream and must be returned for
    /// every poll after that point. An `Err` ends the response early;
    /// deltas already delivered are not retracted.
    ///
    /// When returning `Poll::Pending` the implementation has arranged for
    /// `cx` to be woken.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped producing text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model finished naturally or hit a stop sequence.
    Stop,
    /// The model ran out of output tokens.
    Length,
}

/// One piece of a [`ModelResponse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The completion ended.
    Completed(ModelFinishReason),
    /// More completion text.
    MessageDelta(String),
}

impl ModelResponseEvent {
    /// Returns the text carried by a delta.
    pub fn delta(&self) -> Option<&str> {
        match self {
            ModelResponseEvent::MessageDelta(text) => Some(text),
            ModelResponseEvent::Completed(_) => None,
        }
    }
}
