use serde::{Deserialize, Serialize};

/// One scripted step of a response stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PresetEvent {
    /// Streams a piece of completion text.
    MessageDelta(String),
    /// Breaks the stream with the given message.
    Fail(String),
}

/// What the provider does with one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Streamed in order once the request is accepted.
    pub events: Vec<PresetEvent>,
    /// Number of attempts rejected with a rate limit error before the
    /// events are served. `Some(0)` rejects every attempt.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Serves `events` on the first attempt.
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a `PresetResponse` that streams `text` word by word.
    pub fn text(text: &str) -> Self {
        Self::with_events(
            text.split_inclusive(' ')
                .map(|word| PresetEvent::MessageDelta(word.to_owned()))
                .collect::<Vec<_>>(),
        )
    }

    /// Rejects the first `failures` attempts, or all of them for `0`.
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}
