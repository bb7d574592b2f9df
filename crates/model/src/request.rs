/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Sequences where the model should stop generating.
    ///
    /// The stop sequence itself is not part of the completion.
    pub stop: Vec<String>,
}

impl ModelRequest {
    /// Creates a request with a single user prompt.
    #[inline]
    pub fn from_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            messages: vec![ModelMessage::User(prompt.into())],
            stop: vec![],
        }
    }

    /// Sets the stop sequences.
    #[inline]
    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}
