//! Conversation-related types.

use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// The agent.
    Assistant,
}

/// A message in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Returns the author of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of this message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Represents a conversation.
///
/// Messages can only be appended. Once added, a message is never changed,
/// removed or moved.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates a conversation that opens with an assistant message.
    pub fn with_greeting<S: Into<String>>(greeting: S) -> Self {
        let mut conversation = Self::default();
        conversation.push(Role::Assistant, greeting);
        conversation
    }

    /// Appends a message.
    #[inline]
    pub fn push<S: Into<String>>(&mut self, role: Role, content: S) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }

    /// Returns the messages in order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
