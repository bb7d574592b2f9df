use std::fmt::{self, Debug};

use tokio::sync::{mpsc, oneshot, watch};

use crate::{Actor, ActorDeadError};

/// A message that an actor can handle.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with mutable access to the actor's state.
    ///
    /// `actor` is a handle to the actor itself, useful for tasks that
    /// report back once they are done.
    fn handle(self, state: &mut S, actor: &Actor<S>);
}

/// Object-safe counterpart of [`Message`].
pub(crate) trait Envelope<S>: Send + Debug {
    fn deliver(self: Box<Self>, state: &mut S, actor: &Actor<S>);
}

impl<S, M: Message<S>> Envelope<S> for M {
    #[inline]
    fn deliver(self: Box<Self>, state: &mut S, actor: &Actor<S>) {
        (*self).handle(state, actor)
    }
}

/// A closure run against the state, with its result sent back.
pub(crate) struct Call<S, R> {
    pub f: Box<dyn FnOnce(&mut S, &Actor<S>) -> R + Send>,
    pub reply: oneshot::Sender<R>,
}

impl<S, R> Debug for Call<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Call")
    }
}

impl<S: 'static, R: Send + 'static> Message<S> for Call<S, R> {
    fn handle(self, state: &mut S, actor: &Actor<S>) {
        // The caller may have given up waiting.
        self.reply.send((self.f)(state, actor)).ok();
    }
}

pub(crate) type BoxedEnvelope<S> = Box<dyn Envelope<S>>;

pub(crate) struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxedEnvelope<S>>,
    kill_tx: watch::Sender<bool>,
}

pub(crate) struct Inbox<S> {
    pub msg_rx: mpsc::UnboundedReceiver<BoxedEnvelope<S>>,
    pub kill_rx: watch::Receiver<bool>,
}

impl<S: Send + 'static> Mailbox<S> {
    pub fn new() -> (Self, Inbox<S>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        (Mailbox { msg_tx, kill_tx }, Inbox { msg_rx, kill_rx })
    }

    #[inline]
    pub fn send(&self, msg: BoxedEnvelope<S>) -> Result<(), ActorDeadError> {
        self.msg_tx.send(msg).map_err(|_| ActorDeadError)
    }

    #[inline]
    pub fn kill(&self) {
        self.kill_tx.send(true).ok();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.msg_tx.is_closed()
    }
}
