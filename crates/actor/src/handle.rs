use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::mailbox::{Call, Mailbox};
use crate::scheduler::run_actor;
use crate::{ActorDeadError, Message};

/// Handle to an actor.
///
/// Handles are cheap to clone. The actor stops once it is killed or the
/// last handle is dropped.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor with the specified state on the current runtime.
    ///
    /// Prefer the wrapper type generated by [`crate::define_actor`], which
    /// forwards to this method.
    pub fn spawn(state: S, label: &str) -> Self {
        let (mailbox, inbox) = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, inbox)
                .instrument(debug_span!("actor", label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor without waiting for it to be handled.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorDeadError> {
        self.mailbox.send(Box::new(msg))
    }

    /// Runs `f` on the actor's task and returns its result.
    ///
    /// Messages sent earlier from the same handle are handled first.
    pub async fn call<R, F>(&self, f: F) -> Result<R, ActorDeadError>
    where
        R: Send + 'static,
        F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(Call {
            f: Box::new(f),
            reply,
        })?;
        rx.await.map_err(|_| ActorDeadError)
    }

    /// Kills the actor.
    ///
    /// Messages already queued are dropped without being handled.
    #[inline]
    pub fn kill(&self) {
        self.mailbox.kill();
    }

    /// Returns `false` once the actor loop has exited.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.mailbox.is_closed()
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
