//! A lightweight actor runtime.
//!
//! An actor owns a piece of state and processes messages against it one at
//! a time on its own task. Nothing else ever touches the state, so the
//! state needs no locks.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod macros;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    struct CounterState {
        value: u32,
        log: Vec<u32>,
    }

    define_actor! {
        /// This is a test actor.
        struct Counter(CounterState);
    }

    impl Counter {
        async fn value(&self) -> Result<u32, ActorDeadError> {
            self.handle().call(|state, _| state.value).await
        }
    }

    #[derive(Debug)]
    struct AddMessage(u32);

    impl Message<CounterState> for AddMessage {
        fn handle(self, state: &mut CounterState, _actor: &Actor<CounterState>) {
            state.value += self.0;
            state.log.push(self.0);
        }
    }

    #[derive(Debug)]
    struct GetMessage(oneshot::Sender<u32>);

    impl Message<CounterState> for GetMessage {
        fn handle(self, state: &mut CounterState, _actor: &Actor<CounterState>) {
            self.0.send(state.value).ok();
        }
    }

    /// Defers its work to a spawned task which reports back via a message.
    #[derive(Debug)]
    struct DeferredAdd(u32);

    impl Message<CounterState> for DeferredAdd {
        fn handle(self, _state: &mut CounterState, actor: &Actor<CounterState>) {
            let actor = actor.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                actor.send(AddMessage(self.0)).ok();
            });
        }
    }

    #[tokio::test]
    async fn test_send_message() {
        let counter = Counter::spawn(CounterState::default(), "counter");
        counter.handle().send(AddMessage(42)).unwrap();

        let (tx, rx) = oneshot::channel();
        counter.handle().send(GetMessage(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_messages_are_ordered() {
        let counter = Counter::spawn(CounterState::default(), "counter");
        for i in 1..=5 {
            counter.handle().send(AddMessage(i)).unwrap();
        }
        let log = counter.handle().call(|state, _| state.log.clone()).await;
        assert_eq!(log.unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_message_from_spawned_task() {
        let counter = Counter::spawn(CounterState::default(), "counter");
        counter.handle().send(DeferredAdd(7)).unwrap();
        assert_eq!(counter.value().await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.value().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_kill() {
        let counter = Counter::spawn(CounterState::default(), "counter");
        assert!(counter.handle().is_alive());
        counter.handle().kill();
        assert!(counter.value().await.is_err());
        assert!(!counter.handle().is_alive());
        assert!(counter.handle().send(AddMessage(1)).is_err());
    }
}
