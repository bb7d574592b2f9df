use std::sync::Weak;

use tokio::select;

use crate::Actor;
use crate::mailbox::{Inbox, Mailbox};

/// Runs the actor loop until it is killed or every handle is dropped.
pub(crate) async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    inbox: Inbox<S>,
) {
    let Inbox {
        mut msg_rx,
        mut kill_rx,
    } = inbox;
    debug!("started");

    let mut handled = 0u64;
    loop {
        let msg = select! {
            biased;

            _ = kill_rx.changed() => {
                debug!("killed");
                break;
            }
            msg = msg_rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };
        trace!("received message: {msg:?}");

        // Handles only live as long as someone outside holds one.
        let Some(mailbox) = mailbox.upgrade() else {
            warn!("all handles are dropped, discard the message");
            break;
        };
        trace_span!("proc msg").in_scope(|| {
            msg.deliver(&mut state, &Actor::from_mailbox(mailbox));
        });
        handled += 1;
    }

    // Closing the receiver makes further sends fail fast.
    msg_rx.close();
    debug!(handled, "will terminate");
}
