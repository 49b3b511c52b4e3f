use comms::Envelope;
use log::debug;

use crate::{Result, learner::Learner, node::Node, transport::Transport};

/// What to do with a completed operation after its callback ran.
pub enum Action<H> {
    /// Remove the entry; its envelope is freed with it.
    Dispose,
    /// Keep the entry alive under a freshly posted handle. The callback
    /// must have zeroed the envelope before posting.
    Rearm(H),
}

/// Completion callback. Runs with the entry already detached from the
/// registry, so it may freely register new operations through the node.
pub type Callback<T, L> =
    Box<dyn FnMut(&mut Envelope, &mut Node<T, L>) -> Result<Action<<T as Transport>::Handle>>>;

/// One in-flight non-blocking transport operation and its owned envelope.
pub struct PendingOp<T: Transport, L: Learner> {
    pub handle: T::Handle,
    pub buf: Envelope,
    pub callback: Callback<T, L>,
    pub dispose_after_callback: bool,
}

impl<T: Transport, L: Learner> PendingOp<T, L> {
    /// An operation disposed after its callback; the default callback
    /// only logs the completion.
    pub fn transient(handle: T::Handle, buf: Envelope) -> Self {
        Self {
            handle,
            buf,
            callback: Box::new(|_, _| {
                debug!("pending operation completed");
                Ok(Action::Dispose)
            }),
            dispose_after_callback: true,
        }
    }

    /// A long-lived operation whose callback re-arms it indefinitely.
    pub fn perpetual(handle: T::Handle, buf: Envelope, callback: Callback<T, L>) -> Self {
        Self {
            handle,
            buf,
            callback,
            dispose_after_callback: false,
        }
    }
}
