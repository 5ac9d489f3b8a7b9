//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is used to fan out notifications (sign-in, sign-out, token refresh)
//! from a single source to every interested listener.
//!
//! ## Delivery
//!
//! - **At-least-once**: a listener may see the same notification twice; consumers
//!   must be idempotent.
//! - **Per-publisher ordering**: messages from one publisher arrive in publish order.
//! - **No persistence**: a subscription only sees messages published after it was
//!   created.
//!
//! ## Scoped release
//!
//! A [`Subscription`] owns its registration. Dropping it (or calling
//! [`Subscription::unsubscribe`]) releases the registration; the bus prunes the
//! dead sender on its next publish. There is no way to leak a registration past
//! the lifetime of its handle.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};

/// A subscription to a message stream.
///
/// ```ignore
/// let mut sub = bus.subscribe();
/// while let Some(change) = sub.recv().await {
///     reevaluate(change).await;
/// }
/// // `None`: the bus went away.
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// A subscription that never yields anything (for sources that never change).
    pub fn closed() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self { receiver: rx }
    }

    /// Wait for the next message. `None` once the publisher side is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Release the registration explicitly.
    ///
    /// Equivalent to dropping the handle.
    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// Implementations must be `Send + Sync`: the same bus is shared by the
/// publisher and by every listener.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;

    /// Number of live subscriptions.
    fn subscriber_count(&self) -> usize;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn subscriber_count(&self) -> usize {
        (**self).subscriber_count()
    }
}
