use core::future::{self, Future};
use core::time::Duration;
use duelsweeper_protocol::{EventKind, PresenceRecord, PresenceState};
use futures_util::Stream;
use serde_json::Value;

use crate::ChannelError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Subscribed,
    TimedOut,
    Closed,
    ChannelError,
}

/// Everything a room can tell a subscriber.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    Status(SubscriptionStatus),
    Broadcast {
        event: String,
        payload: Value,
    },
    /// The presence snapshot changed, read it with [`Channel::presence_state`].
    Sync,
    Join {
        key: String,
        new_presences: Vec<PresenceRecord>,
    },
    Leave {
        key: String,
        left_presences: Vec<PresenceRecord>,
    },
}

/// A room on a presence + broadcast transport.
///
/// Inbound traffic arrives on the stream handed out by [`Channel::subscribe`], in the order the
/// transport delivered it. Broadcasts go to every other subscriber, never back to the sender.
pub trait Channel {
    type Events: Stream<Item = ChannelEvent> + Unpin;

    fn subscribe(&mut self) -> Result<Self::Events, ChannelError>;

    fn unsubscribe(&mut self);

    fn track(&mut self, record: PresenceRecord) -> Result<(), ChannelError>;

    fn untrack(&mut self);

    fn presence_state(&self) -> PresenceState;

    /// Resolves once the transport has accepted the message.
    fn broadcast(
        &mut self,
        event: EventKind,
        payload: Value,
    ) -> impl Future<Output = Result<(), ChannelError>>;
}

/// Source of the pacing and grace delays.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Completes every sleep immediately.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDelay;

impl Sleeper for NoDelay {
    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> {
        future::ready(())
    }
}
