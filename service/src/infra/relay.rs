//! [`Relay`] of domain [`Event`]s.

use futures::{stream, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing as log;

use crate::domain::Event;

/// In-process broadcast of committed [`Event`]s to live subscribers.
///
/// Subscribers falling behind for more than the channel capacity miss the
/// overflowed [`Event`]s.
#[derive(Clone, Debug)]
pub struct Relay {
    /// Sending half of the broadcast channel.
    sender: broadcast::Sender<Event>,
}

impl Relay {
    /// Default number of [`Event`]s buffered for a slow subscriber.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a new [`Relay`] buffering up to `capacity` [`Event`]s for each
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes the provided [`Event`] to all the current subscribers.
    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            log::trace!("no subscribers for `{event:?}`");
        }
    }

    /// Publishes the provided [`Event`]s in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribes to the [`Event`]s published since now.
    ///
    /// The returned [`Stream`] ends once the [`Relay`] is dropped.
    pub fn subscribe(&self) -> impl Stream<Item = Event> + Send + 'static {
        stream::unfold(self.sender.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => return Some((ev, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("subscriber lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod spec {
    use futures::{pin_mut, StreamExt as _};

    use crate::domain::{lot, Event};

    use super::Relay;

    fn event(available: u16) -> Event {
        Event::SlotsChanged {
            lot_id: lot::Id::new(),
            available,
            total: 10,
        }
    }

    #[tokio::test]
    async fn publishes_without_subscribers() {
        Relay::default().publish(event(1));
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let relay = Relay::default();
        let events = relay.subscribe();
        pin_mut!(events);

        let (first, second) = (event(2), event(1));
        relay.publish_all([first, second]);

        assert_eq!(events.next().await, Some(first));
        assert_eq!(events.next().await, Some(second));
    }

    #[tokio::test]
    async fn skips_overflowed_events() {
        let relay = Relay::new(2);
        let events = relay.subscribe();
        pin_mut!(events);

        let published = [event(3), event(2), event(1)];
        relay.publish_all(published);

        assert_eq!(events.next().await, Some(published[1]));
        assert_eq!(events.next().await, Some(published[2]));

        drop(relay);
        assert_eq!(events.next().await, None);
    }
}
