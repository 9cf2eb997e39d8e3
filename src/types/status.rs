//! Feed identity, published events, and connectivity status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::LinkError;

/// One of the two independent data pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Feed {
    Telemetry,
    Imagery,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::Telemetry => f.write_str("telemetry"),
            Feed::Imagery => f.write_str("imagery"),
        }
    }
}

/// Event published on a feed's broadcast channel.
///
/// `Failed` and `Ended` are terminal for the session that produced them.
#[derive(Debug, Clone)]
pub enum FeedEvent<T> {
    /// A decoded payload
    Item(T),
    /// Transport failure; the feed is down until a new session is started
    Failed(Arc<LinkError>),
    /// The source finished normally
    Ended,
}

impl<T> FeedEvent<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FeedEvent::Item(_))
    }

    /// The payload, if this is an item event.
    pub fn into_item(self) -> Option<T> {
        match self {
            FeedEvent::Item(item) => Some(item),
            _ => None,
        }
    }
}

/// Per-feed connectivity flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ConnectionStatus {
    pub telemetry: bool,
    pub imagery: bool,
}

impl ConnectionStatus {
    /// Both feeds are up.
    pub fn is_fully_connected(&self) -> bool {
        self.telemetry && self.imagery
    }

    pub fn get(&self, feed: Feed) -> bool {
        match feed {
            Feed::Telemetry => self.telemetry,
            Feed::Imagery => self.imagery,
        }
    }

    /// Set one flag, returning whether it changed.
    pub fn set(&mut self, feed: Feed, connected: bool) -> bool {
        let slot = match feed {
            Feed::Telemetry => &mut self.telemetry,
            Feed::Imagery => &mut self.imagery,
        };
        let changed = *slot != connected;
        *slot = connected;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_connected_requires_both_feeds() {
        let mut status = ConnectionStatus::default();
        assert!(!status.is_fully_connected());

        assert!(status.set(Feed::Telemetry, true));
        assert!(!status.is_fully_connected());
        assert!(!status.set(Feed::Telemetry, true));

        assert!(status.set(Feed::Imagery, true));
        assert!(status.is_fully_connected());
        assert!(status.get(Feed::Imagery));
    }

    #[test]
    fn terminal_events() {
        assert!(!FeedEvent::Item(1u8).is_terminal());
        assert!(FeedEvent::<u8>::Ended.is_terminal());
        let failed = FeedEvent::<u8>::Failed(Arc::new(LinkError::transport("reset")));
        assert!(failed.is_terminal());
        assert_eq!(FeedEvent::Item(7u8).into_item(), Some(7));
    }
}
