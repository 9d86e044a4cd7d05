pub mod cache;
pub mod fetch;

use serde::{Deserialize, Serialize};
use std::sync::mpsc;

pub use cache::CacheMessage;
pub use fetch::FetchMessage;

/// Top-level message enum representing all possible diagnostic messages from dsfetch.
///
/// Each variant corresponds to a specific subsystem and wraps that subsystem's message type.
/// Messages are serialized as tagged JSON with a "type" field indicating the subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    Cache(CacheMessage),
    Fetch(FetchMessage),
}

/// A reporter for diagnostic messages.
///
/// This type is cheaply cloneable and can be shared across threads. It supports two modes:
/// - `Null`: Messages are silently discarded (no-op)
/// - `Channel`: Messages are sent to an mpsc channel for processing
///
/// The `report` method takes a closure to avoid allocating or cloning data unless messages
/// are actually enabled.
#[derive(Clone, Debug)]
pub enum MessageReporter {
    Null,
    Channel(mpsc::SyncSender<Message>),
}

impl MessageReporter {
    /// Create a null reporter that discards all messages.
    pub fn null() -> Self {
        Self::Null
    }

    /// Create a channel reporter that sends messages to the given sender.
    pub fn channel(sender: mpsc::SyncSender<Message>) -> Self {
        Self::Channel(sender)
    }

    /// Report a message by invoking the closure only if messages are enabled.
    ///
    /// # Example
    ///
    /// ```ignore
    /// reporter.report(|| CacheMessage::miss(name, &version));
    /// ```
    pub fn report<F, T>(&self, f: F)
    where
        F: FnOnce() -> T,
        T: Into<Message>,
    {
        if let Self::Channel(sender) = self {
            let msg = f().into();
            let _ = sender.send(msg);
        }
    }

    /// Returns true if message reporting is enabled (not null).
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}

/// A reporter whose messages can be inspected afterwards.
///
/// The channel is sized generously so that tests never block on a full buffer.
#[cfg(test)]
pub(crate) fn test_reporter() -> (MessageReporter, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::sync_channel(1024);
    (MessageReporter::channel(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    #[test]
    fn null_reporter_never_builds_the_message() {
        let reporter = MessageReporter::null();
        assert!(!reporter.is_enabled());
        reporter.report(|| -> CacheMessage { panic!("message should not be constructed") });
    }

    #[test]
    fn messages_serialize_as_tagged_json() {
        let version: Version = "1.0.2".parse().unwrap();
        let msg: Message = CacheMessage::miss("mnist", &version).into();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "cache");
        assert_eq!(json["data"]["event"], "cache_miss");
        assert_eq!(json["data"]["version"], "1.0.2");

        let round_tripped: Message = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, msg);
    }

    #[test]
    fn channel_reporter_delivers_in_order() {
        let (reporter, rx) = test_reporter();
        let version: Version = "2.0.0".parse().unwrap();
        reporter.report(|| CacheMessage::lookup("mnist", &version));
        reporter.report(|| CacheMessage::miss("mnist", &version));
        drop(reporter);

        let received: Vec<_> = rx.iter().collect();
        assert_eq!(
            received,
            vec![
                Message::Cache(CacheMessage::lookup("mnist", &version)),
                Message::Cache(CacheMessage::miss("mnist", &version)),
            ]
        );
    }
}
