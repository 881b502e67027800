//! Worker message protocol
//!
//! Two requests travel from the page to a waiting update-worker:
//! - `{"type":"SKIP_WAITING"}` is fire-and-forget and tells the worker to activate.
//! - `{"type":"GET_VERSION"}` is sent together with a [`ReplyPort`]; the worker
//!   answers `{"buildHash": "<hash>"}` on that port.
//!
//! Replies are carried as raw JSON so that a malformed answer from an older
//! worker can be told apart from a missing one.

use crate::errors::{HandoverError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Request posted to a waiting update-worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate immediately instead of waiting for every client to close
    SkipWaiting,
    /// Report the worker's build hash on the attached reply port
    GetVersion,
}

/// Reply to [`WorkerMessage::GetVersion`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
    /// Build hash of the worker's bundle
    #[serde(rename = "buildHash")]
    pub build_hash: String,
}

impl VersionReply {
    /// Parse a raw reply, returning `None` for malformed or empty hashes
    pub fn parse(value: serde_json::Value) -> Option<Self> {
        let reply: Self = serde_json::from_value(value).ok()?;
        if reply.build_hash.trim().is_empty() {
            return None;
        }
        Some(reply)
    }
}

/// Sending half of a [`MessageChannel`], handed to the worker with a request
#[derive(Debug)]
pub struct ReplyPort {
    sender: oneshot::Sender<serde_json::Value>,
}

impl ReplyPort {
    /// Post a reply. Fails if the page stopped listening (e.g. it timed out).
    pub fn post(self, value: serde_json::Value) -> Result<()> {
        self.sender
            .send(value)
            .map_err(|_| HandoverError::platform("reply port closed before the worker answered"))
    }

    /// Whether the receiving half has been dropped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving half of a [`MessageChannel`], kept by the page
#[derive(Debug)]
pub struct ReceivePort {
    receiver: oneshot::Receiver<serde_json::Value>,
}

impl ReceivePort {
    /// Wait for the reply. Resolves to `None` if the worker dropped its port.
    pub async fn recv(self) -> Option<serde_json::Value> {
        self.receiver.await.ok()
    }
}

/// Dedicated two-port channel for one request/reply exchange
#[derive(Debug)]
pub struct MessageChannel {
    /// Port the page listens on
    pub port1: ReceivePort,
    /// Port transferred to the worker
    pub port2: ReplyPort,
}

impl MessageChannel {
    /// Open an independent channel
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            port1: ReceivePort { receiver },
            port2: ReplyPort { sender },
        }
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(WorkerMessage::SkipWaiting).unwrap(),
            json!({"type": "SKIP_WAITING"})
        );
        assert_eq!(
            serde_json::to_value(WorkerMessage::GetVersion).unwrap(),
            json!({"type": "GET_VERSION"})
        );
        let parsed: WorkerMessage = serde_json::from_value(json!({"type": "GET_VERSION"})).unwrap();
        assert_eq!(parsed, WorkerMessage::GetVersion);
    }

    #[test]
    fn test_version_reply_parse() {
        assert_eq!(
            VersionReply::parse(json!({"buildHash": "abc"})),
            Some(VersionReply {
                build_hash: "abc".to_string()
            })
        );
        assert_eq!(VersionReply::parse(json!({"buildHash": ""})), None);
        assert_eq!(VersionReply::parse(json!({"hash": "abc"})), None);
        assert_eq!(VersionReply::parse(json!("abc")), None);
    }

    #[tokio::test]
    async fn test_channel_delivers_reply() {
        let channel = MessageChannel::new();
        channel.port2.post(json!({"buildHash": "abc"})).unwrap();
        assert_eq!(channel.port1.recv().await, Some(json!({"buildHash": "abc"})));
    }

    #[tokio::test]
    async fn test_dropped_reply_port_resolves_none() {
        let MessageChannel { port1, port2 } = MessageChannel::new();
        drop(port2);
        assert_eq!(port1.recv().await, None);
    }

    #[test]
    fn test_post_after_receiver_dropped_fails() {
        let MessageChannel { port1, port2 } = MessageChannel::new();
        drop(port1);
        assert!(port2.is_closed());
        assert!(port2.post(json!({})).is_err());
    }
}
