//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Frame transport abstraction and in-memory implementation."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{MessagingError, Result};

/// Moves encoded frames between the two runtimes.
///
/// Socket setup and connection lifecycle belong to the implementation; the
/// core only hands it complete frames and asks for complete frames back.
pub trait Transport: Send + Sync {
    /// Send one complete frame.
    fn send(&self, frame: Bytes) -> Result<()>;
    /// Next received frame, if one is available.
    fn recv(&self) -> Option<Bytes>;
    /// Human-readable transport name for logging/metrics.
    fn name(&self) -> &'static str;
}

type Queue = Mutex<VecDeque<Bytes>>;

/// In-process transport backed by mutex protected queues.
///
/// [`InMemoryTransport::new`] loops frames back to the sender;
/// [`InMemoryTransport::pair`] returns two connected endpoints.
pub struct InMemoryTransport {
    inbound: Arc<Queue>,
    outbound: Weak<Queue>,
}

impl InMemoryTransport {
    /// Loopback endpoint: every sent frame is received by the same endpoint.
    pub fn new() -> Self {
        let queue = Arc::new(Queue::default());
        Self {
            outbound: Arc::downgrade(&queue),
            inbound: queue,
        }
    }

    /// Two endpoints wired to each other.
    pub fn pair() -> (Self, Self) {
        let left = Arc::new(Queue::default());
        let right = Arc::new(Queue::default());
        (
            Self {
                outbound: Arc::downgrade(&right),
                inbound: left.clone(),
            },
            Self {
                outbound: Arc::downgrade(&left),
                inbound: right,
            },
        )
    }

    /// Frames waiting to be received on this endpoint.
    pub fn pending(&self) -> usize {
        self.inbound.lock().len()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, frame: Bytes) -> Result<()> {
        let peer = self
            .outbound
            .upgrade()
            .ok_or(MessagingError::TransportClosed("in_memory peer dropped"))?;
        peer.lock().push_back(frame);
        Ok(())
    }

    fn recv(&self) -> Option<Bytes> {
        self.inbound.lock().pop_front()
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_send_and_recv() {
        let transport = InMemoryTransport::new();
        transport.send(Bytes::from_static(b"frame")).expect("send succeeds");
        assert_eq!(transport.pending(), 1);
        assert_eq!(transport.recv().as_deref(), Some(&b"frame"[..]));
        assert!(transport.recv().is_none());
    }

    #[test]
    fn pair_crosses_frames_in_order() {
        let (left, right) = InMemoryTransport::pair();
        left.send(Bytes::from_static(b"one")).unwrap();
        left.send(Bytes::from_static(b"two")).unwrap();
        right.send(Bytes::from_static(b"back")).unwrap();

        assert_eq!(right.recv().as_deref(), Some(&b"one"[..]));
        assert_eq!(right.recv().as_deref(), Some(&b"two"[..]));
        assert_eq!(left.recv().as_deref(), Some(&b"back"[..]));
        assert!(left.recv().is_none());
    }

    #[test]
    fn send_to_dropped_peer_fails() {
        let (left, right) = InMemoryTransport::pair();
        drop(right);
        assert!(matches!(
            left.send(Bytes::from_static(b"lost")),
            Err(MessagingError::TransportClosed(_))
        ));
    }
}
