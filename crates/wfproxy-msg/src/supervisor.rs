//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Bridge supervisor tying codec, transport and request correlation together."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::codec::{decode, encode};
use crate::envelope::Message;
use crate::logging::{log_message, MessageDirection, MessagingMetricsExporter};
use crate::pending::{PendingReply, PendingRequests};
use crate::registry::TypeRegistry;
use crate::transport::Transport;
use crate::{MessagingError, Result};

/// Snapshot of bridge counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeMetrics {
    /// Frames handed to the transport.
    pub sent: u64,
    /// Frames decoded from the transport.
    pub received: u64,
    /// Frames the transport refused.
    pub dropped: u64,
    /// Replies with no pending request.
    pub orphaned: u64,
    /// Frames that failed to decode.
    pub rejected: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    dropped: AtomicU64,
    orphaned: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BridgeMetrics {
        BridgeMetrics {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            orphaned: self.orphaned.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Result of handling one inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// A request from the peer; the caller dispatches it by type id.
    Request(Box<dyn Message>),
    /// A reply that was handed to its waiting caller.
    Reply {
        /// Correlation id of the answered request.
        request_id: i64,
    },
}

/// One side of the proxy link.
///
/// Encodes outgoing messages onto a [`Transport`], decodes incoming frames
/// through the shared [`TypeRegistry`], and routes replies to the
/// [`PendingRequests`] table. Inbound requests are returned to the caller.
pub struct ProxyBridge {
    registry: Arc<TypeRegistry>,
    transport: Arc<dyn Transport>,
    pending: PendingRequests,
    counters: Counters,
    exporter: Option<MessagingMetricsExporter>,
}

impl ProxyBridge {
    /// Construct a bridge over `transport`.
    pub fn new(registry: Arc<TypeRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            pending: PendingRequests::new(),
            counters: Counters::default(),
            exporter: None,
        }
    }

    /// Also report traffic to a prometheus exporter.
    pub fn with_metrics(mut self, exporter: MessagingMetricsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Registry used for decoding.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Table of requests awaiting replies.
    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Send a request and register it for its reply.
    ///
    /// A request without a correlation id gets a fresh one from
    /// [`PendingRequests::next_request_id`]; if the send then fails, that id
    /// is cleared again so the request is left as the caller passed it.
    /// Caller-supplied ids are used as-is and share the table with generated
    /// ones, so a clash surfaces as [`MessagingError::DuplicateRequestId`].
    pub fn send_request(&self, request: &mut dyn Message) -> Result<PendingReply> {
        let message_type = request.message_type();
        let base = request
            .as_request_mut()
            .ok_or(MessagingError::NotARequest(message_type))?;
        let (request_id, assigned) = match base.request_id()? {
            Some(request_id) => (request_id, false),
            None => {
                let request_id = self.pending.next_request_id();
                base.set_request_id(Some(request_id));
                (request_id, true)
            }
        };

        let pending = match self.pending.register(request_id) {
            Ok(pending) => pending,
            Err(err) => {
                if assigned {
                    base.set_request_id(None);
                }
                return Err(err);
            }
        };
        if let Err(err) = self.send(&*request) {
            drop(pending);
            if assigned {
                if let Some(base) = request.as_request_mut() {
                    base.set_request_id(None);
                }
            }
            return Err(err);
        }
        Ok(pending)
    }

    /// Answer `request` with `reply`, copying the correlation id across.
    pub fn send_reply(&self, request: &dyn Message, reply: &mut dyn Message) -> Result<()> {
        let request_type = request.message_type();
        let request_id = request
            .as_request()
            .ok_or(MessagingError::NotARequest(request_type))?
            .request_id()?
            .ok_or(MessagingError::MissingRequestId(request_type))?;
        let reply_type = reply.message_type();
        reply
            .as_reply_mut()
            .ok_or(MessagingError::NotAReply(reply_type))?
            .set_request_id(Some(request_id));
        self.send(&*reply)
    }

    /// Re-send a copy of a message received elsewhere, e.g. relaying a peer's
    /// request to another link. The copy keeps the source's correlation id and
    /// is not tracked in this bridge's pending table.
    pub fn forward(&self, message: &dyn Message) -> Result<()> {
        let copy = message.clone_message();
        self.transmit(MessageDirection::Forward, copy.as_ref())
    }

    /// Encode and send a message as-is.
    pub fn send(&self, message: &dyn Message) -> Result<()> {
        self.transmit(MessageDirection::Outbound, message)
    }

    fn transmit(&self, direction: MessageDirection, message: &dyn Message) -> Result<()> {
        log_message(direction, message);
        match self.transport.send(encode(message)) {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
                if let Some(exporter) = &self.exporter {
                    exporter.observe_sent();
                }
                Ok(())
            }
            Err(err) => {
                warn!(transport = self.transport.name(), error = %err, "transport send failed");
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Decode one frame and route it.
    pub fn receive_frame(&self, frame: &[u8]) -> Result<Inbound> {
        let message = match decode(frame, &self.registry) {
            Ok(message) => message,
            Err(err) => {
                warn!(transport = self.transport.name(), error = %err, "rejected inbound frame");
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                if let Some(exporter) = &self.exporter {
                    exporter.observe_rejected();
                }
                return Err(err);
            }
        };
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        if let Some(exporter) = &self.exporter {
            exporter.observe_received();
        }
        log_message(MessageDirection::Inbound, message.as_ref());

        if message.as_reply().is_none() {
            return Ok(Inbound::Request(message));
        }
        match self.pending.deliver(message) {
            Ok((request_id, latency)) => {
                if let Some(exporter) = &self.exporter {
                    exporter.observe_latency(latency);
                }
                Ok(Inbound::Reply { request_id })
            }
            Err(err) => {
                if let MessagingError::OrphanReply { request_id, message_type } = &err {
                    warn!(request_id, %message_type, "orphan reply");
                    self.counters.orphaned.fetch_add(1, Ordering::Relaxed);
                    if let Some(exporter) = &self.exporter {
                        exporter.observe_orphaned();
                    }
                }
                Err(err)
            }
        }
    }

    /// Drain the transport, handling every available frame in arrival order.
    pub fn poll(&self) -> Vec<Result<Inbound>> {
        let mut handled = Vec::new();
        while let Some(frame) = self.transport.recv() {
            handled.push(self.receive_frame(&frame));
        }
        handled
    }

    /// Cancel every request still waiting for a reply.
    pub fn shutdown(&self) -> usize {
        self.pending.cancel_all()
    }

    /// Return the current metrics snapshot.
    pub fn metrics(&self) -> BridgeMetrics {
        self.counters.snapshot()
    }
}
