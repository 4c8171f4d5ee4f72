//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Structured logging and prometheus metrics for proxy traffic."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use tracing::debug;

use crate::envelope::Message;

/// Direction of the message movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Message encoded and handed to a transport.
    Outbound,
    /// Message decoded from a transport.
    Inbound,
    /// Message duplicated for forwarding.
    Forward,
}

/// Emit a structured log entry for message activity.
pub fn log_message(direction: MessageDirection, message: &dyn Message) {
    let request_id = match (message.as_request(), message.as_reply()) {
        (Some(request), _) => request.request_id().ok().flatten(),
        (_, Some(reply)) => reply.request_id().ok().flatten(),
        _ => None,
    };
    debug!(
        message_type = %message.message_type(),
        request_id = ?request_id,
        properties = message.properties().len(),
        direction = ?direction,
        "proxy message"
    );
}

/// Prometheus metric handles for proxy traffic.
pub struct MessagingMetricsExporter {
    sent: IntCounter,
    received: IntCounter,
    orphaned: IntCounter,
    rejected: IntCounter,
    latency: Histogram,
}

impl MessagingMetricsExporter {
    /// Register proxy metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let sent = IntCounter::with_opts(Opts::new(
            "proxy_messages_sent_total",
            "Frames handed to the transport",
        ))?;
        let received = IntCounter::with_opts(Opts::new(
            "proxy_messages_received_total",
            "Frames decoded from the transport",
        ))?;
        let orphaned = IntCounter::with_opts(Opts::new(
            "proxy_orphan_replies_total",
            "Replies whose request id had no pending entry",
        ))?;
        let rejected = IntCounter::with_opts(Opts::new(
            "proxy_frames_rejected_total",
            "Frames that failed to decode",
        ))?;
        let latency = Histogram::with_opts(HistogramOpts::new(
            "proxy_request_latency_seconds",
            "Time between sending a request and receiving its reply",
        ))?;

        registry.register(Box::new(sent.clone()))?;
        registry.register(Box::new(received.clone()))?;
        registry.register(Box::new(orphaned.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            sent,
            received,
            orphaned,
            rejected,
            latency,
        })
    }

    /// Record a sent frame.
    pub fn observe_sent(&self) {
        self.sent.inc();
    }

    /// Record a decoded frame.
    pub fn observe_received(&self) {
        self.received.inc();
    }

    /// Record an orphan reply.
    pub fn observe_orphaned(&self) {
        self.orphaned.inc();
    }

    /// Record a frame that failed to decode.
    pub fn observe_rejected(&self) {
        self.rejected.inc();
    }

    /// Record request/reply latency.
    pub fn observe_latency(&self, duration: Duration) {
        self.latency.observe(duration.as_secs_f64());
    }
}
