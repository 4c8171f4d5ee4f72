//! ---
//! wfp_section: "05-networking-external-interfaces"
//! wfp_subsection: "binary"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "In-process request/reply round trip over a framed stream."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Args;
use futures::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio_util::codec::Framed;
use tracing::{info, warn};
use wfproxy_common::config::AppConfig;
use wfproxy_msg::messages::{EchoReply, EchoRequest, InitializeReply, InitializeRequest};
use wfproxy_msg::{
    log_message, ErrorKind, Message, MessageDirection, PendingRequests, ProxyCodec, ProxyError,
    TypeRegistry,
};

#[derive(Debug, Args)]
pub struct LoopbackCommand {
    /// Number of initialize requests to send.
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Make the responder fail every request with this message.
    #[arg(long = "fail-with", value_name = "MESSAGE")]
    fail_with: Option<String>,
}

impl LoopbackCommand {
    pub async fn execute(self, config: &AppConfig, registry: Arc<TypeRegistry>) -> Result<()> {
        let codec = ProxyCodec::with_max_frame_size(registry, config.proxy.max_frame_size);
        let (near, far) = tokio::io::duplex(64 * 1024);
        let mut stream = Framed::new(near, codec.clone());
        let responder = tokio::spawn(respond(Framed::new(far, codec), self.fail_with.clone()));

        let pending = PendingRequests::new();
        let port = config.proxy.library_port.to_string();
        for _ in 0..self.count {
            let request_id = pending.next_request_id();
            let mut request = InitializeRequest::new();
            request.set_library_address(Some(config.proxy.library_address.as_str()));
            request.set_library_port(Some(port.as_str()));
            request.request_mut().set_request_id(Some(request_id));

            let waiter = pending.register(request_id)?;
            log_message(MessageDirection::Outbound, &request);
            stream.send(Box::new(request) as Box<dyn Message>).await?;

            let reply = stream
                .next()
                .await
                .ok_or_else(|| anyhow!("responder closed the stream"))??;
            log_message(MessageDirection::Inbound, reply.as_ref());
            pending.complete(reply)?;

            let reply = waiter.wait_timeout(config.proxy.request_timeout).await?;
            let base = reply
                .as_reply()
                .ok_or_else(|| anyhow!("{} is not a reply", reply.message_type()))?;
            match base.error()? {
                None => println!("request {request_id}: ok"),
                Some(error) => println!("request {request_id}: {error}"),
            }
        }

        drop(stream);
        let answered = responder.await??;
        info!(answered, "loopback finished");
        Ok(())
    }
}

/// Answer initialize and echo requests until the peer hangs up.
async fn respond(
    mut stream: Framed<DuplexStream, ProxyCodec>,
    fail_with: Option<String>,
) -> Result<u64> {
    let mut answered = 0;
    while let Some(frame) = stream.next().await {
        let request = frame?;
        let request_id = request
            .as_request()
            .ok_or_else(|| anyhow!("{} is not a request", request.message_type()))?
            .request_id()?;

        let mut reply: Box<dyn Message> = if request.is::<InitializeRequest>() {
            Box::new(InitializeReply::new())
        } else if let Some(echo) = request.downcast_ref::<EchoRequest>() {
            let mut reply = EchoReply::new();
            reply.set_payload(echo.payload()?.as_deref());
            Box::new(reply)
        } else {
            warn!(message_type = %request.message_type(), "no responder for request");
            continue;
        };

        if let Some(base) = reply.as_reply_mut() {
            base.set_request_id(request_id);
            let error = fail_with
                .as_ref()
                .map(|message| ProxyError::new(ErrorKind::Custom, message.clone()));
            base.set_error(error.as_ref());
        }
        stream.send(reply).await?;
        answered += 1;
    }
    Ok(answered)
}
