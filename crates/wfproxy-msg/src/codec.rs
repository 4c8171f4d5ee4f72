//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Binary wire codec for proxy message frames."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
//! Frame layout, all integers little-endian:
//!
//! ```text
//! u32  body length (bytes following this field)
//! i32  message type id
//! u32  property count
//! per property, in key order:
//!     u32 key length, key bytes
//!     u8  presence flag (1 present, 0 absent)
//!     u32 value length, value bytes   (present only)
//! ```
//!
//! Absent entries from a peer decode to a missing key.
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::{raw_properties_mut, Message, MessageType, ProxyMessage};
use crate::registry::TypeRegistry;
use crate::{MessagingError, Result};

/// Default upper bound on a frame body.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX: usize = 4;
const PRESENT: u8 = 1;
const ABSENT: u8 = 0;

/// Encode a message into a complete frame.
pub fn encode(message: &dyn Message) -> Bytes {
    encode_message(message.envelope())
}

/// Encode an envelope into a complete frame.
pub fn encode_message(message: &ProxyMessage) -> Bytes {
    let mut frame = BytesMut::new();
    write_frame(message, &mut frame);
    frame.freeze()
}

/// Decode a complete frame, including its length prefix.
///
/// The type id is resolved through `registry` before any property is read;
/// an unregistered id fails with [`MessagingError::UnknownMessageType`].
pub fn decode(frame: &[u8], registry: &TypeRegistry) -> Result<Box<dyn Message>> {
    let mut buf = frame;
    let body_len = read_u32(&mut buf, "body length")? as usize;
    if buf.remaining() != body_len {
        return Err(MessagingError::MalformedFrame(format!(
            "declared body length {body_len} but {} bytes follow",
            buf.remaining()
        )));
    }
    decode_body(buf, registry)
}

fn write_frame(message: &ProxyMessage, dst: &mut BytesMut) {
    let start = dst.len();
    dst.put_u32_le(0);
    dst.put_i32_le(message.message_type().id());
    dst.put_u32_le(message.properties().len() as u32);
    for (key, value) in message.properties() {
        put_str(dst, key);
        dst.put_u8(PRESENT);
        put_str(dst, value);
    }
    let body_len = (dst.len() - start - LENGTH_PREFIX) as u32;
    dst[start..start + LENGTH_PREFIX].copy_from_slice(&body_len.to_le_bytes());
}

fn decode_body(mut buf: &[u8], registry: &TypeRegistry) -> Result<Box<dyn Message>> {
    let message_type = MessageType::new(read_i32(&mut buf, "message type")?);
    let mut message = registry.instantiate(message_type)?;
    let count = read_u32(&mut buf, "property count")?;
    let properties = raw_properties_mut(&mut *message);
    for _ in 0..count {
        let key = read_string(&mut buf, "property key")?;
        match read_u8(&mut buf, "presence flag")? {
            PRESENT => {
                let value = read_string(&mut buf, "property value")?;
                properties.insert_text(key, value);
            }
            ABSENT => {}
            flag => {
                return Err(MessagingError::MalformedFrame(format!(
                    "invalid presence flag {flag} for property `{key}`"
                )))
            }
        }
    }
    if buf.has_remaining() {
        return Err(MessagingError::MalformedFrame(format!(
            "{} trailing bytes after {count} properties",
            buf.remaining()
        )));
    }
    Ok(message)
}

fn put_str(dst: &mut BytesMut, value: &str) {
    dst.put_u32_le(value.len() as u32);
    dst.put_slice(value.as_bytes());
}

fn ensure(buf: &[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(MessagingError::MalformedFrame(format!(
            "truncated {what}: need {needed} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8], what: &str) -> Result<u8> {
    ensure(*buf, 1, what)?;
    Ok(buf.get_u8())
}

fn read_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    ensure(*buf, 4, what)?;
    Ok(buf.get_u32_le())
}

fn read_i32(buf: &mut &[u8], what: &str) -> Result<i32> {
    ensure(*buf, 4, what)?;
    Ok(buf.get_i32_le())
}

fn read_string(buf: &mut &[u8], what: &str) -> Result<String> {
    let len = read_u32(buf, what)? as usize;
    ensure(*buf, len, what)?;
    let text = std::str::from_utf8(&buf[..len])
        .map_err(|err| MessagingError::MalformedFrame(format!("{what} is not UTF-8: {err}")))?
        .to_owned();
    buf.advance(len);
    Ok(text)
}

/// Stream codec for framed transports.
///
/// Frames on one connection are decoded strictly in order. A frame with an
/// unknown type id is consumed before the error is returned, so the caller
/// may keep reading.
#[derive(Debug, Clone)]
pub struct ProxyCodec {
    registry: Arc<TypeRegistry>,
    max_frame_size: usize,
}

impl ProxyCodec {
    /// Codec using the default frame size limit.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_max_frame_size(registry, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Codec with an explicit frame size limit.
    pub fn with_max_frame_size(registry: Arc<TypeRegistry>, max_frame_size: usize) -> Self {
        Self {
            registry,
            max_frame_size,
        }
    }

    /// Registry used to resolve type ids.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }
}

impl Decoder for ProxyCodec {
    type Item = Box<dyn Message>;
    type Error = MessagingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }
        let body_len = (&src[..LENGTH_PREFIX]).get_u32_le() as usize;
        if body_len > self.max_frame_size {
            return Err(MessagingError::FrameTooLarge {
                size: body_len,
                max: self.max_frame_size,
            });
        }
        let frame_len = LENGTH_PREFIX + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }
        src.advance(LENGTH_PREFIX);
        let body = src.split_to(body_len);
        decode_body(&body, &self.registry).map(Some)
    }
}

impl Encoder<Box<dyn Message>> for ProxyCodec {
    type Error = MessagingError;

    fn encode(&mut self, item: Box<dyn Message>, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        write_frame(item.envelope(), dst);
        let body_len = dst.len() - start - LENGTH_PREFIX;
        if body_len > self.max_frame_size {
            dst.truncate(start);
            return Err(MessagingError::FrameTooLarge {
                size: body_len,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::messages::{self, ConnectRequest, EchoReply, InitializeRequest};
    use crate::registry::RegistryBuilder;
    use crate::reply::{ErrorKind, ProxyError};

    fn registry() -> Arc<TypeRegistry> {
        let mut builder = RegistryBuilder::new();
        messages::register_all(&mut builder).expect("register families");
        Arc::new(builder.build())
    }

    #[test]
    fn initialize_request_survives_the_wire() {
        let registry = registry();
        let mut request = InitializeRequest::new();
        request.set_library_address(Some("127.0.0.1"));
        request.set_library_port(Some("7933"));
        request.request_mut().set_request_id(Some(1));

        let decoded = decode(&encode(&request), &registry).expect("decode");
        assert_eq!(decoded.message_type(), MessageType::INITIALIZE_REQUEST);
        let typed = decoded.downcast_ref::<InitializeRequest>().expect("concrete kind");
        assert_eq!(typed, &request);
    }

    #[test]
    fn absent_and_empty_fields_survive_the_wire() {
        let registry = registry();
        let mut request = ConnectRequest::new();
        request.set_identity(Some(""));
        request.set_client_timeout(Some(Duration::from_millis(250)));

        let decoded = decode(&encode(&request), &registry).unwrap();
        let typed = decoded.downcast_ref::<ConnectRequest>().unwrap();
        assert_eq!(typed.identity().as_deref(), Some(""));
        assert_eq!(typed.endpoints(), None);
        assert_eq!(typed.create_domain().unwrap(), None);
        assert_eq!(
            typed.client_timeout().unwrap(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn decoder_keeps_unparsable_text_verbatim() {
        let registry = registry();
        let mut request = ConnectRequest::new();
        request.request_mut().properties_mut().insert_text("CreateDomain", "yes");

        let decoded = decode(&encode(&request), &registry).unwrap();
        assert_eq!(decoded.properties().text("CreateDomain"), Some("yes"));
        let typed = decoded.downcast_ref::<ConnectRequest>().unwrap();
        assert!(typed.create_domain().is_err());
    }

    #[test]
    fn encoding_is_canonical() {
        let mut a = ConnectRequest::new();
        a.set_identity(Some("w"));
        a.set_endpoints(Some("e"));
        let mut b = ConnectRequest::new();
        b.set_endpoints(Some("e"));
        b.set_identity(Some("w"));
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn frame_layout_matches_documentation() {
        let mut reply = EchoReply::new();
        reply.reply_mut().set_request_id(Some(3));
        let frame = encode(&reply);

        let mut expected = Vec::new();
        expected.extend_from_slice(&(4u32 + 4 + 4 + 9 + 1 + 4 + 1).to_le_bytes());
        expected.extend_from_slice(&8i32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&9u32.to_le_bytes());
        expected.extend_from_slice(b"RequestId");
        expected.push(1);
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(b"3");
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn absent_flag_from_peer_decodes_as_missing_key() {
        let registry = registry();
        let mut body = BytesMut::new();
        body.put_i32_le(MessageType::INITIALIZE_REQUEST.id());
        body.put_u32_le(2);
        put_str(&mut body, "LibraryAddress");
        body.put_u8(ABSENT);
        put_str(&mut body, "LibraryPort");
        body.put_u8(PRESENT);
        put_str(&mut body, "7933");
        let mut frame = BytesMut::new();
        frame.put_u32_le(body.len() as u32);
        frame.extend_from_slice(&body);

        let decoded = decode(&frame, &registry).unwrap();
        let typed = decoded.downcast_ref::<InitializeRequest>().unwrap();
        assert_eq!(typed.library_address(), None);
        assert_eq!(typed.library_port().as_deref(), Some("7933"));
    }

    #[test]
    fn unknown_type_is_rejected_before_properties_are_read() {
        let registry = registry();
        let mut frame = BytesMut::new();
        frame.put_u32_le(8);
        frame.put_i32_le(4242);
        frame.put_u32_le(u32::MAX);
        assert!(matches!(
            decode(&frame, &registry),
            Err(MessagingError::UnknownMessageType(t)) if t == MessageType::new(4242)
        ));
    }

    #[test]
    fn truncated_and_trailing_frames_are_malformed() {
        let registry = registry();
        let mut request = InitializeRequest::new();
        request.set_library_port(Some("7933"));
        let frame = encode(&request);

        assert!(matches!(
            decode(&frame[..frame.len() - 1], &registry),
            Err(MessagingError::MalformedFrame(_))
        ));

        let mut body = frame[LENGTH_PREFIX..frame.len() - 2].to_vec();
        let mut short = (body.len() as u32).to_le_bytes().to_vec();
        short.append(&mut body);
        assert!(matches!(
            decode(&short, &registry),
            Err(MessagingError::MalformedFrame(_))
        ));

        let mut padded = frame[LENGTH_PREFIX..].to_vec();
        padded.push(0);
        let mut long = (padded.len() as u32).to_le_bytes().to_vec();
        long.append(&mut padded);
        assert!(matches!(
            decode(&long, &registry),
            Err(MessagingError::MalformedFrame(msg)) if msg.contains("trailing")
        ));
    }

    #[test]
    fn stream_codec_handles_partial_and_back_to_back_frames() {
        let registry = registry();
        let mut codec = ProxyCodec::new(registry);

        let mut first = InitializeRequest::new();
        first.set_library_address(Some("127.0.0.1"));
        let mut second = EchoReply::new();
        second
            .reply_mut()
            .set_error(Some(&ProxyError::new(ErrorKind::Timeout, "late")));

        let mut wire = BytesMut::new();
        codec.encode(Box::new(first) as Box<dyn Message>, &mut wire).unwrap();
        codec.encode(Box::new(second) as Box<dyn Message>, &mut wire).unwrap();

        let mut src = BytesMut::new();
        src.extend_from_slice(&wire[..3]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&wire[3..]);

        let one = codec.decode(&mut src).unwrap().expect("first frame");
        assert_eq!(one.message_type(), MessageType::INITIALIZE_REQUEST);
        let two = codec.decode(&mut src).unwrap().expect("second frame");
        assert!(!two.as_reply().unwrap().is_success());
        assert!(codec.decode(&mut src).unwrap().is_none());
        assert!(src.is_empty());
    }

    #[test]
    fn stream_codec_enforces_frame_limit() {
        let mut codec = ProxyCodec::with_max_frame_size(registry(), 16);
        let mut src = BytesMut::new();
        src.put_u32_le(17);
        assert!(matches!(
            codec.decode(&mut src),
            Err(MessagingError::FrameTooLarge { size: 17, max: 16 })
        ));

        let mut request = InitializeRequest::new();
        request.set_library_address(Some("a-rather-long-host-name.internal"));
        let mut dst = BytesMut::new();
        assert!(codec
            .encode(Box::new(request) as Box<dyn Message>, &mut dst)
            .is_err());
        assert!(dst.is_empty());
    }
}
