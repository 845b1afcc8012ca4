// Copyright 2020 Joyent, Inc.

//! The message codec used with `tokio_util::codec::Framed`.
//!
//! A [`NetconfCodec`] stacks two replaceable layers: the [`FrameCodec`] that
//! delimits frames on the byte stream and a [`MessageEncoding`] that turns a
//! frame into message text. Both may be swapped after the hello exchange
//! through `Framed::codec_mut`, and only between two frames.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{CodecError, EncodingError};
use crate::framing::{FrameCodec, FramingMode};
use crate::message::NetconfMessage;

pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// How a frame's bytes map to message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEncoding {
    /// UTF-8 XML text, the encoding every session starts with.
    Xml,
    /// zstd-compressed XML text, negotiated with `<start-exi>`.
    Compressed { level: i32 },
}

#[derive(Debug)]
pub struct NetconfCodec {
    framing: FrameCodec,
    encoding: MessageEncoding,
}

impl NetconfCodec {
    pub fn new() -> NetconfCodec {
        NetconfCodec::with_framing(FrameCodec::new())
    }

    pub fn with_framing(framing: FrameCodec) -> NetconfCodec {
        NetconfCodec {
            framing,
            encoding: MessageEncoding::Xml,
        }
    }

    pub fn framing_mode(&self) -> FramingMode {
        self.framing.mode()
    }

    pub fn set_framing(&mut self, mode: FramingMode) {
        self.framing.set_mode(mode);
    }

    pub fn encoding(&self) -> MessageEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: MessageEncoding) {
        self.encoding = encoding;
    }

    pub fn decode_payload(&self, frame: &[u8]) -> Result<NetconfMessage, EncodingError> {
        let text = match self.encoding {
            MessageEncoding::Xml => String::from_utf8(frame.to_vec())?,
            MessageEncoding::Compressed { .. } => {
                let raw = zstd::bulk::decompress(frame, self.framing.max_message_size())
                    .map_err(EncodingError::Compression)?;
                String::from_utf8(raw)?
            }
        };
        Ok(NetconfMessage::new(text))
    }

    pub fn encode_payload(&self, msg: &NetconfMessage) -> Result<Bytes, EncodingError> {
        match self.encoding {
            MessageEncoding::Xml => Ok(Bytes::copy_from_slice(msg.as_str().as_bytes())),
            MessageEncoding::Compressed { level } => {
                zstd::bulk::compress(msg.as_str().as_bytes(), level)
                    .map(Bytes::from)
                    .map_err(EncodingError::Compression)
            }
        }
    }
}

impl Default for NetconfCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for NetconfCodec {
    type Item = NetconfMessage;
    type Error = CodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<NetconfMessage>, CodecError> {
        match self.framing.decode_frame(buf)? {
            Some(frame) => Ok(Some(self.decode_payload(&frame)?)),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<NetconfMessage>, CodecError> {
        match self.framing.decode_frame_eof(buf)? {
            Some(frame) => Ok(Some(self.decode_payload(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<NetconfMessage> for NetconfCodec {
    type Error = CodecError;

    fn encode(&mut self, msg: NetconfMessage, dst: &mut BytesMut) -> Result<(), CodecError> {
        let payload = self.encode_payload(&msg)?;
        self.framing.encode_frame(&payload, dst)?;
        Ok(())
    }
}
