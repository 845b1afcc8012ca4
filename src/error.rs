// Copyright 2020 Joyent, Inc.

//! Error types for every layer of the protocol engine.
//!
//! Decode errors are fatal to the connection, negotiation errors are fatal to
//! the negotiation attempt, and transport errors are handed to every affected
//! outstanding request. A well-formed `<rpc-error>` reply is a
//! [`ProtocolError`], never a transport error.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::message::RpcErrorInfo;

/// Errors raised by the frame codec.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The chunk header or footer does not follow the RFC 6242 grammar.
    #[error("malformed chunk header: got byte {found:#04x} while waiting for {expected}")]
    MalformedChunkHeader { found: u8, expected: &'static str },

    /// The aggregate message size exceeds the configured ceiling.
    #[error("message size {size} exceeds maximum {limit}")]
    MessageTooLarge { size: u64, limit: usize },

    /// The outbound chunk size is outside the accepted range.
    #[error("invalid chunk size {0}")]
    InvalidChunkSize(usize),

    /// A previous fatal error left the decoder unusable.
    #[error("decoder failed earlier and cannot continue")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while turning a frame into a message and back.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("message is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("compressed encoding failed: {0}")]
    Compression(io::Error),
}

/// Error type of the message codec driven by `tokio_util::codec::Framed`.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> CodecError {
        CodecError::Framing(FramingError::Io(e))
    }
}

/// A capability URN carries a parameter that cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("invalid value {value:?} for capability parameter {name}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("{0:?} cannot be used as a module namespace")]
    InvalidNamespace(String),
}

/// Problems with the structure of a NETCONF message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message is not well-formed XML: {0}")]
    Malformed(String),

    #[error("message has no root element")]
    MissingRoot,

    #[error("expected <{expected}> but found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("invalid session-id {0:?}")]
    InvalidSessionId(String),

    #[error("malformed additional header {0:?}")]
    MalformedHeader(String),
}

/// Terminal negotiation failures. The transport is always closed when one of
/// these is reported.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("session was not established after {0}ms")]
    Timeout(u64),

    #[error("malformed hello message: {0}")]
    MalformedHello(#[from] MessageError),

    #[error("hello message rejected: {0}")]
    InvalidHello(String),

    #[error("peer hello received before the local hello was sent")]
    OutOfOrder,

    #[error("unexpected message during negotiation: {0}")]
    UnexpectedMessage(String),

    #[error("failed to decode negotiation message: {0}")]
    Decode(#[from] CodecError),

    #[error("transport failed during negotiation: {0}")]
    Transport(String),

    #[error("negotiation already finished")]
    Finished,

    #[error("invalid session configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Transport-level failures handed to outstanding requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no live session")]
    NoSession,

    #[error("limit of concurrent rpc messages was reached (limit: {limit})")]
    LimitReached { limit: usize },

    #[error("failed to write request: {0}")]
    WriteFailed(String),

    #[error("session went down: {0}")]
    SessionDown(String),

    #[error("session terminated: {0}")]
    SessionTerminated(String),

    #[error("request was dropped before completion")]
    Dropped,
}

/// A well-formed reply whose content reports a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub errors: Vec<RpcErrorInfo>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msgs: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "rpc-error: {}", msgs.join("; "))
    }
}

impl std::error::Error for ProtocolError {}

/// The failure side of an rpc result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The peer never answered.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The peer answered with an error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The outbound message could not be stamped with a message-id.
    #[error("invalid request message: {0}")]
    InvalidMessage(String),
}

impl RequestError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RequestError::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, RequestError::Protocol(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
