// Copyright 2020 Joyent, Inc.

//! netconf-wire: the wire and session layers of NETCONF (RFC 6241) as
//! carried over a byte stream (RFC 6242).
//!
//! Protocol overview
//!
//! A NETCONF session starts with both peers sending a `<hello>` listing the
//! capabilities they support. The server's hello carries a session-id; the
//! client's must not. Messages are framed one of two ways:
//!
//! * End-of-message: each message is followed by the marker `]]>]]>`. This
//!   is the only framing allowed before the hellos have been exchanged, and
//!   the only one a base:1.0 peer understands.
//!
//! * Chunked: each message is a sequence of chunks, each written as
//!   `\n#<size>\n<data>`, and the message ends with `\n##\n`. Both peers
//!   switch to chunked framing right after the hellos when both advertised
//!   `urn:ietf:params:netconf:base:1.1`.
//!
//! After the hello exchange the client sends `<rpc>` requests, each carrying
//! a `message-id` attribute, and the server answers each with an
//! `<rpc-reply>` carrying the same `message-id`. Replies may contain `<ok/>`,
//! data or one or more `<rpc-error>` elements. A server may also send
//! `<notification>` messages at any time.
//!
//! If both hellos advertise the EXI capability, a client may request an
//! alternate encoding with `<start-exi>`. Once the server replies `<ok/>`,
//! both sides switch to the compressed encoding for every following message.
//!
//! Crate layout
//!
//! * [`framing`] splits a byte stream into messages and back.
//! * [`capability`] and [`preferences`] model advertised capabilities.
//! * [`negotiator`] runs the hello exchange and picks framing and encoding.
//! * [`correlator`] matches replies to outstanding requests.
//! * [`client`] and [`server`] put the pieces together over a socket.

#![allow(missing_docs)]

pub mod capability;
pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod framing;
pub mod message;
pub mod negotiator;
pub mod preferences;
pub mod protocol;
pub mod reconnect;
pub mod server;
pub mod session;
pub mod timer;
