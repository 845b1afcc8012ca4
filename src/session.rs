// Copyright 2020 Joyent, Inc.

//! An established NETCONF session and the event loop that serves it.
//!
//! Every connection is owned by exactly one task. That task runs
//! [`drive`], which multiplexes three event sources: requests admitted by
//! the correlator, frames decoded from the transport and the shutdown
//! signal. Codec state and the correlation table are only touched from this
//! task.

use std::fmt;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use slog::{debug, error, info, o, Logger};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::Framed;

use crate::correlator::{Correlator, PendingRequest};
use crate::error::{CodecError, TransportError};
use crate::framing::FramingMode;
use crate::message::{AdditionalHeader, NetconfMessage};
use crate::negotiator::Role;
use crate::preferences::SessionPreferences;
use crate::protocol::{MessageEncoding, NetconfCodec};

/// The outcome of a successful hello exchange.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: u32,
    pub role: Role,
    pub framing: FramingMode,
    pub encoding: MessageEncoding,
    /// Capabilities advertised by the peer.
    pub preferences: SessionPreferences,
    /// Additional header sent by the peer in front of its hello.
    pub peer_header: Option<AdditionalHeader>,
    pub established_at: DateTime<Utc>,
    /// Notifications that arrived before the session was established.
    pub early_notifications: Vec<NetconfMessage>,
}

impl Session {
    pub fn logger(&self, log: &Logger) -> Logger {
        log.new(o!("session" => self.id, "role" => self.role.to_string()))
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} ({}, {} framing, {:?} encoding, {})",
            self.id, self.role, self.framing, self.encoding, self.preferences
        )
    }
}

/// Why [`drive`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The transport failed or the peer went away.
    Down(String),
    /// The session was closed on purpose.
    Terminated(String),
}

enum LoopEvent {
    Request(Option<PendingRequest>),
    Frame(Option<Result<NetconfMessage, CodecError>>),
    // true when the sending side of the signal is gone
    Shutdown(bool),
}

/// Serve one established session until it ends. Outstanding requests are
/// failed before this returns, with a transport error matching the cause.
pub async fn drive<T>(
    mut framed: Framed<T, NetconfCodec>,
    correlator: &mut Correlator,
    shutdown: &mut watch::Receiver<bool>,
    log: &Logger,
) -> SessionEnd
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    correlator.session_up();
    info!(log, "session up");

    loop {
        let closing = *shutdown.borrow();
        if closing {
            return terminate(framed, correlator, log, "closed by client").await;
        }

        let event = tokio::select! {
            req = correlator.next_request() => LoopEvent::Request(req),
            frame = framed.next() => LoopEvent::Frame(frame),
            res = shutdown.changed() => LoopEvent::Shutdown(res.is_err()),
        };

        match event {
            LoopEvent::Request(Some(req)) => {
                if let Some((id, msg)) = correlator.accept(req) {
                    debug!(log, "writing request"; "message-id" => &id);
                    let res = framed
                        .send(msg)
                        .await
                        .map_err(|e| TransportError::WriteFailed(e.to_string()));
                    let failed = res.as_ref().err().cloned();
                    correlator.on_write_complete(&id, res);
                    if let Some(e) = failed {
                        error!(log, "write failed"; "err" => %e);
                        let cause = e.to_string();
                        correlator.on_session_down(&cause);
                        return SessionEnd::Down(cause);
                    }
                }
            }
            LoopEvent::Shutdown(false) => (),
            LoopEvent::Request(None) | LoopEvent::Shutdown(true) => {
                return terminate(framed, correlator, log, "client dropped").await;
            }
            LoopEvent::Frame(Some(Ok(msg))) => {
                correlator.on_incoming(msg);
            }
            LoopEvent::Frame(Some(Err(e))) => {
                error!(log, "failed to decode frame"; "err" => %e);
                let cause = e.to_string();
                correlator.on_session_down(&cause);
                return SessionEnd::Down(cause);
            }
            LoopEvent::Frame(None) if correlator.is_closing() => {
                return terminate(framed, correlator, log, "session closed").await;
            }
            LoopEvent::Frame(None) => {
                let cause = "connection closed by peer".to_string();
                info!(log, "session down"; "cause" => &cause);
                correlator.on_session_down(&cause);
                return SessionEnd::Down(cause);
            }
        }
    }
}

async fn terminate<T>(
    mut framed: Framed<T, NetconfCodec>,
    correlator: &mut Correlator,
    log: &Logger,
    reason: &str,
) -> SessionEnd
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    info!(log, "session terminated"; "reason" => reason);
    correlator.on_session_terminated(reason);
    if let Err(e) = framed.close().await {
        debug!(log, "error closing transport"; "err" => %e);
    }
    SessionEnd::Terminated(reason.to_string())
}
