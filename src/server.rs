// Copyright 2020 Joyent, Inc.

//! Device side of a NETCONF session.
//!
//! The server negotiates with the server role, assigning each session a
//! process-wide unique session-id, and then answers rpcs in the order they
//! arrive. `<close-session>` and `<start-exi>` are handled here; every other
//! operation goes to the handler, whose `Ok` value becomes the body of the
//! `<rpc-reply>` and whose `Err` value becomes an `<rpc-error>`.

use std::sync::atomic::{AtomicU32, Ordering};

use futures::{SinkExt, StreamExt};
use slog::{debug, error, info, o, warn, Drain, Logger};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::capability;
use crate::config::SessionConfig;
use crate::error::{CodecError, NegotiationError};
use crate::message::{ErrorType, NetconfMessage, RpcErrorInfo};
use crate::negotiator::{self, Role};
use crate::protocol::{MessageEncoding, NetconfCodec};
use crate::session::{Session, SessionEnd};

static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a session-id. Ids are never 0.
pub fn next_session_id() -> u32 {
    loop {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst);
        if id != 0 {
            return id;
        }
    }
}

/// Negotiate a server session over `socket` and answer requests until the
/// client closes it or the transport goes away.
pub async fn serve<T, F>(
    socket: T,
    handler: F,
    config: &SessionConfig,
    log: Option<&Logger>,
) -> Result<SessionEnd, NegotiationError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    F: Fn(&NetconfMessage, &Logger) -> Result<String, RpcErrorInfo>,
{
    let log = log
        .cloned()
        .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));

    let id = next_session_id();
    let (framed, session) =
        negotiator::establish(socket, Role::Server, Some(id), config, &log).await?;
    let log = session.logger(&log);
    info!(log, "session established"; "session" => %session);

    Ok(respond(framed, &session, handler, config, &log)
        .await
        .unwrap_or_else(|e| {
            error!(log, "session failed"; "err" => %e);
            SessionEnd::Down(e.to_string())
        }))
}

async fn respond<T, F>(
    mut framed: Framed<T, NetconfCodec>,
    session: &Session,
    handler: F,
    config: &SessionConfig,
    log: &Logger,
) -> Result<SessionEnd, CodecError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    F: Fn(&NetconfMessage, &Logger) -> Result<String, RpcErrorInfo>,
{
    loop {
        let msg = match framed.next().await {
            Some(msg) => msg?,
            None => {
                info!(log, "client disconnected");
                return Ok(SessionEnd::Down("connection closed by peer".to_string()));
            }
        };

        if !msg.is_rpc() {
            warn!(log, "ignoring message that is not an rpc";
                "root" => msg.root_name().unwrap_or_default());
            continue;
        }

        let message_id = match msg.message_id() {
            Ok(Some(id)) => id,
            _ => {
                let err = RpcErrorInfo::new(ErrorType::Rpc, "missing-attribute", "rpc has no message-id")
                    .with_info("bad-attribute", "message-id")
                    .with_info("bad-element", "rpc");
                framed.send(NetconfMessage::rpc_error_reply(None, &[err])).await?;
                continue;
            }
        };

        let operation = msg.rpc_operation().ok().flatten().unwrap_or_default();
        debug!(log, "request"; "message-id" => &message_id, "operation" => &operation);

        match operation.as_str() {
            "close-session" => {
                framed.send(NetconfMessage::ok_reply(&message_id)).await?;
                if let Err(e) = framed.close().await {
                    debug!(log, "error closing transport"; "err" => %e);
                }
                info!(log, "session closed by client");
                return Ok(SessionEnd::Terminated("closed by client".to_string()));
            }
            "start-exi" => start_exi(&mut framed, session, config, &message_id, log).await?,
            _ => {
                let response = match handler(&msg, log) {
                    Ok(body) => NetconfMessage::rpc_reply(&message_id, &body),
                    Err(err) => {
                        debug!(log, "request failed"; "err" => %err);
                        NetconfMessage::rpc_error_reply(Some(&message_id), &[err])
                    }
                };
                framed.send(response).await?;
            }
        }
    }
}

/// Spawn a task serving `socket`.
pub fn make_task<T, F>(
    socket: T,
    handler: F,
    config: SessionConfig,
    log: Option<&Logger>,
) -> JoinHandle<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    F: Fn(&NetconfMessage, &Logger) -> Result<String, RpcErrorInfo> + Send + Sync + 'static,
{
    let log = log
        .cloned()
        .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
    tokio::spawn(async move {
        match serve(socket, handler, &config, Some(&log)).await {
            Ok(end) => debug!(log, "session finished"; "end" => ?end),
            Err(e) => error!(log, "failed to establish session"; "err" => %e),
        }
    })
}

// The reply to start-exi goes out in XML; the encoding switches after it.
async fn start_exi<T>(
    framed: &mut Framed<T, NetconfCodec>,
    session: &Session,
    config: &SessionConfig,
    message_id: &str,
    log: &Logger,
) -> Result<(), CodecError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let offered = session
        .preferences
        .contains_partial_non_module(capability::EXI_1_0);
    match config.exi_compression {
        Some(level) if offered && framed.codec().encoding() == MessageEncoding::Xml => {
            framed.send(NetconfMessage::ok_reply(message_id)).await?;
            framed
                .codec_mut()
                .set_encoding(MessageEncoding::Compressed { level });
            info!(log, "switched to compressed encoding"; "level" => level);
        }
        _ => {
            let err = RpcErrorInfo::operation_not_supported("start-exi");
            framed
                .send(NetconfMessage::rpc_error_reply(Some(message_id), &[err]))
                .await?;
        }
    }
    Ok(())
}
