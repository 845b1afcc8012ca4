// Copyright 2020 Joyent, Inc.

//! Client side of a NETCONF session.
//!
//! [`connect`] negotiates a session over an already connected stream and
//! hands the connection to a background task. [`ReconnectingClient`] owns
//! the whole connection lifecycle and keeps one correlator across
//! sessions, so its handle stays valid while the device comes and goes.

use std::io;
use std::net::SocketAddr;

use futures::future::BoxFuture;
use slog::{error, info, o, warn, Drain, Logger};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::correlator::{Correlator, CorrelatorHandle, ReplyFuture, RpcResult};
use crate::error::NegotiationError;
use crate::message::NetconfMessage;
use crate::negotiator::{self, Role};
use crate::reconnect::ReconnectStrategy;
use crate::session::{self, Session, SessionEnd};

fn client_logger(config: &ClientConfig, log: Option<&Logger>) -> Logger {
    let log = log
        .cloned()
        .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
    log.new(o!("device" => config.name.clone()))
}

fn with_override(config: &ClientConfig, mut session: Session) -> Session {
    if let Some(ovr) = &config.capability_override {
        session.preferences = ovr.apply(&session.preferences);
    }
    session
}

// Notifications received during negotiation go to the listener ahead of
// anything the session loop reads.
fn deliver_early_notifications(correlator: &mut Correlator, session: &mut Session) {
    for msg in session.early_notifications.drain(..) {
        correlator.on_incoming(msg);
    }
}

/// A negotiated session served by a background task.
#[derive(Debug)]
pub struct NetconfClient {
    handle: CorrelatorHandle,
    session: Session,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<SessionEnd>,
    notifications: Option<mpsc::UnboundedReceiver<NetconfMessage>>,
}

/// Negotiate a client session over `stream`.
pub async fn connect<T>(
    stream: T,
    config: &ClientConfig,
    log: Option<&Logger>,
) -> Result<NetconfClient, NegotiationError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    config.validate()?;
    let log = client_logger(config, log);

    let (framed, session) =
        negotiator::establish(stream, Role::Client, None, &config.session, &log).await?;
    let mut session = with_override(config, session);
    info!(log, "connected"; "session" => %session);

    let (mut correlator, handle) =
        Correlator::new(&config.name, config.concurrent_rpc_limit, Some(&log));
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    correlator.set_notification_listener(notify_tx);
    correlator.session_up();
    deliver_early_notifications(&mut correlator, &mut session);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let session_log = session.logger(&log);
    let task = tokio::spawn(async move {
        session::drive(framed, &mut correlator, &mut shutdown_rx, &session_log).await
    });

    Ok(NetconfClient {
        handle,
        session,
        shutdown: shutdown_tx,
        task,
        notifications: Some(notify_rx),
    })
}

impl NetconfClient {
    pub fn send(&self, msg: NetconfMessage) -> ReplyFuture {
        self.handle.send(msg)
    }

    /// Wrap `body` in an `<rpc>` element and send it.
    pub fn rpc(&self, body: &str) -> ReplyFuture {
        self.handle.send(NetconfMessage::rpc(body))
    }

    pub fn handle(&self) -> CorrelatorHandle {
        self.handle.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    /// Notifications received on this session. Only the first call returns
    /// the receiver.
    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<NetconfMessage>> {
        self.notifications.take()
    }

    /// Send `<close-session/>`, wait for the reply and stop the session task.
    pub async fn close(self) -> RpcResult {
        let reply = self.handle.close_session().await;
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
        reply
    }

    /// Wait for the session to end without closing it.
    pub async fn closed(self) -> SessionEnd {
        let NetconfClient {
            handle,
            shutdown,
            task,
            ..
        } = self;
        let end = task
            .await
            .unwrap_or_else(|e| SessionEnd::Down(format!("session task failed: {}", e)));
        drop((handle, shutdown));
        end
    }
}

/// Opens transport connections for a [`ReconnectingClient`].
pub trait Connector: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(&mut self) -> BoxFuture<'static, io::Result<Self::Stream>>;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr) -> TcpConnector {
        TcpConnector { addr }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self) -> BoxFuture<'static, io::Result<TcpStream>> {
        Box::pin(TcpStream::connect(self.addr))
    }
}

/// A client that reconnects and renegotiates whenever the session goes
/// down, until the strategy gives up or the client is closed.
///
/// Requests submitted while no session is up fail immediately with a
/// no-session transport error.
#[derive(Debug)]
pub struct ReconnectingClient {
    handle: CorrelatorHandle,
    sessions: watch::Receiver<Option<Session>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    notifications: Option<mpsc::UnboundedReceiver<NetconfMessage>>,
}

impl ReconnectingClient {
    pub fn start<C, S>(
        connector: C,
        strategy: S,
        config: ClientConfig,
        log: Option<&Logger>,
    ) -> ReconnectingClient
    where
        C: Connector,
        S: ReconnectStrategy + 'static,
    {
        let log = client_logger(&config, log);
        let (mut correlator, handle) =
            Correlator::new(&config.name, config.concurrent_rpc_limit, Some(&log));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        correlator.set_notification_listener(notify_tx);

        let (session_tx, session_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(reconnect_loop(
            connector,
            strategy,
            config,
            correlator,
            session_tx,
            shutdown_rx,
            log,
        ));

        ReconnectingClient {
            handle,
            sessions: session_rx,
            shutdown: shutdown_tx,
            task,
            notifications: Some(notify_rx),
        }
    }

    pub fn send(&self, msg: NetconfMessage) -> ReplyFuture {
        self.handle.send(msg)
    }

    pub fn rpc(&self, body: &str) -> ReplyFuture {
        self.handle.send(NetconfMessage::rpc(body))
    }

    pub fn handle(&self) -> CorrelatorHandle {
        self.handle.clone()
    }

    /// The current session, if one is up.
    pub fn session(&self) -> Option<Session> {
        self.sessions.borrow().clone()
    }

    /// Wait until a session is up. Returns `None` once the client has
    /// stopped reconnecting.
    pub async fn wait_for_session(&mut self) -> Option<Session> {
        loop {
            let current = self.sessions.borrow().clone();
            if current.is_some() {
                return current;
            }
            if self.sessions.changed().await.is_err() {
                return None;
            }
        }
    }

    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<NetconfMessage>> {
        self.notifications.take()
    }

    /// Close the current session, if any, and stop reconnecting.
    pub async fn close(self) {
        if self.handle.is_live() {
            let _ = self.handle.close_session().await;
        }
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn reconnect_loop<C, S>(
    mut connector: C,
    mut strategy: S,
    config: ClientConfig,
    mut correlator: Correlator,
    sessions: watch::Sender<Option<Session>>,
    mut shutdown: watch::Receiver<bool>,
    log: Logger,
) where
    C: Connector,
    S: ReconnectStrategy,
{
    loop {
        let stop = *shutdown.borrow();
        if stop {
            break;
        }

        let cause = match connector.connect().await {
            Ok(stream) => {
                match negotiator::establish(stream, Role::Client, None, &config.session, &log)
                    .await
                {
                    Ok((framed, session)) => {
                        strategy.reconnect_succeeded();
                        let mut session = with_override(&config, session);
                        info!(log, "connected"; "session" => %session);
                        deliver_early_notifications(&mut correlator, &mut session);
                        let session_log = session.logger(&log);
                        let _ = sessions.send(Some(session));

                        let end =
                            session::drive(framed, &mut correlator, &mut shutdown, &session_log)
                                .await;
                        let _ = sessions.send(None);
                        match end {
                            SessionEnd::Terminated(_) => break,
                            SessionEnd::Down(cause) => cause,
                        }
                    }
                    Err(e) => format!("negotiation failed: {}", e),
                }
            }
            Err(e) => format!("connect failed: {}", e),
        };

        match strategy.next_delay(&cause) {
            Some(delay) => {
                warn!(log, "reconnecting"; "cause" => &cause,
                    "delay_ms" => delay.as_millis() as u64);
                let stop = tokio::select! {
                    _ = tokio::time::sleep(delay) => false,
                    res = shutdown.changed() => res.is_err() || *shutdown.borrow(),
                };
                if stop {
                    break;
                }
            }
            None => {
                error!(log, "giving up on device"; "cause" => &cause);
                break;
            }
        }
    }
}
