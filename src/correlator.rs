// Copyright 2020 Joyent, Inc.

//! Request/reply correlation.
//!
//! The [`Correlator`] is owned by the session's event loop. Application code
//! talks to it through a cloneable [`CorrelatorHandle`], which may be used
//! from any thread: admission control (live session, in-flight ceiling) is
//! decided on the caller's side with atomics, and admitted requests are
//! queued to the loop in admission order.
//!
//! Every accepted request holds one in-flight slot until its result is
//! assigned. Rejections are reported through an already-completed
//! [`ReplyFuture`], never by blocking or panicking.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use slog::{debug, info, o, trace, warn, Drain, Logger};
use tokio::sync::{mpsc, oneshot};

use crate::error::{ProtocolError, RequestError, TransportError};
use crate::message::{ErrorSeverity, ErrorType, NetconfMessage, RpcErrorInfo};

pub type RpcResult = Result<NetconfMessage, RequestError>;

#[derive(Debug)]
struct Shared {
    live: AtomicBool,
    in_flight: AtomicUsize,
    limit: usize,
    next_id: AtomicU64,
}

fn try_reserve(shared: &Arc<Shared>) -> Option<Permit> {
    let limit = shared.limit;
    shared
        .in_flight
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            if limit == 0 || n < limit {
                Some(n + 1)
            } else {
                None
            }
        })
        .ok()
        .map(|_| Permit {
            shared: Arc::clone(shared),
        })
}

/// One in-flight slot, released on drop.
#[derive(Debug)]
struct Permit {
    shared: Arc<Shared>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An admitted request waiting for its reply.
#[derive(Debug)]
pub struct PendingRequest {
    message_id: String,
    message: NetconfMessage,
    closes_session: bool,
    slot: oneshot::Sender<RpcResult>,
    permit: Permit,
}

impl PendingRequest {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn message(&self) -> &NetconfMessage {
        &self.message
    }

    /// Assign the result. The slot is released before the caller is woken.
    fn complete(self, result: RpcResult) {
        let PendingRequest { slot, permit, .. } = self;
        drop(permit);
        let _ = slot.send(result);
    }
}

enum ReplyState {
    Ready(Option<RpcResult>),
    Waiting(oneshot::Receiver<RpcResult>),
}

/// The eventual result of a request.
pub struct ReplyFuture {
    state: ReplyState,
}

impl ReplyFuture {
    fn ready(result: RpcResult) -> ReplyFuture {
        ReplyFuture {
            state: ReplyState::Ready(Some(result)),
        }
    }

    fn rejected(err: TransportError) -> ReplyFuture {
        ReplyFuture::ready(Err(RequestError::Transport(err)))
    }

    /// The result if it has been assigned, without waiting.
    pub fn try_result(&mut self) -> Option<RpcResult> {
        match &mut self.state {
            ReplyState::Ready(result) => result.take(),
            ReplyState::Waiting(rx) => match rx.try_recv() {
                Ok(result) => {
                    self.state = ReplyState::Ready(None);
                    Some(result)
                }
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.state = ReplyState::Ready(None);
                    Some(Err(TransportError::Dropped.into()))
                }
            },
        }
    }

    /// Block the current thread until the result is assigned. Must not be
    /// called from within an async context.
    pub fn wait(self) -> RpcResult {
        match self.state {
            ReplyState::Ready(result) => result.unwrap_or_else(|| Err(TransportError::Dropped.into())),
            ReplyState::Waiting(rx) => rx
                .blocking_recv()
                .unwrap_or_else(|_| Err(TransportError::Dropped.into())),
        }
    }
}

impl Future for ReplyFuture {
    type Output = RpcResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<RpcResult> {
        let this = self.get_mut();
        match &mut this.state {
            ReplyState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or_else(|| Err(TransportError::Dropped.into())))
            }
            ReplyState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|r| r.unwrap_or_else(|_| Err(TransportError::Dropped.into()))),
        }
    }
}

/// Thread-safe sending side of a correlator.
#[derive(Debug, Clone)]
pub struct CorrelatorHandle {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<PendingRequest>,
}

impl CorrelatorHandle {
    /// Submit an rpc. The message-id attribute is assigned here and replaces
    /// any id the message already carries.
    pub fn send(&self, msg: NetconfMessage) -> ReplyFuture {
        self.submit(msg, false)
    }

    /// Submit `<close-session/>`. Once it is written, the peer closing the
    /// transport ends the session instead of failing it.
    pub fn close_session(&self) -> ReplyFuture {
        self.submit(NetconfMessage::close_session(), true)
    }

    fn submit(&self, msg: NetconfMessage, closes_session: bool) -> ReplyFuture {
        if !self.shared.live.load(Ordering::SeqCst) {
            return ReplyFuture::rejected(TransportError::NoSession);
        }

        let permit = match try_reserve(&self.shared) {
            Some(permit) => permit,
            None => {
                return ReplyFuture::rejected(TransportError::LimitReached {
                    limit: self.shared.limit,
                })
            }
        };

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let message = match msg.with_message_id(&id) {
            Ok(message) => message,
            Err(e) => return ReplyFuture::ready(Err(RequestError::InvalidMessage(e.to_string()))),
        };

        let (slot, rx) = oneshot::channel();
        let req = PendingRequest {
            message_id: id,
            message,
            closes_session,
            slot,
            permit,
        };
        if self.tx.send(req).is_err() {
            return ReplyFuture::rejected(TransportError::NoSession);
        }

        ReplyFuture {
            state: ReplyState::Waiting(rx),
        }
    }

    pub fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Requests admitted and not yet completed.
    pub fn outstanding(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.shared.limit
    }
}

/// What [`Correlator::on_incoming`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Completed the request with this message-id.
    Reply(String),
    Notification,
    /// Dropped: no matching request.
    Unsolicited,
}

pub struct Correlator {
    shared: Arc<Shared>,
    rx: mpsc::UnboundedReceiver<PendingRequest>,
    pending: HashMap<String, PendingRequest>,
    notifications: Option<mpsc::UnboundedSender<NetconfMessage>>,
    closing: bool,
    log: Logger,
}

impl Correlator {
    /// `limit` caps the number of outstanding requests; 0 disables the cap.
    /// The correlator starts without a live session.
    pub fn new(name: &str, limit: usize, log: Option<&Logger>) -> (Correlator, CorrelatorHandle) {
        let log = log
            .cloned()
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()))
            .new(o!("device" => name.to_string()));

        let shared = Arc::new(Shared {
            live: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            limit,
            next_id: AtomicU64::new(1),
        });
        let (tx, rx) = mpsc::unbounded_channel();

        let correlator = Correlator {
            shared: Arc::clone(&shared),
            rx,
            pending: HashMap::new(),
            notifications: None,
            closing: false,
            log,
        };
        (correlator, CorrelatorHandle { shared, tx })
    }

    pub fn set_notification_listener(&mut self, listener: mpsc::UnboundedSender<NetconfMessage>) {
        self.notifications = Some(listener);
    }

    pub fn session_up(&mut self) {
        self.closing = false;
        self.shared.live.store(true, Ordering::SeqCst);
        debug!(self.log, "correlator accepting requests");
    }

    pub fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// True once a close-session request has been accepted.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Requests written and awaiting a reply.
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Next admitted request, in admission order. Returns `None` once every
    /// handle is gone.
    pub async fn next_request(&mut self) -> Option<PendingRequest> {
        self.rx.recv().await
    }

    pub fn try_next_request(&mut self) -> Option<PendingRequest> {
        self.rx.try_recv().ok()
    }

    /// Record a request in the correlation table. Returns the message-id
    /// and the message to write, or `None` if the session went down after
    /// the request was admitted.
    pub fn accept(&mut self, req: PendingRequest) -> Option<(String, NetconfMessage)> {
        if !self.is_live() {
            req.complete(Err(TransportError::NoSession.into()));
            return None;
        }

        if req.closes_session {
            self.closing = true;
        }
        let id = req.message_id.clone();
        let msg = req.message.clone();
        trace!(self.log, "request accepted"; "message-id" => &id);
        self.pending.insert(id.clone(), req);
        Some((id, msg))
    }

    pub fn on_write_complete(&mut self, message_id: &str, result: Result<(), TransportError>) {
        if let Err(e) = result {
            if let Some(req) = self.pending.remove(message_id) {
                warn!(self.log, "failed to write request"; "message-id" => message_id, "err" => %e);
                req.complete(Err(e.into()));
            }
        }
    }

    pub fn on_incoming(&mut self, msg: NetconfMessage) -> Incoming {
        if msg.is_notification() {
            match &self.notifications {
                Some(listener) => {
                    if listener.send(msg).is_err() {
                        debug!(self.log, "notification listener is gone");
                    }
                }
                None => debug!(self.log, "dropping notification, no listener registered"),
            }
            return Incoming::Notification;
        }

        if !msg.is_rpc_reply() {
            warn!(self.log, "dropping unexpected message"; "root" => msg.root_name().unwrap_or_default());
            return Incoming::Unsolicited;
        }

        let id = match msg.message_id() {
            Ok(Some(id)) => id,
            Ok(None) => return self.on_reply_without_id(),
            Err(e) => {
                warn!(self.log, "dropping malformed reply"; "err" => %e);
                return Incoming::Unsolicited;
            }
        };

        match self.pending.remove(&id) {
            Some(req) => {
                trace!(self.log, "reply received"; "message-id" => &id);
                req.complete(reply_result(msg));
                Incoming::Reply(id)
            }
            None => {
                warn!(self.log, "dropping unsolicited reply"; "message-id" => &id);
                Incoming::Unsolicited
            }
        }
    }

    // A reply without a message-id can only be attributed when exactly one
    // request is outstanding.
    fn on_reply_without_id(&mut self) -> Incoming {
        if self.pending.len() != 1 {
            warn!(self.log, "dropping reply without message-id"; "outstanding" => self.pending.len());
            return Incoming::Unsolicited;
        }

        let id = match self.pending.keys().next() {
            Some(id) => id.clone(),
            None => return Incoming::Unsolicited,
        };
        if let Some(req) = self.pending.remove(&id) {
            warn!(self.log, "reply is missing its message-id"; "expected" => &id);
            let err = RpcErrorInfo::new(ErrorType::Rpc, "bad-attribute", "reply has no message-id")
                .with_info("bad-attribute", "message-id")
                .with_info("expected-message-id", &id);
            req.complete(Err(ProtocolError { errors: vec![err] }.into()));
        }
        Incoming::Reply(id)
    }

    pub fn on_session_down(&mut self, cause: &str) {
        self.fail_all(TransportError::SessionDown(cause.to_string()));
    }

    pub fn on_session_terminated(&mut self, reason: &str) {
        self.fail_all(TransportError::SessionTerminated(reason.to_string()));
    }

    // Fails both written and still-queued requests. A second call finds
    // nothing left to fail.
    fn fail_all(&mut self, err: TransportError) {
        self.shared.live.store(false, Ordering::SeqCst);
        self.closing = false;

        let mut failed = 0;
        for (_, req) in self.pending.drain() {
            req.complete(Err(err.clone().into()));
            failed += 1;
        }
        while let Ok(req) = self.rx.try_recv() {
            req.complete(Err(err.clone().into()));
            failed += 1;
        }

        if failed > 0 {
            info!(self.log, "failed outstanding requests"; "count" => failed, "cause" => %err);
        }
    }
}

impl Drop for Correlator {
    fn drop(&mut self) {
        self.rx.close();
        self.fail_all(TransportError::SessionDown("correlator dropped".to_string()));
    }
}

// Error-severity rpc-errors turn the reply into a protocol error; warnings
// alone do not.
fn reply_result(msg: NetconfMessage) -> RpcResult {
    match msg.rpc_errors() {
        Ok(errors) if errors.iter().any(|e| e.severity == ErrorSeverity::Error) => {
            Err(ProtocolError { errors }.into())
        }
        _ => Ok(msg),
    }
}
