// Copyright 2020 Joyent, Inc.

//! The hello exchange.
//!
//! ```text
//!   Idle --start--> AwaitingPeerHello --peer hello--> Negotiated
//!                        |      \
//!                        |       `--peer hello, EXI--> AwaitingExiReply --reply--> Negotiated
//!                        `--timeout / bad hello / transport failure--> Failed
//! ```
//!
//! The negotiator itself does no I/O. [`SessionNegotiator::on_message`]
//! mutates the codec in place once a message is fully processed, so the
//! next frame is already decoded with the negotiated framing. [`negotiate`]
//! drives a negotiator over a `Framed` transport.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use slog::{debug, info, o, warn, Drain, Logger};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use crate::capability;
use crate::config::SessionConfig;
use crate::error::{CodecError, NegotiationError};
use crate::framing::FramingMode;
use crate::message::{HelloMessage, NetconfMessage};
use crate::preferences::{CapabilityOrigin, SessionPreferences};
use crate::protocol::{MessageEncoding, NetconfCodec};
use crate::session::Session;
use crate::timer::{NegotiationTimer, TimeoutToken, TokioTimer};

pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_millis(20_000);

const START_EXI_MESSAGE_ID: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    AwaitingPeerHello,
    AwaitingExiReply(Box<Session>),
    Negotiated,
    Failed,
}

/// Externally visible negotiation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingPeerHello,
    AwaitingExiReply,
    Negotiated,
    Failed,
}

#[derive(Debug)]
pub enum Negotiation {
    /// Still negotiating; the message, if any, must be written to the peer.
    Pending(Option<NetconfMessage>),
    Established(Session),
}

pub struct SessionNegotiator {
    role: Role,
    local_hello: HelloMessage,
    timeout: Duration,
    exi_level: Option<i32>,
    state: State,
    timer: Box<dyn NegotiationTimer>,
    pending_timeout: Option<TimeoutToken>,
    log: Logger,
}

impl SessionNegotiator {
    /// A client hello must not carry a session-id; a server hello must.
    pub fn new(
        role: Role,
        local_hello: HelloMessage,
        timer: Box<dyn NegotiationTimer>,
        log: Option<&Logger>,
    ) -> SessionNegotiator {
        let log = log
            .cloned()
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()))
            .new(o!("role" => role.to_string()));

        SessionNegotiator {
            role,
            local_hello,
            timeout: DEFAULT_NEGOTIATION_TIMEOUT,
            exi_level: None,
            state: State::Idle,
            timer,
            pending_timeout: None,
            log,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> SessionNegotiator {
        self.timeout = timeout;
        self
    }

    /// Request the compressed encoding after the hello exchange. Only a
    /// client requests it, and only if both hellos advertise EXI.
    pub fn exi(mut self, level: Option<i32>) -> SessionNegotiator {
        self.exi_level = level;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::AwaitingPeerHello => Phase::AwaitingPeerHello,
            State::AwaitingExiReply(_) => Phase::AwaitingExiReply,
            State::Negotiated => Phase::Negotiated,
            State::Failed => Phase::Failed,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Negotiated | State::Failed)
    }

    /// Connection is active: returns the local hello to be written and arms
    /// the negotiation timer.
    pub fn start(&mut self) -> Result<NetconfMessage, NegotiationError> {
        match self.state {
            State::Idle => {
                self.state = State::AwaitingPeerHello;
                self.pending_timeout = Some(self.timer.schedule(self.timeout));
                debug!(self.log, "sending hello"; "timeout_ms" => self.timeout.as_millis() as u64);
                Ok(self.local_hello.to_message())
            }
            _ => Err(NegotiationError::Finished),
        }
    }

    pub fn on_message(
        &mut self,
        msg: &NetconfMessage,
        codec: &mut NetconfCodec,
    ) -> Result<Negotiation, NegotiationError> {
        match std::mem::replace(&mut self.state, State::Failed) {
            State::Idle => Err(self.fail(NegotiationError::OutOfOrder)),
            State::AwaitingPeerHello => self.on_peer_hello(msg, codec),
            State::AwaitingExiReply(session) => self.on_exi_reply(*session, msg, codec),
            state => {
                self.state = state;
                Err(NegotiationError::Finished)
            }
        }
    }

    /// A timer fired. Stale tokens, and tokens arriving after a terminal
    /// state was reached, are ignored.
    pub fn on_timeout(&mut self, token: TimeoutToken) -> Option<NegotiationError> {
        if self.is_finished() || self.pending_timeout != Some(token) {
            debug!(self.log, "ignoring stale negotiation timeout");
            return None;
        }

        // The timer already fired; nothing left to cancel.
        self.pending_timeout = None;
        let err = NegotiationError::Timeout(self.timeout.as_millis() as u64);
        Some(self.fail(err))
    }

    /// Abort the negotiation. Safe to call in any state.
    pub fn close(&mut self) {
        if !self.is_finished() {
            self.state = State::Failed;
            self.cancel_timer();
            debug!(self.log, "negotiation closed");
        }
    }

    /// Move to `Failed` and hand back the cause. The timer is cancelled if
    /// it is still armed.
    pub fn fail(&mut self, err: NegotiationError) -> NegotiationError {
        if !matches!(self.state, State::Negotiated) {
            self.state = State::Failed;
        }
        self.cancel_timer();
        warn!(self.log, "session negotiation failed"; "err" => %err);
        err
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.pending_timeout.take() {
            self.timer.cancel(token);
        }
    }

    fn on_peer_hello(
        &mut self,
        msg: &NetconfMessage,
        codec: &mut NetconfCodec,
    ) -> Result<Negotiation, NegotiationError> {
        let hello = match HelloMessage::parse(msg) {
            Ok(hello) => hello,
            Err(e) => return Err(self.fail(e.into())),
        };

        let session_id = match (self.role, hello.session_id, self.local_hello.session_id) {
            (Role::Client, Some(id), _) => id,
            (Role::Client, None, _) => {
                let err = NegotiationError::InvalidHello("server hello has no session-id".into());
                return Err(self.fail(err));
            }
            (Role::Server, Some(id), _) => {
                let err =
                    NegotiationError::InvalidHello(format!("client hello carries session-id {}", id));
                return Err(self.fail(err));
            }
            (Role::Server, None, Some(id)) => id,
            (Role::Server, None, None) => {
                let err = NegotiationError::InvalidHello("no session-id was assigned".into());
                return Err(self.fail(err));
            }
        };

        let base_1_0 =
            self.local_hello.has_capability(capability::BASE_1_0) && hello.has_capability(capability::BASE_1_0);
        let base_1_1 =
            self.local_hello.has_capability(capability::BASE_1_1) && hello.has_capability(capability::BASE_1_1);
        if !base_1_0 && !base_1_1 {
            let err = NegotiationError::InvalidHello("no common base capability".into());
            return Err(self.fail(err));
        }

        // The hello frame is fully consumed; the next frame uses the new mode.
        if base_1_1 {
            codec.set_framing(FramingMode::Chunked);
        }

        let preferences =
            SessionPreferences::from_capabilities(&hello.capabilities, CapabilityOrigin::DeviceAdvertised)
                .with_session_id(session_id);

        let session = Session {
            id: session_id,
            role: self.role,
            framing: codec.framing_mode(),
            encoding: codec.encoding(),
            preferences,
            peer_header: hello.additional_header,
            established_at: Utc::now(),
            early_notifications: Vec::new(),
        };

        let wants_exi = self.role == Role::Client
            && self.exi_level.is_some()
            && self.local_hello.has_capability_prefix(capability::EXI_1_0)
            && hello.capabilities.iter().any(|c| c.starts_with(capability::EXI_1_0));

        if wants_exi {
            debug!(self.log, "requesting compressed encoding"; "session" => session_id);
            self.state = State::AwaitingExiReply(Box::new(session));
            let start_exi = NetconfMessage::start_exi()
                .with_message_id(START_EXI_MESSAGE_ID)
                .map_err(|e| self.fail(e.into()))?;
            return Ok(Negotiation::Pending(Some(start_exi)));
        }

        Ok(self.established(session))
    }

    fn on_exi_reply(
        &mut self,
        mut session: Session,
        msg: &NetconfMessage,
        codec: &mut NetconfCodec,
    ) -> Result<Negotiation, NegotiationError> {
        // The server may interleave notifications; they are kept for the
        // session in arrival order.
        if msg.is_notification() {
            session.early_notifications.push(msg.clone());
            self.state = State::AwaitingExiReply(Box::new(session));
            return Ok(Negotiation::Pending(None));
        }
        if !msg.is_rpc_reply() {
            let err = NegotiationError::UnexpectedMessage(
                "expected the reply to start-exi".to_string(),
            );
            return Err(self.fail(err));
        }
        match msg.message_id() {
            Ok(Some(id)) if id == START_EXI_MESSAGE_ID => (),
            Ok(id) => {
                let err = NegotiationError::UnexpectedMessage(format!(
                    "reply with message-id {:?} while awaiting the reply to start-exi",
                    id
                ));
                return Err(self.fail(err));
            }
            Err(e) => {
                let err =
                    NegotiationError::UnexpectedMessage(format!("unreadable reply to start-exi: {}", e));
                return Err(self.fail(err));
            }
        }

        if msg.is_ok() {
            let level = self.exi_level.unwrap_or(crate::protocol::DEFAULT_COMPRESSION_LEVEL);
            codec.set_encoding(MessageEncoding::Compressed { level });
            session.encoding = codec.encoding();
        } else {
            warn!(self.log, "peer refused start-exi, keeping xml encoding");
        }

        Ok(self.established(session))
    }

    fn established(&mut self, session: Session) -> Negotiation {
        self.state = State::Negotiated;
        self.cancel_timer();
        info!(self.log, "session negotiated";
            "session" => session.id,
            "framing" => %session.framing,
            "encoding" => ?session.encoding);
        Negotiation::Established(session)
    }
}

enum NegotiationEvent {
    Frame(Option<Result<NetconfMessage, CodecError>>),
    Timeout(Option<TimeoutToken>),
}

/// Run the hello exchange over `framed`. On success the transport is
/// returned along with the session; on failure it is dropped, which closes
/// it.
pub async fn negotiate<T>(
    mut framed: Framed<T, NetconfCodec>,
    negotiator: &mut SessionNegotiator,
    timeouts: &mut mpsc::UnboundedReceiver<TimeoutToken>,
) -> Result<(Framed<T, NetconfCodec>, Session), NegotiationError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let hello = negotiator.start()?;
    if let Err(e) = framed.send(hello).await {
        return Err(negotiator.fail(NegotiationError::Transport(e.to_string())));
    }

    loop {
        let event = tokio::select! {
            frame = framed.next() => NegotiationEvent::Frame(frame),
            token = timeouts.recv() => NegotiationEvent::Timeout(token),
        };

        match event {
            NegotiationEvent::Frame(Some(Ok(msg))) => {
                match negotiator.on_message(&msg, framed.codec_mut())? {
                    Negotiation::Established(session) => return Ok((framed, session)),
                    Negotiation::Pending(Some(out)) => {
                        if let Err(e) = framed.send(out).await {
                            return Err(negotiator.fail(NegotiationError::Transport(e.to_string())));
                        }
                    }
                    Negotiation::Pending(None) => (),
                }
            }
            NegotiationEvent::Frame(Some(Err(e))) => {
                return Err(negotiator.fail(NegotiationError::Decode(e)));
            }
            NegotiationEvent::Frame(None) => {
                let err = NegotiationError::Transport("connection closed by peer".into());
                return Err(negotiator.fail(err));
            }
            NegotiationEvent::Timeout(Some(token)) => {
                if let Some(err) = negotiator.on_timeout(token) {
                    return Err(err);
                }
            }
            NegotiationEvent::Timeout(None) => {
                let err = NegotiationError::Transport("negotiation timer is gone".into());
                return Err(negotiator.fail(err));
            }
        }
    }
}

/// Wrap `stream` in a codec configured from `config` and negotiate a
/// session in the given role. A server passes the session-id it assigned.
pub async fn establish<T>(
    stream: T,
    role: Role,
    session_id: Option<u32>,
    config: &SessionConfig,
    log: &Logger,
) -> Result<(Framed<T, NetconfCodec>, Session), NegotiationError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    config.validate()?;
    let framed = Framed::new(stream, NetconfCodec::with_framing(config.frame_codec()?));
    let (timer, mut timeouts) = TokioTimer::new();
    let mut negotiator =
        SessionNegotiator::new(role, config.local_hello(session_id)?, Box::new(timer), Some(log))
            .timeout(config.connection_timeout())
            .exi(config.exi_compression);

    negotiate(framed, &mut negotiator, &mut timeouts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimer;

    fn base_caps(with_1_1: bool) -> Vec<&'static str> {
        if with_1_1 {
            vec![capability::BASE_1_0, capability::BASE_1_1]
        } else {
            vec![capability::BASE_1_0]
        }
    }

    fn client(caps: Vec<&'static str>, timer: &ManualTimer) -> SessionNegotiator {
        SessionNegotiator::new(
            Role::Client,
            HelloMessage::new(caps),
            Box::new(timer.clone()),
            None,
        )
    }

    fn server_hello(caps: Vec<&'static str>, session_id: u32) -> NetconfMessage {
        let mut hello = HelloMessage::new(caps);
        hello.session_id = Some(session_id);
        hello.to_message()
    }

    fn established(result: Result<Negotiation, NegotiationError>) -> Session {
        match result {
            Ok(Negotiation::Established(session)) => session,
            other => panic!("expected an established session, got {:?}", other),
        }
    }

    #[test]
    fn hello_before_start_is_out_of_order() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(true), &timer);
        let mut codec = NetconfCodec::new();

        let res = negotiator.on_message(&server_hello(base_caps(true), 1), &mut codec);
        assert!(matches!(res, Err(NegotiationError::OutOfOrder)));
        assert_eq!(negotiator.phase(), Phase::Failed);
        assert!(timer.armed().is_empty());
    }

    #[test]
    fn chunked_framing_when_both_sides_speak_1_1() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(true), &timer);
        let mut codec = NetconfCodec::new();

        let hello = negotiator.start().unwrap();
        assert!(HelloMessage::parse(&hello).unwrap().session_id.is_none());
        assert_eq!(timer.armed().len(), 1);

        let session = established(negotiator.on_message(&server_hello(base_caps(true), 42), &mut codec));
        assert_eq!(session.id, 42);
        assert_eq!(session.framing, FramingMode::Chunked);
        assert_eq!(codec.framing_mode(), FramingMode::Chunked);
        assert!(session.preferences.is_base_1_1_supported());
    }

    #[test]
    fn end_of_message_framing_is_kept_without_common_1_1() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(false), &timer);
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let session = established(negotiator.on_message(&server_hello(base_caps(true), 3), &mut codec));
        assert_eq!(session.framing, FramingMode::EndOfMessage);
        assert_eq!(codec.framing_mode(), FramingMode::EndOfMessage);
    }

    #[test]
    fn success_cancels_timer_and_late_timeout_is_ignored() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(true), &timer);
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let token = timer.armed()[0];

        established(negotiator.on_message(&server_hello(base_caps(true), 1), &mut codec));
        assert_eq!(timer.cancelled(), vec![token]);
        assert!(timer.armed().is_empty());

        // The timeout was already in flight when the hello arrived.
        assert!(negotiator.on_timeout(token).is_none());
        assert_eq!(negotiator.phase(), Phase::Negotiated);

        negotiator.close();
        negotiator.close();
        assert_eq!(timer.cancelled(), vec![token]);
    }

    #[test]
    fn timeout_wins_when_it_fires_first() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(true), &timer);
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let token = timer.armed()[0];

        assert!(matches!(
            negotiator.on_timeout(token),
            Some(NegotiationError::Timeout(20_000))
        ));
        assert!(negotiator.on_timeout(token).is_none());

        let res = negotiator.on_message(&server_hello(base_caps(true), 1), &mut codec);
        assert!(matches!(res, Err(NegotiationError::Finished)));
        assert_eq!(negotiator.phase(), Phase::Failed);
        assert_eq!(codec.framing_mode(), FramingMode::EndOfMessage);
        assert!(timer.cancelled().is_empty());
    }

    #[test]
    fn malformed_hello_fails_and_cancels_timer() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(true), &timer);
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let res = negotiator.on_message(&NetconfMessage::new("<hello><capabilities>"), &mut codec);
        assert!(matches!(res, Err(NegotiationError::MalformedHello(_))));
        assert_eq!(timer.cancelled().len(), 1);
        assert!(negotiator.start().is_err());
    }

    #[test]
    fn client_requires_session_id() {
        let timer = ManualTimer::new();
        let mut negotiator = client(base_caps(true), &timer);
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let hello = HelloMessage::new(base_caps(true)).to_message();
        let res = negotiator.on_message(&hello, &mut codec);
        assert!(matches!(res, Err(NegotiationError::InvalidHello(_))));
    }

    #[test]
    fn server_rejects_client_session_id() {
        let timer = ManualTimer::new();
        let mut local = HelloMessage::new(base_caps(true));
        local.session_id = Some(9);
        let mut negotiator = SessionNegotiator::new(Role::Server, local, Box::new(timer.clone()), None);
        let mut codec = NetconfCodec::new();

        let hello = negotiator.start().unwrap();
        assert_eq!(HelloMessage::parse(&hello).unwrap().session_id, Some(9));

        let res = negotiator.on_message(&server_hello(base_caps(true), 5), &mut codec);
        assert!(matches!(res, Err(NegotiationError::InvalidHello(_))));
    }

    #[test]
    fn server_assigns_its_own_session_id() {
        let timer = ManualTimer::new();
        let mut local = HelloMessage::new(base_caps(true));
        local.session_id = Some(9);
        let mut negotiator = SessionNegotiator::new(Role::Server, local, Box::new(timer.clone()), None);
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let session = established(
            negotiator.on_message(&HelloMessage::new(base_caps(false)).to_message(), &mut codec),
        );
        assert_eq!(session.id, 9);
        assert_eq!(session.role, Role::Server);
        assert_eq!(session.framing, FramingMode::EndOfMessage);
    }

    #[test]
    fn start_exi_switches_encoding_on_ok() {
        let timer = ManualTimer::new();
        let mut caps = base_caps(true);
        caps.push(capability::EXI_1_0);
        let mut negotiator = client(caps.clone(), &timer).exi(Some(5));
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        let peer = server_hello(caps, 2);
        let start_exi = match negotiator.on_message(&peer, &mut codec).unwrap() {
            Negotiation::Pending(Some(msg)) => msg,
            other => panic!("expected start-exi, got {:?}", other),
        };
        assert_eq!(start_exi.rpc_operation().unwrap().as_deref(), Some("start-exi"));
        assert_eq!(negotiator.phase(), Phase::AwaitingExiReply);
        assert_eq!(codec.encoding(), MessageEncoding::Xml);
        assert!(timer.cancelled().is_empty());

        let id = start_exi.message_id().unwrap().unwrap();
        let session = established(negotiator.on_message(&NetconfMessage::ok_reply(&id), &mut codec));
        assert_eq!(session.encoding, MessageEncoding::Compressed { level: 5 });
        assert_eq!(codec.encoding(), MessageEncoding::Compressed { level: 5 });
        assert_eq!(timer.cancelled().len(), 1);
    }

    #[test]
    fn refused_start_exi_keeps_xml() {
        let timer = ManualTimer::new();
        let mut caps = base_caps(true);
        caps.push(capability::EXI_1_0);
        let mut negotiator = client(caps.clone(), &timer).exi(Some(1));
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        negotiator.on_message(&server_hello(caps, 2), &mut codec).unwrap();

        let err = crate::message::RpcErrorInfo::operation_not_supported("start-exi");
        let reply = NetconfMessage::rpc_error_reply(Some("0"), &[err]);
        let session = established(negotiator.on_message(&reply, &mut codec));
        assert_eq!(session.encoding, MessageEncoding::Xml);
    }

    fn awaiting_exi_reply(timer: &ManualTimer, codec: &mut NetconfCodec) -> SessionNegotiator {
        let mut caps = base_caps(true);
        caps.push(capability::EXI_1_0);
        let mut negotiator = client(caps.clone(), timer).exi(Some(3));
        negotiator.start().unwrap();
        negotiator.on_message(&server_hello(caps, 2), codec).unwrap();
        assert_eq!(negotiator.phase(), Phase::AwaitingExiReply);
        negotiator
    }

    #[test]
    fn reply_to_another_request_is_not_the_start_exi_reply() {
        let timer = ManualTimer::new();
        let mut codec = NetconfCodec::new();
        let mut negotiator = awaiting_exi_reply(&timer, &mut codec);

        let res = negotiator.on_message(&NetconfMessage::ok_reply("17"), &mut codec);
        assert!(matches!(res, Err(NegotiationError::UnexpectedMessage(_))));
        assert_eq!(negotiator.phase(), Phase::Failed);
        assert_eq!(codec.encoding(), MessageEncoding::Xml);
        assert_eq!(timer.cancelled().len(), 1);

        let mut codec = NetconfCodec::new();
        let mut negotiator = awaiting_exi_reply(&timer, &mut codec);
        let no_id = NetconfMessage::new(format!(
            "<rpc-reply xmlns=\"{}\"><ok/></rpc-reply>",
            crate::message::BASE_NS
        ));
        let res = negotiator.on_message(&no_id, &mut codec);
        assert!(matches!(res, Err(NegotiationError::UnexpectedMessage(_))));
    }

    #[test]
    fn notifications_before_start_exi_reply_are_kept() {
        let timer = ManualTimer::new();
        let mut codec = NetconfCodec::new();
        let mut negotiator = awaiting_exi_reply(&timer, &mut codec);

        let first = NetconfMessage::notification("2020-01-01T00:00:00Z", "<a/>");
        let second = NetconfMessage::notification("2020-01-01T00:00:01Z", "<b/>");
        for n in &[&first, &second] {
            match negotiator.on_message(n, &mut codec).unwrap() {
                Negotiation::Pending(None) => (),
                other => panic!("expected nothing to send, got {:?}", other),
            }
        }
        assert_eq!(negotiator.phase(), Phase::AwaitingExiReply);

        let session = established(negotiator.on_message(&NetconfMessage::ok_reply("0"), &mut codec));
        assert_eq!(session.encoding, MessageEncoding::Compressed { level: 3 });
        assert_eq!(session.early_notifications, vec![first, second]);
    }

    #[test]
    fn exi_not_requested_unless_both_advertise_it() {
        let timer = ManualTimer::new();
        let mut caps = base_caps(true);
        caps.push(capability::EXI_1_0);
        let mut negotiator = client(caps, &timer).exi(Some(1));
        let mut codec = NetconfCodec::new();

        negotiator.start().unwrap();
        established(negotiator.on_message(&server_hello(base_caps(true), 2), &mut codec));
        assert_eq!(codec.encoding(), MessageEncoding::Xml);
    }
}
