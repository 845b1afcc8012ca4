// Copyright 2020 Joyent, Inc.

//! NETCONF messages.
//!
//! A [`NetconfMessage`] is the XML text of one frame. Structural queries
//! (root element, message-id, rpc-error content) parse the text on demand
//! with `quick-xml`; the correlator and the negotiator only ever look at the
//! root element and a handful of well-known children.

use std::fmt;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::MessageError;

pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const EXI_NS: &str = "urn:ietf:params:xml:ns:netconf:exi:1.0";
pub const NOTIFICATION_NS: &str = "urn:ietf:params:xml:ns:netconf:notification:1.0";

const MESSAGE_ID: &str = "message-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetconfMessage {
    text: String,
}

impl NetconfMessage {
    pub fn new<S: Into<String>>(text: S) -> NetconfMessage {
        NetconfMessage { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Wrap an operation in an `<rpc>` envelope. The message-id is assigned
    /// when the request is admitted by the correlator.
    pub fn rpc(body: &str) -> NetconfMessage {
        NetconfMessage::new(format!("<rpc xmlns=\"{}\">{}</rpc>", BASE_NS, body))
    }

    pub fn rpc_reply(message_id: &str, body: &str) -> NetconfMessage {
        NetconfMessage::new(format!(
            "<rpc-reply xmlns=\"{}\" message-id=\"{}\">{}</rpc-reply>",
            BASE_NS,
            escape(message_id),
            body
        ))
    }

    pub fn ok_reply(message_id: &str) -> NetconfMessage {
        NetconfMessage::rpc_reply(message_id, "<ok/>")
    }

    pub fn rpc_error_reply(message_id: Option<&str>, errors: &[RpcErrorInfo]) -> NetconfMessage {
        let body: String = errors.iter().map(RpcErrorInfo::to_xml).collect();
        match message_id {
            Some(id) => NetconfMessage::rpc_reply(id, &body),
            None => NetconfMessage::new(format!(
                "<rpc-reply xmlns=\"{}\">{}</rpc-reply>",
                BASE_NS, body
            )),
        }
    }

    pub fn start_exi() -> NetconfMessage {
        NetconfMessage::rpc(&format!(
            "<start-exi xmlns=\"{}\"><alignment>compression</alignment></start-exi>",
            EXI_NS
        ))
    }

    pub fn close_session() -> NetconfMessage {
        NetconfMessage::rpc("<close-session/>")
    }

    pub fn notification(event_time: &str, body: &str) -> NetconfMessage {
        NetconfMessage::new(format!(
            "<notification xmlns=\"{}\"><eventTime>{}</eventTime>{}</notification>",
            NOTIFICATION_NS,
            escape(event_time),
            body
        ))
    }

    /// Local name of the root element.
    pub fn root_name(&self) -> Result<String, MessageError> {
        let root = find_root(&self.text)?;
        Ok(local_name(&root.start))
    }

    pub fn message_id(&self) -> Result<Option<String>, MessageError> {
        let root = find_root(&self.text)?;
        attribute(&root.start, MESSAGE_ID)
    }

    /// Return a copy whose root element carries `message-id="id"`,
    /// replacing any message-id already present.
    pub fn with_message_id(&self, id: &str) -> Result<NetconfMessage, MessageError> {
        let root = find_root(&self.text)?;

        let name = String::from_utf8_lossy(root.start.name().as_ref()).into_owned();
        let mut tag = BytesStart::new(name);
        for attr in root.start.attributes() {
            let attr = attr.map_err(|e| MessageError::Malformed(e.to_string()))?;
            if attr.key.local_name().as_ref() != MESSAGE_ID.as_bytes() {
                tag.push_attribute(attr);
            }
        }
        tag.push_attribute((MESSAGE_ID, id));

        let mut writer = Writer::new(Vec::new());
        let event = if root.empty {
            Event::Empty(tag)
        } else {
            Event::Start(tag)
        };
        writer
            .write_event(event)
            .map_err(|e| MessageError::Malformed(e.to_string()))?;
        let tag = String::from_utf8(writer.into_inner())
            .map_err(|e| MessageError::Malformed(e.to_string()))?;

        let mut text = String::with_capacity(self.text.len() + id.len() + 16);
        text.push_str(&self.text[..root.begin]);
        text.push_str(&tag);
        text.push_str(&self.text[root.end..]);
        Ok(NetconfMessage { text })
    }

    pub fn is_rpc(&self) -> bool {
        self.root_is("rpc")
    }

    pub fn is_rpc_reply(&self) -> bool {
        self.root_is("rpc-reply")
    }

    pub fn is_notification(&self) -> bool {
        self.root_is("notification")
    }

    pub fn is_hello(&self) -> bool {
        self.root_is("hello")
    }

    fn root_is(&self, name: &str) -> bool {
        self.root_name().map_or(false, |n| n == name)
    }

    /// An `<rpc-reply>` whose only content is `<ok/>`.
    pub fn is_ok(&self) -> bool {
        match parse_tree(&self.text) {
            Ok(root) => {
                root.name == "rpc-reply" && root.children.len() == 1 && root.children[0].name == "ok"
            }
            Err(_) => false,
        }
    }

    /// Local name of the operation inside an `<rpc>`.
    pub fn rpc_operation(&self) -> Result<Option<String>, MessageError> {
        let root = parse_tree(&self.text)?;
        if root.name != "rpc" {
            return Err(MessageError::UnexpectedRoot {
                expected: "rpc",
                found: root.name,
            });
        }
        Ok(root.children.into_iter().next().map(|c| c.name))
    }

    pub fn rpc_errors(&self) -> Result<Vec<RpcErrorInfo>, MessageError> {
        let root = parse_tree(&self.text)?;
        Ok(root
            .children
            .iter()
            .filter(|c| c.name == "rpc-error")
            .map(RpcErrorInfo::from_element)
            .collect())
    }

    /// Text between the root start and end tags.
    pub fn inner_xml(&self) -> Result<&str, MessageError> {
        let root = find_root(&self.text)?;
        if root.empty {
            return Ok("");
        }

        let mut reader = Reader::from_str(&self.text[root.end..]);
        // the root end tag has no matching start in this reader
        reader.check_end_names(false);
        let mut depth = 0usize;
        loop {
            let before = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::End(_)) => {
                    if depth == 0 {
                        return Ok(&self.text[root.end..root.end + before]);
                    }
                    depth -= 1;
                }
                Ok(Event::Eof) => return Err(MessageError::Malformed("unclosed root".into())),
                Ok(_) => (),
                Err(e) => return Err(MessageError::Malformed(e.to_string())),
            }
        }
    }
}

impl fmt::Display for NetconfMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }

    fn parse(s: &str) -> ErrorType {
        match s {
            "transport" => ErrorType::Transport,
            "rpc" => ErrorType::Rpc,
            "protocol" => ErrorType::Protocol,
            _ => ErrorType::Application,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Error,
    Warning,
}

impl ErrorSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorSeverity::Error => "error",
            ErrorSeverity::Warning => "warning",
        }
    }
}

/// Structured content of one `<rpc-error>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcErrorInfo {
    pub error_type: ErrorType,
    pub tag: String,
    pub severity: ErrorSeverity,
    pub app_tag: Option<String>,
    pub path: Option<String>,
    pub message: Option<String>,
    /// Children of `<error-info>` as (local name, text) pairs.
    pub info: Vec<(String, String)>,
}

impl RpcErrorInfo {
    pub fn new(error_type: ErrorType, tag: &str, message: &str) -> RpcErrorInfo {
        RpcErrorInfo {
            error_type,
            tag: tag.to_string(),
            severity: ErrorSeverity::Error,
            app_tag: None,
            path: None,
            message: Some(message.to_string()),
            info: Vec::new(),
        }
    }

    pub fn with_info(mut self, name: &str, value: &str) -> RpcErrorInfo {
        self.info.push((name.to_string(), value.to_string()));
        self
    }

    pub fn operation_not_supported(operation: &str) -> RpcErrorInfo {
        RpcErrorInfo::new(
            ErrorType::Protocol,
            "operation-not-supported",
            &format!("operation {} is not supported", operation),
        )
    }

    pub fn info_value(&self, name: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            "<rpc-error><error-type>{}</error-type><error-tag>{}</error-tag>\
             <error-severity>{}</error-severity>",
            self.error_type.as_str(),
            escape(&self.tag),
            self.severity.as_str()
        );
        if let Some(app_tag) = &self.app_tag {
            xml.push_str(&format!("<error-app-tag>{}</error-app-tag>", escape(app_tag)));
        }
        if let Some(path) = &self.path {
            xml.push_str(&format!("<error-path>{}</error-path>", escape(path)));
        }
        if let Some(message) = &self.message {
            xml.push_str(&format!(
                "<error-message>{}</error-message>",
                escape(message)
            ));
        }
        if !self.info.is_empty() {
            xml.push_str("<error-info>");
            for (k, v) in &self.info {
                xml.push_str(&format!("<{0}>{1}</{0}>", k, escape(v)));
            }
            xml.push_str("</error-info>");
        }
        xml.push_str("</rpc-error>");
        xml
    }

    fn from_element(el: &Element) -> RpcErrorInfo {
        let text = |name: &str| el.child(name).map(|c| c.text.trim().to_string());
        let severity = match text("error-severity").as_deref() {
            Some("warning") => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        };
        let info = el
            .child("error-info")
            .map(|i| {
                i.children
                    .iter()
                    .map(|c| (c.name.clone(), c.text.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        RpcErrorInfo {
            error_type: ErrorType::parse(&text("error-type").unwrap_or_default()),
            tag: text("error-tag").unwrap_or_default(),
            severity,
            app_tag: text("error-app-tag"),
            path: text("error-path"),
            message: text("error-message"),
            info,
        }
    }
}

impl fmt::Display for RpcErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.error_type.as_str(),
            self.tag,
            self.severity.as_str()
        )?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Vendor header that may precede a hello:
/// `[user;host:port;transport;sessionId;]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalHeader {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub transport: String,
    pub session_identifier: String,
}

impl AdditionalHeader {
    pub fn parse(s: &str) -> Result<AdditionalHeader, MessageError> {
        let malformed = || MessageError::MalformedHeader(s.to_string());

        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(malformed)?;
        let inner = inner.strip_suffix(';').unwrap_or(inner);
        let fields: Vec<&str> = inner.split(';').collect();
        if fields.len() != 4 || fields[..3].iter().any(|f| f.is_empty()) {
            return Err(malformed());
        }

        let idx = fields[1].rfind(':').ok_or_else(malformed)?;
        let port = fields[1][idx + 1..].parse().map_err(|_| malformed())?;

        Ok(AdditionalHeader {
            user: fields[0].to_string(),
            host: fields[1][..idx].to_string(),
            port,
            transport: fields[2].to_string(),
            session_identifier: fields[3].to_string(),
        })
    }
}

impl fmt::Display for AdditionalHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{};{}:{};{};{};]",
            self.user, self.host, self.port, self.transport, self.session_identifier
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloMessage {
    pub capabilities: Vec<String>,
    pub session_id: Option<u32>,
    pub additional_header: Option<AdditionalHeader>,
}

impl HelloMessage {
    pub fn new<I, S>(capabilities: I) -> HelloMessage
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HelloMessage {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            session_id: None,
            additional_header: None,
        }
    }

    pub fn parse(msg: &NetconfMessage) -> Result<HelloMessage, MessageError> {
        let mut text = msg.as_str();
        let mut additional_header = None;

        if text.trim_start().starts_with('[') {
            let start = text.find('[').unwrap_or(0);
            let end = text
                .find(']')
                .ok_or_else(|| MessageError::MalformedHeader(text.to_string()))?;
            additional_header = Some(AdditionalHeader::parse(&text[start..=end])?);
            text = &text[end + 1..];
            text = text
                .strip_prefix("\r\n")
                .or_else(|| text.strip_prefix('\n'))
                .unwrap_or(text);
        }

        let root = parse_tree(text)?;
        if root.name != "hello" {
            return Err(MessageError::UnexpectedRoot {
                expected: "hello",
                found: root.name,
            });
        }

        let capabilities = root
            .child("capabilities")
            .map(|caps| {
                caps.children
                    .iter()
                    .filter(|c| c.name == "capability")
                    .map(|c| c.text.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let session_id = match root.child("session-id") {
            Some(el) => {
                let raw = el.text.trim();
                match raw.parse::<u32>() {
                    Ok(id) if id > 0 => Some(id),
                    _ => return Err(MessageError::InvalidSessionId(raw.to_string())),
                }
            }
            None => None,
        };

        Ok(HelloMessage {
            capabilities,
            session_id,
            additional_header,
        })
    }

    pub fn has_capability(&self, urn: &str) -> bool {
        self.capabilities.iter().any(|c| c == urn)
    }

    /// True if any advertised capability starts with `prefix`; used for
    /// capabilities that may carry a query string.
    pub fn has_capability_prefix(&self, prefix: &str) -> bool {
        self.capabilities.iter().any(|c| c.starts_with(prefix))
    }

    pub fn to_message(&self) -> NetconfMessage {
        let mut text = String::new();
        if let Some(header) = &self.additional_header {
            text.push_str(&header.to_string());
            text.push('\n');
        }
        text.push_str(&format!("<hello xmlns=\"{}\"><capabilities>", BASE_NS));
        for cap in &self.capabilities {
            text.push_str(&format!("<capability>{}</capability>", escape(cap)));
        }
        text.push_str("</capabilities>");
        if let Some(id) = self.session_id {
            text.push_str(&format!("<session-id>{}</session-id>", id));
        }
        text.push_str("</hello>");
        NetconfMessage { text }
    }
}

struct Root<'a> {
    start: BytesStart<'a>,
    empty: bool,
    /// Byte offsets of the root start tag within the text.
    begin: usize,
    end: usize,
}

fn find_root(text: &str) -> Result<Root<'_>, MessageError> {
    let mut reader = Reader::from_str(text);
    loop {
        let begin = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                return Ok(Root {
                    start,
                    empty: false,
                    begin,
                    end: reader.buffer_position(),
                })
            }
            Ok(Event::Empty(start)) => {
                return Ok(Root {
                    start,
                    empty: true,
                    begin,
                    end: reader.buffer_position(),
                })
            }
            Ok(Event::Eof) => return Err(MessageError::MissingRoot),
            Ok(Event::End(_)) => return Err(MessageError::Malformed("unexpected end tag".into())),
            Ok(Event::Text(t)) => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(MessageError::Malformed("text before root element".into()));
                }
            }
            Ok(_) => (),
            Err(e) => return Err(MessageError::Malformed(e.to_string())),
        }
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, MessageError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MessageError::Malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| MessageError::Malformed(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Minimal element tree: local names, element children and concatenated text.
#[derive(Debug, Default)]
struct Element {
    name: String,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

// The root is returned only once the whole document has been read; anything
// after it other than whitespace, comments and processing instructions is
// rejected.
fn parse_tree(text: &str) -> Result<Element, MessageError> {
    let malformed = |e: quick_xml::Error| MessageError::Malformed(e.to_string());
    let trailing = || MessageError::Malformed("content after root element".into());

    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    loop {
        let event = reader.read_event().map_err(malformed)?;
        if root.is_some() {
            match event {
                Event::Eof => break,
                Event::Comment(_) | Event::PI(_) => continue,
                Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => continue,
                _ => return Err(trailing()),
            }
        }

        match event {
            Event::Start(start) => stack.push(Element {
                name: local_name(&start),
                ..Default::default()
            }),
            Event::Empty(start) => {
                let el = Element {
                    name: local_name(&start),
                    ..Default::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| MessageError::Malformed("unbalanced end tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::Text(t) => {
                if let Some(el) = stack.last_mut() {
                    el.text.push_str(&t.unescape().map_err(malformed)?);
                } else if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(MessageError::Malformed("text outside root element".into()));
                }
            }
            Event::CData(c) => match stack.last_mut() {
                Some(el) => el.text.push_str(&String::from_utf8_lossy(&c)),
                None => return Err(MessageError::Malformed("cdata outside root element".into())),
            },
            Event::Eof => {
                return Err(if stack.is_empty() {
                    MessageError::MissingRoot
                } else {
                    MessageError::Malformed("unexpected end of document".into())
                })
            }
            _ => (),
        }
    }
    root.ok_or(MessageError::MissingRoot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_is_stamped_on_root() {
        let msg = NetconfMessage::rpc("<get/>");
        assert_eq!(msg.message_id().unwrap(), None);

        let stamped = msg.with_message_id("101").unwrap();
        assert_eq!(stamped.message_id().unwrap().as_deref(), Some("101"));
        assert_eq!(stamped.rpc_operation().unwrap().as_deref(), Some("get"));
        assert!(stamped.as_str().ends_with("<get/></rpc>"));

        let restamped = stamped.with_message_id("102").unwrap();
        assert_eq!(restamped.message_id().unwrap().as_deref(), Some("102"));
        assert_eq!(restamped.as_str().matches("message-id").count(), 1);
    }

    #[test]
    fn stamping_keeps_prolog_and_prefix() {
        let msg = NetconfMessage::new(
            "<?xml version=\"1.0\"?>\n<nc:rpc xmlns:nc=\"urn:ietf:params:xml:ns:netconf:base:1.0\"/>",
        );
        let stamped = msg.with_message_id("7").unwrap();
        assert!(stamped.as_str().starts_with("<?xml version=\"1.0\"?>\n<nc:rpc "));
        assert_eq!(stamped.root_name().unwrap(), "rpc");
        assert_eq!(stamped.message_id().unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn classifies_roots() {
        assert!(NetconfMessage::ok_reply("1").is_rpc_reply());
        assert!(NetconfMessage::ok_reply("1").is_ok());
        assert!(!NetconfMessage::rpc_reply("1", "<data/>").is_ok());
        assert!(NetconfMessage::notification("2020-01-01T00:00:00Z", "<x/>").is_notification());
        assert!(NetconfMessage::close_session().is_rpc());
        assert!(!NetconfMessage::new("not xml").is_rpc());
        assert_eq!(
            NetconfMessage::new("").root_name(),
            Err(MessageError::MissingRoot)
        );
    }

    #[test]
    fn rpc_errors_round_trip_through_xml() {
        let err = RpcErrorInfo::new(ErrorType::Application, "invalid-value", "bad <value>")
            .with_info("bad-element", "mtu");
        let reply = NetconfMessage::rpc_error_reply(Some("5"), &[err.clone()]);

        assert_eq!(reply.message_id().unwrap().as_deref(), Some("5"));
        let errors = reply.rpc_errors().unwrap();
        assert_eq!(errors, vec![err]);
        assert_eq!(errors[0].info_value("bad-element"), Some("mtu"));
        assert_eq!(
            errors[0].to_string(),
            "application invalid-value (error): bad <value>"
        );
    }

    #[test]
    fn inner_xml_of_reply() {
        let reply = NetconfMessage::rpc_reply("3", "<data><a>1</a></data>");
        assert_eq!(reply.inner_xml().unwrap(), "<data><a>1</a></data>");
        assert_eq!(NetconfMessage::new("<rpc-reply/>").inner_xml().unwrap(), "");
    }

    #[test]
    fn hello_round_trip() {
        let mut hello = HelloMessage::new(vec![
            "urn:ietf:params:netconf:base:1.0",
            "urn:example:a?module=a&revision=2020-01-01",
        ]);
        hello.session_id = Some(4);

        let msg = hello.to_message();
        assert!(msg.as_str().contains("module=a&amp;revision"));
        assert_eq!(HelloMessage::parse(&msg).unwrap(), hello);
    }

    #[test]
    fn hello_with_additional_header() {
        let text = "[admin;10.0.0.1:830;tcp;client;]\n\
                    <hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                    <capabilities><capability>\n  urn:ietf:params:netconf:base:1.1\n</capability>\
                    </capabilities></hello>";
        let hello = HelloMessage::parse(&NetconfMessage::new(text)).unwrap();
        let header = hello.additional_header.clone().unwrap();
        assert_eq!(header.user, "admin");
        assert_eq!(header.host, "10.0.0.1");
        assert_eq!(header.port, 830);
        assert_eq!(header.transport, "tcp");
        assert_eq!(header.session_identifier, "client");
        assert_eq!(hello.capabilities, vec!["urn:ietf:params:netconf:base:1.1"]);
        assert_eq!(hello.session_id, None);

        let rendered = hello.to_message();
        assert!(rendered.as_str().starts_with("[admin;10.0.0.1:830;tcp;client;]\n<hello"));
    }

    #[test]
    fn malformed_hellos() {
        let not_hello = NetconfMessage::rpc("<get/>");
        assert!(matches!(
            HelloMessage::parse(&not_hello),
            Err(MessageError::UnexpectedRoot { .. })
        ));

        let bad_id = NetconfMessage::new(
            "<hello><capabilities/><session-id>abc</session-id></hello>",
        );
        assert_eq!(
            HelloMessage::parse(&bad_id),
            Err(MessageError::InvalidSessionId("abc".into()))
        );

        let truncated = NetconfMessage::new("<hello><capabilities>");
        assert!(matches!(
            HelloMessage::parse(&truncated),
            Err(MessageError::Malformed(_))
        ));

        assert!(AdditionalHeader::parse("[admin;nohostport;tcp;1;]").is_err());
        assert!(AdditionalHeader::parse("admin;h:1;tcp;1;").is_err());
    }
    #[test]
    fn content_after_root_is_rejected() {
        let hello = "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                     <capabilities><capability>urn:ietf:params:netconf:base:1.0</capability>\
                     </capabilities></hello>";

        for junk in ["<junk", "<junk/>", "<hello/>", "text", "<![CDATA[x]]>"] {
            let msg = NetconfMessage::new(format!("{}{}", hello, junk));
            assert!(
                matches!(HelloMessage::parse(&msg), Err(MessageError::Malformed(_))),
                "{}",
                junk
            );
        }
        assert!(!NetconfMessage::new("<rpc-reply><ok/></rpc-reply><ok/>").is_ok());

        let trailing = format!("{}\n<!-- end -->\n<?pi data?>\n", hello);
        let parsed = HelloMessage::parse(&NetconfMessage::new(trailing)).unwrap();
        assert_eq!(parsed.capabilities, vec!["urn:ietf:params:netconf:base:1.0"]);
    }
}
