// Copyright 2020 Joyent, Inc.

//! NETCONF capabilities as advertised in hello messages.
//!
//! A capability is a URN, optionally followed by a `?key=value&...` query.
//! Parameter-less URNs from the RFC registry parse to [`SimpleCapability`].
//! The EXI capability keeps its compression level and schema mode. Every
//! other URN, with or without a query, is treated as a YANG module
//! capability whose namespace is the part before `?`.

use std::fmt;
use std::str::FromStr;

use crate::error::CapabilityError;

pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";
pub const WRITABLE_RUNNING: &str = "urn:ietf:params:netconf:capability:writable-running:1.0";
pub const CANDIDATE: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const CONFIRMED_COMMIT_1_0: &str = "urn:ietf:params:netconf:capability:confirmed-commit:1.0";
pub const CONFIRMED_COMMIT_1_1: &str = "urn:ietf:params:netconf:capability:confirmed-commit:1.1";
pub const ROLLBACK_ON_ERROR: &str = "urn:ietf:params:netconf:capability:rollback-on-error:1.0";
pub const VALIDATE_1_0: &str = "urn:ietf:params:netconf:capability:validate:1.0";
pub const VALIDATE_1_1: &str = "urn:ietf:params:netconf:capability:validate:1.1";
pub const STARTUP: &str = "urn:ietf:params:netconf:capability:startup:1.0";
pub const XPATH: &str = "urn:ietf:params:netconf:capability:xpath:1.0";
pub const NOTIFICATION: &str = "urn:ietf:params:netconf:capability:notification:1.0";
pub const INTERLEAVE: &str = "urn:ietf:params:netconf:capability:interleave:1.0";
pub const PARTIAL_LOCK: &str = "urn:ietf:params:netconf:capability:partial-lock:1.0";
pub const EXI_1_0: &str = "urn:ietf:params:netconf:capability:exi:1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleCapability {
    Base10,
    Base11,
    WritableRunning,
    Candidate,
    ConfirmedCommit10,
    ConfirmedCommit11,
    RollbackOnError,
    Validate10,
    Validate11,
    Startup,
    XPath,
    Notification,
    Interleave,
    PartialLock,
}

impl SimpleCapability {
    pub const ALL: [SimpleCapability; 14] = [
        SimpleCapability::Base10,
        SimpleCapability::Base11,
        SimpleCapability::WritableRunning,
        SimpleCapability::Candidate,
        SimpleCapability::ConfirmedCommit10,
        SimpleCapability::ConfirmedCommit11,
        SimpleCapability::RollbackOnError,
        SimpleCapability::Validate10,
        SimpleCapability::Validate11,
        SimpleCapability::Startup,
        SimpleCapability::XPath,
        SimpleCapability::Notification,
        SimpleCapability::Interleave,
        SimpleCapability::PartialLock,
    ];

    pub fn urn(self) -> &'static str {
        match self {
            SimpleCapability::Base10 => BASE_1_0,
            SimpleCapability::Base11 => BASE_1_1,
            SimpleCapability::WritableRunning => WRITABLE_RUNNING,
            SimpleCapability::Candidate => CANDIDATE,
            SimpleCapability::ConfirmedCommit10 => CONFIRMED_COMMIT_1_0,
            SimpleCapability::ConfirmedCommit11 => CONFIRMED_COMMIT_1_1,
            SimpleCapability::RollbackOnError => ROLLBACK_ON_ERROR,
            SimpleCapability::Validate10 => VALIDATE_1_0,
            SimpleCapability::Validate11 => VALIDATE_1_1,
            SimpleCapability::Startup => STARTUP,
            SimpleCapability::XPath => XPATH,
            SimpleCapability::Notification => NOTIFICATION,
            SimpleCapability::Interleave => INTERLEAVE,
            SimpleCapability::PartialLock => PARTIAL_LOCK,
        }
    }

    pub fn from_urn(urn: &str) -> Option<SimpleCapability> {
        SimpleCapability::ALL.iter().copied().find(|c| c.urn() == urn)
    }
}

/// A YANG module advertised as a capability.
///
/// Values are checked on construction so that [`Capability::urn`] always
/// parses back to the same capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct YangModuleCapability {
    namespace: String,
    module: Option<String>,
    revision: Option<String>,
    features: Vec<String>,
    deviations: Vec<String>,
    // unrecognised `key=value` segments, verbatim in arrival order
    other: Vec<String>,
}

const MODULE_KEYS: [&str; 5] = ["module", "revision", "amp;revision", "features", "deviations"];

impl YangModuleCapability {
    /// Registry and EXI URNs are not module namespaces, and a namespace
    /// cannot carry a query.
    pub fn new(namespace: &str) -> Result<YangModuleCapability, CapabilityError> {
        if namespace.is_empty()
            || namespace.contains('?')
            || namespace == EXI_1_0
            || SimpleCapability::from_urn(namespace).is_some()
        {
            return Err(CapabilityError::InvalidNamespace(namespace.to_string()));
        }
        Ok(YangModuleCapability {
            namespace: namespace.to_string(),
            ..Default::default()
        })
    }

    pub fn with_module(mut self, module: &str) -> Result<YangModuleCapability, CapabilityError> {
        check_value("module", module)?;
        self.module = Some(module.to_string());
        Ok(self)
    }

    pub fn with_revision(mut self, revision: &str) -> Result<YangModuleCapability, CapabilityError> {
        check_value("revision", revision)?;
        self.revision = Some(revision.to_string());
        Ok(self)
    }

    pub fn with_features<I, S>(mut self, features: I) -> Result<YangModuleCapability, CapabilityError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = check_list("features", features)?;
        Ok(self)
    }

    pub fn with_deviations<I, S>(mut self, deviations: I) -> Result<YangModuleCapability, CapabilityError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deviations = check_list("deviations", deviations)?;
        Ok(self)
    }

    /// Append an unrecognised `key=value` segment.
    pub fn with_other(mut self, segment: &str) -> Result<YangModuleCapability, CapabilityError> {
        check_other(segment, &MODULE_KEYS)?;
        self.other.push(segment.to_string());
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn deviations(&self) -> &[String] {
        &self.deviations
    }

    pub fn other(&self) -> &[String] {
        &self.other
    }

    fn params(&self) -> Vec<String> {
        let mut params = Vec::new();
        if let Some(module) = &self.module {
            params.push(format!("module={}", module));
        }
        if let Some(revision) = &self.revision {
            params.push(format!("revision={}", revision));
        }
        if !self.features.is_empty() {
            params.push(format!("features={}", self.features.join(",")));
        }
        if !self.deviations.is_empty() {
            params.push(format!("deviations={}", self.deviations.join(",")));
        }
        params.extend(self.other.iter().cloned());
        params
    }

    // Parsing is lenient: whatever a device sends is kept, and the result
    // still serializes to an equivalent query.
    fn from_query(namespace: &str, query: &str) -> YangModuleCapability {
        let mut cap = YangModuleCapability {
            namespace: namespace.to_string(),
            ..Default::default()
        };
        for (segment, key, value) in query_params(query) {
            match (key, value) {
                ("module", Some(v)) => cap.module = Some(v.to_string()),
                // Some devices escape the ampersand twice
                ("revision", Some(v)) | ("amp;revision", Some(v)) => {
                    cap.revision = Some(v.to_string())
                }
                ("features", Some(v)) => cap.features = split_list(v),
                ("deviations", Some(v)) => cap.deviations = split_list(v),
                _ => cap.other.push(segment.to_string()),
            }
        }
        cap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExiSchemas {
    Builtin,
    Base11,
    Dynamic,
}

impl ExiSchemas {
    pub fn as_str(self) -> &'static str {
        match self {
            ExiSchemas::Builtin => "builtin",
            ExiSchemas::Base11 => "base:1.1",
            ExiSchemas::Dynamic => "dynamic",
        }
    }
}

impl FromStr for ExiSchemas {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<ExiSchemas, CapabilityError> {
        match s {
            "builtin" => Ok(ExiSchemas::Builtin),
            "base:1.1" => Ok(ExiSchemas::Base11),
            "dynamic" => Ok(ExiSchemas::Dynamic),
            _ => Err(CapabilityError::InvalidParameter {
                name: "schemas",
                value: s.to_string(),
            }),
        }
    }
}

/// The EXI capability and its optional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExiCapability {
    compression: Option<u32>,
    schemas: Option<ExiSchemas>,
    other: Vec<String>,
}

const EXI_KEYS: [&str; 2] = ["compression", "schemas"];

impl ExiCapability {
    pub fn new() -> ExiCapability {
        ExiCapability::default()
    }

    pub fn with_compression(mut self, level: u32) -> ExiCapability {
        self.compression = Some(level);
        self
    }

    pub fn with_schemas(mut self, schemas: ExiSchemas) -> ExiCapability {
        self.schemas = Some(schemas);
        self
    }

    /// Append an unrecognised `key=value` segment.
    pub fn with_other(mut self, segment: &str) -> Result<ExiCapability, CapabilityError> {
        check_other(segment, &EXI_KEYS)?;
        self.other.push(segment.to_string());
        Ok(self)
    }

    pub fn compression(&self) -> Option<u32> {
        self.compression
    }

    pub fn schemas(&self) -> Option<ExiSchemas> {
        self.schemas
    }

    pub fn other(&self) -> &[String] {
        &self.other
    }

    fn params(&self) -> Vec<String> {
        let mut params = Vec::new();
        if let Some(level) = self.compression {
            params.push(format!("compression={}", level));
        }
        if let Some(schemas) = self.schemas {
            params.push(format!("schemas={}", schemas.as_str()));
        }
        params.extend(self.other.iter().cloned());
        params
    }

    fn from_query(query: &str) -> Result<ExiCapability, CapabilityError> {
        let mut cap = ExiCapability::new();
        for (segment, key, value) in query_params(query) {
            match (key, value) {
                ("compression", Some(v)) => {
                    let level = v.parse().map_err(|_| CapabilityError::InvalidParameter {
                        name: "compression",
                        value: v.to_string(),
                    })?;
                    cap.compression = Some(level);
                }
                ("schemas", Some(v)) => cap.schemas = Some(v.parse()?),
                _ => cap.other.push(segment.to_string()),
            }
        }
        Ok(cap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Simple(SimpleCapability),
    YangModule(YangModuleCapability),
    Exi(ExiCapability),
}

impl Capability {
    pub fn parse(urn: &str) -> Result<Capability, CapabilityError> {
        let (base, query) = match urn.find('?') {
            Some(idx) => (&urn[..idx], Some(&urn[idx + 1..])),
            None => (urn, None),
        };

        if base == EXI_1_0 {
            return match query {
                Some(q) => ExiCapability::from_query(q).map(Capability::Exi),
                None => Ok(Capability::Exi(ExiCapability::new())),
            };
        }

        // Registry capabilities define no parameters; any query is ignored.
        if let Some(simple) = SimpleCapability::from_urn(base) {
            return Ok(Capability::Simple(simple));
        }

        match query {
            Some(q) => Ok(Capability::YangModule(YangModuleCapability::from_query(base, q))),
            None => Ok(Capability::YangModule(YangModuleCapability::new(base)?)),
        }
    }

    pub fn urn(&self) -> String {
        let (base, params) = match self {
            Capability::Simple(simple) => return simple.urn().to_string(),
            Capability::YangModule(cap) => (cap.namespace.as_str(), cap.params()),
            Capability::Exi(cap) => (EXI_1_0, cap.params()),
        };

        if params.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, params.join("&"))
        }
    }

    /// A YANG module capability naming its module.
    pub fn as_module(&self) -> Option<&YangModuleCapability> {
        match self {
            Capability::YangModule(cap) if cap.module().map_or(false, |m| !m.is_empty()) => {
                Some(cap)
            }
            _ => None,
        }
    }
}

impl From<SimpleCapability> for Capability {
    fn from(simple: SimpleCapability) -> Capability {
        Capability::Simple(simple)
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Capability, CapabilityError> {
        Capability::parse(s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

// (segment, key, value) for every non-empty `&`-separated segment
fn query_params(query: &str) -> impl Iterator<Item = (&str, &str, Option<&str>)> {
    query.split('&').filter(|s| !s.is_empty()).map(|segment| {
        match segment.find('=') {
            Some(idx) => (segment, &segment[..idx], Some(&segment[idx + 1..])),
            None => (segment, segment, None),
        }
    })
}

fn check_value(name: &'static str, value: &str) -> Result<(), CapabilityError> {
    if value.contains('&') {
        return Err(CapabilityError::InvalidParameter {
            name,
            value: value.to_string(),
        });
    }
    Ok(())
}

// List entries are joined with `,`, so they must be non-empty and free of
// separators.
fn check_list<I, S>(name: &'static str, entries: I) -> Result<Vec<String>, CapabilityError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    entries
        .into_iter()
        .map(Into::into)
        .map(|entry: String| {
            if entry.is_empty() || entry.contains(',') || entry.contains('&') {
                Err(CapabilityError::InvalidParameter { name, value: entry })
            } else {
                Ok(entry)
            }
        })
        .collect()
}

fn check_other(segment: &str, reserved: &[&str]) -> Result<(), CapabilityError> {
    let shadows = match segment.find('=') {
        Some(idx) => reserved.contains(&&segment[..idx]),
        None => false,
    };
    if segment.is_empty() || segment.contains('&') || shadows {
        return Err(CapabilityError::InvalidParameter {
            name: "other",
            value: segment.to_string(),
        });
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
