// Copyright 2020 Joyent, Inc.

//! Session and client configuration, loaded from JSON. Every field has a
//! default, so `{}` is a valid configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};

use crate::capability::{self, Capability, ExiCapability};
use crate::error::ConfigError;
use crate::framing::{self, FrameCodec};
use crate::message::{AdditionalHeader, HelloMessage};
use crate::preferences::{CapabilityOrigin, SessionPreferences};

const MAX_ZSTD_LEVEL: i32 = 22;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub connection_timeout_ms: u64,
    pub max_message_size: usize,
    pub chunk_size: usize,
    pub capabilities: Vec<String>,
    /// Compression level of the compressed encoding. When set, the EXI
    /// capability is advertised and a client requests the encoding.
    pub exi_compression: Option<i32>,
    /// `[user;host:port;transport;sessionId;]` sent in front of the hello.
    pub additional_header: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            connection_timeout_ms: 20_000,
            max_message_size: framing::DEFAULT_MAX_MESSAGE_SIZE,
            chunk_size: framing::DEFAULT_CHUNK_SIZE,
            capabilities: vec![
                capability::BASE_1_0.to_string(),
                capability::BASE_1_1.to_string(),
            ],
            exi_compression: None,
            additional_header: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        framing::check_chunk_size(self.chunk_size)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid("max_message_size must be positive".into()));
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connection_timeout_ms must be positive".into()));
        }
        if !self
            .capabilities
            .iter()
            .any(|c| c == capability::BASE_1_0 || c == capability::BASE_1_1)
        {
            return Err(ConfigError::Invalid("no base capability configured".into()));
        }
        if let Some(level) = self.exi_compression {
            if level < 1 || level > MAX_ZSTD_LEVEL {
                return Err(ConfigError::Invalid(format!(
                    "exi_compression {} is outside 1..={}",
                    level, MAX_ZSTD_LEVEL
                )));
            }
        }
        self.header()?;
        Ok(())
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn frame_codec(&self) -> Result<FrameCodec, ConfigError> {
        FrameCodec::with_limits(self.chunk_size, self.max_message_size)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn header(&self) -> Result<Option<AdditionalHeader>, ConfigError> {
        match &self.additional_header {
            Some(h) => AdditionalHeader::parse(h)
                .map(Some)
                .map_err(|e| ConfigError::Invalid(e.to_string())),
            None => Ok(None),
        }
    }

    /// The hello to advertise. A server passes the session-id it assigned.
    pub fn local_hello(&self, session_id: Option<u32>) -> Result<HelloMessage, ConfigError> {
        let mut caps = self.capabilities.clone();
        if let Some(level) = self.exi_compression {
            if !caps.iter().any(|c| c.starts_with(capability::EXI_1_0)) {
                let exi = ExiCapability::new().with_compression(level as u32);
                caps.push(Capability::Exi(exi).urn());
            }
        }

        let mut hello = HelloMessage::new(caps);
        hello.session_id = session_id;
        hello.additional_header = self.header()?;
        Ok(hello)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// 0 retries forever.
    pub max_connection_attempts: u32,
    pub between_attempts_timeout_ms: u64,
    pub sleep_factor: f64,
    pub max_sleep_ms: Option<u64>,
    /// Fraction of each delay applied as random spread, 0.0..=1.0.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_connection_attempts: 0,
            between_attempts_timeout_ms: 2_000,
            sleep_factor: 1.5,
            max_sleep_ms: None,
            jitter: 0.0,
        }
    }
}

/// User-defined capabilities applied on top of what the device advertised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityOverride {
    pub capabilities: Vec<String>,
    /// Replace the device's module capabilities instead of adding to them.
    pub override_module_caps: bool,
    pub override_non_module_caps: bool,
}

impl CapabilityOverride {
    pub fn apply(&self, device: &SessionPreferences) -> SessionPreferences {
        let user =
            SessionPreferences::from_capabilities(&self.capabilities, CapabilityOrigin::UserDefined);

        let merged = if self.override_module_caps {
            device.replace_module_caps(&user)
        } else {
            device.add_module_caps(&user)
        };
        if self.override_non_module_caps {
            merged.replace_non_module_caps(&user)
        } else {
            merged.add_non_module_caps(&user)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Device name used in log context.
    pub name: String,
    #[serde(flatten)]
    pub session: SessionConfig,
    /// Maximum outstanding requests; 0 means unlimited.
    pub concurrent_rpc_limit: usize,
    pub reconnect: ReconnectConfig,
    pub capability_override: Option<CapabilityOverride>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            name: "netconf-device".to_string(),
            session: SessionConfig::default(),
            concurrent_rpc_limit: 0,
            reconnect: ReconnectConfig::default(),
            capability_override: None,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(s: &str) -> Result<ClientConfig, ConfigError> {
        let config: ClientConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
        let config: ClientConfig = load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        let r = &self.reconnect;
        if !(0.0..=1.0).contains(&r.jitter) {
            return Err(ConfigError::Invalid(format!("jitter {} is outside 0..=1", r.jitter)));
        }
        if r.sleep_factor < 1.0 {
            return Err(ConfigError::Invalid("sleep_factor must be at least 1.0".into()));
        }
        Ok(())
    }
}

impl SessionConfig {
    pub fn from_json_str(s: &str) -> Result<SessionConfig, ConfigError> {
        let config: SessionConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SessionConfig, ConfigError> {
        let config: SessionConfig = load(path)?;
        config.validate()?;
        Ok(config)
    }
}

fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = ClientConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.session.connection_timeout(), Duration::from_secs(20));
        assert_eq!(config.session.chunk_size, 8192);
    }

    #[test]
    fn session_fields_are_flattened() {
        let config = ClientConfig::from_json_str(
            r#"{
                "name": "edge-router",
                "chunk_size": 4096,
                "exi_compression": 3,
                "concurrent_rpc_limit": 16,
                "reconnect": { "max_connection_attempts": 5, "sleep_factor": 2.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.name, "edge-router");
        assert_eq!(config.session.chunk_size, 4096);
        assert_eq!(config.session.exi_compression, Some(3));
        assert_eq!(config.concurrent_rpc_limit, 16);
        assert_eq!(config.reconnect.max_connection_attempts, 5);
        assert_eq!(config.reconnect.between_attempts_timeout_ms, 2_000);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ClientConfig::from_json_str(r#"{"chunk_size": 16}"#).is_err());
        assert!(ClientConfig::from_json_str(r#"{"exi_compression": 40}"#).is_err());
        assert!(ClientConfig::from_json_str(r#"{"capabilities": []}"#).is_err());
        assert!(ClientConfig::from_json_str(r#"{"reconnect": {"jitter": 2.0}}"#).is_err());
        assert!(ClientConfig::from_json_str(r#"{"additional_header": "nope"}"#).is_err());
        assert!(matches!(
            ClientConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn local_hello_advertises_exi_when_enabled() {
        let mut config = SessionConfig::default();
        config.exi_compression = Some(4);
        config.additional_header = Some("[admin;127.0.0.1:830;tcp;1;]".into());

        let hello = config.local_hello(None).unwrap();
        assert!(hello.has_capability("urn:ietf:params:netconf:capability:exi:1.0?compression=4"));
        assert_eq!(hello.additional_header.unwrap().port, 830);
        assert_eq!(config.local_hello(Some(3)).unwrap().session_id, Some(3));
    }

    #[test]
    fn capability_override_add_and_replace() {
        let device = SessionPreferences::from_capabilities(
            &[capability::BASE_1_0, "urn:example:a?module=a"],
            CapabilityOrigin::DeviceAdvertised,
        );

        let mut ovr = CapabilityOverride {
            capabilities: vec![capability::CANDIDATE.to_string(), "urn:example:b?module=b".to_string()],
            ..Default::default()
        };
        let added = ovr.apply(&device);
        assert!(added.is_candidate_supported());
        assert!(added.contains_non_module(capability::BASE_1_0));
        assert_eq!(added.module_len(), 2);

        ovr.override_module_caps = true;
        ovr.override_non_module_caps = true;
        let replaced = ovr.apply(&device);
        assert!(!replaced.contains_non_module(capability::BASE_1_0));
        assert!(!replaced.contains_module_namespace("urn:example:a"));
        assert!(replaced.contains_module_namespace("urn:example:b"));
    }
}
