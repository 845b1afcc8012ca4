// Copyright 2020 Joyent, Inc.

//! The capability set of an established session, split into YANG module
//! capabilities and everything else.

use std::collections::BTreeMap;
use std::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::capability::{self, Capability};

pub const NETCONF_MONITORING_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring";
pub const NETCONF_NOTIFICATIONS_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-notifications";

/// Where a capability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityOrigin {
    DeviceAdvertised,
    UserDefined,
}

/// Module capabilities are identified by namespace and revision. The same
/// namespace may be present with several revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub namespace: String,
    pub revision: Option<String>,
}

impl ModuleKey {
    pub fn new(namespace: &str, revision: Option<&str>) -> ModuleKey {
        ModuleKey {
            namespace: namespace.to_string(),
            revision: revision.map(String::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub name: String,
    pub origin: CapabilityOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPreferences {
    non_module: BTreeMap<String, CapabilityOrigin>,
    modules: BTreeMap<ModuleKey, ModuleEntry>,
    session_id: Option<u32>,
}

impl SessionPreferences {
    /// Build preferences from the capability strings of a hello message.
    /// Strings that do not parse, or parse to anything but a YANG module
    /// naming its module, are kept verbatim as non-module capabilities.
    pub fn from_capabilities<I, S>(caps: I, origin: CapabilityOrigin) -> SessionPreferences
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefs = SessionPreferences::default();
        for cap in caps {
            let urn = cap.as_ref();
            match Capability::parse(urn) {
                Ok(parsed) => match parsed.as_module() {
                    Some(module) => {
                        let key = ModuleKey {
                            namespace: module.namespace().to_string(),
                            revision: module.revision().filter(|r| !r.is_empty()).map(String::from),
                        };
                        let entry = ModuleEntry {
                            name: module.module().unwrap_or_default().to_string(),
                            origin,
                        };
                        prefs.modules.insert(key, entry);
                    }
                    None => {
                        prefs.non_module.insert(urn.to_string(), origin);
                    }
                },
                Err(_) => {
                    prefs.non_module.insert(urn.to_string(), origin);
                }
            }
        }
        prefs
    }

    pub fn with_session_id(mut self, session_id: u32) -> SessionPreferences {
        self.session_id = Some(session_id);
        self
    }

    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    pub fn non_module_caps(&self) -> impl Iterator<Item = (&str, CapabilityOrigin)> {
        self.non_module.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn module_caps(&self) -> impl Iterator<Item = (&ModuleKey, &ModuleEntry)> {
        self.modules.iter()
    }

    pub fn non_module_len(&self) -> usize {
        self.non_module.len()
    }

    pub fn module_len(&self) -> usize {
        self.modules.len()
    }

    pub fn contains_non_module(&self, urn: &str) -> bool {
        self.non_module.contains_key(urn)
    }

    /// Prefix match against the non-module set. Parameters are assumed to be
    /// in the same order on both sides.
    pub fn contains_partial_non_module(&self, prefix: &str) -> bool {
        self.non_module.keys().any(|urn| urn.starts_with(prefix))
    }

    pub fn contains_module(&self, key: &ModuleKey) -> bool {
        self.modules.contains_key(key)
    }

    pub fn contains_module_namespace(&self, namespace: &str) -> bool {
        self.modules.keys().any(|k| k.namespace == namespace)
    }

    /// The most recent revision advertised for a namespace. Revisions are
    /// ISO dates so lexical order is chronological; a revision-less entry
    /// ranks below any dated one.
    pub fn newest_revision(&self, namespace: &str) -> Option<(&ModuleKey, &ModuleEntry)> {
        self.modules
            .iter()
            .filter(|(k, _)| k.namespace == namespace)
            .max_by(|a, b| a.0.revision.cmp(&b.0.revision))
    }

    pub fn is_candidate_supported(&self) -> bool {
        self.contains_non_module(capability::CANDIDATE)
    }

    pub fn is_running_writable(&self) -> bool {
        self.contains_non_module(capability::WRITABLE_RUNNING)
    }

    pub fn is_rollback_supported(&self) -> bool {
        self.contains_non_module(capability::ROLLBACK_ON_ERROR)
    }

    pub fn is_base_1_1_supported(&self) -> bool {
        self.contains_non_module(capability::BASE_1_1)
    }

    pub fn is_notifications_supported(&self) -> bool {
        self.contains_partial_non_module(capability::NOTIFICATION)
            || self.contains_module_namespace(NETCONF_NOTIFICATIONS_NS)
    }

    pub fn is_monitoring_supported(&self) -> bool {
        self.contains_module_namespace(NETCONF_MONITORING_NS)
            || self.contains_partial_non_module(NETCONF_MONITORING_NS)
    }

    /// Module capabilities of `other` are added; entries with the same key
    /// take the value from `other`.
    pub fn add_module_caps(&self, other: &SessionPreferences) -> SessionPreferences {
        let mut modules = self.modules.clone();
        modules.extend(other.modules.iter().map(|(k, v)| (k.clone(), v.clone())));
        SessionPreferences {
            non_module: self.non_module.clone(),
            modules,
            session_id: self.session_id,
        }
    }

    pub fn replace_module_caps(&self, other: &SessionPreferences) -> SessionPreferences {
        SessionPreferences {
            non_module: self.non_module.clone(),
            modules: other.modules.clone(),
            session_id: self.session_id,
        }
    }

    pub fn add_non_module_caps(&self, other: &SessionPreferences) -> SessionPreferences {
        let mut non_module = self.non_module.clone();
        non_module.extend(other.non_module.iter().map(|(k, v)| (k.clone(), *v)));
        SessionPreferences {
            non_module,
            modules: self.modules.clone(),
            session_id: self.session_id,
        }
    }

    pub fn replace_non_module_caps(&self, other: &SessionPreferences) -> SessionPreferences {
        SessionPreferences {
            non_module: other.non_module.clone(),
            modules: self.modules.clone(),
            session_id: self.session_id,
        }
    }
}

impl fmt::Display for SessionPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capabilities={} modules={} rollback={} monitoring={} candidate={} writable-running={}",
            self.non_module.len(),
            self.modules.len(),
            self.is_rollback_supported(),
            self.is_monitoring_supported(),
            self.is_candidate_supported(),
            self.is_running_writable()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_prefs(caps: &[&str]) -> SessionPreferences {
        SessionPreferences::from_capabilities(caps, CapabilityOrigin::DeviceAdvertised)
    }

    #[test]
    fn splits_module_and_non_module_caps() {
        let prefs = device_prefs(&[
            capability::BASE_1_0,
            capability::CANDIDATE,
            "urn:example:a?module=a&revision=2020-01-01",
            "urn:example:plain",
            "urn:example:nomodule?revision=2020-01-01",
        ]);

        assert_eq!(prefs.module_len(), 1);
        assert_eq!(prefs.non_module_len(), 4);
        assert!(prefs.contains_module(&ModuleKey::new("urn:example:a", Some("2020-01-01"))));
        assert!(prefs.contains_non_module("urn:example:nomodule?revision=2020-01-01"));
        assert!(prefs.is_candidate_supported());
        assert!(!prefs.is_running_writable());
        assert!(!prefs.is_rollback_supported());
    }

    #[test]
    fn duplicate_caps_are_collapsed() {
        let prefs = device_prefs(&[
            capability::BASE_1_0,
            capability::BASE_1_0,
            "urn:example:a?module=a&revision=2020-01-01",
            "urn:example:a?revision=2020-01-01&module=a",
        ]);
        assert_eq!(prefs.non_module_len(), 1);
        assert_eq!(prefs.module_len(), 1);
    }

    #[test]
    fn keeps_every_revision_of_a_module() {
        let prefs = device_prefs(&[
            "urn:example:a?module=a",
            "urn:example:a?module=a&revision=2019-05-01",
            "urn:example:a?module=a&revision=2021-02-03",
        ]);
        assert_eq!(prefs.module_len(), 3);
        let (key, entry) = prefs.newest_revision("urn:example:a").unwrap();
        assert_eq!(key.revision.as_deref(), Some("2021-02-03"));
        assert_eq!(entry.name, "a");
    }

    #[test]
    fn misescaped_revision_is_read() {
        let prefs = device_prefs(&["urn:example:a?module=a&amp;revision=2019-05-01"]);
        assert!(prefs.contains_module(&ModuleKey::new("urn:example:a", Some("2019-05-01"))));
    }

    #[test]
    fn notification_and_monitoring_detection() {
        let prefs = device_prefs(&[
            "urn:ietf:params:netconf:capability:notification:1.0",
            "urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring?module=ietf-netconf-monitoring&revision=2010-10-04",
        ]);
        assert!(prefs.is_notifications_supported());
        assert!(prefs.is_monitoring_supported());

        let prefs = device_prefs(&[NETCONF_MONITORING_NS]);
        assert!(prefs.is_monitoring_supported());
        assert!(!prefs.is_notifications_supported());
    }

    #[test]
    fn add_and_replace() {
        let device = device_prefs(&[
            capability::BASE_1_0,
            capability::CANDIDATE,
            "urn:example:a?module=a",
        ]);
        let user = SessionPreferences::from_capabilities(
            &[capability::ROLLBACK_ON_ERROR, "urn:example:b?module=b"],
            CapabilityOrigin::UserDefined,
        );

        let added = device.add_module_caps(&user).add_non_module_caps(&user);
        assert_eq!(added.module_len(), 2);
        assert_eq!(added.non_module_len(), 3);
        assert!(added.is_rollback_supported());
        assert!(added.is_candidate_supported());

        let replaced = device.replace_module_caps(&user);
        assert!(!replaced.contains_module_namespace("urn:example:a"));
        assert!(replaced.contains_module_namespace("urn:example:b"));
        assert!(replaced.is_candidate_supported());

        let replaced = device.replace_non_module_caps(&user);
        assert!(!replaced.is_candidate_supported());
        assert!(!replaced.contains_non_module(capability::BASE_1_0));
        assert!(replaced.is_rollback_supported());
        assert!(replaced.contains_module_namespace("urn:example:a"));

        let origins: Vec<_> = replaced.non_module_caps().map(|(_, o)| o).collect();
        assert_eq!(origins, vec![CapabilityOrigin::UserDefined]);
    }

    #[test]
    fn session_id_survives_merges() {
        let device = device_prefs(&[capability::BASE_1_1]).with_session_id(7);
        let user = SessionPreferences::from_capabilities(
            &[capability::CANDIDATE],
            CapabilityOrigin::UserDefined,
        );
        assert_eq!(device.add_non_module_caps(&user).session_id(), Some(7));
        assert!(device.is_base_1_1_supported());
    }
}
