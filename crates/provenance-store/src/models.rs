//! Minimal views of the provisionable alerting resources.
//!
//! The store never looks past the identification triple, so these carry only
//! what is needed to key a record plus a title for log output.

use serde::{Deserialize, Serialize};

use crate::entity::{kind, Provisionable};

/// An alert rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub uid: String,
    pub org_id: i64,
    #[serde(default)]
    pub title: String,
}

impl AlertRule {
    pub fn new(org_id: i64, uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            org_id,
            title: String::new(),
        }
    }
}

impl Provisionable for AlertRule {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    fn resource_uid(&self) -> &str {
        &self.uid
    }

    fn resource_kind(&self) -> &str {
        kind::ALERT_RULE
    }
}

/// A notification receiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub uid: String,
    pub org_id: i64,
    #[serde(default)]
    pub name: String,
}

impl Provisionable for ContactPoint {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    fn resource_uid(&self) -> &str {
        &self.uid
    }

    fn resource_kind(&self) -> &str {
        kind::CONTACT_POINT
    }
}

/// A mute timing. Identified by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuteTiming {
    pub name: String,
    pub org_id: i64,
}

impl Provisionable for MuteTiming {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    fn resource_uid(&self) -> &str {
        &self.name
    }

    fn resource_kind(&self) -> &str {
        kind::MUTE_TIMING
    }
}

/// A notification template. Identified by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub name: String,
    pub org_id: i64,
    #[serde(default)]
    pub template: String,
}

impl Provisionable for NotificationTemplate {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    fn resource_uid(&self) -> &str {
        &self.name
    }

    fn resource_kind(&self) -> &str {
        kind::NOTIFICATION_TEMPLATE
    }
}
