//! Identification of provisionable resources.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Kind tags for the resource types the alerting subsystem provisions.
pub mod kind {
    pub const ALERT_RULE: &str = "alertRule";
    pub const CONTACT_POINT: &str = "contactPoint";
    pub const MUTE_TIMING: &str = "muteTimeInterval";
    pub const NOTIFICATION_TEMPLATE: &str = "template";
}

/// A resource whose provenance can be tracked.
///
/// Implementors expose only what the store needs to build an [`EntityKey`];
/// the rest of their domain shape stays opaque.
pub trait Provisionable {
    /// Tenant the resource belongs to.
    fn org_id(&self) -> i64;

    /// Identifier of the resource, unique within its org and kind.
    fn resource_uid(&self) -> &str;

    /// Kind tag of the resource.
    fn resource_kind(&self) -> &str;
}

/// The `(org, kind, uid)` triple identifying one provenance record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub org_id: i64,
    pub kind: String,
    pub uid: String,
}

impl EntityKey {
    pub fn new(org_id: i64, kind: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            org_id,
            kind: kind.into(),
            uid: uid.into(),
        }
    }

    /// Derive the key of a provisionable resource.
    pub fn of(entity: &(impl Provisionable + ?Sized)) -> Self {
        Self::new(entity.org_id(), entity.resource_kind(), entity.resource_uid())
    }

    /// Reject keys that cannot address a single record.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_empty() {
            return Err(StoreError::InvalidEntity(format!(
                "empty kind for uid '{}' in org {}",
                self.uid, self.org_id
            )));
        }
        if self.uid.is_empty() {
            return Err(StoreError::InvalidEntity(format!(
                "empty uid for kind '{}' in org {}",
                self.kind, self.org_id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.kind, self.uid)
    }
}

impl Provisionable for EntityKey {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    fn resource_uid(&self) -> &str {
        &self.uid
    }

    fn resource_kind(&self) -> &str {
        &self.kind
    }
}
