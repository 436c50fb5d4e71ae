//! Provenance Store - who last wrote a provisioned alerting resource
//!
//! Records, per `(org, kind, uid)`, which actor class last modified a resource
//! (API, file provisioning, ...). Policy layers consult it to keep file
//! provisioned resources from being silently overwritten through the API and
//! vice versa.
//!
//! - **Provenance**: the actor classification, defaulting to `None`
//! - **Entity**: the `Provisionable` trait and the `EntityKey` triple
//! - **Store**: SQLite-backed get/set with tenant isolation and explicit
//!   transaction scopes
//! - **Config**: database location and connection settings
//!
//! # Example
//!
//! ```rust,ignore
//! use provenance_store::{AlertRule, Provenance, ProvenanceStore, SqliteProvenanceStore};
//!
//! let store = SqliteProvenanceStore::open_in_memory()?;
//! let rule = AlertRule::new(1, "cpu-high");
//!
//! store.in_transaction(|scope| -> provenance_store::Result<()> {
//!     scope.set_provenance(&rule, Provenance::File)
//! })?;
//!
//! assert_eq!(store.get_provenance(&rule)?, Provenance::File);
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod models;
pub mod provenance;
pub mod schema;
pub mod store;

pub use config::{DatabaseConfig, StoreConfig};
pub use entity::{EntityKey, Provisionable};
pub use error::{ConfigError, PersistenceError, Result, StoreError};
pub use models::{AlertRule, ContactPoint, MuteTiming, NotificationTemplate};
pub use provenance::Provenance;
pub use schema::{Schema, SCHEMA_VERSION};
pub use store::{ProvenanceStore, SqliteProvenanceStore, TransactionScope};
