//! Shared store setup for integration tests

use std::sync::Once;

use provenance_store::SqliteProvenanceStore;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("provenance_store=debug")
            .try_init();
    });
}

/// Fresh in-memory store with logging enabled
#[allow(dead_code)]
pub fn setup_store() -> SqliteProvenanceStore {
    init_tracing();
    SqliteProvenanceStore::open_in_memory().expect("open in-memory store")
}
