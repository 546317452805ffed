//! Reusable mock infrastructure for integration tests.

pub mod rpc_mock;

pub use rpc_mock::RpcMock;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a test subscriber once per process. Controlled by `RUST_LOG`;
/// silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
