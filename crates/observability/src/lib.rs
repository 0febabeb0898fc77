//! Process-wide tracing setup shared by the binaries.

pub mod tracing;

/// Install JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    tracing::init("info");
}
