/// Version of the running binary, recorded in the metadata file.
pub const BINARY: &str = env!("CARGO_PKG_VERSION");

pub const GIT_COMMIT: &str = env!("FERRUMQ_GIT_COMMIT");
pub const BUILD_TIME: &str = env!("FERRUMQ_BUILD_TIME");

/// Startup banner, e.g. `ferrumqd v1.1.0 (build 1a2b3c4, 2026-01-01T00:00:00Z)`.
pub fn string(app: &str) -> String {
    format!("{app} v{BINARY} (build {GIT_COMMIT}, {BUILD_TIME})")
}
