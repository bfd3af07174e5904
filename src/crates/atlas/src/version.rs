//! Build metadata injected by `build.rs`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git hash, or "unknown" outside a checkout.
pub const GIT_COMMIT: &str = env!("ATLAS_GIT_COMMIT");

pub const BUILD_DATE: &str = env!("ATLAS_BUILD_DATE");

/// One-line version string for `atlas version`.
pub fn version_info() -> String {
    format!("atlas v{} ({} built {})", VERSION, GIT_COMMIT, BUILD_DATE)
}
