pub mod config;
pub mod progress;
pub mod session;
pub mod stats;

use studyquest_core::Config;

/// The `--user` flag, or the configured default user.
pub fn resolve_user(user: Option<String>, config: &Config) -> String {
    user.unwrap_or_else(|| config.user.default_id.clone())
}
