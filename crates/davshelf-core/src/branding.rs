//! Centralized branding constants
//!
//! All product naming comes from this module.

/// User-facing display name
pub const DISPLAY_NAME: &str = "Davshelf";

/// Reverse-domain app identifier
pub const IDENTIFIER: &str = "com.davshelf.app";

/// OS keychain service name used for the storage master key
pub const KEYCHAIN_SERVICE: &str = "com.davshelf.desktop";

/// Directory name under the platform data dir
pub const DATA_DIR_NAME: &str = "davshelf";
