//! # nimbus-settings
//!
//! Client-wide defaults for the Nimbus pub/sub client, loaded from layered
//! sources: compiled defaults, an optional `~/.nimbus/settings.json`
//! deep-merged over them, and environment variable overrides on top.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{NimbusSettings, TimeoutSettings};
