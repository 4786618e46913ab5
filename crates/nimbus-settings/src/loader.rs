//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NimbusSettings::default()`]
//! 2. If `~/.nimbus/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::NimbusSettings;

/// Resolve the path to the settings file (`~/.nimbus/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".nimbus").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NimbusSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<NimbusSettings> {
    let defaults = serde_json::to_value(NimbusSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: NimbusSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each env var has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are silently ignored (fall back to file/default)
pub fn apply_env_overrides(settings: &mut NimbusSettings) {
    // ── Connection settings ─────────────────────────────────────────
    if let Some(v) = read_env_string("NIMBUS_ORIGIN") {
        settings.origin = v;
    }
    if let Some(v) = read_env_bool("NIMBUS_SECURE") {
        settings.secure = v;
    }

    // ── Keys ────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("NIMBUS_SUBSCRIBE_KEY") {
        settings.subscribe_key = v;
    }
    if let Some(v) = read_env_string("NIMBUS_PUBLISH_KEY") {
        settings.publish_key = v;
    }
    if let Some(v) = read_env_string("NIMBUS_SECRET_KEY") {
        settings.secret_key = v;
    }
    if let Some(v) = read_env_string("NIMBUS_AUTH_KEY") {
        settings.auth_key = v;
    }
    if let Some(v) = read_env_string("NIMBUS_UUID") {
        settings.uuid = v;
    }
    if let Some(v) = read_env_string("NIMBUS_CIPHER_KEY") {
        settings.cipher_key = v;
    }

    // ── Timeouts ────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("NIMBUS_CONNECT_TIMEOUT_MS", 100, 600_000) {
        settings.timeouts.connect_ms = v;
    }
    if let Some(v) = read_env_u64("NIMBUS_REQUEST_TIMEOUT_MS", 100, 3_600_000) {
        settings.timeouts.request_ms = v;
    }
    if let Some(v) = read_env_u64("NIMBUS_IDLE_TIMEOUT_MS", 100, 3_600_000) {
        settings.timeouts.idle_ms = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
