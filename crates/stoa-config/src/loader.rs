// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./stoa.toml` > `~/.config/stoa/stoa.toml` > `/etc/stoa/stoa.toml`
//! with environment variable overrides via `STOA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StoaConfig;

/// Config sections reachable through `STOA_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["agent", "memory", "context", "anthropic"];

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/stoa/stoa.toml";

/// Local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "stoa.toml";

/// User config file under the XDG config directory, if one exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stoa").join("stoa.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/stoa/stoa.toml` (system-wide)
/// 3. `~/.config/stoa/stoa.toml` (user XDG config)
/// 4. `./stoa.toml` (local directory)
/// 5. `STOA_*` environment variables
pub fn load_config() -> Result<StoaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<StoaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StoaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StoaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StoaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StoaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config key.
///
/// Only the section prefix is split, so `memory_top_k` becomes `memory.top_k`
/// rather than `memory.top.k`. Names without a known section pass through.
pub fn env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("STOA_").map(|key| env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_splits_only_the_section() {
        assert_eq!(env_key("memory_top_k"), "memory.top_k");
        assert_eq!(env_key("anthropic_api_key"), "anthropic.api_key");
        assert_eq!(env_key("context_max_recent_turns"), "context.max_recent_turns");
        assert_eq!(env_key("agent_log_level"), "agent.log_level");
    }

    #[test]
    fn env_key_leaves_unknown_sections_alone() {
        assert_eq!(env_key("personas"), "personas");
        assert_eq!(env_key("memoryless"), "memoryless");
    }
}
