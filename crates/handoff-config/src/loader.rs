// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where configuration comes from and how the layers stack.
//!
//! The search path, lowest precedence first, is `/etc/handoff/handoff.toml`,
//! `~/.config/handoff/handoff.toml`, then `./handoff.toml`. `HANDOFF_*`
//! variables override every file.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::HandoffConfig;

/// One way of locating a configuration document.
#[derive(Debug, Clone, Copy)]
pub enum ConfigSource<'a> {
    /// Every file on the search path, plus env overrides.
    Search,
    /// A single file chosen by the operator, plus env overrides.
    File(&'a Path),
    /// TOML text with no files and no env overrides.
    Inline(&'a str),
}

impl ConfigSource<'_> {
    /// Defaults, then the source's TOML layers, then env overrides.
    pub fn figment(&self) -> Figment {
        let base = Figment::new().merge(Serialized::defaults(HandoffConfig::default()));
        match self {
            Self::Search => search_path()
                .into_iter()
                .fold(base, |figment, path| figment.merge(Toml::file(path)))
                .merge(env_provider()),
            Self::File(path) => base.merge(Toml::file(path)).merge(env_provider()),
            Self::Inline(text) => base.merge(Toml::string(text)),
        }
    }

    pub fn extract(&self) -> Result<HandoffConfig, figment::Error> {
        self.figment().extract()
    }

    /// The TOML documents this source reads, labelled for diagnostics.
    /// Missing files are skipped.
    pub fn documents(&self) -> Vec<(String, String)> {
        match self {
            Self::Search => search_path().iter().filter_map(|path| read_labelled(path)).collect(),
            Self::File(path) => read_labelled(path).into_iter().collect(),
            Self::Inline(text) => vec![("<inline>".to_string(), (*text).to_string())],
        }
    }
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<HandoffConfig, figment::Error> {
    ConfigSource::Inline(toml_content).extract()
}

fn search_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/handoff/handoff.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("handoff/handoff.toml"));
    }
    paths.push(
        std::env::current_dir()
            .map(|dir| dir.join("handoff.toml"))
            .unwrap_or_else(|_| PathBuf::from("handoff.toml")),
    );
    paths
}

fn read_labelled(path: &Path) -> Option<(String, String)> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| (path.display().to_string(), content))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `HANDOFF_MONITOR_PENDING_GRACE_SECS`
/// must map to `monitor.pending_grace_secs`, not `monitor.pending.grace.secs`.
fn env_provider() -> Env {
    Env::prefixed("HANDOFF_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: &[&str] = &[
        "service",
        "storage",
        "matching",
        "monitor",
        "detector",
        "escalation",
    ];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
