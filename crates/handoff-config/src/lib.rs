// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Handoff escalation service.
//!
//! ```no_run
//! let config = handoff_config::load_and_validate().expect("config errors");
//! println!("grace window: {}s", config.monitor.pending_grace_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config_from_str, ConfigSource};
pub use model::HandoffConfig;

/// Extract and validate `source`. Extraction failures are mapped onto the
/// documents the source read so diagnostics can point at the offending span.
pub fn load_and_validate_source(source: ConfigSource<'_>) -> Result<HandoffConfig, Vec<ConfigError>> {
    let config = source
        .extract()
        .map_err(|err| diagnostic::figment_to_config_errors(err, &source.documents()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// The search path plus `HANDOFF_*` overrides.
pub fn load_and_validate() -> Result<HandoffConfig, Vec<ConfigError>> {
    load_and_validate_source(ConfigSource::Search)
}

pub fn load_and_validate_path(path: &Path) -> Result<HandoffConfig, Vec<ConfigError>> {
    load_and_validate_source(ConfigSource::File(path))
}

pub fn load_and_validate_str(toml_content: &str) -> Result<HandoffConfig, Vec<ConfigError>> {
    load_and_validate_source(ConfigSource::Inline(toml_content))
}
