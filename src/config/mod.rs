//! Signing configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host/user config (~/.config/compdesc/signing.toml)
//! 3. Explicit config file (--config)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

use std::path::PathBuf;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, SigningConfig};
pub use merge::{deep_merge, merge_layers};

/// Location of the host config, if a home directory is known.
pub fn host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("compdesc")
            .join("signing.toml")
    })
}
