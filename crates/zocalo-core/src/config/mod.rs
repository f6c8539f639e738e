mod loader;
pub mod rc;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;

pub use loader::{config_dir, config_path, load, try_load};
pub use rc::{RcError, RcFile};

/// Ambient configuration for the shell process itself.
///
/// Loaded from `~/.config/zocalo/config.toml`. This is deliberately
/// separate from the boot file: `step.rc` configures shell semantics
/// and module loading, `config.toml` configures the tooling around it.
/// Missing sections fall back to defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File logging settings.
    pub logging: LogConfig,
}
