//! Path resolution for kestractl
//!
//! # Environment Variables
//!
//! - `KESTRACTL_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For state_dir():
//! 1. `KESTRACTL_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/kestractl` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\kestractl`
//!    - macOS/Linux: `~/.local/state/kestractl`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "KESTRACTL_STATE_DIR";

/// Name of the state file inside the state directory
pub const STATE_FILE: &str = "state.json";

const APP_DIR: &str = "kestractl";

/// Get the kestractl state directory path
pub fn state_dir() -> Result<PathBuf> {
    let overridden = std::env::var(ENV_STATE_DIR).ok();
    let xdg_state = std::env::var("XDG_STATE_HOME").ok();

    let default = if cfg!(windows) {
        dirs::data_local_dir().map(|dir| dir.join(APP_DIR))
    } else {
        dirs::home_dir().map(|home| home.join(".local").join("state").join(APP_DIR))
    };

    let path = resolve_state_dir(overridden.as_deref(), xdg_state.as_deref(), default)
        .context("Could not determine home directory")?;
    log::debug!("Using state dir: {}", path.display());
    Ok(path)
}

/// Get the state file path
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(STATE_FILE))
}

/// Pick the state directory from an override, `XDG_STATE_HOME`, or a default
fn resolve_state_dir(
    overridden: Option<&str>,
    xdg_state: Option<&str>,
    default: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(dir) = overridden.filter(|d| !d.is_empty()) {
        return Some(expand(dir));
    }
    if let Some(xdg) = xdg_state.filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_DIR));
    }
    default
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Resolve a path declared in a manifest, relative to the manifest's directory
pub fn resolve_relative(base: &Path, path: &str) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
