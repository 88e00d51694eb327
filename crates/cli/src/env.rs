// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process environment access for `mindroidd`, per spec §6: one
//! environment variable selects the node id, one selects the
//! configuration path. The runtime's root directory is derived the
//! same way `oj-daemon`'s `env::state_dir` resolves its own state
//! directory (override var, then XDG, then a `$HOME`-relative default).

use std::path::PathBuf;

use mindroid_core::ids::NodeId;

use crate::exit_error::ExitError;

/// Selects this process's node id.
pub const NODE_ID_VAR: &str = "MINDROID_NODE_ID";

/// Selects the TOML configuration file path. Unset means the process
/// runs with no configured topology — no plugin can be started since
/// none has a `server_uri` to bind.
pub const CONFIG_PATH_VAR: &str = "MINDROID_CONFIG";

/// Overrides the runtime's root directory (spec §6's `getRootDirectory`).
pub const ROOT_DIR_VAR: &str = "MINDROID_ROOT_DIR";

pub fn node_id() -> Result<NodeId, ExitError> {
    let raw = std::env::var(NODE_ID_VAR).map_err(|_| ExitError::config(format!("{NODE_ID_VAR} is not set")))?;
    let id: u32 = raw.parse().map_err(|_| ExitError::config(format!("{NODE_ID_VAR}={raw:?} is not a valid node id")))?;
    NodeId::new(id).ok_or_else(|| ExitError::config(format!("{NODE_ID_VAR} must be nonzero")))
}

pub fn config_path() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from)
}

/// The runtime's root directory. Only `log/` is derived from it here:
/// `apps/`, `data/`, and `preferences/` back the Service/Intent/
/// PackageManager lifecycle framework spec.md treats as an external
/// collaborator, so this port never materializes them.
pub fn root_dir() -> Result<PathBuf, ExitError> {
    if let Ok(dir) = std::env::var(ROOT_DIR_VAR) {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("mindroid"));
    }
    let home = std::env::var("HOME").map_err(|_| ExitError::config("HOME is not set and no root directory override was given"))?;
    Ok(PathBuf::from(home).join(".local/state/mindroid"))
}

pub fn log_dir() -> Result<PathBuf, ExitError> {
    Ok(root_dir()?.join("log"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
