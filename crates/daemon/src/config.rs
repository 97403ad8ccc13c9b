// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration (§10.3). Precedence, lowest to highest:
//! compiled-in defaults → the Protocol Directory's `config.yaml` → process
//! environment variables → CLI flags. Loaded once at startup into an
//! immutable [`Config`]; nothing re-reads the environment after boot.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// `GSD_HARNESS_PORT` default.
pub const DEFAULT_PORT: u16 = 3333;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub n_slots: u32,
    pub max_buffer_bytes: usize,
    pub message_ttl_secs: u64,
    pub session_timeout_millis: i64,
    pub await_timeout_millis: i64,
    pub plan_lookahead: u32,
    pub credentials_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            n_slots: gsdh_core::session::N_SLOTS_DEFAULT,
            max_buffer_bytes: gsdh_core::output::MAX_BUFFER_BYTES_DEFAULT,
            message_ttl_secs: gsdh_core::message::MESSAGE_TTL_DEFAULT_SECS,
            session_timeout_millis: gsdh_pty::SESSION_TIMEOUT_MILLIS_DEFAULT,
            await_timeout_millis: gsdh_wire::AWAIT_TIMEOUT_MILLIS_DEFAULT,
            plan_lookahead: gsdh_core::project_state::PLAN_LOOKAHEAD_DEFAULT,
            credentials_dir: None,
        }
    }
}

/// CLI-flag overrides, applied last. Every field is optional; `None` leaves
/// the underlying layer's value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub credentials_dir: Option<PathBuf>,
}

impl Config {
    /// Merge the Protocol Directory's `config.yaml` (if present), then
    /// environment variables, then explicit CLI overrides, on top of the
    /// compiled-in defaults.
    pub fn load(protocol_dir_root: Option<&std::path::Path>, overrides: ConfigOverrides) -> Result<Self, DaemonError> {
        let mut config = Self::default();

        if let Some(root) = protocol_dir_root {
            let path = root.join("config.yaml");
            if path.is_file() {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| DaemonError::Io { path: path.display().to_string(), source })?;
                let layer: ConfigLayer = serde_yaml::from_str(&raw)
                    .map_err(|e| DaemonError::InvalidConfig(format!("{}: {e}", path.display())))?;
                layer.apply(&mut config);
            }
        }

        if let Ok(port) = std::env::var("GSD_HARNESS_PORT") {
            config.port = port.parse().map_err(|_| DaemonError::InvalidConfig(format!("GSD_HARNESS_PORT: {port}")))?;
        }
        if let Ok(dir) = std::env::var("HARNESS_CREDENTIALS_DIR") {
            config.credentials_dir = Some(PathBuf::from(dir));
        }

        if let Some(port) = overrides.port {
            config.port = port;
        }
        if let Some(dir) = overrides.credentials_dir {
            config.credentials_dir = Some(dir);
        }

        Ok(config)
    }

    /// Directory credential lookups fall back to when
    /// `HARNESS_CREDENTIALS_DIR` is unset: `<state_dir>/credentials`.
    pub fn resolved_credentials_dir(&self, state_dir: &std::path::Path) -> PathBuf {
        self.credentials_dir.clone().unwrap_or_else(|| state_dir.join("credentials"))
    }
}

/// The subset of [`Config`] that `config.yaml` may override; distinct from
/// `Config` itself so an incomplete or partial YAML document doesn't force
/// every field to be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    port: Option<u16>,
    n_slots: Option<u32>,
    max_buffer_bytes: Option<usize>,
    message_ttl_secs: Option<u64>,
    session_timeout_millis: Option<i64>,
    await_timeout_millis: Option<i64>,
    plan_lookahead: Option<u32>,
}

impl ConfigLayer {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.n_slots {
            config.n_slots = v;
        }
        if let Some(v) = self.max_buffer_bytes {
            config.max_buffer_bytes = v;
        }
        if let Some(v) = self.message_ttl_secs {
            config.message_ttl_secs = v;
        }
        if let Some(v) = self.session_timeout_millis {
            config.session_timeout_millis = v;
        }
        if let Some(v) = self.await_timeout_millis {
            config.await_timeout_millis = v;
        }
        if let Some(v) = self.plan_lookahead {
            config.plan_lookahead = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_compiled_in_constants() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.n_slots, gsdh_core::session::N_SLOTS_DEFAULT);
    }

    #[test]
    fn config_yaml_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "plan_lookahead: 8\nport: 4000\n").unwrap();
        let config = Config::load(Some(dir.path()), ConfigOverrides::default()).unwrap();
        assert_eq!(config.plan_lookahead, 8);
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn cli_override_wins_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "port: 4000\n").unwrap();
        let overrides = ConfigOverrides { port: Some(5000), credentials_dir: None };
        let config = Config::load(Some(dir.path()), overrides).unwrap();
        assert_eq!(config.port, 5000);
    }
}
