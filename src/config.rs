//! Application-level configuration loading: capacities, loop intervals, display texts and
//! the host connection settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::roster::SignupMode;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROSTER_BOT_CONFIG_PATH";
/// Shared secret expected in the `x-host-token` header.
const HOST_TOKEN_ENV: &str = "ROSTER_HOST_TOKEN";
/// Base URL of the chat host adapter.
const GATEWAY_URL_ENV: &str = "ROSTER_GATEWAY_URL";
/// Directory holding snapshots and backups.
const DATA_DIR_ENV: &str = "ROSTER_DATA_DIR";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Capacity used when a roster has no lock, override or configured value.
    pub default_capacity: usize,
    /// Configured capacity of a roster created in registration mode.
    pub registration_capacity: usize,
    /// Configured capacity of a roster created in simple mode.
    pub simple_capacity: usize,
    /// Period of the reaction queue drain.
    pub drain_interval: Duration,
    /// Period of the status refresh of every guild.
    pub refresh_interval: Duration,
    /// Period of the rendered-text backup of every guild.
    pub backup_interval: Duration,
    /// First line of every status message.
    pub status_header: String,
    /// Role names recognised as tiers, in priority order.
    pub tiers: Vec<String>,
    /// Role granting fixed slots.
    pub fixed_slot_role: String,
    /// Maps drawn by the random map action.
    pub maps: Vec<String>,
    /// Lifetime of short notices posted in the guild.
    pub notice_ttl: Duration,
    /// Directory holding snapshots and backups.
    pub data_dir: PathBuf,
    /// Token the host must present; checks are skipped when unset.
    pub host_token: Option<String>,
    /// Base URL of the host adapter; the recording gateway is used when unset.
    pub gateway_url: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then apply
    /// the environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tiers = app_config.tiers.len(),
                        maps = app_config.maps.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// Configured capacity given to a roster created in `mode`.
    pub fn capacity_for(&self, mode: SignupMode) -> usize {
        match mode {
            SignupMode::Registration => self.registration_capacity,
            SignupMode::Simple => self.simple_capacity,
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(token) = non_empty_env(HOST_TOKEN_ENV) {
            self.host_token = Some(token);
        }
        if let Some(url) = non_empty_env(GATEWAY_URL_ENV) {
            self.gateway_url = Some(url);
        }
        if let Some(dir) = non_empty_env(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if self.host_token.is_none() {
            warn!("no host token configured; host routes accept any caller");
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional.
struct RawConfig {
    default_capacity: Option<usize>,
    registration_capacity: Option<usize>,
    simple_capacity: Option<usize>,
    drain_interval_ms: Option<u64>,
    refresh_interval_secs: Option<u64>,
    backup_interval_secs: Option<u64>,
    status_header: Option<String>,
    tiers: Option<Vec<String>>,
    fixed_slot_role: Option<String>,
    maps: Option<Vec<String>>,
    notice_ttl_secs: Option<u64>,
    data_dir: Option<PathBuf>,
    host_token: Option<String>,
    gateway_url: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            default_capacity: value.default_capacity.unwrap_or(9),
            registration_capacity: value.registration_capacity.unwrap_or(9),
            simple_capacity: value.simple_capacity.unwrap_or(4),
            drain_interval: Duration::from_millis(value.drain_interval_ms.unwrap_or(200).max(1)),
            refresh_interval: Duration::from_secs(value.refresh_interval_secs.unwrap_or(10).max(1)),
            backup_interval: Duration::from_secs(value.backup_interval_secs.unwrap_or(60).max(1)),
            status_header: value
                .status_header
                .unwrap_or_else(|| "📋 참가자 목록:".to_string()),
            tiers: value.tiers.unwrap_or_else(default_tiers),
            fixed_slot_role: value
                .fixed_slot_role
                .unwrap_or_else(|| "고정룰렛권".to_string()),
            maps: value.maps.filter(|maps| !maps.is_empty()).unwrap_or_else(default_maps),
            notice_ttl: Duration::from_secs(value.notice_ttl_secs.unwrap_or(2)),
            data_dir: value.data_dir.unwrap_or_else(|| PathBuf::from("data")),
            host_token: value.host_token.filter(|token| !token.is_empty()),
            gateway_url: value.gateway_url.filter(|url| !url.is_empty()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn default_tiers() -> Vec<String> {
    ["레", "불", "초", "다", "플", "골", "실", "브", "아"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_maps() -> Vec<String> {
    [
        "바인드",
        "헤이븐",
        "스플릿",
        "어센트",
        "아이스박스",
        "펄",
        "프랙처",
        "로터스",
        "어비스",
        "선셋",
        "코로드",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
