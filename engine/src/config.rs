use serde::Deserialize;
use sortcam_providers::{
    BackendTarget, BackendTargetError, ClassifierEndpoints, ClientTimeouts,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOSTED_ENDPOINT, DEFAULT_LOCAL_RELAY_ENDPOINT,
    DEFAULT_REQUEST_TIMEOUT_SECS, parse_http_url,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use thiserror::Error;

use crate::capture::FrameSize;

pub const BACKEND_URL_ENV: &str = "SORTCAM_BACKEND_URL";
pub const LOCAL_API_URL_ENV: &str = "SORTCAM_LOCAL_API_URL";

pub const DEFAULT_FALLBACK_WIDTH: u32 = 1280;
pub const DEFAULT_FALLBACK_HEIGHT: u32 = 720;

#[derive(Debug, Default, Deserialize)]
pub struct SortcamConfig {
    pub backend: Option<BackendConfig>,
    pub capture: Option<CaptureConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: BackendTargetError,
    },
    #[error("backend mode is 'local' but no local_api_url is set")]
    MissingLocalApiUrl,
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::InvalidUrl { .. } | ConfigError::MissingLocalApiUrl => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Hosted,
    Local,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    /// Hosted classification route.
    pub endpoint: Option<String>,
    /// Relay route used for local model servers.
    pub local_relay: Option<String>,
    pub mode: Option<BackendMode>,
    /// Local model server address forwarded as `apiUrl`.
    pub local_api_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaptureConfig {
    /// Used when the video source reports zero dimensions.
    pub fallback_width: Option<u32>,
    pub fallback_height: Option<u32>,
}

/// Fully-resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub endpoints: ClassifierEndpoints,
    pub target: BackendTarget,
    pub timeouts: ClientTimeouts,
    pub fallback_frame: FrameSize,
}

impl EngineSettings {
    /// Built-in defaults: hosted backend on the default routes.
    pub fn defaults() -> Result<Self, ConfigError> {
        SortcamConfig::default().resolve_with(|_| None)
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl SortcamConfig {
    /// Load `~/.sortcam/config.toml`. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<EngineSettings, ConfigError> {
        self.resolve_with(|key| env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// `SORTCAM_BACKEND_URL` replaces the hosted endpoint.
    /// `SORTCAM_LOCAL_API_URL` replaces `local_api_url` and, when the file
    /// does not set `mode`, selects the local backend.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<EngineSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = self.backend.as_ref();
        let env_value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let file_value = |value: Option<&String>| {
            value
                .map(|v| expand_env_vars(v))
                .filter(|v| !v.trim().is_empty())
        };

        let hosted = env_value(BACKEND_URL_ENV)
            .or_else(|| file_value(backend.and_then(|b| b.endpoint.as_ref())))
            .unwrap_or_else(|| DEFAULT_HOSTED_ENDPOINT.to_string());
        let relay = file_value(backend.and_then(|b| b.local_relay.as_ref()))
            .unwrap_or_else(|| DEFAULT_LOCAL_RELAY_ENDPOINT.to_string());
        let env_local = env_value(LOCAL_API_URL_ENV);
        let local_api_url = env_local
            .clone()
            .or_else(|| file_value(backend.and_then(|b| b.local_api_url.as_ref())));

        let endpoints = ClassifierEndpoints::new(
            parse_http_url(&hosted).map_err(|source| ConfigError::InvalidUrl {
                field: "backend.endpoint",
                source,
            })?,
            parse_http_url(&relay).map_err(|source| ConfigError::InvalidUrl {
                field: "backend.local_relay",
                source,
            })?,
        );

        let mode = backend
            .and_then(|b| b.mode)
            .unwrap_or(if env_local.is_some() {
                BackendMode::Local
            } else {
                BackendMode::Hosted
            });
        let target = match mode {
            BackendMode::Hosted => BackendTarget::Hosted,
            BackendMode::Local => {
                let url = local_api_url.ok_or(ConfigError::MissingLocalApiUrl)?;
                BackendTarget::local(&url).map_err(|source| ConfigError::InvalidUrl {
                    field: "backend.local_api_url",
                    source,
                })?
            }
        };

        let timeouts = ClientTimeouts {
            connect: Duration::from_secs(
                backend
                    .and_then(|b| b.connect_timeout_secs)
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            request: Duration::from_secs(
                backend
                    .and_then(|b| b.request_timeout_secs)
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        };

        let capture = self.capture.as_ref();
        let fallback_frame = FrameSize::new(
            capture
                .and_then(|c| c.fallback_width)
                .filter(|w| *w > 0)
                .unwrap_or(DEFAULT_FALLBACK_WIDTH),
            capture
                .and_then(|c| c.fallback_height)
                .filter(|h| *h > 0)
                .unwrap_or(DEFAULT_FALLBACK_HEIGHT),
        );

        Ok(EngineSettings {
            endpoints,
            target,
            timeouts,
            fallback_frame,
        })
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sortcam").join("config.toml"))
}
