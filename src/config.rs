use std::path::PathBuf;

use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("HOMEROOM_REMOTE_URL must be set when HOMEROOM_BACKEND=remote")]
    MissingRemoteUrl,
}

/// Process configuration derived from env.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub remote_url: Option<String>,
    pub bind: String,
    pub frontend_url: Option<String>,
}

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_raw = non_empty("HOMEROOM_BACKEND").map(|v| v.to_ascii_lowercase());
        let backend = match backend_raw.as_deref() {
            None | Some("local") => Backend::Local,
            Some("remote") => Backend::Remote,
            Some(other) => {
                warn!(value = other, "unknown HOMEROOM_BACKEND, using local");
                Backend::Local
            }
        };
        let remote_url = non_empty("HOMEROOM_REMOTE_URL");
        if backend == Backend::Remote && remote_url.is_none() {
            return Err(ConfigError::MissingRemoteUrl);
        }
        Ok(Self {
            backend,
            data_dir: non_empty("HOMEROOM_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            remote_url,
            bind: non_empty("HOMEROOM_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            frontend_url: non_empty("FRONTEND_URL"),
        })
    }
}
