use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AvotError, Result};
use crate::workflow::{FailurePolicy, DEFAULT_COHERENCE_THRESHOLD};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub defaults: SpecDefaults,
    #[serde(default)]
    pub stub: StubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "avot=info,warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Values filled into a workflow spec during normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_coherence_threshold")]
    pub coherence_threshold: f64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_temperature() -> f64 {
    0.4
}

fn default_coherence_threshold() -> f64 {
    DEFAULT_COHERENCE_THRESHOLD
}

impl Default for SpecDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            coherence_threshold: default_coherence_threshold(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Behaviour of the built-in stub capability providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubConfig {
    #[serde(default = "default_stub_score")]
    pub coherence_score: f64,
}

fn default_stub_score() -> f64 {
    0.8
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            coherence_score: default_stub_score(),
        }
    }
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}

/// Read a TOML document from disk, expanding `${ENV_VAR}` references first.
///
/// Only a missing file is `ConfigNotFound`; other read failures are `Io`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AvotError::ConfigNotFound(path.display().to_string()),
        _ => AvotError::Io(e),
    })?;

    toml::from_str(&expand_env_vars(&content))
        .map_err(|e| AvotError::Config(format!("{}: {}", path.display(), e)))
}

/// Substitute `${NAME}` with the value of env var `NAME`.
///
/// Unset variables and an unterminated `${` are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(len) = tail.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let reference = &rest[start..start + len + 3];
        match std::env::var(&tail[..len]) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(reference),
        }
        rest = &tail[len + 1..];
    }

    out.push_str(rest);
    out
}
