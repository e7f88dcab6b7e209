use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Backend {0} cannot be empty")]
    EmptyBackendCredential(&'static str),

    #[error("Backend timeout cannot be 0")]
    InvalidTimeout,

    #[error("max_poll_attempts must be at least 1")]
    InvalidPollAttempts,

    #[error("poll_interval_ms ({0}) cannot exceed max_poll_interval_ms ({1})")]
    InvalidPollInterval(u64, u64),

    #[error("Custom disk offering name cannot be empty")]
    EmptyDiskOffering,
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for EC2 Query API requests
    pub listener: Listener,
    /// CloudStack endpoint and job polling behaviour
    pub backend: BackendConfig,
    /// Where caller credentials are read from
    pub credentials: CredentialStoreConfig,
    #[serde(default)]
    pub resources: ResourceSettings,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.backend.validate()?;
        self.resources.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// CloudStack API endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Full API URL, e.g. `http://cloudstack:8080/client/api`
    pub url: Url,
    pub api_key: String,
    pub secret_key: String,
    /// Timeout for every individual HTTP call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// First delay between job status queries, doubled after every poll
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Wall clock ceiling for one asynchronous operation, submission included
    #[serde(default = "default_max_job_wait_secs")]
    pub max_job_wait_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_poll_attempts() -> u32 {
    120
}

fn default_max_job_wait_secs() -> u64 {
    600
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::EmptyBackendCredential("api_key"));
        }
        if self.secret_key.is_empty() {
            return Err(ValidationError::EmptyBackendCredential("secret_key"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_poll_attempts == 0 {
            return Err(ValidationError::InvalidPollAttempts);
        }
        if self.poll_interval_ms > self.max_poll_interval_ms {
            return Err(ValidationError::InvalidPollInterval(
                self.poll_interval_ms,
                self.max_poll_interval_ms,
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn max_job_wait(&self) -> Duration {
        Duration::from_secs(self.max_job_wait_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum CredentialStoreType {
    Inline { keys: HashMap<String, String> },
    File { path: PathBuf },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CredentialStoreConfig {
    #[serde(flatten)]
    pub r#type: CredentialStoreType,
}

/// Settings consumed by resource handlers.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResourceSettings {
    /// Name of the CloudStack disk offering used for volumes created by size
    #[serde(default = "default_custom_disk_offering")]
    pub custom_disk_offering: String,
}

fn default_custom_disk_offering() -> String {
    "Custom".into()
}

impl Default for ResourceSettings {
    fn default() -> Self {
        ResourceSettings {
            custom_disk_offering: default_custom_disk_offering(),
        }
    }
}

impl ResourceSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.custom_disk_offering.is_empty() {
            return Err(ValidationError::EmptyDiskOffering);
        }
        Ok(())
    }
}
