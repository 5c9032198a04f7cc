// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::credentials::Credentials;
use crate::operation::ParsePolicy;
use crate::DIRECTORY_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub fn default_directory_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DIRECTORY_PORT))
}

fn default_max_in_flight() -> usize {
    256
}

fn default_stall_round_limit() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_directory_addr")]
    pub directory_addr: SocketAddr,
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Upper bound on concurrent remote calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Per-call timeout in milliseconds (0 = no timeout)
    #[serde(default)]
    pub call_timeout_ms: u64,
    /// Consecutive rounds without an accepted batch before giving up
    #[serde(default = "default_stall_round_limit")]
    pub stall_round_limit: usize,
    #[serde(default)]
    pub parse_policy: ParsePolicy,
    /// Seeds the agreement policy's worker selection
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            directory_addr: default_directory_addr(),
            credentials: Credentials::default(),
            max_in_flight: default_max_in_flight(),
            call_timeout_ms: 0,
            stall_round_limit: default_stall_round_limit(),
            parse_policy: ParsePolicy::default(),
            seed: None,
        }
    }
}

impl DispatcherConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: DispatcherConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid("max_in_flight must be at least 1".into()));
        }
        if self.stall_round_limit == 0 {
            return Err(ConfigError::Invalid("stall_round_limit must be at least 1".into()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        if self.call_timeout_ms > 0 {
            Some(Duration::from_millis(self.call_timeout_ms))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub capacity: usize,
    pub malicious_rate: f64,
    /// 0 lets the OS pick a port
    pub port: u16,
    /// Host name published to the directory
    pub advertise_host: String,
    pub directory_addr: SocketAddr,
}

impl WorkerConfig {
    pub fn new(capacity: usize, malicious_rate: f64, port: u16) -> Self {
        Self {
            capacity,
            malicious_rate,
            port,
            advertise_host: Ipv4Addr::LOCALHOST.to_string(),
            directory_addr: default_directory_addr(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.malicious_rate) {
            return Err(ConfigError::Invalid(format!(
                "malicious rate must be between 0 and 1, got {}",
                self.malicious_rate
            )));
        }
        Ok(())
    }
}
