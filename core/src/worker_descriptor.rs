// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Network location and declared capacity of a registered worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub host: String,
    pub port: u16,
    /// Largest batch the worker accepts without risking an overload refusal
    pub capacity: usize,
    /// Declared for bookkeeping only; the dispatcher never trusts it
    #[serde(default)]
    pub malicious_rate: Option<f64>,
}

impl WorkerDescriptor {
    pub fn new(host: impl Into<String>, port: u16, capacity: usize) -> Self {
        Self {
            host: host.into(),
            port,
            capacity,
            malicious_rate: None,
        }
    }

    pub fn with_malicious_rate(mut self, rate: f64) -> Self {
        self.malicious_rate = Some(rate);
        self
    }

    /// `host:port`, the identity used by the directory for deduplication
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves `host:port` on the runtime's resolver
    pub async fn addr(&self) -> std::io::Result<SocketAddr> {
        tokio::net::lookup_host(self.endpoint()).await?.next().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no address for {}", self.endpoint()),
            )
        })
    }
}
