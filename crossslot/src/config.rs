// Copyright 2026 crossslot Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{env, time::Duration};

use crate::{
    error::{Error, Result},
    slot::slot_generator,
};

/// Environment variable carrying the cluster host name.
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
/// Environment variable carrying the cluster port.
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";
/// Environment variable carrying the cluster user.
pub const ENV_REDIS_USER: &str = "REDIS_USER";
/// Environment variable carrying the cluster password.
pub const ENV_REDIS_PASS: &str = "REDIS_PASS";

/// Ports at or below this value are rejected.
const MIN_PORT: u16 = 1024;

/// Connection and behavior parameters of a [`crate::ClusterDataStore`].
///
/// Credentials come from the environment via [`StoreParams::from_env`]; the
/// remaining knobs are set by the caller on top of [`StoreParams::default`].
/// All fields are checked by [`StoreParams::validate`] before any connection
/// is attempted.
#[derive(Debug, Clone)]
pub struct StoreParams {
    /// Cluster host name or address.
    pub host: String,
    /// Cluster port. Must be above the reserved range.
    pub port: u16,
    /// User name for the cluster ACL.
    pub username: String,
    /// Password for the cluster ACL.
    pub password: String,
    /// Prefix every wire key carries in front of its logical identifier.
    pub key_prefix: String,
    /// Suffix every wire key carries after its logical identifier.
    pub key_suffix: String,
    /// Serve reads from replica nodes when the client supports it.
    pub prefer_read_replicas: bool,
    /// Connection pool size hint.
    pub pool_size: usize,
    /// How long to wait for a connection. Zero waits without limit.
    pub pool_wait_timeout: Duration,
    /// Maximum lifetime of a pooled connection. Zero keeps them forever.
    pub pool_connection_lifetime: Duration,
    /// Maximum idle time of a pooled connection. Zero keeps them forever.
    pub pool_connection_idle_time: Duration,
    /// Largest number of keys sent in one multi-key fetch. Zero issues one
    /// fetch per hashslot group regardless of its size.
    pub max_multikey_batch_size: usize,
    /// Slot checksum engine, `"crc"` or `"locked"`.
    pub slot_engine: String,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 6379,
            username: "default".to_string(),
            password: String::new(),
            key_prefix: String::new(),
            key_suffix: String::new(),
            prefer_read_replicas: true,
            pool_size: 3,
            pool_wait_timeout: Duration::ZERO,
            pool_connection_lifetime: Duration::from_secs(600),
            pool_connection_idle_time: Duration::ZERO,
            max_multikey_batch_size: 10,
            slot_engine: "crc".to_string(),
        }
    }
}

impl StoreParams {
    /// Build parameters with host, port and credentials taken from the
    /// `REDIS_HOST`, `REDIS_PORT`, `REDIS_USER` and `REDIS_PASS` environment
    /// variables. Every variable is required.
    pub fn from_env() -> Result<Self> {
        let host = require_env(ENV_REDIS_HOST, "host")?;
        let port_raw = require_env(ENV_REDIS_PORT, "port")?;
        let username = require_env(ENV_REDIS_USER, "user")?;
        let password = require_env(ENV_REDIS_PASS, "password")?;

        let port = port_raw.parse::<u16>().map_err(|e| Error::Config {
            field: "port",
            reason: format!("{ENV_REDIS_PORT}={port_raw:?} is not a valid port: {e}"),
        })?;

        Ok(Self {
            host,
            port,
            username,
            password,
            ..Default::default()
        })
    }

    /// Check every field, failing fast on the first offender.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config {
                field: "host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.username.is_empty() {
            return Err(Error::Config {
                field: "user",
                reason: "must not be empty".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(Error::Config {
                field: "password",
                reason: "not set".to_string(),
            });
        }
        if self.key_prefix.is_empty() {
            return Err(Error::Config {
                field: "key_prefix",
                reason: "must not be empty".to_string(),
            });
        }
        if self.key_suffix.is_empty() {
            return Err(Error::Config {
                field: "key_suffix",
                reason: "must not be empty".to_string(),
            });
        }
        if self.port <= MIN_PORT {
            return Err(Error::Config {
                field: "port",
                reason: format!("{} is within the reserved range (<= {MIN_PORT})", self.port),
            });
        }
        slot_generator(&self.slot_engine)?;
        Ok(())
    }
}

fn require_env(var: &str, field: &'static str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config {
            field,
            reason: format!("{var} is not set"),
        }),
    }
}
