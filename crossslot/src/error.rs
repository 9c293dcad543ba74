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

/// Crossslot error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration. Fatal at startup; always names the
    /// offending field.
    #[error("config error: {field}: {reason}")]
    Config {
        /// The offending configuration field.
        field: &'static str,
        /// Why the value is rejected.
        reason: String,
    },
    /// Caller-side argument error. Not retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Transport or cluster error raised by the underlying client.
    #[error(transparent)]
    Cluster(#[from] redis::RedisError),
    /// The cluster did not answer the startup readiness probe.
    #[error("cluster not ready after {attempts} probes")]
    NotReady {
        /// Number of readiness probes issued.
        attempts: usize,
    },
}

/// Crossslot result.
pub type Result<T> = std::result::Result<T, Error>;
