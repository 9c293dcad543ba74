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

//! Multi-key fetch client and workload driver for sharded key-value clusters.
//!
//! The crate groups keys of a multi-key query by hashslot, splits each group
//! into bounded sub-batches, dispatches every sub-batch as an eagerly started
//! fetch, and merges the results back into a single map. A small workload
//! harness runs buckets of such queries concurrently and reports nearest-rank
//! latency percentiles per worker.

mod client;
mod collector;
mod config;
mod error;
mod fetch;
mod runner;
mod slot;
mod stats;
mod store;

pub use client::{ClusterClient, RedisClusterClient};
pub use collector::{distribute, DistributionMode, QueryBucket};
pub use config::{StoreParams, ENV_REDIS_HOST, ENV_REDIS_PASS, ENV_REDIS_PORT, ENV_REDIS_USER};
pub use error::{Error, Result};
pub use fetch::{collect, dispatch, FetchResult, KeyIndex, PendingFetch};
pub use runner::{RunnerReport, WorkloadHarness, WorkloadRunner};
pub use slot::{hash_tag, partition_by_slot, slot_generator, CrcSlotGenerator, LockedCrcSlotGenerator, SlotGenerator, MAX_SLOTS};
pub use stats::{find_average, find_percentile};
pub use store::{
    ClusterDataStore, DATASET_METADATA_ID, DATASET_META_NOT_FOUND, DATASET_VERSION_UNKNOWN, UNKNOWN_VERSION,
};
