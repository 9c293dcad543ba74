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

//! Sub-batch dispatch and result aggregation for multi-key fetches.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::{client::ClusterClient, error::Result};

/// Fetched values keyed by wire or logical key.
pub type FetchResult = HashMap<String, Option<Vec<u8>>>;

/// Key form of a [`FetchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyIndex {
    /// Key the result by the literal wire key.
    #[default]
    Wire,
    /// Key the result by the logical identifier recovered by stripping the
    /// configured key prefix and suffix.
    Logical,
}

/// One in-flight multi-key fetch.
///
/// Carries the keys of its own sub-batch so values can be zipped back
/// positionally no matter how the owning hashslot group was split.
pub struct PendingFetch {
    keys: Vec<String>,
    handle: JoinHandle<Result<Vec<Option<Vec<u8>>>>>,
}

impl PendingFetch {
    /// Keys of this sub-batch, in dispatch order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Split `keys` into consecutive sub-batches of at most `max_batch_size`
/// keys and start one multi-key fetch per sub-batch.
///
/// Every fetch is in flight when this returns, so sub-batches overlap
/// across one group and across groups. `max_batch_size == 0` sends the
/// whole group as one fetch. No retries happen at this layer.
pub fn dispatch<C>(client: &Arc<C>, keys: &[String], max_batch_size: usize) -> Vec<PendingFetch>
where
    C: ClusterClient,
{
    if keys.is_empty() {
        return Vec::new();
    }
    let chunk = if max_batch_size == 0 { keys.len() } else { max_batch_size };
    keys.chunks(chunk)
        .map(|sub_batch| {
            let keys = sub_batch.to_vec();
            let task_keys = keys.clone();
            let client = Arc::clone(client);
            let handle = tokio::spawn(async move { client.mget(&task_keys).await });
            PendingFetch { keys, handle }
        })
        .collect()
}

/// Await every pending fetch and merge the value sequences into one map.
///
/// A failed fetch is logged and surfaces as missing entries rather than an
/// error. A value count differing from the sub-batch's key count is logged
/// and the overlapping prefix is kept.
pub async fn collect(pending: Vec<PendingFetch>, key_index: KeyIndex, prefix: &str, suffix: &str) -> FetchResult {
    let mut merged = FetchResult::new();
    for fetch in pending {
        let PendingFetch { keys, handle } = fetch;
        let values = match handle.await {
            Ok(Ok(values)) => values,
            Ok(Err(e)) => {
                warn!(keys = keys.len(), "sub-batch fetch failed: {e}");
                continue;
            }
            Err(e) => {
                error!(keys = keys.len(), "sub-batch fetch task failed: {e}");
                continue;
            }
        };
        if values.len() != keys.len() {
            warn!(
                keys = keys.len(),
                values = values.len(),
                "value count differs from key count, zipping the overlap"
            );
        }
        for (key, value) in keys.into_iter().zip(values) {
            let mapped = match key_index {
                KeyIndex::Wire => key,
                KeyIndex::Logical => strip_affixes(&key, prefix, suffix),
            };
            // Keys are disjoint across sub-batches, so a replaced entry can
            // only come from logical identifiers colliding after stripping.
            match merged.entry(mapped) {
                Entry::Occupied(mut slot) => {
                    if slot.get() != &value {
                        warn!(key = %slot.key(), "conflicting values merged for one key");
                    }
                    slot.insert(value);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
    }
    merged
}

/// Logical identifier of `key`. A key that does not carry both the prefix
/// and the suffix passes through unchanged.
pub(crate) fn strip_affixes(key: &str, prefix: &str, suffix: &str) -> String {
    match key.strip_prefix(prefix).and_then(|inner| inner.strip_suffix(suffix)) {
        Some(id) => id.to_string(),
        None => key.to_string(),
    }
}
