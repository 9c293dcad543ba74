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

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    client::ClusterClient,
    config::StoreParams,
    error::Result,
    fetch::{self, FetchResult, KeyIndex, PendingFetch},
    slot::{partition_by_slot, slot_generator, SlotGenerator},
};

/// Well-known logical identifier of the dataset metadata document.
pub const DATASET_METADATA_ID: &str = "dataset_metadata";
/// Sentinel returned when the server version cannot be determined.
pub const UNKNOWN_VERSION: &str = "UNKNOWN VERSION";
/// Sentinel returned when the dataset metadata document is absent.
pub const DATASET_META_NOT_FOUND: &str = "DATASET_META_NOT_FOUND";
/// Sentinel returned when the dataset version cannot be determined.
pub const DATASET_VERSION_UNKNOWN: &str = "unknown";

const DEFAULT_INFO_HASH_TAG: &str = "0";

/// Hashslot-aware read façade over a cluster client.
///
/// Groups requested keys by hashslot, splits oversized groups into bounded
/// sub-batches, runs every sub-batch fetch concurrently and merges the
/// results into one map.
pub struct ClusterDataStore<C>
where
    C: ClusterClient,
{
    client: Arc<C>,
    slots: Box<dyn SlotGenerator>,
    key_prefix: String,
    key_suffix: String,
    max_multikey_batch_size: usize,
}

impl<C> ClusterDataStore<C>
where
    C: ClusterClient,
{
    /// Build a store over an explicitly constructed client.
    pub fn new(client: C, params: &StoreParams) -> Result<Self> {
        Ok(Self {
            client: Arc::new(client),
            slots: slot_generator(&params.slot_engine)?,
            key_prefix: params.key_prefix.clone(),
            key_suffix: params.key_suffix.clone(),
            max_multikey_batch_size: params.max_multikey_batch_size,
        })
    }

    /// Fetch every key: deduplicated, grouped by hashslot, split into
    /// bounded sub-batches that all run concurrently.
    ///
    /// Transport failures inside a sub-batch degrade to missing entries, so
    /// the returned map can fall short of the deduplicated key count; the
    /// shortfall is logged, never raised.
    pub async fn fetch_by_keys(&self, keys: &[String], key_index: KeyIndex) -> Result<FetchResult> {
        if keys.is_empty() {
            return Ok(FetchResult::new());
        }
        let groups = partition_by_slot(keys, self.slots.as_ref())?;
        let requested: usize = groups.values().map(|group| group.len()).sum();

        let mut pending: Vec<PendingFetch> = Vec::new();
        for (slot, group) in &groups {
            debug!(slot, keys = group.len(), "dispatching hashslot group");
            pending.extend(fetch::dispatch(&self.client, group, self.max_multikey_batch_size));
        }

        let result = fetch::collect(pending, key_index, &self.key_prefix, &self.key_suffix).await;
        if result.len() != requested {
            warn!(
                requested,
                fetched = result.len(),
                "fetch result size differs from requested key count"
            );
        }
        Ok(result)
    }

    /// Wire key carrying logical identifier `id`.
    pub fn key_for_id(&self, id: &str) -> String {
        format!("{}{}{}", self.key_prefix, id, self.key_suffix)
    }

    /// Logical identifier of `key`. Keys that do not carry the configured
    /// prefix and suffix pass through unchanged.
    pub fn id_from_key(&self, key: &str) -> String {
        fetch::strip_affixes(key, &self.key_prefix, &self.key_suffix)
    }

    /// Server `INFO` text from the node owning the given hash tag's slot,
    /// tag `"0"` when not given.
    pub async fn server_info(&self, hash_tag: Option<&str>) -> Result<String> {
        let tag = hash_tag.unwrap_or(DEFAULT_INFO_HASH_TAG);
        let slot = self.slots.slot_of(tag)?;
        let info = self.client.raw_command(&["INFO"], Some(slot)).await?;
        Ok(info.unwrap_or_default())
    }

    /// Server version parsed from `INFO`, or a sentinel when it cannot be
    /// determined. Fetch failures are logged and swallowed.
    pub async fn server_version(&self) -> String {
        let info = match self.server_info(None).await {
            Ok(info) => info,
            Err(e) => {
                warn!("server info fetch failed: {e}");
                return UNKNOWN_VERSION.to_string();
            }
        };
        parse_server_version(&info).unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    /// Raw dataset metadata document, or a sentinel when absent or empty.
    /// Fetch failures are logged and swallowed.
    pub async fn dataset_metadata(&self) -> String {
        let key = self.key_for_id(DATASET_METADATA_ID);
        match self.client.get(&key).await {
            Ok(Some(raw)) if !raw.is_empty() => String::from_utf8_lossy(&raw).into_owned(),
            Ok(_) => DATASET_META_NOT_FOUND.to_string(),
            Err(e) => {
                warn!("dataset metadata fetch failed: {e}");
                DATASET_META_NOT_FOUND.to_string()
            }
        }
    }

    /// Dataset version resolved from the metadata document, or a sentinel
    /// when any step of the lookup fails.
    pub async fn dataset_version(&self) -> String {
        parse_dataset_version(&self.dataset_metadata().await)
    }
}

fn parse_server_version(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.strip_prefix("redis_version:"))
        .map(|version| version.trim_end_matches('\r').to_string())
}

// The metadata document names its active bundle in `data_bundle[0]`; the
// bundle's "<name> <version>" string keys into `data_sources`, whose
// `basemap.id` is the dataset version.
fn parse_dataset_version(meta: &str) -> String {
    let doc: serde_json::Value = match serde_json::from_str(meta) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("dataset metadata does not parse as JSON: {e}");
            return DATASET_VERSION_UNKNOWN.to_string();
        }
    };
    let Some(bundle) = doc.get("data_bundle").and_then(|bundles| bundles.get(0)) else {
        return DATASET_VERSION_UNKNOWN.to_string();
    };
    let (Some(name), Some(version)) = (
        bundle.get("name").and_then(|name| name.as_str()),
        bundle.get("version").and_then(|version| version.as_str()),
    ) else {
        return DATASET_VERSION_UNKNOWN.to_string();
    };
    let source_key = format!("{name} {version}");
    doc.get("data_sources")
        .and_then(|sources| sources.get(source_key.as_str()))
        .and_then(|source| source.get("basemap"))
        .and_then(|basemap| basemap.get("id"))
        .and_then(|id| id.as_str())
        .map(|id| id.to_string())
        .unwrap_or_else(|| DATASET_VERSION_UNKNOWN.to_string())
}
