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

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use crossslot::{
    distribute, ClusterClient, ClusterDataStore, DistributionMode, KeyIndex, Result, StoreParams, WorkloadHarness,
};
use parking_lot::RwLock;

const KEY_PREFIX: &str = "bench:{";
const KEY_SUFFIX: &str = "}";

/// In-process cluster double shared by every worker of a harness run.
#[derive(Clone, Default)]
struct SharedCluster {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    server_info: Arc<RwLock<String>>,
}

impl SharedCluster {
    fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.write().insert(key.into(), value.into());
    }

    fn set_server_info(&self, info: impl Into<String>) {
        *self.server_info.write() = info.into();
    }
}

#[async_trait]
impl ClusterClient for SharedCluster {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let data = self.data.read();
        Ok(keys.iter().map(|key| data.get(key).cloned()).collect())
    }

    async fn raw_command(&self, args: &[&str], _route: Option<u16>) -> Result<Option<String>> {
        match args {
            ["INFO"] | ["CLUSTER", "INFO"] => Ok(Some(self.server_info.read().clone())),
            _ => Ok(None),
        }
    }
}

fn staged_store(entries: usize) -> (SharedCluster, Arc<ClusterDataStore<SharedCluster>>) {
    let cluster = SharedCluster::default();
    for i in 0..entries {
        cluster.put(format!("{KEY_PREFIX}k{i}{KEY_SUFFIX}"), format!("value{i}"));
    }

    let params = StoreParams {
        key_prefix: KEY_PREFIX.to_string(),
        key_suffix: KEY_SUFFIX.to_string(),
        max_multikey_batch_size: 2,
        ..Default::default()
    };
    let store = Arc::new(ClusterDataStore::new(cluster.clone(), &params).unwrap());
    (cluster, store)
}

fn wire_key(i: usize) -> String {
    format!("{KEY_PREFIX}k{i}{KEY_SUFFIX}")
}

#[tokio::test]
async fn test_harness_divide_end_to_end() {
    let (_cluster, store) = staged_store(12);

    // 6 two-key queries plus one probing a key that is not in the store.
    let mut queries: Vec<Vec<String>> = (0..6).map(|q| vec![wire_key(2 * q), wire_key(2 * q + 1)]).collect();
    queries.push(vec![wire_key(0), wire_key(99)]);

    let buckets = distribute(queries, 3, DistributionMode::Divide).unwrap();
    let reports = WorkloadHarness::new("pass1", buckets, store).run().await;
    assert_eq!(reports.len(), 3);

    let mut query_count = 0;
    let mut fetched = 0;
    for (id, slot) in reports.iter().enumerate() {
        let report = slot.as_ref().unwrap();
        assert_eq!(report.name, format!("pass1.{id}"));
        assert_eq!(report.success_count, report.query_count);
        assert_eq!(report.latencies_us.len(), report.query_count);
        query_count += report.query_count;
        fetched += report.fetched_objects;
    }
    assert_eq!(query_count, 7);
    // 12 staged values hit once each, k0 twice, k99 never.
    assert_eq!(fetched, 13);

    let rendered = reports[0].as_ref().unwrap().to_string();
    assert!(rendered.starts_with("Runner report: pass1.0\n"));
    for line in [
        "  Input query count:",
        "  Query successes count:",
        "  Input key count:",
        "  Max query length:",
        "  Fetched object count:",
        "  Total runtime ms:",
        "  query times elapsed(microseconds):",
        "   p50:",
        "   p90:",
        "   p95:",
        "   p99:",
        "   p100:",
        "   mean:",
    ] {
        assert!(rendered.contains(line), "missing {line:?} in report:\n{rendered}");
    }
}

#[tokio::test]
async fn test_harness_replicate_runs_full_list_per_worker() {
    let (_cluster, store) = staged_store(4);

    let queries: Vec<Vec<String>> = (0..4).map(|i| vec![wire_key(i)]).collect();
    let buckets = distribute(queries, 2, DistributionMode::Replicate).unwrap();
    let reports = WorkloadHarness::new("pass1", buckets, store).run().await;

    for slot in &reports {
        let report = slot.as_ref().unwrap();
        assert_eq!(report.query_count, 4);
        assert_eq!(report.fetched_objects, 4);
    }
}

#[tokio::test]
async fn test_harness_leaves_empty_buckets_unreported() {
    let (_cluster, store) = staged_store(1);

    let buckets = distribute(vec![vec![wire_key(0)]], 3, DistributionMode::Divide).unwrap();
    let reports = WorkloadHarness::new("pass1", buckets, store).run().await;

    assert_eq!(reports.len(), 3);
    assert!(reports[0].is_some());
    assert!(reports[1].is_none());
    assert!(reports[2].is_none());
}

#[tokio::test]
async fn test_fetch_by_keys_logical_index() {
    let (_cluster, store) = staged_store(2);

    let keys = vec![wire_key(0), wire_key(1)];
    let result = store.fetch_by_keys(&keys, KeyIndex::Logical).await.unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result["k0"], Some(b"value0".to_vec()));
    assert_eq!(result["k1"], Some(b"value1".to_vec()));
}

#[tokio::test]
async fn test_server_version_through_store() {
    let (cluster, store) = staged_store(0);
    cluster.set_server_info("# Server\r\nredis_version:7.2.4\r\nredis_mode:cluster\r\n");

    assert_eq!(store.server_version().await, "7.2.4");
}
