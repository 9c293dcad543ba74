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

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    cluster::ClusterClientBuilder,
    cluster_async::ClusterConnection,
    cluster_routing::{Route, RoutingInfo, SingleNodeRoutingInfo, SlotAddr},
    AsyncCommands,
};
use tracing::{debug, info, warn};

use crate::{
    config::StoreParams,
    error::{Error, Result},
};

const READY_PROBE_COUNT: usize = 3;
const READY_PROBE_DELAY: Duration = Duration::from_millis(10);

/// Minimum cluster surface the data store needs.
///
/// Routing is owned by the implementation: once the caller has grouped keys
/// by hashslot, a multi-key read is a single-slot operation the client can
/// place on its own. Implementations must support concurrent invocation
/// from many workers over one shared instance.
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    /// Fetch a single key, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Ordered multi-key fetch: one value per input key, `None` for missing
    /// keys.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Administrative command returning a text payload, routed to the node
    /// owning slot `route` when given and to an arbitrary node otherwise.
    async fn raw_command(&self, args: &[&str], route: Option<u16>) -> Result<Option<String>>;
}

/// [`ClusterClient`] over the redis async cluster connection.
pub struct RedisClusterClient {
    conn: ClusterConnection,
}

impl RedisClusterClient {
    /// Connect with validated parameters, then probe `CLUSTER INFO` until
    /// the cluster answers, a bounded number of times. Gives up with the
    /// probe error once the attempts are exhausted.
    pub async fn connect(params: &StoreParams) -> Result<Self> {
        params.validate()?;
        info!(
            host = params.host,
            port = params.port,
            user = params.username,
            prefer_read_replicas = params.prefer_read_replicas,
            pool_size = params.pool_size,
            pool_wait_timeout = ?params.pool_wait_timeout,
            pool_connection_lifetime = ?params.pool_connection_lifetime,
            pool_connection_idle_time = ?params.pool_connection_idle_time,
            max_multikey_batch_size = params.max_multikey_batch_size,
            "connecting to redis cluster"
        );

        let mut builder = ClusterClientBuilder::new(vec![format!("redis://{}:{}", params.host, params.port)])
            .username(params.username.clone())
            .password(params.password.clone());
        if params.prefer_read_replicas {
            builder = builder.read_from_replicas();
        }
        if !params.pool_wait_timeout.is_zero() {
            builder = builder.connection_timeout(params.pool_wait_timeout);
        }

        let conn = builder.build()?.get_async_connection().await?;
        let client = Self { conn };
        client.await_ready().await?;
        Ok(client)
    }

    async fn await_ready(&self) -> Result<()> {
        for attempt in 1..=READY_PROBE_COUNT {
            match self.raw_command(&["CLUSTER", "INFO"], None).await {
                Ok(Some(state)) if !state.is_empty() => {
                    debug!(attempt, "cluster ready:\n{state}");
                    return Ok(());
                }
                Ok(_) => warn!(attempt, "empty cluster info, cluster not ready"),
                Err(e) => {
                    if attempt == READY_PROBE_COUNT {
                        return Err(e);
                    }
                    warn!(attempt, "cluster not ready: {e}");
                }
            }
            tokio::time::sleep(READY_PROBE_DELAY).await;
        }
        Err(Error::NotReady {
            attempts: READY_PROBE_COUNT,
        })
    }
}

#[async_trait]
impl ClusterClient for RedisClusterClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let values: Vec<Option<Vec<u8>>> = cmd.query_async(&mut conn).await?;
        Ok(values)
    }

    async fn raw_command(&self, args: &[&str], route: Option<u16>) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::Cmd::new();
        for arg in args {
            cmd.arg(*arg);
        }
        let routing = match route {
            Some(slot) => RoutingInfo::SingleNode(SingleNodeRoutingInfo::SpecificNode(Route::new(slot, SlotAddr::Master))),
            None => RoutingInfo::SingleNode(SingleNodeRoutingInfo::Random),
        };
        let value = conn.route_command(&cmd, routing).await?;
        Ok(redis::from_redis_value(&value)?)
    }
}


#[cfg(test)]
mod tests {
    use super::{test_util::MemoryCluster, *};

    #[test_log::test(tokio::test)]
    async fn test_memory_cluster_ordered_mget() {
        let cluster = MemoryCluster::default();
        cluster.put("a", b"1".to_vec());
        cluster.put("c", b"3".to_vec());

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = cluster.mget(&keys).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
        assert_eq!(cluster.batch_sizes(), vec![3]);
    }

    #[test_log::test(tokio::test)]
    async fn test_memory_cluster_injected_failure() {
        let cluster = MemoryCluster::default();
        cluster.put("a", b"1".to_vec());
        cluster.fail_key("b");

        assert!(cluster.get("a").await.unwrap().is_some());
        assert!(cluster.mget(&["a".to_string(), "b".to_string()]).await.is_err());
    }
}
