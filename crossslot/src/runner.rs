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

//! Workload execution and latency reporting.

use std::{
    fmt::{self, Display},
    sync::Arc,
    time::Instant,
};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::{
    client::ClusterClient,
    collector::QueryBucket,
    error::{Error, Result},
    fetch::KeyIndex,
    stats::{find_average, find_percentile},
    store::ClusterDataStore,
};

/// Percentiles every report renders.
const REPORT_PERCENTILES: [usize; 5] = [50, 90, 95, 99, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerState {
    Idle,
    Running,
    Complete,
}

/// Count and latency summary of one runner's pass.
#[derive(Debug, Clone)]
pub struct RunnerReport {
    /// Runner display name, `<pass>.<id>`.
    pub name: String,
    /// Queries the runner received.
    pub query_count: usize,
    /// Queries whose fetch returned without error.
    pub success_count: usize,
    /// Keys across all received queries.
    pub key_count: usize,
    /// Largest key count of a single query.
    pub max_query_len: usize,
    /// Values present across all fetch results.
    pub fetched_objects: usize,
    /// Wall clock of the whole pass in milliseconds.
    pub runtime_ms: u64,
    /// Per-query wall clock in microseconds, in execution order.
    pub latencies_us: Vec<u64>,
}

impl Display for RunnerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Runner report: {}", self.name)?;
        writeln!(f, "  Input query count: {}", self.query_count)?;
        writeln!(f, "  Query successes count: {}", self.success_count)?;
        writeln!(f, "  Input key count: {}", self.key_count)?;
        writeln!(f, "  Max query length: {}", self.max_query_len)?;
        writeln!(f, "  Fetched object count: {}", self.fetched_objects)?;
        writeln!(f, "  Total runtime ms: {}", self.runtime_ms)?;
        writeln!(f, "  query times elapsed(microseconds):")?;
        let mut sorted = self.latencies_us.clone();
        for pct in REPORT_PERCENTILES {
            let value = find_percentile(&mut sorted, pct).unwrap_or(0);
            writeln!(f, "   p{pct}: {value}")?;
        }
        write!(f, "   mean: {:.2}", find_average(&self.latencies_us).unwrap_or(0.0))
    }
}

/// Executes one bucket of queries sequentially against a shared store.
///
/// A runner moves `Idle` to `Running` to `Complete` exactly once; the
/// report is cached at completion and stays available.
pub struct WorkloadRunner<C>
where
    C: ClusterClient,
{
    id: usize,
    name: String,
    queries: QueryBucket,
    store: Arc<ClusterDataStore<C>>,
    state: RunnerState,
    report: Option<RunnerReport>,
}

impl<C> WorkloadRunner<C>
where
    C: ClusterClient,
{
    /// Build runner `id` of pass `pass_name` over its query bucket.
    pub fn new(pass_name: &str, id: usize, queries: QueryBucket, store: Arc<ClusterDataStore<C>>) -> Self {
        Self {
            id,
            name: format!("{pass_name}.{id}"),
            queries,
            store,
            state: RunnerState::Idle,
            report: None,
        }
    }

    /// Runner index within its pass.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Runner display name, `<pass>.<id>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while the runner is idle and has work to do.
    pub fn ready_to_run(&self) -> bool {
        self.state == RunnerState::Idle && !self.queries.is_empty()
    }

    /// True once the runner finished and cached its report.
    pub fn run_complete(&self) -> bool {
        self.state == RunnerState::Complete
    }

    /// The cached report, present once the runner completed.
    pub fn report(&self) -> Option<&RunnerReport> {
        self.report.as_ref()
    }

    /// Consume the runner, yielding its cached report.
    pub fn into_report(self) -> Option<RunnerReport> {
        self.report
    }

    /// Execute every query of the bucket, one after another, timing each in
    /// microseconds.
    ///
    /// Fails when called on a runner that already ran. A per-query fetch
    /// failure is logged and shows up as a success count below the query
    /// count, not as an error.
    pub async fn run(&mut self) -> Result<()> {
        if self.state != RunnerState::Idle {
            return Err(Error::InvalidArgument(format!("runner {} has already run", self.name)));
        }
        self.state = RunnerState::Running;
        info!(runner = %self.name, queries = self.queries.len(), "runner starting");

        let mut success_count = 0;
        let mut key_count = 0;
        let mut max_query_len = 0;
        let mut fetched_objects = 0;
        let mut latencies_us = Vec::with_capacity(self.queries.len());

        let started = Instant::now();
        for query in &self.queries {
            key_count += query.len();
            max_query_len = max_query_len.max(query.len());

            let query_started = Instant::now();
            let outcome = self.store.fetch_by_keys(query, KeyIndex::Wire).await;
            latencies_us.push(query_started.elapsed().as_micros() as u64);

            match outcome {
                Ok(result) => {
                    success_count += 1;
                    fetched_objects += result.values().filter(|value| value.is_some()).count();
                }
                Err(e) => warn!(runner = %self.name, "query failed: {e}"),
            }
        }
        let runtime_ms = started.elapsed().as_millis() as u64;

        self.report = Some(RunnerReport {
            name: self.name.clone(),
            query_count: self.queries.len(),
            success_count,
            key_count,
            max_query_len,
            fetched_objects,
            runtime_ms,
            latencies_us,
        });
        self.state = RunnerState::Complete;
        info!(runner = %self.name, "runner complete");
        Ok(())
    }
}

/// Runs every ready runner of one pass concurrently and gathers reports.
pub struct WorkloadHarness<C>
where
    C: ClusterClient,
{
    pass_name: String,
    runners: Vec<WorkloadRunner<C>>,
}

impl<C> WorkloadHarness<C>
where
    C: ClusterClient,
{
    /// Build one runner per bucket for pass `pass_name`.
    pub fn new(pass_name: &str, buckets: Vec<QueryBucket>, store: Arc<ClusterDataStore<C>>) -> Self {
        let runners = buckets
            .into_iter()
            .enumerate()
            .map(|(id, bucket)| WorkloadRunner::new(pass_name, id, bucket, store.clone()))
            .collect();
        Self {
            pass_name: pass_name.to_string(),
            runners,
        }
    }

    /// Spawn every ready runner, join them all, and return the reports in
    /// runner-id order.
    ///
    /// Slots of runners that were skipped or never completed hold `None`.
    /// A lost worker is logged and leaves its slot empty; it never takes
    /// the pass down.
    pub async fn run(self) -> Vec<Option<RunnerReport>> {
        let Self { pass_name, runners } = self;
        let mut reports: Vec<Option<RunnerReport>> = Vec::new();
        reports.resize_with(runners.len(), || None);

        let mut workers: JoinSet<WorkloadRunner<C>> = JoinSet::new();
        for runner in runners {
            if !runner.ready_to_run() {
                warn!(runner = %runner.name(), "runner not ready, skipping");
                continue;
            }
            workers.spawn(async move {
                let mut runner = runner;
                if let Err(e) = runner.run().await {
                    error!(runner = %runner.name(), "runner failed: {e}");
                }
                runner
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(runner) if runner.run_complete() => {
                    let id = runner.id();
                    reports[id] = runner.into_report();
                }
                Ok(runner) => warn!(runner = %runner.name(), "runner finished without a report"),
                Err(e) => error!(pass = %pass_name, "worker lost: {e}"),
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::client::test_util::MemoryCluster;
    use crate::config::StoreParams;

    fn test_store(cluster: MemoryCluster) -> Arc<ClusterDataStore<MemoryCluster>> {
        let params = StoreParams {
            key_prefix: "t:{".to_string(),
            key_suffix: "}".to_string(),
            max_multikey_batch_size: 2,
            ..Default::default()
        };
        Arc::new(ClusterDataStore::new(cluster, &params).unwrap())
    }

    fn staged_cluster(ids: usize) -> MemoryCluster {
        let cluster = MemoryCluster::default();
        for i in 0..ids {
            cluster.put(format!("t:{{{i}}}"), format!("value{i}").into_bytes());
        }
        cluster
    }

    #[test_log::test(tokio::test)]
    async fn test_runner_lifecycle_and_report() {
        let store = test_store(staged_cluster(4));
        let bucket = vec![
            vec!["t:{0}".to_string(), "t:{1}".to_string(), "t:{2}".to_string()],
            vec!["t:{3}".to_string(), "t:{missing}".to_string()],
        ];
        let mut runner = WorkloadRunner::new("run1", 0, bucket, store);

        assert!(runner.ready_to_run());
        assert!(!runner.run_complete());
        assert!(runner.report().is_none());

        runner.run().await.unwrap();
        assert!(runner.run_complete());
        assert!(!runner.ready_to_run());

        let report = runner.report().unwrap();
        assert_eq!(report.name, "run1.0");
        assert_eq!(report.query_count, 2);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.key_count, 5);
        assert_eq!(report.max_query_len, 3);
        assert_eq!(report.fetched_objects, 4);
        assert_eq!(report.latencies_us.len(), 2);

        let rendered = report.to_string();
        for line in ["p50:", "p90:", "p95:", "p99:", "p100:", "mean:"] {
            assert!(rendered.contains(line), "missing {line} in {rendered}");
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_runner_rejects_second_run() {
        let store = test_store(staged_cluster(1));
        let mut runner = WorkloadRunner::new("run1", 0, vec![vec!["t:{0}".to_string()]], store);
        runner.run().await.unwrap();
        assert!(runner.run().await.is_err());
    }

    #[test_log::test(tokio::test)]
    async fn test_runner_counts_failed_queries() {
        let store = test_store(staged_cluster(1));
        let bucket = vec![vec!["t:{0}".to_string()], vec![String::new()]];
        let mut runner = WorkloadRunner::new("run1", 0, bucket, store);
        runner.run().await.unwrap();

        let report = runner.report().unwrap();
        assert_eq!(report.query_count, 2);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.latencies_us.len(), 2);
    }

    #[test]
    fn test_empty_bucket_not_ready() {
        let store = test_store(MemoryCluster::default());
        let runner = WorkloadRunner::new("run1", 0, Vec::new(), store);
        assert!(!runner.ready_to_run());
    }

    #[test_log::test(tokio::test)]
    async fn test_harness_reports_in_runner_order() {
        let store = test_store(staged_cluster(6));
        let buckets = vec![
            (0..3).map(|i| vec![format!("t:{{{i}}}")]).collect_vec(),
            Vec::new(),
            (3..6).map(|i| vec![format!("t:{{{i}}}")]).collect_vec(),
        ];

        let reports = WorkloadHarness::new("run1", buckets, store).run().await;
        assert_eq!(reports.len(), 3);

        let first = reports[0].as_ref().unwrap();
        assert_eq!(first.name, "run1.0");
        assert_eq!(first.query_count, 3);

        assert!(reports[1].is_none());

        let third = reports[2].as_ref().unwrap();
        assert_eq!(third.name, "run1.2");
        assert_eq!(third.success_count, 3);
    }
}
