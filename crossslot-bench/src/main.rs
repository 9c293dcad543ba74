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

//! Workload driver reading multi-key queries from a file and replaying them
//! against a cluster over concurrent workers.

mod input;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::ensure;
use clap::Parser;
use crossslot::{
    distribute, ClusterDataStore, DistributionMode, RedisClusterClient, StoreParams, WorkloadHarness,
};
use tracing::{error, info};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// Query file, one comma-separated key list per row.
    #[arg(short, long)]
    file: PathBuf,

    /// Worker count per pass.
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Replicate the full query list to every worker instead of dividing it.
    #[arg(short, long, default_value_t = false)]
    replicate: bool,

    /// Passes over the workload.
    #[arg(long, default_value_t = 2)]
    passes: usize,

    /// Hashslot engine, `crc` or `locked`.
    #[arg(long, default_value = "crc")]
    slot_engine: String,

    /// Prefix every wire key carries.
    #[arg(long, default_value = "test.datastore:v1:{")]
    key_prefix: String,

    /// Suffix every wire key carries.
    #[arg(long, default_value = "}")]
    key_suffix: String,

    /// Largest sub-batch handed to one multi-key fetch, 0 for unbounded.
    #[arg(long, default_value_t = 40)]
    max_batch_size: usize,

    /// Connection pool size.
    #[arg(long, default_value_t = 1000)]
    pool_size: usize,

    /// Pool wait timeout. (ms, 0 waits without limit)
    #[arg(long, default_value_t = 0)]
    pool_wait_timeout_ms: u64,

    /// Pooled connection lifetime. (ms, 0 for unlimited)
    #[arg(long, default_value_t = 0)]
    pool_connection_lifetime_ms: u64,

    /// Pooled connection idle time. (ms, 0 for unlimited)
    #[arg(long, default_value_t = 0)]
    pool_connection_idle_ms: u64,
}

impl Args {
    fn store_params(&self) -> crossslot::Result<StoreParams> {
        let mut params = StoreParams::from_env()?;
        params.key_prefix = self.key_prefix.clone();
        params.key_suffix = self.key_suffix.clone();
        params.max_multikey_batch_size = self.max_batch_size;
        params.slot_engine = self.slot_engine.clone();
        params.pool_size = self.pool_size;
        params.pool_wait_timeout = Duration::from_millis(self.pool_wait_timeout_ms);
        params.pool_connection_lifetime = Duration::from_millis(self.pool_connection_lifetime_ms);
        params.pool_connection_idle_time = Duration::from_millis(self.pool_connection_idle_ms);
        Ok(params)
    }

    fn mode(&self) -> DistributionMode {
        if self.replicate {
            DistributionMode::Replicate
        } else {
            DistributionMode::Divide
        }
    }
}

fn init_logger() {
    use tracing_subscriber::{prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_line_number(true))
        .with(EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    ensure!(args.threads >= 1, "thread count must be at least 1");
    ensure!(args.passes >= 1, "pass count must be at least 1");
    ensure!(
        args.file.is_file(),
        "query file does not exist at: {}",
        args.file.display()
    );

    info!(
        file = %args.file.display(),
        threads = args.threads,
        mode = ?args.mode(),
        passes = args.passes,
        "running workload"
    );

    let queries = input::load_queries(&args.file)?;
    ensure!(!queries.is_empty(), "query file {} holds no queries", args.file.display());

    let params = args.store_params()?;
    let client = RedisClusterClient::connect(&params).await?;
    let store = Arc::new(ClusterDataStore::new(client, &params)?);

    info!(server_version = %store.server_version().await, "connected");
    info!(dataset_version = %store.dataset_version().await, "dataset");

    for pass in 1..=args.passes {
        let pass_name = format!("run{pass}");
        let buckets = distribute(queries.clone(), args.threads, args.mode())?;
        let reports = WorkloadHarness::new(&pass_name, buckets, store.clone()).run().await;
        for (id, slot) in reports.iter().enumerate() {
            match slot {
                Some(report) => println!("{report}\n"),
                None => error!(pass = %pass_name, "runner report {id} not ready"),
            }
        }
    }

    println!("Tests complete");
    Ok(())
}
