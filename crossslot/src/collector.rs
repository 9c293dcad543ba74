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

//! Query distribution across workload buckets.

use itertools::Itertools;
use tracing::info;

use crate::error::{Error, Result};

/// One worker's share of the query list. Every inner vector is one query's
/// key list.
pub type QueryBucket = Vec<Vec<String>>;

/// How queries spread over buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionMode {
    /// Round-robin each query into one bucket.
    #[default]
    Divide,
    /// Hand every bucket the complete query list.
    Replicate,
}

/// Distribute `queries` over exactly `bucket_count` buckets.
///
/// `Divide` assigns the i-th query to bucket `i % bucket_count`;
/// `Replicate` hands every bucket the whole list in input order. The split
/// is deterministic for a given input order.
pub fn distribute(queries: Vec<Vec<String>>, bucket_count: usize, mode: DistributionMode) -> Result<Vec<QueryBucket>> {
    if bucket_count == 0 {
        return Err(Error::InvalidArgument("bucket count must be at least 1".to_string()));
    }
    let mut buckets: Vec<QueryBucket> = vec![Vec::new(); bucket_count];
    match mode {
        DistributionMode::Divide => {
            for (index, query) in queries.into_iter().enumerate() {
                buckets[index % bucket_count].push(query);
            }
        }
        DistributionMode::Replicate => {
            for bucket in &mut buckets {
                *bucket = queries.clone();
            }
        }
    }
    info!(
        ?mode,
        sizes = ?buckets.iter().map(|bucket| bucket.len()).collect_vec(),
        "distributed queries over buckets"
    );
    Ok(buckets)
}
