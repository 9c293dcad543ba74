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

//! Order statistics over latency samples.

use tracing::warn;

use crate::error::{Error, Result};

// Percentiles over fewer samples than this are statistically shaky; they
// are still computed, with a warning.
const SMALL_SAMPLE_THRESHOLD: usize = 20;

/// Nearest-rank percentile of `data` for `pct` in `[1, 100]`.
///
/// Sorts `data` ascending in place and returns the element at 1-based rank
/// `ceil(len * pct / 100)`.
pub fn find_percentile(data: &mut [u64], pct: usize) -> Result<u64> {
    if !(1..=100).contains(&pct) {
        return Err(Error::InvalidArgument(format!("percentile {pct} outside [1, 100]")));
    }
    if data.is_empty() {
        return Err(Error::InvalidArgument("empty dataset".to_string()));
    }
    if data.len() < SMALL_SAMPLE_THRESHOLD {
        warn!(samples = data.len(), "percentile over a small sample is unreliable");
    }
    data.sort_unstable();
    let rank = (data.len() as u64 * pct as u64).div_ceil(100);
    Ok(data[rank as usize - 1])
}

/// Arithmetic mean of `data`.
pub fn find_average(data: &[u64]) -> Result<f64> {
    if data.is_empty() {
        return Err(Error::InvalidArgument("empty dataset".to_string()));
    }
    Ok(data.iter().sum::<u64>() as f64 / data.len() as f64)
}
