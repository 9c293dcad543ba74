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

//! Query file loading.

use std::{fs::File, path::Path};

use anyhow::Context;
use csv::{ReaderBuilder, Trim};

/// Parse a query file into one key list per row.
///
/// Rows may carry any number of comma-separated keys. Surrounding whitespace
/// is trimmed, empty fields are dropped, and rows without any remaining key
/// are skipped.
pub fn load_queries(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let file = File::open(path).with_context(|| format!("open query file {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut queries = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("malformed record in {}", path.display()))?;
        let keys: Vec<String> = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            continue;
        }
        queries.push(keys);
    }
    Ok(queries)
}
