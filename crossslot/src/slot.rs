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

//! Hash tag extraction and hashslot math for Redis-Cluster-style key
//! partitioning.

use std::collections::BTreeMap;

use crc::{Crc, CRC_16_XMODEM};
use itertools::Itertools;
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Number of hashslots a cluster routes over.
pub const MAX_SLOTS: u16 = 16384;

const SLOT_MASK: u16 = MAX_SLOTS - 1;

// CRC-16/CCITT as used for cluster key routing: polynomial 0x1021, initial
// remainder 0x0000, no reflection, no final xor.
const CRC16_ALGO: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Extract the hash tag of `key`.
///
/// The hash tag is the substring strictly between the first `{` and the
/// first `}` following it. A key without braces, with an unterminated `{`,
/// or with an empty `{}` tag hashes as a whole.
pub fn hash_tag(key: &str) -> Result<&str> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("key is empty".to_string()));
    }
    let Some(open) = key.find('{') else {
        return Ok(key);
    };
    match key[open + 1..].find('}') {
        Some(close) if close > 0 => Ok(&key[open + 1..open + 1 + close]),
        _ => Ok(key),
    }
}

/// Maps keys to hashslots.
///
/// Implementations must be safe to call from many workers at once, and all
/// of them share one checksum parameterization, so they are freely
/// interchangeable.
pub trait SlotGenerator: Send + Sync {
    /// Checksum over the canonical hash tag bytes.
    fn crc16(&self, data: &[u8]) -> u16;

    /// Hashslot owning `key`.
    fn slot_of(&self, key: &str) -> Result<u16> {
        Ok(self.crc16(hash_tag(key)?.as_bytes()) & SLOT_MASK)
    }
}

/// Slot generator running an independent checksum digest per call.
#[derive(Debug, Default)]
pub struct CrcSlotGenerator;

impl SlotGenerator for CrcSlotGenerator {
    fn crc16(&self, data: &[u8]) -> u16 {
        CRC16_ALGO.checksum(data)
    }
}

/// Slot generator serializing every checksum through one shared engine
/// instance behind a lock.
pub struct LockedCrcSlotGenerator {
    engine: Mutex<Crc<u16>>,
}

impl Default for LockedCrcSlotGenerator {
    fn default() -> Self {
        Self {
            engine: Mutex::new(Crc::<u16>::new(&CRC_16_XMODEM)),
        }
    }
}

impl SlotGenerator for LockedCrcSlotGenerator {
    fn crc16(&self, data: &[u8]) -> u16 {
        self.engine.lock().checksum(data)
    }
}

/// Build the slot generator selected by the `slot_engine` configuration
/// value.
///
/// Known engines: `"crc"` (independent digest per call, the default) and
/// `"locked"` (one shared engine instance behind a lock).
pub fn slot_generator(engine: &str) -> Result<Box<dyn SlotGenerator>> {
    match engine {
        "crc" => Ok(Box::new(CrcSlotGenerator)),
        "locked" => Ok(Box::new(LockedCrcSlotGenerator::default())),
        _ => Err(Error::Config {
            field: "slot_engine",
            reason: format!("unknown slot engine {engine:?}, expected \"crc\" or \"locked\""),
        }),
    }
}

/// Group `keys` by hashslot.
///
/// Keys are deduplicated first; input order is not preserved. The returned
/// groups are disjoint and cover every deduplicated key exactly once,
/// ordered by slot id.
pub fn partition_by_slot(keys: &[String], slots: &dyn SlotGenerator) -> Result<BTreeMap<u16, Vec<String>>> {
    let mut groups: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    for key in keys.iter().cloned().sorted_unstable().dedup() {
        let slot = slots.slot_of(&key)?;
        groups.entry(slot).or_default().push(key);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::future::join_all;

    use super::*;

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(CrcSlotGenerator.crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_hash_tag_rules() {
        assert_eq!(hash_tag("foo").unwrap(), "foo");
        assert_eq!(hash_tag("foo{bar}baz").unwrap(), "bar");
        assert_eq!(hash_tag("foo{}baz").unwrap(), "foo{}baz");
        assert_eq!(hash_tag("foo{bar").unwrap(), "foo{bar");
        assert_eq!(hash_tag("{a}{b}").unwrap(), "a");
        assert_eq!(hash_tag("x{}{y}").unwrap(), "x{}{y}");
        assert!(hash_tag("").is_err());
    }

    #[test]
    fn test_slot_of_known_keys() {
        let slots = CrcSlotGenerator;
        assert_eq!(slots.slot_of("foo").unwrap(), 12182);
        assert_eq!(slots.slot_of("hello").unwrap(), 866);
        assert_eq!(
            slots.slot_of("{user1000}.following").unwrap(),
            slots.slot_of("{user1000}.followers").unwrap()
        );
        assert_eq!(
            slots.slot_of("{user1000}.following").unwrap(),
            slots.slot_of("user1000").unwrap()
        );
        for key in ["a", "b", "user:1:profile", "{tag}", "x{}{y}"] {
            assert!(slots.slot_of(key).unwrap() < MAX_SLOTS);
        }
    }

    #[test]
    fn test_engines_agree() {
        let per_call = CrcSlotGenerator;
        let locked = LockedCrcSlotGenerator::default();
        for key in ["foo", "foo{bar}baz", "{q}", "a:b:c", "123456789"] {
            assert_eq!(per_call.slot_of(key).unwrap(), locked.slot_of(key).unwrap());
        }
    }

    #[test]
    fn test_slot_generator_selection() {
        assert!(slot_generator("crc").is_ok());
        assert!(slot_generator("locked").is_ok());
        assert!(matches!(
            slot_generator("md5"),
            Err(Error::Config { field: "slot_engine", .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_locked_engine_concurrent() {
        let slots = Arc::new(LockedCrcSlotGenerator::default());
        let expected = slots.slot_of("{user1000}.following").unwrap();
        let handles = (0..64)
            .map(|_| {
                let slots = slots.clone();
                tokio::spawn(async move { slots.slot_of("{user1000}.following").unwrap() })
            })
            .collect_vec();
        for got in join_all(handles).await {
            assert_eq!(got.unwrap(), expected);
        }
    }

    #[test]
    fn test_partition_disjoint_cover() {
        let slots = CrcSlotGenerator;
        let keys: Vec<String> = ["a", "b", "{t}1", "{t}2", "a", "c{t}", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let groups = partition_by_slot(&keys, &slots).unwrap();

        let all = groups.values().flatten().cloned().sorted_unstable().collect_vec();
        let expected = keys.iter().cloned().sorted_unstable().dedup().collect_vec();
        assert_eq!(all, expected);

        let tagged = groups
            .values()
            .find(|group| group.contains(&"{t}1".to_string()))
            .unwrap();
        assert!(tagged.contains(&"{t}2".to_string()));
        assert!(tagged.contains(&"c{t}".to_string()));
    }

    #[test]
    fn test_partition_empty_and_invalid() {
        let slots = CrcSlotGenerator;
        assert!(partition_by_slot(&[], &slots).unwrap().is_empty());

        let keys = vec!["ok".to_string(), String::new()];
        assert!(partition_by_slot(&keys, &slots).is_err());
    }
}
