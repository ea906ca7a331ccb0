//! Encoded wire table and the decoded range lookup built from it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::codec::{self, NO_VALUE};
use super::postcode;
use crate::error::TableError;

/// Table as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodedTable<T> {
    /// Delta-encoded ascending postcode keys
    pub postcode_keys: Vec<u64>,
    /// Value indices, offset by one, `0` repeats the entry two back
    pub value_key: Vec<i64>,
    /// Opaque payloads addressed by `value_key`
    pub value_values: Vec<T>,
}

/// Decoded, validated postcode range table.
///
/// Each key starts a range that runs up to the next key. Immutable once
/// built, so it can be shared freely behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeLookup<T> {
    postcode_keys: Vec<u64>,
    value_key: Vec<Option<usize>>,
    value_values: Vec<T>,
}

/// Decode a wire table.
pub fn decode<T>(encoded: EncodedTable<T>) -> Result<RangeLookup<T>, TableError> {
    RangeLookup::from_encoded(encoded)
}

impl<T> RangeLookup<T> {
    /// Decode and validate a wire table.
    pub fn from_encoded(encoded: EncodedTable<T>) -> Result<Self, TableError> {
        let keys = codec::reverse_difference_compression(&encoded.postcode_keys)?;
        let value_key = codec::reverse_drop_minus_one(&encoded.value_key)?;
        Self::from_parts(keys, value_key, encoded.value_values)
    }

    /// Build from already decoded columns.
    ///
    /// `value_key` uses `-1` for "no value". Indices past the end of
    /// `value_values` are kept and resolve to no match at query time.
    pub fn from_parts(
        postcode_keys: Vec<u64>,
        value_key: Vec<i64>,
        value_values: Vec<T>,
    ) -> Result<Self, TableError> {
        if postcode_keys.len() != value_key.len() {
            return Err(TableError::LengthMismatch {
                keys: postcode_keys.len(),
                values: value_key.len(),
            });
        }

        if let Some(index) = postcode_keys.windows(2).position(|w| w[1] < w[0]) {
            return Err(TableError::NotSorted {
                index: index + 1,
                prev: postcode_keys[index],
                next: postcode_keys[index + 1],
            });
        }

        let value_key = value_key
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                NO_VALUE => Ok(None),
                v if v < NO_VALUE => Err(TableError::InvalidValueKey { index, value }),
                v => usize::try_from(v)
                    .map(Some)
                    .map_err(|_| TableError::InvalidValueKey { index, value }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Decoded postcode table with {} ranges and {} values",
            postcode_keys.len(),
            value_values.len()
        );

        Ok(Self {
            postcode_keys,
            value_key,
            value_values,
        })
    }

    /// Look up the value for a postcode, validating its format first.
    pub fn get(&self, postcode: &str) -> Option<&T> {
        self.get_value(postcode, true)
    }

    /// Look up the value for a postcode.
    ///
    /// Every miss is `None`: a badly formed postcode (when
    /// `check_valid_postcode` is set), a Northern Ireland postcode, a key
    /// before the first range, or a range with no value.
    ///
    /// With validation off, input whose base-36 value does not fit in a
    /// `u64` is also a miss rather than landing in the last range.
    pub fn get_value(&self, postcode: &str, check_valid_postcode: bool) -> Option<&T> {
        if check_valid_postcode && !postcode::is_valid(postcode) {
            return None;
        }
        if postcode::is_excluded(postcode) {
            return None;
        }
        let key = postcode::postcode_to_int(postcode)?;
        self.lookup_key(key)
    }

    /// Resolve a raw key to its value.
    pub fn lookup_key(&self, key: u64) -> Option<&T> {
        let index = self.bucket_for_key(key)?;
        let value_index = self.value_key[index]?;
        self.value_values.get(value_index)
    }

    /// Index of the range containing `key`.
    ///
    /// An exact match selects its own range; a key between two boundaries
    /// belongs to the lower one. Keys before the first boundary have no range.
    pub fn bucket_for_key(&self, key: u64) -> Option<usize> {
        let keys = &self.postcode_keys;
        let mut index = keys.partition_point(|&k| k < key);

        if index == 0 && keys.first() != Some(&key) {
            return None;
        }
        if keys.get(index) != Some(&key) {
            index -= 1;
        }
        if index == keys.len() {
            index -= 1;
        }
        Some(index)
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.postcode_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postcode_keys.is_empty()
    }

    pub fn postcode_keys(&self) -> &[u64] {
        &self.postcode_keys
    }

    pub fn value_key(&self) -> &[Option<usize>] {
        &self.value_key
    }

    pub fn values(&self) -> &[T] {
        &self.value_values
    }
}

impl<T> TryFrom<EncodedTable<T>> for RangeLookup<T> {
    type Error = TableError;

    fn try_from(encoded: EncodedTable<T>) -> Result<Self, Self::Error> {
        Self::from_encoded(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(keys: Vec<u64>, value_key: Vec<i64>, values: &[&str]) -> RangeLookup<String> {
        RangeLookup::from_parts(
            keys,
            value_key,
            values.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    fn key(pc: &str) -> u64 {
        postcode::postcode_to_int(pc).unwrap()
    }

    #[test]
    fn test_bucket_tie_break() {
        let table = regions(vec![10, 20, 30], vec![0, 1, 2], &["a", "b", "c"]);
        assert_eq!(table.bucket_for_key(20), Some(1));
        assert_eq!(table.bucket_for_key(25), Some(1));
        assert_eq!(table.bucket_for_key(5), None);
        assert_eq!(table.bucket_for_key(35), Some(2));
        assert_eq!(table.bucket_for_key(10), Some(0));
        assert_eq!(table.bucket_for_key(11), Some(0));
        assert_eq!(table.bucket_for_key(30), Some(2));
    }

    #[test]
    fn test_empty_table() {
        let table = regions(vec![], vec![], &[]);
        assert!(table.is_empty());
        assert_eq!(table.bucket_for_key(0), None);
        assert_eq!(table.get("SW1A 1AA"), None);
    }

    #[test]
    fn test_duplicate_keys_pick_first() {
        let table = regions(vec![10, 10, 20], vec![0, 1, 2], &["a", "b", "c"]);
        assert_eq!(table.bucket_for_key(10), Some(0));
        assert_eq!(table.bucket_for_key(15), Some(1));
    }

    #[test]
    fn test_end_to_end_single_boundary() {
        let encoded = EncodedTable {
            postcode_keys: vec![key("AA1")],
            value_key: vec![1],
            value_values: vec!["RegionX".to_string()],
        };
        let table = decode(encoded).unwrap();
        assert_eq!(table.get("AA1 1AA").map(String::as_str), Some("RegionX"));
        assert_eq!(table.lookup_key(key("AA1") - 1), None);
    }

    #[test]
    fn test_no_value_marker() {
        let table = regions(
            vec![key("AB1 0AA"), key("AB1 5AA"), key("AB2 0AA")],
            vec![0, -1, 1],
            &["North", "South"],
        );
        assert_eq!(table.get("AB1 2ZZ").map(String::as_str), Some("North"));
        assert_eq!(table.get("AB1 7AA"), None);
        assert_eq!(table.get("AB2 3CD").map(String::as_str), Some("South"));
    }

    #[test]
    fn test_out_of_range_value_index() {
        let table = regions(vec![10], vec![4], &["only"]);
        assert_eq!(table.lookup_key(10), None);
    }

    #[test]
    fn test_validation_gate() {
        let table = regions(vec![0], vec![0], &["everything"]);
        assert_eq!(table.get_value("not a postcode", true), None);
        assert_eq!(
            table.get_value("not a postcode", false).map(String::as_str),
            Some("everything")
        );
        assert_eq!(table.get_value("!!!", false), None);
    }

    #[test]
    fn test_overflowing_key_is_a_miss() {
        let table = regions(vec![0], vec![0], &["everything"]);
        let long = "Z".repeat(20);
        assert_eq!(table.get_value(&long, false), None);
        assert_eq!(
            table.get_value(&"Z".repeat(12), false).map(String::as_str),
            Some("everything")
        );
    }

    #[test]
    fn test_northern_ireland_excluded() {
        let table = regions(vec![key("BT1 1AA")], vec![0], &["Belfast"]);
        assert_eq!(table.get("BT1 1AA"), None);
        assert_eq!(table.get("bt1 1aa"), None);
        assert_eq!(table.get_value("b t11aa", false), None);
        assert_eq!(table.lookup_key(key("BT1 1AA")).map(String::as_str), Some("Belfast"));
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let table = regions(vec![key("E1 0AA")], vec![0], &["East"]);
        let first = table.get("E1 6AN").cloned();
        for _ in 0..3 {
            assert_eq!(table.get("E1 6AN").cloned(), first);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = RangeLookup::<String>::from_parts(vec![1, 2], vec![0], vec![]).unwrap_err();
        assert_eq!(err, TableError::LengthMismatch { keys: 2, values: 1 });
    }

    #[test]
    fn test_unsorted_rejected() {
        let err = RangeLookup::<String>::from_parts(vec![1, 3, 2], vec![0, 0, 0], vec![])
            .unwrap_err();
        assert_eq!(
            err,
            TableError::NotSorted {
                index: 2,
                prev: 3,
                next: 2
            }
        );
    }

    #[test]
    fn test_negative_raw_value_key_rejected() {
        let encoded = EncodedTable::<String> {
            postcode_keys: vec![1],
            value_key: vec![-3],
            value_values: vec![],
        };
        let err = decode(encoded).unwrap_err();
        assert_eq!(err, TableError::InvalidValueKey { index: 0, value: -4 });
    }

    #[test]
    fn test_min_raw_value_key_rejected() {
        let json = r#"{"postcode_keys":[1],"value_key":[-9223372036854775808],"value_values":["a"]}"#;
        let encoded: EncodedTable<String> = serde_json::from_str(json).unwrap();
        let err = decode(encoded).unwrap_err();
        assert_eq!(
            err,
            TableError::InvalidValueKey {
                index: 0,
                value: i64::MIN
            }
        );
    }

    #[test]
    #[cfg(target_pointer_width = "32")]
    fn test_index_wider_than_usize_rejected() {
        let err =
            RangeLookup::<String>::from_parts(vec![1], vec![i64::from(u32::MAX) + 1], vec![])
                .unwrap_err();
        assert!(matches!(err, TableError::InvalidValueKey { index: 0, .. }));
    }

    #[test]
    fn test_large_index_is_a_miss() {
        let table = regions(vec![1], vec![i64::from(u32::MAX)], &["a"]);
        assert_eq!(table.lookup_key(1), None);
    }

    #[test]
    fn test_wire_json_shape() {
        let json = r#"{"postcode_keys":[10,10,10],"value_key":[1,2,0],"value_values":["a","b"]}"#;
        let encoded: EncodedTable<String> = serde_json::from_str(json).unwrap();
        let table = RangeLookup::try_from(encoded).unwrap();
        assert_eq!(table.postcode_keys(), &[10, 20, 30]);
        assert_eq!(table.value_key(), &[Some(0), Some(1), Some(0)]);
        assert_eq!(table.values().len(), 2);
    }

    #[test]
    fn test_wire_json_rejects_bad_shape() {
        let missing = r#"{"postcode_keys":[1],"value_values":[]}"#;
        assert!(serde_json::from_str::<EncodedTable<String>>(missing).is_err());

        let negative = r#"{"postcode_keys":[-1],"value_key":[1],"value_values":[]}"#;
        assert!(serde_json::from_str::<EncodedTable<String>>(negative).is_err());

        let extra = r#"{"postcode_keys":[],"value_key":[],"value_values":[],"x":1}"#;
        assert!(serde_json::from_str::<EncodedTable<String>>(extra).is_err());
    }
}
