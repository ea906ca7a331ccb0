//! Wire codecs for the two integer columns of an encoded table.
//!
//! `postcode_keys` is delta encoded. `value_key` stores every index offset by
//! one so that `0` is free to mean "same as the entry two back"; a decoded
//! `-1` marks a range with no value.

use crate::error::{EncodeError, TableError};

/// Raw value that repeats the decoded entry two positions back.
pub const REPEAT_SENTINEL: i64 = 0;

/// Decoded value key marking a range with no value.
pub const NO_VALUE: i64 = -1;

/// Rebuild ascending keys from their deltas (running sum).
pub fn reverse_difference_compression(deltas: &[u64]) -> Result<Vec<u64>, TableError> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut acc: u64 = 0;
    for (index, &delta) in deltas.iter().enumerate() {
        acc = acc
            .checked_add(delta)
            .ok_or(TableError::KeyOverflow { index })?;
        out.push(acc);
    }
    Ok(out)
}

/// Expand repeat sentinels, then undo the `+1` offset.
///
/// The first two entries are taken as-is. After that a raw `0` copies the
/// entry two back in the output being built.
pub fn reverse_drop_minus_one(raw: &[i64]) -> Result<Vec<i64>, TableError> {
    let mut out: Vec<i64> = Vec::with_capacity(raw.len());
    for (i, &v) in raw.iter().enumerate() {
        if i >= 2 && v == REPEAT_SENTINEL {
            out.push(out[out.len() - 2]);
        } else {
            out.push(v);
        }
    }
    for (index, v) in out.iter_mut().enumerate() {
        *v = v
            .checked_sub(1)
            .ok_or(TableError::InvalidValueKey { index, value: *v })?;
    }
    Ok(out)
}

/// Delta encode a non-decreasing key sequence.
pub fn difference_compression(keys: &[u64]) -> Result<Vec<u64>, EncodeError> {
    let mut out = Vec::with_capacity(keys.len());
    let mut prev: u64 = 0;
    for (index, &next) in keys.iter().enumerate() {
        if next < prev {
            return Err(EncodeError::NotSorted { index, prev, next });
        }
        out.push(next - prev);
        prev = next;
    }
    Ok(out)
}

/// Offset indices by one and replace entries equal to the one two back with
/// the repeat sentinel.
///
/// A `-1` marker past the first two positions encodes as `0`, which the
/// decoder reads as a repeat, so it is only expressible when the entry two
/// back is also `-1`.
pub fn drop_minus_one(value_key: &[i64]) -> Result<Vec<i64>, EncodeError> {
    let mut out = Vec::with_capacity(value_key.len());
    for (index, &value) in value_key.iter().enumerate() {
        if value < NO_VALUE {
            return Err(EncodeError::InvalidIndex { index, value });
        }
        if index >= 2 && value == value_key[index - 2] {
            out.push(REPEAT_SENTINEL);
        } else if index >= 2 && value == NO_VALUE {
            return Err(EncodeError::UnrepresentableGap { index });
        } else {
            out.push(value + 1);
        }
    }
    Ok(out)
}
