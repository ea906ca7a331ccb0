//! Build encoded tables from postcode rows.

use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, info};

use super::codec::{self, NO_VALUE};
use super::postcode;
use super::table::EncodedTable;
use crate::error::EncodeError;

/// Collects `(postcode, value)` rows and compresses them into a wire table.
///
/// Consecutive postcodes (in key order) with equal values collapse into one
/// range. A row without a value ends the current range; the wire format can
/// only carry such gaps when they alternate with valued ranges, anything else
/// fails with [`EncodeError::UnrepresentableGap`].
#[derive(Debug, Clone)]
pub struct TableBuilder<T> {
    rows: Vec<(u64, String, Option<T>)>,
    skipped: usize,
}

impl<T: Eq + Hash + Clone> TableBuilder<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            skipped: 0,
        }
    }

    /// Add a row. `None` marks the postcode as having no value.
    ///
    /// Northern Ireland postcodes are dropped since lookups never reach them.
    pub fn push(&mut self, postcode: &str, value: Option<T>) -> Result<(), EncodeError> {
        if !postcode::is_valid(postcode) {
            return Err(EncodeError::InvalidPostcode(postcode.to_string()));
        }
        if postcode::is_excluded(postcode) {
            self.skipped += 1;
            return Ok(());
        }
        let key = postcode::postcode_to_int(postcode)
            .ok_or_else(|| EncodeError::InvalidPostcode(postcode.to_string()))?;
        self.rows.push((key, postcode::clean(postcode), value));
        Ok(())
    }

    /// Rows accepted so far
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows dropped as excluded
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn build(mut self) -> Result<EncodedTable<T>, EncodeError> {
        self.rows.sort_by_key(|(key, _, _)| *key);

        if let Some(w) = self.rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(EncodeError::DuplicatePostcode(w[1].1.clone()));
        }

        let mut keys = Vec::new();
        let mut value_key = Vec::new();
        let mut values: Vec<T> = Vec::new();
        let mut interned: HashMap<&T, i64> = HashMap::new();
        let mut current: Option<&Option<T>> = None;

        for (key, _, value) in &self.rows {
            if current == Some(value) {
                continue;
            }
            current = Some(value);

            let index = match value {
                None => NO_VALUE,
                Some(v) => *interned.entry(v).or_insert_with(|| {
                    values.push(v.clone());
                    (values.len() - 1) as i64
                }),
            };
            keys.push(*key);
            value_key.push(index);
        }

        debug!(
            "Collapsed {} rows into {} ranges over {} values",
            self.rows.len(),
            keys.len(),
            values.len()
        );

        let table = EncodedTable {
            postcode_keys: codec::difference_compression(&keys)?,
            value_key: codec::drop_minus_one(&value_key)?,
            value_values: values,
        };

        info!(
            "Built table with {} ranges ({} excluded rows skipped)",
            table.postcode_keys.len(),
            self.skipped
        );
        Ok(table)
    }
}

impl<T: Eq + Hash + Clone> Default for TableBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
