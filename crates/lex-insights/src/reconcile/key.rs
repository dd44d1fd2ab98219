//! Composite row keys.

use crate::types::{CellValue, Record};
use indexmap::IndexMap;
use indexmap::map::Entry;

/// One string form per key column; `None` marks a null part.
///
/// The parts are kept as a tuple instead of being joined into one string, so
/// `("a|b", "c")` and `("a", "b|c")` never collide, and a null part never
/// equals an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(Vec<Option<String>>);

impl CompositeKey {
    /// Build the key of `row` from `key_columns`. Missing columns count as null.
    pub fn from_record(row: &Record, key_columns: &[String]) -> Self {
        CompositeKey(
            key_columns
                .iter()
                .map(|col| row.get(col).and_then(CellValue::as_key_string))
                .collect(),
        )
    }

    pub fn parts(&self) -> &[Option<String>] {
        &self.0
    }
}

/// First occurrence of every distinct key in a dataset, in row order.
#[derive(Debug, Default)]
pub(crate) struct KeyIndex {
    rows: IndexMap<CompositeKey, usize>,
    duplicates: usize,
}

impl KeyIndex {
    pub(crate) fn build(records: &[Record], key_columns: &[String]) -> Self {
        let mut index = KeyIndex::default();
        for (row, record) in records.iter().enumerate() {
            match index.rows.entry(CompositeKey::from_record(record, key_columns)) {
                Entry::Occupied(_) => index.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
        }
        index
    }

    /// Row number of the first occurrence of `key`.
    pub(crate) fn row_of(&self, key: &CompositeKey) -> Option<usize> {
        self.rows.get(key).copied()
    }

    /// Distinct keys with their first row, in row order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&CompositeKey, usize)> {
        self.rows.iter().map(|(key, row)| (key, *row))
    }

    /// Rows whose key already appeared earlier.
    pub(crate) fn duplicates(&self) -> usize {
        self.duplicates
    }
}
