//! Secondary indexes over non-key fields.
//!
//! Each index maps a field value to the bucket of `TransactionID`s holding
//! that value.
//!
//! # Invariants
//!
//! - Every stored record that has a value for an indexed field appears in
//!   exactly one bucket of that field's index.
//! - Buckets never name a key absent from the primary collection.
//! - Empty buckets are removed, never kept as empty sets.

use std::collections::{BTreeMap, BTreeSet};

use coinledger_core::{Field, FieldValue, IndexKey, Transaction, TransactionId};

/// The index for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    field: Field,
    buckets: BTreeMap<IndexKey, BTreeSet<TransactionId>>,
}

impl FieldIndex {
    /// Create an empty index for `field`.
    #[must_use]
    pub const fn new(field: Field) -> Self {
        Self {
            field,
            buckets: BTreeMap::new(),
        }
    }

    /// Build an index from scratch over `records`.
    #[must_use]
    pub fn build<'a>(field: Field, records: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut index = Self::new(field);
        for record in records {
            index.insert(record);
        }
        index
    }

    /// The indexed field.
    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Add `record` to the bucket for its value.
    pub fn insert(&mut self, record: &Transaction) {
        if let Some(key) = self.key_of(record) {
            self.buckets
                .entry(key)
                .or_default()
                .insert(record.transaction_id);
        }
    }

    /// Remove `record` from the bucket for its value, pruning the bucket if it empties.
    pub fn remove(&mut self, record: &Transaction) {
        let Some(key) = self.key_of(record) else {
            return;
        };
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&record.transaction_id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    /// Move `old` to the bucket for `new`'s value, if the value changed.
    pub fn update(&mut self, old: &Transaction, new: &Transaction) {
        if self.key_of(old) != self.key_of(new) || old.transaction_id != new.transaction_id {
            self.remove(old);
            self.insert(new);
        }
    }

    /// The keys stored under `value`, in ascending order.
    #[must_use]
    pub fn lookup(&self, value: &FieldValue) -> Option<&BTreeSet<TransactionId>> {
        value.index_key().and_then(|key| self.buckets.get(&key))
    }

    /// Number of distinct values.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of entries across buckets.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    /// Iterate over `(value, keys)` pairs in value order.
    pub fn buckets(&self) -> impl Iterator<Item = (&IndexKey, &BTreeSet<TransactionId>)> {
        self.buckets.iter()
    }

    fn key_of(&self, record: &Transaction) -> Option<IndexKey> {
        record.get(self.field).and_then(|value| value.index_key())
    }
}

/// All secondary indexes of a store, kept in step as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    indexes: BTreeMap<Field, FieldIndex>,
}

impl IndexSet {
    /// Create empty indexes for `fields`. Duplicates collapse.
    #[must_use]
    pub fn new(fields: &[Field]) -> Self {
        Self {
            indexes: fields
                .iter()
                .map(|&field| (field, FieldIndex::new(field)))
                .collect(),
        }
    }

    /// Whether `field` is indexed.
    #[must_use]
    pub fn covers(&self, field: Field) -> bool {
        self.indexes.contains_key(&field)
    }

    /// The index for `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldIndex> {
        self.indexes.get(&field)
    }

    /// The indexed fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.indexes.keys().copied()
    }

    /// Add `record` to every index.
    pub fn insert(&mut self, record: &Transaction) {
        for index in self.indexes.values_mut() {
            index.insert(record);
        }
    }

    /// Remove `record` from every index.
    pub fn remove(&mut self, record: &Transaction) {
        for index in self.indexes.values_mut() {
            index.remove(record);
        }
    }

    /// Re-bucket a record whose fields changed from `old` to `new`.
    pub fn update(&mut self, old: &Transaction, new: &Transaction) {
        for index in self.indexes.values_mut() {
            index.update(old, new);
        }
    }

    /// Drop every entry, keeping the set of indexed fields.
    pub fn clear(&mut self) {
        for index in self.indexes.values_mut() {
            *index = FieldIndex::new(index.field());
        }
    }

    /// Recompute every index from `records`.
    pub fn rebuild<'a>(&mut self, records: impl IntoIterator<Item = &'a Transaction> + Clone) {
        for index in self.indexes.values_mut() {
            *index = FieldIndex::build(index.field(), records.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinledger_core::UserId;

    fn tx(id: u64, user: u64, symbol: &str) -> Transaction {
        Transaction::new(TransactionId::new(id), UserId::new(user), symbol, "buy", 1.0)
    }

    #[test]
    fn insert_groups_by_value() {
        let mut index = FieldIndex::new(Field::UserId);
        index.insert(&tx(1, 10, "BTC"));
        index.insert(&tx(2, 10, "ETH"));
        index.insert(&tx(3, 11, "BTC"));

        let bucket = index.lookup(&UserId::new(10).into()).unwrap();
        assert_eq!(
            bucket.iter().copied().collect::<Vec<_>>(),
            vec![TransactionId::new(1), TransactionId::new(2)]
        );
        assert_eq!(index.bucket_count(), 2);
        assert_eq!(index.entry_count(), 3);
    }

    #[test]
    fn remove_prunes_empty_buckets() {
        let record = tx(1, 10, "BTC");
        let mut index = FieldIndex::new(Field::CryptoSymbol);
        index.insert(&record);
        index.remove(&record);

        assert!(index.lookup(&"BTC".into()).is_none());
        assert_eq!(index.bucket_count(), 0);
    }

    #[test]
    fn unset_optional_fields_are_not_indexed() {
        let mut index = FieldIndex::new(Field::TransactionDate);
        index.insert(&tx(1, 10, "BTC"));
        assert_eq!(index.entry_count(), 0);
    }

    #[test]
    fn index_set_rebuild_matches_incremental() {
        let records = [tx(1, 10, "BTC"), tx(2, 20, "BTC"), tx(3, 10, "SOL")];

        let mut incremental = IndexSet::new(&[Field::UserId, Field::CryptoSymbol]);
        for record in &records {
            incremental.insert(record);
        }
        incremental.remove(&records[1]);

        let mut rebuilt = IndexSet::new(&[Field::UserId, Field::CryptoSymbol]);
        rebuilt.rebuild([&records[0], &records[2]]);

        assert_eq!(incremental, rebuilt);
    }

    #[test]
    fn update_moves_between_buckets() {
        let old = tx(1, 10, "BTC");
        let new = tx(1, 20, "BTC");
        let mut index = FieldIndex::new(Field::UserId);
        index.insert(&old);
        index.update(&old, &new);

        assert!(index.lookup(&UserId::new(10).into()).is_none());
        assert!(index
            .lookup(&UserId::new(20).into())
            .unwrap()
            .contains(&TransactionId::new(1)));
    }

    #[test]
    fn clear_keeps_fields() {
        let mut set = IndexSet::new(&[Field::UserId]);
        set.insert(&tx(1, 10, "BTC"));
        set.clear();
        assert!(set.covers(Field::UserId));
        assert_eq!(set.get(Field::UserId).unwrap().entry_count(), 0);
    }
}
