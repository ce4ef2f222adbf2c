//! In-memory record store keyed by pay period.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::models::payslip::{PayPeriod, PayslipRecord};

/// One current record per period; reprocessing a period replaces its record.
///
/// Keys are canonical `YYYY-MM` strings, so iteration is in period order.
/// The `unknown` sentinel sorts after every dated period.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: BTreeMap<String, PayslipRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record for the same period.
    ///
    /// Returns the replaced record.
    pub fn upsert(&mut self, record: PayslipRecord) -> Option<PayslipRecord> {
        let key = record.key();
        let previous = self.records.insert(key.clone(), record);
        if previous.is_some() {
            debug!("Replaced record for {}", key);
        }
        previous
    }

    /// Current record for a period.
    pub fn get(&self, period: &PayPeriod) -> Option<&PayslipRecord> {
        self.records.get(&period.key())
    }

    /// All records, ordered by period key ascending.
    pub fn list_all(&self) -> Vec<&PayslipRecord> {
        self.records.values().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the store, returning records in period order.
    pub fn into_records(self) -> Vec<PayslipRecord> {
        self.records.into_values().collect()
    }
}

impl Extend<PayslipRecord> for RecordStore {
    fn extend<T: IntoIterator<Item = PayslipRecord>>(&mut self, iter: T) {
        for record in iter {
            self.upsert(record);
        }
    }
}

impl FromIterator<PayslipRecord> for RecordStore {
    fn from_iter<T: IntoIterator<Item = PayslipRecord>>(iter: T) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

/// A [`RecordStore`] shared between workers. Only `upsert` takes the lock
/// for writing; extraction itself runs unlocked.
#[derive(Debug, Clone, Default)]
pub struct SharedRecordStore {
    inner: Arc<Mutex<RecordStore>>,
}

impl SharedRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordStore> {
        // Upsert never leaves partial state, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record, replacing any record for the same period.
    pub fn upsert(&self, record: PayslipRecord) -> Option<PayslipRecord> {
        self.lock().upsert(record)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current records, in period order.
    pub fn snapshot(&self) -> Vec<PayslipRecord> {
        self.lock().list_all().into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payslip::{assemble, RecordParts};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn record(year: i32, month: u32, net: i64) -> PayslipRecord {
        let mut parts = RecordParts::new(PayPeriod::new(year, month).unwrap());
        parts.net_amount = Some(Decimal::from(net));
        assemble(parts)
    }

    #[test]
    fn test_upsert_replaces_same_period() {
        let mut store = RecordStore::new();
        assert!(store.upsert(record(2024, 3, 800_000)).is_none());

        let replaced = store.upsert(record(2024, 3, 810_000)).unwrap();
        assert_eq!(replaced.net_amount, Some(Decimal::from(800_000)));

        assert_eq!(store.len(), 1);
        let current = store.get(&PayPeriod::new(2024, 3).unwrap()).unwrap();
        assert_eq!(current.net_amount, Some(Decimal::from(810_000)));
    }

    #[test]
    fn test_list_all_in_period_order() {
        let store: RecordStore = vec![
            record(2024, 2, 1),
            assemble(RecordParts::new(PayPeriod::unknown())),
            record(2023, 12, 2),
            record(2024, 1, 3),
        ]
        .into_iter()
        .collect();

        let keys: Vec<String> = store.list_all().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["2023-12", "2024-01", "2024-02", "unknown"]);
    }

    #[test]
    fn test_get_missing_period() {
        let store = RecordStore::new();
        assert!(store.is_empty());
        assert!(store.get(&PayPeriod::new(2024, 1).unwrap()).is_none());
    }

    #[test]
    fn test_shared_store_across_threads() {
        let store = SharedRecordStore::new();

        let handles: Vec<_> = (1..=12)
            .map(|month| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.upsert(record(2024, month, 100));
                    store.upsert(record(2024, month, 200));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = store.snapshot();
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|r| r.net_amount == Some(Decimal::from(200))));
        assert_eq!(records[0].key(), "2024-01");
    }
}
