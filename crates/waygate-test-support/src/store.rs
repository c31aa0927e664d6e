//! In-memory `SessionSnapshotStore`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use waygate_core::ports::SessionSnapshotStore;
use waygate_core::types::{FieldValue, SessionField};

/// Snapshot store backed by a map. Missing fields read as `Unset`.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    fields: Mutex<BTreeMap<SessionField, FieldValue>>,
}

impl InMemorySnapshotStore {
    /// Returns a copy of every field that holds a value.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fields(&self) -> BTreeMap<SessionField, FieldValue> {
        self.fields
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, value)| **value != FieldValue::Unset)
            .map(|(field, value)| (*field, value.clone()))
            .collect()
    }
}

impl SessionSnapshotStore for InMemorySnapshotStore {
    fn get(&self, field: SessionField) -> FieldValue {
        self.fields
            .lock()
            .unwrap()
            .get(&field)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&self, field: SessionField, value: FieldValue) {
        self.fields.lock().unwrap().insert(field, value);
    }
}
