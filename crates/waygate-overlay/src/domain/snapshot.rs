//! Frozen host session fields.

use std::collections::BTreeMap;

use serde::Serialize;
use waygate_core::ports::SessionSnapshotStore;
use waygate_core::types::{FieldValue, SessionField};

/// Prior values of the host fields the overlay may overwrite.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionFieldSnapshot {
    fields: BTreeMap<SessionField, FieldValue>,
}

impl SessionFieldSnapshot {
    /// Reads every snapshot field from `store`.
    #[must_use]
    pub fn capture(store: &dyn SessionSnapshotStore) -> Self {
        let fields = SessionField::ALL
            .into_iter()
            .map(|field| (field, store.get(field)))
            .collect();
        Self { fields }
    }

    /// The captured value of `field`.
    #[must_use]
    pub fn get(&self, field: SessionField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Writes every captured field back, including fields that were unset.
    pub fn restore(&self, store: &dyn SessionSnapshotStore) {
        for (field, value) in &self.fields {
            store.set(*field, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use waygate_core::types::Vec3;
    use waygate_test_support::InMemorySnapshotStore;

    use super::*;

    #[test]
    fn test_restore_writes_back_captured_values() {
        // Arrange
        let store = InMemorySnapshotStore::default();
        store.set(SessionField::RespawnScene, FieldValue::Text("town".into()));
        store.set(SessionField::Position, FieldValue::Position(Vec3::new(3.0, 4.0, 0.0)));
        let snapshot = SessionFieldSnapshot::capture(&store);
        store.set(SessionField::RespawnScene, FieldValue::Text("overlay-1".into()));
        store.set(SessionField::HazardRespawnOverride, FieldValue::Flag(true));

        // Act
        snapshot.restore(&store);

        // Assert
        assert_eq!(
            store.get(SessionField::RespawnScene),
            FieldValue::Text("town".into())
        );
        assert_eq!(store.get(SessionField::HazardRespawnOverride), FieldValue::Unset);
        assert_eq!(
            store.get(SessionField::Position),
            FieldValue::Position(Vec3::new(3.0, 4.0, 0.0))
        );
    }
}
