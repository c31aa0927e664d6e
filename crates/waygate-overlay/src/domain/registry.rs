//! Interaction points disabled while the overlay is active.

use std::collections::BTreeSet;

use waygate_core::types::ObjectHandle;

/// Handles the controller disabled on entry and must re-enable on cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledInteractions {
    handles: BTreeSet<ObjectHandle>,
}

impl DisabledInteractions {
    /// Records a disabled handle.
    pub fn insert(&mut self, handle: ObjectHandle) {
        self.handles.insert(handle);
    }

    /// Number of recorded handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Empties the registry, returning what it held in handle order.
    pub fn drain(&mut self) -> Vec<ObjectHandle> {
        std::mem::take(&mut self.handles).into_iter().collect()
    }
}

impl Extend<ObjectHandle> for DisabledInteractions {
    fn extend<T: IntoIterator<Item = ObjectHandle>>(&mut self, iter: T) {
        self.handles.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_registry() {
        let mut registry = DisabledInteractions::default();
        registry.extend([ObjectHandle(3), ObjectHandle(1), ObjectHandle(3)]);

        let drained = registry.drain();

        assert_eq!(drained, vec![ObjectHandle(1), ObjectHandle(3)]);
        assert!(registry.is_empty());
        assert!(registry.drain().is_empty());
    }
}
