//! Scripted `ContentLoader`.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use waygate_core::error::OverlayError;
use waygate_core::ports::ContentLoader;
use waygate_core::types::{ContentHandle, ContentId};

/// How the next loads behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Complete immediately.
    Ready,
    /// Complete after the given delay.
    Delayed(Duration),
    /// Never complete.
    Never,
    /// Fail with the given reason.
    Fail(String),
}

#[derive(Debug)]
struct LoaderState {
    behavior: LoadBehavior,
    resident: BTreeMap<ContentId, ContentHandle>,
    next_handle: u64,
    loads: Vec<ContentId>,
    unloads: Vec<ContentHandle>,
}

/// A loader whose behavior is set by the test. Resident content keeps its
/// handle across repeated loads.
#[derive(Debug)]
pub struct ScriptedContentLoader {
    state: Mutex<LoaderState>,
}

impl Default for ScriptedContentLoader {
    fn default() -> Self {
        Self::new(LoadBehavior::Ready)
    }
}

impl ScriptedContentLoader {
    /// Creates a loader with the given behavior.
    #[must_use]
    pub fn new(behavior: LoadBehavior) -> Self {
        Self {
            state: Mutex::new(LoaderState {
                behavior,
                resident: BTreeMap::new(),
                next_handle: 0,
                loads: Vec::new(),
                unloads: Vec::new(),
            }),
        }
    }

    /// Changes the behavior of subsequent loads.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_behavior(&self, behavior: LoadBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }

    /// Every content id passed to `load`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn loads(&self) -> Vec<ContentId> {
        self.state.lock().unwrap().loads.clone()
    }

    /// Every handle passed to `unload`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn unloads(&self) -> Vec<ContentHandle> {
        self.state.lock().unwrap().unloads.clone()
    }

    /// Whether `content_id` is currently resident.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_resident(&self, content_id: &ContentId) -> bool {
        self.state.lock().unwrap().resident.contains_key(content_id)
    }
}

#[async_trait]
impl ContentLoader for ScriptedContentLoader {
    async fn load(&self, content_id: &ContentId) -> Result<ContentHandle, OverlayError> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.loads.push(content_id.clone());
            state.behavior.clone()
        };

        match behavior {
            LoadBehavior::Ready => {}
            LoadBehavior::Delayed(delay) => tokio::time::sleep(delay).await,
            LoadBehavior::Never => std::future::pending::<()>().await,
            LoadBehavior::Fail(reason) => {
                return Err(OverlayError::LoadFailed {
                    content_id: content_id.clone(),
                    reason,
                });
            }
        }

        let mut state = self.state.lock().unwrap();
        if let Some(handle) = state.resident.get(content_id) {
            return Ok(*handle);
        }
        state.next_handle += 1;
        let handle = ContentHandle(state.next_handle);
        state.resident.insert(content_id.clone(), handle);
        Ok(handle)
    }

    async fn unload(&self, handle: ContentHandle) {
        let mut state = self.state.lock().unwrap();
        state.unloads.push(handle);
        state.resident.retain(|_, resident| *resident != handle);
    }
}
