//! # Handle Registry
//!
//! Ownership table for every callback handed to the host.
//!
//! The host owns the [`CallbackHandle`] it was given and may invoke it at most once.
//! The registry keeps a revocation entry per live handle, keyed by the observer that
//! created it. When an observer reaches `Stopped` its whole entry is removed and every
//! callback it still had outstanding is revoked: a later invocation by the host is a
//! no-op instead of running continuation code for a dead observer.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::observability::MonitorMetrics;

/// Identifier of a registered callback
pub type HandleId = u64;

/// The observers that own callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObserverId {
    Clock,
    Viewport,
    Clipboard,
    Media,
    Meter,
    Battery,
    Location,
}

impl ObserverId {
    /// Every observer, in bootstrap order
    pub const ALL: [ObserverId; 7] = [
        ObserverId::Clock,
        ObserverId::Viewport,
        ObserverId::Clipboard,
        ObserverId::Media,
        ObserverId::Meter,
        ObserverId::Battery,
        ObserverId::Location,
    ];

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ObserverId::Clock => "clock",
            ObserverId::Viewport => "viewport",
            ObserverId::Clipboard => "clipboard",
            ObserverId::Media => "media",
            ObserverId::Meter => "meter",
            ObserverId::Battery => "battery",
            ObserverId::Location => "location",
        }
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

type Continuation<T> = Box<dyn FnOnce(T) + Send>;

/// Type-erased view of a callback slot
trait Revoke: Send + Sync {
    /// Drop the continuation. Returns true if it had not fired yet.
    fn revoke(&self) -> bool;
}

struct Slot<T> {
    continuation: Mutex<Option<Continuation<T>>>,
}

impl<T> Slot<T> {
    fn take(&self) -> Option<Continuation<T>> {
        self.continuation.lock().ok().and_then(|mut c| c.take())
    }
}

impl<T: 'static> Revoke for Slot<T> {
    fn revoke(&self) -> bool {
        self.take().is_some()
    }
}

/// Ownership table of live callback handles
pub struct HandleRegistry {
    next_id: AtomicU64,
    owners: Mutex<HashMap<ObserverId, HashMap<HandleId, Arc<dyn Revoke>>>>,
    metrics: Arc<MonitorMetrics>,
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(Arc::new(MonitorMetrics::new()))
    }
}

impl HandleRegistry {
    /// Create an empty registry reporting into `metrics`
    pub fn new(metrics: Arc<MonitorMetrics>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            owners: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Register a continuation owned by `owner` and return the handle to give the host
    pub fn register<T, F>(self: &Arc<Self>, owner: ObserverId, continuation: F) -> CallbackHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot {
            continuation: Mutex::new(Some(Box::new(continuation) as Continuation<T>)),
        });

        if let Ok(mut owners) = self.owners.lock() {
            owners
                .entry(owner)
                .or_default()
                .insert(id, slot.clone() as Arc<dyn Revoke>);
        }
        self.metrics.increment_handles_registered();

        CallbackHandle {
            id,
            owner,
            slot: Some(slot),
            registry: Arc::downgrade(self),
        }
    }

    /// Release one handle. Returns true if it was still registered.
    pub fn release(&self, owner: ObserverId, id: HandleId) -> bool {
        let removed = self.owners.lock().ok().and_then(|mut owners| {
            let handles = owners.get_mut(&owner)?;
            let slot = handles.remove(&id);
            if handles.is_empty() {
                owners.remove(&owner);
            }
            slot
        });

        match removed {
            Some(slot) => {
                slot.revoke();
                self.metrics.add_handles_released(1);
                true
            }
            None => false,
        }
    }

    /// Remove the owner's entry, revoking everything it still holds.
    ///
    /// Called exactly when the owning observer transitions to `Stopped`.
    pub fn release_owner(&self, owner: ObserverId) -> usize {
        let removed = self
            .owners
            .lock()
            .ok()
            .and_then(|mut owners| owners.remove(&owner))
            .unwrap_or_default();

        for slot in removed.values() {
            slot.revoke();
        }
        let count = removed.len();
        self.metrics.add_handles_released(count as u64);
        count
    }

    /// Drain the whole table (final teardown step)
    pub fn release_all(&self) -> usize {
        let drained: Vec<_> = self
            .owners
            .lock()
            .map(|mut owners| owners.drain().collect())
            .unwrap_or_default();

        let mut count = 0;
        for (_, handles) in drained {
            for slot in handles.values() {
                slot.revoke();
            }
            count += handles.len();
        }
        self.metrics.add_handles_released(count as u64);
        count
    }

    /// Number of live handles across all owners
    pub fn live_count(&self) -> usize {
        self.owners
            .lock()
            .map(|owners| owners.values().map(HashMap::len).sum::<usize>())
            .unwrap_or(0)
    }

    /// Number of live handles held by one owner
    pub fn live_for(&self, owner: ObserverId) -> usize {
        self.owners
            .lock()
            .ok()
            .and_then(|owners| owners.get(&owner).map(HashMap::len))
            .unwrap_or(0)
    }
}

/// A registered continuation, owned by the host until it fires.
///
/// Invoking consumes the handle. Dropping it without invoking releases the registry
/// entry, which is what happens to the unused branch of a settled completion.
pub struct CallbackHandle<T> {
    id: HandleId,
    owner: ObserverId,
    slot: Option<Arc<Slot<T>>>,
    registry: Weak<HandleRegistry>,
}

impl<T> fmt::Debug for CallbackHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .finish()
    }
}

impl<T> CallbackHandle<T> {
    /// Handle id
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Owning observer
    pub fn owner(&self) -> ObserverId {
        self.owner
    }

    /// Run the continuation with `value`.
    ///
    /// The registry entry is released before the continuation runs. Returns false if
    /// the handle had been revoked (its observer stopped), in which case nothing runs.
    pub fn invoke(mut self, value: T) -> bool {
        let continuation = self.slot.take().and_then(|slot| slot.take());
        self.release_entry();
        match continuation {
            Some(continuation) => {
                continuation(value);
                true
            }
            None => false,
        }
    }

    /// True if the continuation can still fire
    pub fn is_live(&self) -> bool {
        self.slot
            .as_ref()
            .and_then(|slot| slot.continuation.lock().ok().map(|c| c.is_some()))
            .unwrap_or(false)
    }

    fn release_entry(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.owner, self.id);
        }
    }
}

impl<T> Drop for CallbackHandle<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.take();
            self.release_entry();
        }
    }
}
