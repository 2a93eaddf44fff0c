//! GPU resource ownership
//!
//! Every geometry, material, and texture is wrapped in an [`Owned`] handle
//! acquired from the [`ResourceLedger`]. The handle is the single owner of the
//! resource: it cannot be cloned, and dropping it releases the resource exactly
//! once. Releases are counted per kind and queued so the renderer bridge can
//! free the matching GPU-side objects.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

impl ResourceKind {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            ResourceKind::Geometry => 0,
            ResourceKind::Material => 1,
            ResourceKind::Texture => 2,
        }
    }
}

/// Identity of one allocation; never reused within a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// Values that stand in for a GPU-resident allocation
pub trait GpuResource {
    const KIND: ResourceKind;
}

/// A release notification for the renderer bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub id: ResourceId,
    pub kind: ResourceKind,
}

struct LedgerShared {
    next_id: AtomicU64,
    acquired: [AtomicU64; ResourceKind::COUNT],
    released: [AtomicU64; ResourceKind::COUNT],
    release_tx: mpsc::UnboundedSender<Released>,
}

impl LedgerShared {
    fn release(&self, id: ResourceId, kind: ResourceKind) {
        self.released[kind.index()].fetch_add(1, Ordering::SeqCst);
        trace!("Released {:?} {}", kind, id);
        // The receiver is gone once the ledger itself is dropped
        let _ = self.release_tx.send(Released { id, kind });
    }
}

/// Owning handle; dropping it disposes the resource
pub struct Owned<T: GpuResource> {
    id: ResourceId,
    value: T,
    ledger: Arc<LedgerShared>,
}

impl<T: GpuResource> Owned<T> {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        T::KIND
    }
}

impl<T: GpuResource> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: GpuResource> DerefMut for Owned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: GpuResource> Drop for Owned<T> {
    fn drop(&mut self) {
        self.ledger.release(self.id, T::KIND);
    }
}

impl<T: GpuResource + fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

/// Live and lifetime counts per resource kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub live_geometries: u64,
    pub live_materials: u64,
    pub live_textures: u64,
    pub total_acquired: u64,
    pub total_released: u64,
}

impl LedgerStats {
    pub fn live(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Geometry => self.live_geometries,
            ResourceKind::Material => self.live_materials,
            ResourceKind::Texture => self.live_textures,
        }
    }
}

/// Allocator and accountant for GPU resources
pub struct ResourceLedger {
    shared: Arc<LedgerShared>,
    release_rx: Mutex<mpsc::UnboundedReceiver<Released>>,
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceLedger {
    pub fn new() -> Self {
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(LedgerShared {
                next_id: AtomicU64::new(1),
                acquired: Default::default(),
                released: Default::default(),
                release_tx,
            }),
            release_rx: Mutex::new(release_rx),
        }
    }

    /// Take ownership of a freshly built resource
    pub fn acquire<T: GpuResource>(&self, value: T) -> Owned<T> {
        let id = ResourceId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared.acquired[T::KIND.index()].fetch_add(1, Ordering::SeqCst);
        trace!("Acquired {:?} {}", T::KIND, id);
        Owned {
            id,
            value,
            ledger: Arc::clone(&self.shared),
        }
    }

    pub fn stats(&self) -> LedgerStats {
        let count = |counters: &[AtomicU64; ResourceKind::COUNT], kind: ResourceKind| {
            counters[kind.index()].load(Ordering::SeqCst)
        };
        let live = |kind| count(&self.shared.acquired, kind) - count(&self.shared.released, kind);

        let total = |counters: &[AtomicU64; ResourceKind::COUNT]| {
            counters.iter().map(|c| c.load(Ordering::SeqCst)).sum::<u64>()
        };

        LedgerStats {
            live_geometries: live(ResourceKind::Geometry),
            live_materials: live(ResourceKind::Material),
            live_textures: live(ResourceKind::Texture),
            total_acquired: total(&self.shared.acquired),
            total_released: total(&self.shared.released),
        }
    }

    /// Releases since the last drain, in release order
    pub fn drain_released(&self) -> Vec<Released> {
        let mut drained = Vec::new();
        if let Ok(mut rx) = self.release_rx.lock() {
            while let Ok(released) = rx.try_recv() {
                drained.push(released);
            }
        }
        drained
    }
}
