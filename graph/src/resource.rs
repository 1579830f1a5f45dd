use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use basalt_core::gpu::{GpuBackend, Resource as GpuResource, ResourceDesc, ResourceState};
use parking_lot::Mutex;
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::tracker::StateTracker;

static NEXT_GLOBAL_ID: AtomicU64 = AtomicU64::new(1);

/// A graph-managed resource: the backend object plus everything the
/// compiler needs to reason about it. The tracker is only ever mutated by
/// the compiling thread; the mutex exists because resources are shared
/// through `Arc` with passes and providers.
pub struct GraphResource<B: GpuBackend> {
    backend: B::Resource,
    global_id: u64,
    name: Option<SmartString>,
    aliases: Mutex<SmallVec<[u64; 4]>>,
    tracker: Mutex<StateTracker>,
}

impl<B: GpuBackend> GraphResource<B> {
    pub fn new(backend: B::Resource, name: Option<&str>) -> Arc<Self> {
        let desc = backend.desc();
        let tracker = if desc.is_buffer() {
            StateTracker::for_buffer(ResourceState::initial())
        } else {
            StateTracker::new(desc.mip_levels, desc.array_size, ResourceState::initial())
        };
        Arc::new(Self {
            backend,
            global_id: NEXT_GLOBAL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.map(SmartString::from),
            aliases: Mutex::new(SmallVec::new()),
            tracker: Mutex::new(tracker),
        })
    }

    pub fn backend(&self) -> &B::Resource {
        &self.backend
    }

    pub fn desc(&self) -> &ResourceDesc {
        self.backend.desc()
    }

    pub fn global_id(&self) -> u64 {
        self.global_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mip_count(&self) -> u32 {
        let desc = self.desc();
        if desc.is_buffer() {
            1
        } else {
            desc.mip_levels
        }
    }

    pub fn slice_count(&self) -> u32 {
        let desc = self.desc();
        if desc.is_buffer() {
            1
        } else {
            desc.array_size
        }
    }

    /// Marks two resources as sharing memory. Alias links are symmetric;
    /// connected components are rebuilt at structural compile time.
    pub fn add_alias(&self, other: &GraphResource<B>) {
        let mut own = self.aliases.lock();
        if !own.contains(&other.global_id) {
            own.push(other.global_id);
        }
        drop(own);
        let mut theirs = other.aliases.lock();
        if !theirs.contains(&self.global_id) {
            theirs.push(self.global_id);
        }
    }

    pub fn alias_ids(&self) -> SmallVec<[u64; 4]> {
        self.aliases.lock().clone()
    }

    pub fn tracker(&self) -> &Mutex<StateTracker> {
        &self.tracker
    }
}
