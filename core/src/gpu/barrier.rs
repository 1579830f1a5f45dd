use super::*;

/// Enhanced-barrier record for one texture subresource range. `discard` is
/// set when the previous layout was undefined and the contents may be
/// dropped during the transition.
pub struct TextureBarrier<'a, B: GpuBackend> {
    pub texture: &'a B::Resource,
    pub range: SubresourceRange,
    pub old_sync: ResourceSync,
    pub new_sync: ResourceSync,
    pub old_access: ResourceAccess,
    pub new_access: ResourceAccess,
    pub old_layout: ResourceLayout,
    pub new_layout: ResourceLayout,
    pub discard: bool,
    pub queue_ownership: Option<QueueOwnershipTransfer>,
}

pub struct BufferBarrier<'a, B: GpuBackend> {
    pub buffer: &'a B::Resource,
    pub offset: u64,
    pub length: u64,
    pub old_sync: ResourceSync,
    pub new_sync: ResourceSync,
    pub old_access: ResourceAccess,
    pub new_access: ResourceAccess,
    pub queue_ownership: Option<QueueOwnershipTransfer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalBarrier {
    pub old_sync: ResourceSync,
    pub new_sync: ResourceSync,
    pub old_access: ResourceAccess,
    pub new_access: ResourceAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueOwnershipTransfer {
    pub from: QueueKind,
    pub to: QueueKind,
}

/// One flush of coalesced barriers handed to `CommandList::barriers`.
pub struct BarrierBatch<'a, B: GpuBackend> {
    pub textures: Vec<TextureBarrier<'a, B>>,
    pub buffers: Vec<BufferBarrier<'a, B>>,
    pub globals: Vec<GlobalBarrier>,
}

impl<'a, B: GpuBackend> Default for BarrierBatch<'a, B> {
    fn default() -> Self {
        Self {
            textures: Vec::new(),
            buffers: Vec::new(),
            globals: Vec::new(),
        }
    }
}

impl<'a, B: GpuBackend> BarrierBatch<'a, B> {
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.buffers.is_empty() && self.globals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.textures.len() + self.buffers.len() + self.globals.len()
    }
}
