use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    CbvSrvUav,
    Sampler,
    Rtv,
    Dsv,
}

/// One element of a descriptor heap. POD so it can live in recorded
/// bytecode and be compared across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DescriptorSlot {
    pub heap: DescriptorHeapHandle,
    pub index: u32,
}

impl DescriptorSlot {
    pub fn is_valid(&self) -> bool {
        self.heap.is_valid()
    }
}

/// Clearing a UAV requires both a shader-visible and a CPU-visible
/// descriptor for the same subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UavClearInfo {
    pub shader_visible: DescriptorSlot,
    pub cpu_visible: DescriptorSlot,
    pub resource: ResourceHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHeapDesc {
    pub kind: DescriptorHeapKind,
    pub capacity: u32,
    pub shader_visible: bool,
}

pub trait DescriptorHeap: Send + Sync {
    fn desc(&self) -> &DescriptorHeapDesc;
    fn handle(&self) -> DescriptorHeapHandle;
}
