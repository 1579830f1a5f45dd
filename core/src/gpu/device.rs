use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureInfo {
    pub mesh_shaders: bool,
    pub raytracing: bool,
    pub enhanced_barriers: bool,
    pub pipeline_statistics: bool,
    pub async_compute: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VideoMemoryInfo {
    pub budget: u64,
    pub current_usage: u64,
    pub available_for_reservation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FootprintRange {
    pub first_subresource: u32,
    pub count: u32,
    pub base_offset: u64,
}

/// Device factory and service surface. Destruction goes through a deletion
/// queue so GPU work still referencing an object completes before the
/// backing allocation is released.
pub trait Device<B: GpuBackend>: Send + Sync {
    unsafe fn create_resource(
        &self,
        desc: &ResourceDesc,
        name: Option<&str>,
    ) -> Result<B::Resource, GpuError>;
    unsafe fn create_placed_resource(
        &self,
        heap: &B::Heap,
        offset: u64,
        desc: &ResourceDesc,
        name: Option<&str>,
    ) -> Result<B::Resource, GpuError>;
    unsafe fn destroy_resource(&self, resource: B::Resource);

    unsafe fn create_heap(&self, size: u64, kind: HeapKind) -> Result<B::Heap, GpuError>;
    unsafe fn create_timeline(&self, initial_value: u64) -> Result<B::Timeline, GpuError>;
    unsafe fn create_command_allocator(
        &self,
        kind: QueueKind,
    ) -> Result<B::CommandAllocator, GpuError>;
    unsafe fn create_command_list(&self, kind: QueueKind) -> Result<B::CommandList, GpuError>;
    unsafe fn create_query_pool(&self, desc: &QueryPoolDesc) -> Result<B::QueryPool, GpuError>;
    unsafe fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<B::DescriptorHeap, GpuError>;
    unsafe fn create_sampler(&self, desc: &SamplerDesc) -> Result<B::Sampler, GpuError>;
    unsafe fn create_command_signature(
        &self,
        desc: &CommandSignatureDesc,
    ) -> Result<B::CommandSignature, GpuError>;

    fn queue(&self, kind: QueueKind) -> Option<&B::Queue>;

    unsafe fn wait_idle(&self) -> Result<(), GpuError>;
    unsafe fn flush_deletion_queue(&self, completed_frame: u64);

    unsafe fn resource_allocation_info(&self, desc: &ResourceDesc) -> ResourceAllocationInfo;
    unsafe fn copyable_footprints(
        &self,
        desc: &ResourceDesc,
        range: &FootprintRange,
        out: &mut [CopyableFootprint],
    ) -> u64;

    fn feature_info(&self) -> FeatureInfo;
    unsafe fn video_memory_info(&self) -> VideoMemoryInfo;
    unsafe fn set_residency_priority(&self, resource: &B::Resource, priority: ResidencyPriority);

    /// Timestamp ticks per second for converting query results.
    fn timestamp_frequency(&self, kind: QueueKind) -> u64;

    /// Populated once after a device-lost error has been observed.
    unsafe fn device_lost_report(&self) -> Option<DeviceLostReport>;
}
