use super::*;

/// Minimum interface revision the graph was written against. Backends
/// report theirs; anything older is rejected at construction.
pub const GPU_API_VERSION: u32 = 1;

pub trait GpuBackend: 'static + Sized {
    type Device: Device<Self> + Send + Sync;
    type Queue: Queue<Self> + Send + Sync;
    type CommandAllocator: CommandAllocator + Send;
    type CommandList: CommandList<Self> + Send;
    type Timeline: Timeline + Send + Sync;
    type Resource: Resource + Send + Sync + PartialEq;
    type Heap: Send + Sync;
    type QueryPool: QueryPool + Send + Sync;
    type Pipeline: Pipeline + Send + Sync;
    type PipelineLayout: PipelineLayout + Send + Sync;
    type DescriptorHeap: DescriptorHeap + Send + Sync;
    type CommandSignature: CommandSignature + Send + Sync;
    type Sampler: Sampler + Send + Sync;
    type Swapchain: Swapchain<Self> + Send + Sync;

    fn name() -> &'static str;
    fn api_version() -> u32;

    fn is_supported() -> bool {
        Self::api_version() >= GPU_API_VERSION
    }
}
