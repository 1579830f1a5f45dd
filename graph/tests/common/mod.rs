//! Recording null backend: implements the RHI traits without a GPU and
//! appends every command-list and queue call to a shared log so tests can
//! assert ordering and arguments.

#![allow(dead_code)]

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use basalt_core::gpu::*;
use basalt_graph::{
    DescriptorSource, GraphPass, GraphResult, GraphResource, ImmediateContext, RenderContext,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListBegin,
    ListFinish,
    TextureBarrier {
        resource: String,
        range: SubresourceRange,
        old: (ResourceAccess, ResourceLayout, ResourceSync),
        new: (ResourceAccess, ResourceLayout, ResourceSync),
        discard: bool,
    },
    BufferBarrier {
        resource: String,
        old: (ResourceAccess, ResourceSync),
        new: (ResourceAccess, ResourceSync),
    },
    CopyBufferRegion {
        src: String,
        dst: String,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    },
    CopyTextureRegion {
        src: String,
        dst: String,
        src_sub: Subresource,
        dst_sub: Subresource,
        extent: (u32, u32, u32),
    },
    CopyTextureToBuffer {
        texture: String,
        buffer: String,
        sub: Subresource,
    },
    CopyBufferToTexture {
        texture: String,
        buffer: String,
        sub: Subresource,
    },
    ClearRtv {
        slot: DescriptorSlot,
        color: [f32; 4],
    },
    ClearDsv {
        slot: DescriptorSlot,
        clear_depth: bool,
        depth: f32,
        clear_stencil: bool,
        stencil: u8,
    },
    ClearUavU32 {
        resource: ResourceHandle,
        values: [u32; 4],
    },
    ClearUavF32 {
        resource: ResourceHandle,
        values: [f32; 4],
    },
    Draw,
    Dispatch,
    Submit {
        queue: QueueKind,
        waits: Vec<u64>,
        signals: Vec<u64>,
    },
    QueueSignal {
        queue: QueueKind,
        value: u64,
    },
    QueueWait {
        queue: QueueKind,
        value: u64,
    },
    WriteTimestamp {
        index: u32,
    },
    BeginQuery {
        index: u32,
    },
    EndQuery {
        index: u32,
    },
    ResolveQueryData {
        first: u32,
        count: u32,
    },
    BeginLabel(String),
    EndLabel,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn drain(log: &CallLog) -> Vec<Call> {
    std::mem::take(&mut *log.lock().unwrap())
}

pub enum NullBackend {}

impl GpuBackend for NullBackend {
    type Device = NullDevice;
    type Queue = NullQueue;
    type CommandAllocator = NullCommandAllocator;
    type CommandList = NullCommandList;
    type Timeline = NullTimeline;
    type Resource = NullResource;
    type Heap = NullHeap;
    type QueryPool = NullQueryPool;
    type Pipeline = NullPipeline;
    type PipelineLayout = NullPipelineLayout;
    type DescriptorHeap = NullDescriptorHeap;
    type CommandSignature = NullCommandSignature;
    type Sampler = NullSampler;
    type Swapchain = NullSwapchain;

    fn name() -> &'static str {
        "null"
    }

    fn api_version() -> u32 {
        GPU_API_VERSION
    }
}

pub struct NullResource {
    pub name: String,
    desc: ResourceDesc,
    handle: ResourceHandle,
    storage: UnsafeCell<Vec<u8>>,
}

unsafe impl Send for NullResource {}
unsafe impl Sync for NullResource {}

impl PartialEq for NullResource {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Resource for NullResource {
    fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    fn handle(&self) -> ResourceHandle {
        self.handle
    }

    unsafe fn map(&self, offset: u64, length: u64) -> Option<*mut u8> {
        let storage = &mut *self.storage.get();
        let needed = (offset + length) as usize;
        if storage.len() < needed {
            storage.resize(needed, 0);
        }
        Some(storage.as_mut_ptr().add(offset as usize))
    }

    unsafe fn unmap(&self, _offset: u64, _length: u64) {}
}

pub struct NullTimeline {
    value: AtomicU64,
}

impl Timeline for NullTimeline {
    unsafe fn completed_value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    unsafe fn host_wait(&self, _value: u64, _timeout_ns: Option<u64>) -> Result<(), GpuError> {
        Ok(())
    }
}

impl NullTimeline {
    fn advance(&self, value: u64) {
        self.value.fetch_max(value, Ordering::SeqCst);
    }
}

pub struct NullQueue {
    kind: QueueKind,
    log: CallLog,
    fail_submits: Arc<std::sync::atomic::AtomicBool>,
}

impl Queue<NullBackend> for NullQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    unsafe fn submit(&self, submission: &Submission<NullBackend>) -> Result<(), GpuError> {
        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(GpuError::DeviceRemoved);
        }
        let waits = submission.waits.iter().map(|p| p.value).collect();
        let signals: Vec<u64> = submission.signals.iter().map(|p| p.value).collect();
        self.log.lock().unwrap().push(Call::Submit {
            queue: self.kind,
            waits,
            signals: signals.clone(),
        });
        // Work completes instantly: signaled values become visible at once.
        for point in submission.signals {
            point.timeline.advance(point.value);
        }
        Ok(())
    }

    unsafe fn signal(&self, point: &TimelinePoint<NullBackend>) -> Result<(), GpuError> {
        self.log.lock().unwrap().push(Call::QueueSignal {
            queue: self.kind,
            value: point.value,
        });
        point.timeline.advance(point.value);
        Ok(())
    }

    unsafe fn wait(&self, point: &TimelinePoint<NullBackend>) -> Result<(), GpuError> {
        self.log.lock().unwrap().push(Call::QueueWait {
            queue: self.kind,
            value: point.value,
        });
        Ok(())
    }
}

pub struct NullCommandAllocator;

impl CommandAllocator for NullCommandAllocator {
    unsafe fn reset(&mut self) -> Result<(), GpuError> {
        Ok(())
    }
}

pub struct NullCommandList {
    log: CallLog,
}

impl NullCommandList {
    fn push(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl CommandList<NullBackend> for NullCommandList {
    unsafe fn begin(&mut self, _allocator: &mut NullCommandAllocator) -> Result<(), GpuError> {
        self.push(Call::ListBegin);
        Ok(())
    }

    unsafe fn finish(&mut self) -> Result<(), GpuError> {
        self.push(Call::ListFinish);
        Ok(())
    }

    unsafe fn begin_pass(&mut self, _info: &PassBeginInfo<NullBackend>) {}
    unsafe fn end_pass(&mut self) {}

    unsafe fn barriers(&mut self, batch: &BarrierBatch<NullBackend>) {
        let mut log = self.log.lock().unwrap();
        for barrier in &batch.textures {
            log.push(Call::TextureBarrier {
                resource: barrier.texture.name.clone(),
                range: barrier.range,
                old: (barrier.old_access, barrier.old_layout, barrier.old_sync),
                new: (barrier.new_access, barrier.new_layout, barrier.new_sync),
                discard: barrier.discard,
            });
        }
        for barrier in &batch.buffers {
            log.push(Call::BufferBarrier {
                resource: barrier.buffer.name.clone(),
                old: (barrier.old_access, barrier.old_sync),
                new: (barrier.new_access, barrier.new_sync),
            });
        }
    }

    unsafe fn bind_layout(&mut self, _layout: &NullPipelineLayout) {}
    unsafe fn bind_pipeline(&mut self, _pipeline: &NullPipeline) {}
    unsafe fn set_descriptor_heaps(
        &mut self,
        _cbv_srv_uav: &NullDescriptorHeap,
        _sampler: Option<&NullDescriptorHeap>,
    ) {
    }
    unsafe fn push_constants(
        &mut self,
        _stages: ShaderStages,
        _set: u32,
        _binding: u32,
        _offset: u32,
        _data: &[u32],
    ) {
    }

    unsafe fn set_viewports(&mut self, _viewports: &[Viewport]) {}
    unsafe fn set_scissors(&mut self, _scissors: &[Scissor]) {}
    unsafe fn set_primitive_topology(&mut self, _topology: PrimitiveTopology) {}
    unsafe fn set_vertex_buffers(&mut self, _buffers: &[(&NullResource, u64)]) {}
    unsafe fn set_index_buffer(
        &mut self,
        _buffer: &NullResource,
        _offset: u64,
        _format: IndexFormat,
    ) {
    }

    unsafe fn draw(
        &mut self,
        _vertices: u32,
        _instances: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.push(Call::Draw);
    }

    unsafe fn draw_indexed(
        &mut self,
        _indices: u32,
        _instances: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.push(Call::Draw);
    }

    unsafe fn dispatch(&mut self, _x: u32, _y: u32, _z: u32) {
        self.push(Call::Dispatch);
    }

    unsafe fn dispatch_mesh(&mut self, _x: u32, _y: u32, _z: u32) {
        self.push(Call::Dispatch);
    }

    unsafe fn execute_indirect(
        &mut self,
        _signature: &NullCommandSignature,
        _args: &NullResource,
        _args_offset: u64,
        _count_buffer: Option<&NullResource>,
        _count_offset: u64,
        _max_count: u32,
    ) {
        self.push(Call::Draw);
    }

    unsafe fn copy_buffer_region(
        &mut self,
        src: &NullResource,
        dst: &NullResource,
        region: &BufferCopyRegion,
    ) {
        self.push(Call::CopyBufferRegion {
            src: src.name.clone(),
            dst: dst.name.clone(),
            src_offset: region.src_offset,
            dst_offset: region.dst_offset,
            size: region.size,
        });
    }

    unsafe fn copy_texture_region(
        &mut self,
        src: &NullResource,
        dst: &NullResource,
        region: &TextureCopyRegion,
    ) {
        self.push(Call::CopyTextureRegion {
            src: src.name.clone(),
            dst: dst.name.clone(),
            src_sub: region.src_subresource,
            dst_sub: region.dst_subresource,
            extent: (
                region.extent.width,
                region.extent.height,
                region.extent.depth,
            ),
        });
    }

    unsafe fn copy_texture_to_buffer(
        &mut self,
        src: &NullResource,
        dst: &NullResource,
        region: &BufferTextureCopyRegion,
    ) {
        self.push(Call::CopyTextureToBuffer {
            texture: src.name.clone(),
            buffer: dst.name.clone(),
            sub: region.texture_subresource,
        });
    }

    unsafe fn copy_buffer_to_texture(
        &mut self,
        src: &NullResource,
        dst: &NullResource,
        region: &BufferTextureCopyRegion,
    ) {
        self.push(Call::CopyBufferToTexture {
            texture: dst.name.clone(),
            buffer: src.name.clone(),
            sub: region.texture_subresource,
        });
    }

    unsafe fn clear_rtv(&mut self, rtv: DescriptorSlot, color: [f32; 4]) {
        self.push(Call::ClearRtv { slot: rtv, color });
    }

    unsafe fn clear_dsv(
        &mut self,
        dsv: DescriptorSlot,
        clear_depth: bool,
        depth: f32,
        clear_stencil: bool,
        stencil: u8,
    ) {
        self.push(Call::ClearDsv {
            slot: dsv,
            clear_depth,
            depth,
            clear_stencil,
            stencil,
        });
    }

    unsafe fn clear_uav_u32(&mut self, info: &UavClearInfo, values: [u32; 4]) {
        self.push(Call::ClearUavU32 {
            resource: info.resource,
            values,
        });
    }

    unsafe fn clear_uav_f32(&mut self, info: &UavClearInfo, values: [f32; 4]) {
        self.push(Call::ClearUavF32 {
            resource: info.resource,
            values,
        });
    }

    unsafe fn begin_query(&mut self, _pool: &NullQueryPool, index: u32) {
        self.push(Call::BeginQuery { index });
    }

    unsafe fn end_query(&mut self, _pool: &NullQueryPool, index: u32) {
        self.push(Call::EndQuery { index });
    }

    unsafe fn write_timestamp(&mut self, _pool: &NullQueryPool, index: u32) {
        self.push(Call::WriteTimestamp { index });
    }

    unsafe fn resolve_query_data(
        &mut self,
        _pool: &NullQueryPool,
        first: u32,
        count: u32,
        _destination: &NullResource,
        _dst_offset: u64,
    ) {
        self.push(Call::ResolveQueryData { first, count });
    }

    unsafe fn reset_queries(&mut self, _pool: &NullQueryPool, _first: u32, _count: u32) {}

    unsafe fn begin_label(&mut self, label: &str) {
        self.push(Call::BeginLabel(label.to_string()));
    }

    unsafe fn end_label(&mut self) {
        self.push(Call::EndLabel);
    }
}

pub struct NullHeap;

pub struct NullQueryPool {
    desc: QueryPoolDesc,
}

impl QueryPool for NullQueryPool {
    fn desc(&self) -> &QueryPoolDesc {
        &self.desc
    }

    fn result_info(&self) -> QueryResultInfo {
        match self.desc.kind {
            QueryKind::Timestamp => QueryResultInfo {
                element_size: 8,
                count: self.desc.count,
            },
            QueryKind::PipelineStatistics => QueryResultInfo {
                element_size: 16,
                count: self.desc.count,
            },
        }
    }

    fn stat_field(&self, stat: PipelineStatFlags) -> Option<PipelineStatField> {
        let byte_offset = if stat == PipelineStatFlags::MESH_INVOCATIONS {
            0
        } else if stat == PipelineStatFlags::MESH_PRIMITIVES {
            8
        } else {
            return None;
        };
        Some(PipelineStatField {
            stat,
            byte_offset,
            supported: self.desc.stats_mask.contains(stat),
        })
    }
}

pub struct NullPipeline {
    kind: PipelineKind,
}

impl Pipeline for NullPipeline {
    fn kind(&self) -> PipelineKind {
        self.kind
    }
}

pub struct NullPipelineLayout {
    desc: PipelineLayoutDesc,
}

impl PipelineLayout for NullPipelineLayout {
    fn desc(&self) -> &PipelineLayoutDesc {
        &self.desc
    }
}

pub struct NullDescriptorHeap {
    desc: DescriptorHeapDesc,
    handle: DescriptorHeapHandle,
}

impl DescriptorHeap for NullDescriptorHeap {
    fn desc(&self) -> &DescriptorHeapDesc {
        &self.desc
    }

    fn handle(&self) -> DescriptorHeapHandle {
        self.handle
    }
}

pub struct NullCommandSignature {
    desc: CommandSignatureDesc,
}

impl CommandSignature for NullCommandSignature {
    fn desc(&self) -> &CommandSignatureDesc {
        &self.desc
    }
}

pub struct NullSampler {
    desc: SamplerDesc,
}

impl Sampler for NullSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

pub struct NullSwapchain {
    desc: SwapchainDesc,
    backbuffer: NullResource,
}

impl Swapchain<NullBackend> for NullSwapchain {
    fn desc(&self) -> &SwapchainDesc {
        &self.desc
    }

    unsafe fn acquire_next_image(&mut self) -> Result<u32, GpuError> {
        Ok(0)
    }

    unsafe fn backbuffer(&self, _index: u32) -> &NullResource {
        &self.backbuffer
    }

    unsafe fn present(&mut self, _queue: &NullQueue) -> Result<PresentStatus, GpuError> {
        Ok(PresentStatus::Ok)
    }
}

pub struct NullDevice {
    pub log: CallLog,
    pub fail_submits: Arc<std::sync::atomic::AtomicBool>,
    graphics_queue: NullQueue,
    compute_queue: Option<NullQueue>,
    next_handle: AtomicU32,
}

impl NullDevice {
    pub fn new(with_compute_queue: bool) -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let fail_submits = Arc::new(std::sync::atomic::AtomicBool::new(false));
        Self {
            graphics_queue: NullQueue {
                kind: QueueKind::Graphics,
                log: log.clone(),
                fail_submits: fail_submits.clone(),
            },
            compute_queue: with_compute_queue.then(|| NullQueue {
                kind: QueueKind::Compute,
                log: log.clone(),
                fail_submits: fail_submits.clone(),
            }),
            next_handle: AtomicU32::new(1),
            log,
            fail_submits,
        }
    }

    fn next_handle(&self) -> ResourceHandle {
        ResourceHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed), 1)
    }
}

impl Device<NullBackend> for NullDevice {
    unsafe fn create_resource(
        &self,
        desc: &ResourceDesc,
        name: Option<&str>,
    ) -> Result<NullResource, GpuError> {
        Ok(NullResource {
            name: name.unwrap_or("<unnamed>").to_string(),
            desc: desc.clone(),
            handle: self.next_handle(),
            storage: UnsafeCell::new(Vec::new()),
        })
    }

    unsafe fn create_placed_resource(
        &self,
        _heap: &NullHeap,
        _offset: u64,
        desc: &ResourceDesc,
        name: Option<&str>,
    ) -> Result<NullResource, GpuError> {
        self.create_resource(desc, name)
    }

    unsafe fn destroy_resource(&self, _resource: NullResource) {}

    unsafe fn create_heap(&self, _size: u64, _kind: HeapKind) -> Result<NullHeap, GpuError> {
        Ok(NullHeap)
    }

    unsafe fn create_timeline(&self, initial_value: u64) -> Result<NullTimeline, GpuError> {
        Ok(NullTimeline {
            value: AtomicU64::new(initial_value),
        })
    }

    unsafe fn create_command_allocator(
        &self,
        _kind: QueueKind,
    ) -> Result<NullCommandAllocator, GpuError> {
        Ok(NullCommandAllocator)
    }

    unsafe fn create_command_list(&self, _kind: QueueKind) -> Result<NullCommandList, GpuError> {
        Ok(NullCommandList {
            log: self.log.clone(),
        })
    }

    unsafe fn create_query_pool(&self, desc: &QueryPoolDesc) -> Result<NullQueryPool, GpuError> {
        Ok(NullQueryPool { desc: *desc })
    }

    unsafe fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<NullDescriptorHeap, GpuError> {
        Ok(NullDescriptorHeap {
            desc: *desc,
            handle: DescriptorHeapHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed), 1),
        })
    }

    unsafe fn create_sampler(&self, desc: &SamplerDesc) -> Result<NullSampler, GpuError> {
        Ok(NullSampler { desc: desc.clone() })
    }

    unsafe fn create_command_signature(
        &self,
        desc: &CommandSignatureDesc,
    ) -> Result<NullCommandSignature, GpuError> {
        Ok(NullCommandSignature { desc: *desc })
    }

    fn queue(&self, kind: QueueKind) -> Option<&NullQueue> {
        match kind {
            QueueKind::Graphics => Some(&self.graphics_queue),
            QueueKind::Compute => self.compute_queue.as_ref(),
            QueueKind::Copy => None,
        }
    }

    unsafe fn wait_idle(&self) -> Result<(), GpuError> {
        Ok(())
    }

    unsafe fn flush_deletion_queue(&self, _completed_frame: u64) {}

    unsafe fn resource_allocation_info(&self, desc: &ResourceDesc) -> ResourceAllocationInfo {
        ResourceAllocationInfo {
            size: if desc.is_buffer() {
                desc.buffer_size()
            } else {
                1 << 20
            },
            alignment: 256,
        }
    }

    unsafe fn copyable_footprints(
        &self,
        desc: &ResourceDesc,
        range: &FootprintRange,
        out: &mut [CopyableFootprint],
    ) -> u64 {
        let row_pitch = desc.extent.width * desc.format.element_size().max(1);
        let mut offset = range.base_offset;
        for footprint in out.iter_mut().take(range.count as usize) {
            *footprint = CopyableFootprint {
                offset,
                format: desc.format,
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
                row_pitch,
            };
            offset += (row_pitch * desc.extent.height) as u64;
        }
        offset
    }

    fn feature_info(&self) -> FeatureInfo {
        FeatureInfo {
            mesh_shaders: true,
            raytracing: false,
            enhanced_barriers: true,
            pipeline_statistics: true,
            async_compute: self.compute_queue.is_some(),
        }
    }

    unsafe fn video_memory_info(&self) -> VideoMemoryInfo {
        VideoMemoryInfo::default()
    }

    unsafe fn set_residency_priority(&self, _resource: &NullResource, _priority: ResidencyPriority) {
    }

    fn timestamp_frequency(&self, _kind: QueueKind) -> u64 {
        1_000_000_000
    }

    unsafe fn device_lost_report(&self) -> Option<DeviceLostReport> {
        None
    }
}

// ---- graph-level helpers ----

pub fn make_buffer(
    device: &NullDevice,
    name: &str,
    size: u64,
    heap: HeapKind,
) -> Arc<GraphResource<NullBackend>> {
    let backend = unsafe {
        device
            .create_resource(&ResourceDesc::buffer(size, heap), Some(name))
            .unwrap()
    };
    GraphResource::new(backend, Some(name))
}

pub fn make_texture(
    device: &NullDevice,
    name: &str,
    mips: u32,
    slices: u32,
) -> Arc<GraphResource<NullBackend>> {
    let backend = unsafe {
        device
            .create_resource(
                &ResourceDesc::texture_2d(Format::R8G8B8A8_UNorm, 256, 256, mips, slices)
                    .with_flags(ResourceFlags::RENDER_TARGET | ResourceFlags::UNORDERED_ACCESS),
                Some(name),
            )
            .unwrap()
    };
    GraphResource::new(backend, Some(name))
}

/// Descriptor source handing out deterministic slots.
pub struct TestDescriptors;

impl DescriptorSource<NullBackend> for TestDescriptors {
    fn rtv(&self, _resource: &GraphResource<NullBackend>, mip: u32, slice: u32) -> Option<DescriptorSlot> {
        Some(DescriptorSlot {
            heap: DescriptorHeapHandle::new(100, 1),
            index: mip * 64 + slice,
        })
    }

    fn dsv(&self, _resource: &GraphResource<NullBackend>, mip: u32, slice: u32) -> Option<DescriptorSlot> {
        Some(DescriptorSlot {
            heap: DescriptorHeapHandle::new(101, 1),
            index: mip * 64 + slice,
        })
    }

    fn uav_clear_info(
        &self,
        resource: &GraphResource<NullBackend>,
        mip: u32,
        slice: u32,
    ) -> Option<UavClearInfo> {
        Some(UavClearInfo {
            shader_visible: DescriptorSlot {
                heap: DescriptorHeapHandle::new(102, 1),
                index: mip * 64 + slice,
            },
            cpu_visible: DescriptorSlot {
                heap: DescriptorHeapHandle::new(103, 1),
                index: mip * 64 + slice,
            },
            resource: resource.backend().handle(),
        })
    }
}

pub type ExecuteHook =
    Box<dyn FnMut(&mut RenderContext<'_, NullBackend>) -> GraphResult<()> + Send>;
pub type ImmediateHook =
    Box<dyn FnMut(&mut ImmediateContext<'_, '_, NullBackend>) -> GraphResult<()> + Send>;

/// Pass body assembled from closures; the default retained body records a
/// single dispatch so the call log shows the pass ran.
pub struct TestPass {
    pub execute: Option<ExecuteHook>,
    pub immediate: Option<ImmediateHook>,
}

impl TestPass {
    pub fn retained() -> Self {
        Self {
            execute: None,
            immediate: None,
        }
    }

    pub fn with_immediate(hook: ImmediateHook) -> Self {
        Self {
            execute: None,
            immediate: Some(hook),
        }
    }
}

impl GraphPass<NullBackend> for TestPass {
    fn execute(&mut self, ctx: &mut RenderContext<'_, NullBackend>) -> GraphResult<()> {
        match &mut self.execute {
            Some(hook) => hook(ctx),
            None => {
                unsafe { ctx.cmd.dispatch(1, 1, 1) };
                Ok(())
            }
        }
    }

    fn execute_immediate(
        &mut self,
        ctx: &mut ImmediateContext<'_, '_, NullBackend>,
    ) -> GraphResult<()> {
        match &mut self.immediate {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }
}

pub fn test_pass(pass: TestPass) -> Arc<parking_lot::Mutex<dyn GraphPass<NullBackend>>> {
    Arc::new(parking_lot::Mutex::new(pass))
}
