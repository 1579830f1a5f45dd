use std::collections::HashMap;
use std::sync::Arc;

use basalt_core::gpu::{
    compute_sync_for_access, layout_for_access, render_sync_for_access, Box3d,
    BufferTextureCopyRegion, CommandList, CopyableFootprint, DescriptorSlot, Extent3d, GpuBackend,
    ResourceAccess, ResourceHandle, ResourceState, Subresource, TextureCopyRegion, UavClearInfo,
};

use crate::error::{GraphError, GraphResult};
use crate::identifier::ResourceIdentifier;
use crate::params::{BindingKind, ResourceRequirement};
use crate::pass::DescriptorSource;
use crate::range::RangeSpec;
use crate::registry::ResourceRegistry;
use crate::resource::GraphResource;
use crate::tracker::StateTracker;

const RECORD_ALIGN: usize = 8;
const HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ImmediateOp {
    CopyBufferRegion = 0,
    ClearRtv = 1,
    ClearDsv = 2,
    ClearUavF32 = 3,
    ClearUavU32 = 4,
    CopyTextureRegion = 5,
    CopyTextureRegions = 6,
    CopyTextureToBuffer = 7,
    CopyBufferToTexture = 8,
}

impl ImmediateOp {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => ImmediateOp::CopyBufferRegion,
            1 => ImmediateOp::ClearRtv,
            2 => ImmediateOp::ClearDsv,
            3 => ImmediateOp::ClearUavF32,
            4 => ImmediateOp::ClearUavU32,
            5 => ImmediateOp::CopyTextureRegion,
            6 => ImmediateOp::CopyTextureRegions,
            7 => ImmediateOp::CopyTextureToBuffer,
            8 => ImmediateOp::CopyBufferToTexture,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ImmediateQueue {
    Graphics = 0,
    Compute = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub op: ImmediateOp,
    pub queue: ImmediateQueue,
    pub flags: u16,
    pub size_bytes: u32,
}

/// Append-only little-endian byte stream. Records start 8-byte aligned and
/// carry their total size in the header so readers can skip unknown ops.
#[derive(Default)]
pub struct BytecodeWriter {
    bytes: Vec<u8>,
}

impl BytecodeWriter {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    fn align(&mut self) {
        while self.bytes.len() % RECORD_ALIGN != 0 {
            self.bytes.push(0);
        }
    }

    pub fn begin(&mut self, op: ImmediateOp, queue: ImmediateQueue, flags: u16) -> usize {
        self.align();
        let start = self.bytes.len();
        self.bytes.push(op as u8);
        self.bytes.push(queue as u8);
        self.bytes.extend_from_slice(&flags.to_le_bytes());
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        start
    }

    pub fn end(&mut self, start: usize) {
        self.align();
        let total = (self.bytes.len() - start) as u32;
        self.bytes[start + 4..start + 8].copy_from_slice(&total.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_handle(&mut self, handle: ResourceHandle) {
        self.write_u32(handle.index);
        self.write_u32(handle.generation);
    }

    pub fn write_slot(&mut self, slot: DescriptorSlot) {
        self.write_u32(slot.heap.index);
        self.write_u32(slot.heap.generation);
        self.write_u32(slot.index);
        self.write_u32(0);
    }

    pub fn write_uav_clear_info(&mut self, info: &UavClearInfo) {
        self.write_slot(info.shader_visible);
        self.write_slot(info.cpu_visible);
        self.write_handle(info.resource);
    }
}

/// Cursor over recorded bytecode. Every read is bounds-checked; running off
/// the end of a record or the stream reports `BytecodeUnderflow`.
pub struct BytecodeReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> BytecodeReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn align(&mut self) {
        let rem = self.offset % RECORD_ALIGN;
        if rem != 0 {
            self.offset += RECORD_ALIGN - rem;
        }
    }

    /// Reads the next record header and positions the cursor at its
    /// payload. Returns the header plus the payload end offset.
    pub fn next_record(&mut self) -> GraphResult<Option<(RecordHeader, usize)>> {
        self.align();
        if self.offset >= self.bytes.len() {
            return Ok(None);
        }
        if self.offset + HEADER_SIZE > self.bytes.len() {
            return Err(GraphError::BytecodeUnderflow);
        }
        let op = ImmediateOp::from_u8(self.bytes[self.offset])
            .ok_or(GraphError::BytecodeUnderflow)?;
        let queue = match self.bytes[self.offset + 1] {
            0 => ImmediateQueue::Graphics,
            1 => ImmediateQueue::Compute,
            _ => return Err(GraphError::BytecodeUnderflow),
        };
        let flags = u16::from_le_bytes([self.bytes[self.offset + 2], self.bytes[self.offset + 3]]);
        let size_bytes = u32::from_le_bytes([
            self.bytes[self.offset + 4],
            self.bytes[self.offset + 5],
            self.bytes[self.offset + 6],
            self.bytes[self.offset + 7],
        ]);
        if (size_bytes as usize) < HEADER_SIZE
            || self.offset + size_bytes as usize > self.bytes.len()
        {
            return Err(GraphError::BytecodeUnderflow);
        }
        let end = self.offset + size_bytes as usize;
        self.offset += HEADER_SIZE;
        Ok(Some((
            RecordHeader {
                op,
                queue,
                flags,
                size_bytes,
            },
            end,
        )))
    }

    pub fn skip_to(&mut self, end: usize) {
        self.offset = end;
    }

    fn take(&mut self, n: usize) -> GraphResult<&'a [u8]> {
        if self.offset + n > self.bytes.len() {
            return Err(GraphError::BytecodeUnderflow);
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> GraphResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> GraphResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_f32(&mut self) -> GraphResult<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_handle(&mut self) -> GraphResult<ResourceHandle> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Ok(ResourceHandle::new(index, generation))
    }

    pub fn read_slot(&mut self) -> GraphResult<DescriptorSlot> {
        let heap_index = self.read_u32()?;
        let heap_generation = self.read_u32()?;
        let index = self.read_u32()?;
        let _pad = self.read_u32()?;
        Ok(DescriptorSlot {
            heap: basalt_core::gpu::DescriptorHeapHandle::new(heap_index, heap_generation),
            index,
        })
    }

    pub fn read_uav_clear_info(&mut self) -> GraphResult<UavClearInfo> {
        let shader_visible = self.read_slot()?;
        let cpu_visible = self.read_slot()?;
        let resource = self.read_handle()?;
        Ok(UavClearInfo {
            shader_visible,
            cpu_visible,
            resource,
        })
    }
}

/// Output of one pass's immediate recording: the bytecode to replay plus
/// the requirements discovered from the access log.
pub struct FrameData<B: GpuBackend> {
    pub bytecode: Vec<u8>,
    pub requirements: Vec<ResourceRequirement<B>>,
    pub keep_alive: Vec<Arc<GraphResource<B>>>,
}

impl<B: GpuBackend> Default for FrameData<B> {
    fn default() -> Self {
        Self {
            bytecode: Vec::new(),
            requirements: Vec::new(),
            keep_alive: Vec::new(),
        }
    }
}

/// Targets an immediate command can address: a registered identifier or a
/// resource in hand.
pub enum ImmediateTarget<B: GpuBackend> {
    Identifier(ResourceIdentifier),
    Resource(Arc<GraphResource<B>>),
}

impl<B: GpuBackend> From<&str> for ImmediateTarget<B> {
    fn from(name: &str) -> Self {
        ImmediateTarget::Identifier(ResourceIdentifier::new(name))
    }
}

impl<B: GpuBackend> From<&ResourceIdentifier> for ImmediateTarget<B> {
    fn from(id: &ResourceIdentifier) -> Self {
        ImmediateTarget::Identifier(id.clone())
    }
}

impl<B: GpuBackend> From<&Arc<GraphResource<B>>> for ImmediateTarget<B> {
    fn from(resource: &Arc<GraphResource<B>>) -> Self {
        ImmediateTarget::Resource(resource.clone())
    }
}

/// Records dynamic copy and clear commands into bytecode while logging the
/// state each touched range must be in. The log becomes additional pass
/// requirements at finalize time; the bytecode replays on the compiled
/// command list every frame.
pub struct ImmediateCommandList<'g, B: GpuBackend> {
    registry: &'g mut ResourceRegistry<B>,
    descriptors: &'g dyn DescriptorSource<B>,
    writer: BytecodeWriter,
    trackers: HashMap<u64, StateTracker>,
    keep_alive: HashMap<u64, Arc<GraphResource<B>>>,
    is_render_pass: bool,
    queue: ImmediateQueue,
}

/// Initial state of every range an immediate command touches. Segments
/// still in this state at finalize are not turned into requirements.
fn immediate_initial_state() -> ResourceState {
    ResourceState::new(
        ResourceAccess::COMMON,
        basalt_core::gpu::ResourceLayout::Common,
        basalt_core::gpu::ResourceSync::None,
    )
}

struct Resolved<B: GpuBackend> {
    resource: Arc<GraphResource<B>>,
    handle: ResourceHandle,
    global_id: u64,
}

impl<'g, B: GpuBackend> ImmediateCommandList<'g, B> {
    pub fn new(
        registry: &'g mut ResourceRegistry<B>,
        descriptors: &'g dyn DescriptorSource<B>,
        is_render_pass: bool,
    ) -> Self {
        Self {
            registry,
            descriptors,
            writer: BytecodeWriter::default(),
            trackers: HashMap::new(),
            keep_alive: HashMap::new(),
            is_render_pass,
            queue: if is_render_pass {
                ImmediateQueue::Graphics
            } else {
                ImmediateQueue::Compute
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writer.bytes().is_empty()
    }

    fn resolve(&mut self, target: ImmediateTarget<B>) -> GraphResult<Resolved<B>> {
        let resource = match target {
            ImmediateTarget::Identifier(id) => match self.registry.request_shared(&id, false)? {
                Some(resource) => resource,
                None => return Err(GraphError::MissingProvider(id)),
            },
            ImmediateTarget::Resource(resource) => {
                self.registry.register_anonymous(resource.clone());
                resource
            }
        };
        let handle = self
            .registry
            .handle_for_resource(&resource)
            .ok_or(GraphError::NotFound)?;
        let global_id = resource.global_id();
        self.keep_alive.entry(global_id).or_insert_with(|| resource.clone());
        self.trackers.entry(global_id).or_insert_with(|| {
            StateTracker::new(
                resource.mip_count(),
                resource.slice_count(),
                immediate_initial_state(),
            )
        });
        Ok(Resolved {
            resource,
            handle,
            global_id,
        })
    }

    fn state_for(&self, access: ResourceAccess) -> ResourceState {
        let layout = layout_for_access(access, self.is_render_pass);
        let sync = if self.is_render_pass {
            render_sync_for_access(access)
        } else {
            compute_sync_for_access(access)
        };
        ResourceState::new(access, layout, sync)
    }

    /// Applies the desired state to the in-pass tracker. A range that was
    /// already forced into a different non-initial state by an earlier
    /// command in the same pass is a recording error.
    fn track(&mut self, global_id: u64, range: RangeSpec, access: ResourceAccess) -> GraphResult<()> {
        let want = self.state_for(access);
        let tracker = self
            .trackers
            .get_mut(&global_id)
            .expect("resolve() seeds a tracker before track() runs");
        let mut transitions = Vec::new();
        tracker.apply(range, global_id, want, &mut transitions);
        for t in &transitions {
            if t.prev.access != ResourceAccess::COMMON && t.prev.access != t.next.access {
                return Err(GraphError::InternalStateConflict);
            }
        }
        Ok(())
    }

    fn for_each_mip_slice(
        resource: &GraphResource<B>,
        range: RangeSpec,
        mut f: impl FnMut(u32, u32) -> GraphResult<()>,
    ) -> GraphResult<bool> {
        let resolved = range.resolve(resource.mip_count(), resource.slice_count());
        if resolved.is_empty() {
            return Ok(false);
        }
        for mip in resolved.first_mip..resolved.first_mip + resolved.mip_count {
            for slice in resolved.first_slice..resolved.first_slice + resolved.slice_count {
                f(mip, slice)?;
            }
        }
        Ok(true)
    }

    pub fn copy_buffer_region(
        &mut self,
        dst: impl Into<ImmediateTarget<B>>,
        dst_offset: u64,
        src: impl Into<ImmediateTarget<B>>,
        src_offset: u64,
        num_bytes: u64,
    ) -> GraphResult<()> {
        let dst = self.resolve(dst.into())?;
        let src = self.resolve(src.into())?;

        let start = self.writer.begin(ImmediateOp::CopyBufferRegion, self.queue, 0);
        self.writer.write_handle(dst.handle);
        self.writer.write_handle(src.handle);
        self.writer.write_u64(dst_offset);
        self.writer.write_u64(src_offset);
        self.writer.write_u64(num_bytes);
        self.writer.end(start);

        self.track(dst.global_id, RangeSpec::Whole, ResourceAccess::COPY_DEST)?;
        self.track(src.global_id, RangeSpec::Whole, ResourceAccess::COPY_SOURCE)?;
        Ok(())
    }

    pub fn clear_rtv(
        &mut self,
        target: impl Into<ImmediateTarget<B>>,
        color: [f32; 4],
        range: RangeSpec,
    ) -> GraphResult<()> {
        let target = self.resolve(target.into())?;
        let descriptors = self.descriptors;
        let resource = target.resource.clone();
        let writer = &mut self.writer;
        let queue = self.queue;

        let any = Self::for_each_mip_slice(&resource, range, |mip, slice| {
            let rtv = descriptors
                .rtv(&resource, mip, slice)
                .ok_or(GraphError::MissingDescriptor {
                    id: resource.global_id(),
                })?;
            let start = writer.begin(ImmediateOp::ClearRtv, queue, 0);
            writer.write_slot(rtv);
            for channel in color {
                writer.write_f32(channel);
            }
            writer.end(start);
            Ok(())
        })?;

        if any {
            self.track(target.global_id, range, ResourceAccess::RENDER_TARGET)?;
        }
        Ok(())
    }

    pub fn clear_dsv(
        &mut self,
        target: impl Into<ImmediateTarget<B>>,
        clear_depth: bool,
        depth: f32,
        clear_stencil: bool,
        stencil: u8,
        range: RangeSpec,
    ) -> GraphResult<()> {
        if !clear_depth && !clear_stencil {
            return Ok(());
        }
        let target = self.resolve(target.into())?;
        let descriptors = self.descriptors;
        let resource = target.resource.clone();
        let writer = &mut self.writer;
        let queue = self.queue;

        let any = Self::for_each_mip_slice(&resource, range, |mip, slice| {
            let dsv = descriptors
                .dsv(&resource, mip, slice)
                .ok_or(GraphError::MissingDescriptor {
                    id: resource.global_id(),
                })?;
            let start = writer.begin(ImmediateOp::ClearDsv, queue, 0);
            writer.write_slot(dsv);
            writer.write_f32(depth);
            writer.write_u32(
                (stencil as u32) | ((clear_depth as u32) << 8) | ((clear_stencil as u32) << 16),
            );
            writer.end(start);
            Ok(())
        })?;

        if any {
            self.track(target.global_id, range, ResourceAccess::DEPTH_READ_WRITE)?;
        }
        Ok(())
    }

    fn clear_uav(
        &mut self,
        target: ImmediateTarget<B>,
        range: RangeSpec,
        write_record: impl Fn(&mut BytecodeWriter, ImmediateQueue, &UavClearInfo),
    ) -> GraphResult<()> {
        let target = self.resolve(target)?;
        let descriptors = self.descriptors;
        let resource = target.resource.clone();
        let writer = &mut self.writer;
        let queue = self.queue;

        let any = Self::for_each_mip_slice(&resource, range, |mip, slice| {
            let info =
                descriptors
                    .uav_clear_info(&resource, mip, slice)
                    .ok_or(GraphError::MissingDescriptor {
                        id: resource.global_id(),
                    })?;
            if !info.shader_visible.is_valid() || !info.cpu_visible.is_valid() {
                return Err(GraphError::MissingDescriptor {
                    id: resource.global_id(),
                });
            }
            write_record(writer, queue, &info);
            Ok(())
        })?;

        if any {
            self.track(target.global_id, range, ResourceAccess::UNORDERED_ACCESS)?;
        }
        Ok(())
    }

    pub fn clear_uav_f32(
        &mut self,
        target: impl Into<ImmediateTarget<B>>,
        values: [f32; 4],
        range: RangeSpec,
    ) -> GraphResult<()> {
        self.clear_uav(target.into(), range, move |writer, queue, info| {
            let start = writer.begin(ImmediateOp::ClearUavF32, queue, 0);
            writer.write_uav_clear_info(info);
            for v in values {
                writer.write_f32(v);
            }
            writer.end(start);
        })
    }

    pub fn clear_uav_u32(
        &mut self,
        target: impl Into<ImmediateTarget<B>>,
        values: [u32; 4],
        range: RangeSpec,
    ) -> GraphResult<()> {
        self.clear_uav(target.into(), range, move |writer, queue, info| {
            let start = writer.begin(ImmediateOp::ClearUavU32, queue, 0);
            writer.write_uav_clear_info(info);
            for v in values {
                writer.write_u32(v);
            }
            writer.end(start);
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn copy_texture_region(
        &mut self,
        dst: impl Into<ImmediateTarget<B>>,
        dst_sub: Subresource,
        dst_offset: [u32; 3],
        src: impl Into<ImmediateTarget<B>>,
        src_sub: Subresource,
        src_offset: [u32; 3],
        extent: Extent3d,
    ) -> GraphResult<()> {
        let dst = self.resolve(dst.into())?;
        let src = self.resolve(src.into())?;

        let start = self.writer.begin(ImmediateOp::CopyTextureRegion, self.queue, 0);
        self.writer.write_handle(dst.handle);
        self.writer.write_handle(src.handle);
        self.writer.write_u32(dst_sub.mip_level);
        self.writer.write_u32(dst_sub.array_slice);
        self.writer.write_u32(src_sub.mip_level);
        self.writer.write_u32(src_sub.array_slice);
        for v in dst_offset {
            self.writer.write_u32(v);
        }
        for v in src_offset {
            self.writer.write_u32(v);
        }
        self.writer.write_u32(extent.width);
        self.writer.write_u32(extent.height);
        self.writer.write_u32(extent.depth);
        self.writer.end(start);

        self.track(
            dst.global_id,
            RangeSpec::single(dst_sub.mip_level, dst_sub.array_slice),
            ResourceAccess::COPY_DEST,
        )?;
        self.track(
            src.global_id,
            RangeSpec::single(src_sub.mip_level, src_sub.array_slice),
            ResourceAccess::COPY_SOURCE,
        )?;
        Ok(())
    }

    /// Multi-region variant: one record with a trailing region array.
    pub fn copy_texture_regions(
        &mut self,
        dst: impl Into<ImmediateTarget<B>>,
        dst_sub: Subresource,
        src: impl Into<ImmediateTarget<B>>,
        src_sub: Subresource,
        regions: &[Box3d],
    ) -> GraphResult<()> {
        let dst = self.resolve(dst.into())?;
        let src = self.resolve(src.into())?;

        let start = self.writer.begin(ImmediateOp::CopyTextureRegions, self.queue, 0);
        self.writer.write_handle(dst.handle);
        self.writer.write_handle(src.handle);
        self.writer.write_u32(dst_sub.mip_level);
        self.writer.write_u32(dst_sub.array_slice);
        self.writer.write_u32(src_sub.mip_level);
        self.writer.write_u32(src_sub.array_slice);
        self.writer.write_u32(regions.len() as u32);
        self.writer.write_u32(0);
        for region in regions {
            self.writer.write_u32(region.left);
            self.writer.write_u32(region.top);
            self.writer.write_u32(region.front);
            self.writer.write_u32(region.right);
            self.writer.write_u32(region.bottom);
            self.writer.write_u32(region.back);
        }
        self.writer.end(start);

        self.track(
            dst.global_id,
            RangeSpec::single(dst_sub.mip_level, dst_sub.array_slice),
            ResourceAccess::COPY_DEST,
        )?;
        self.track(
            src.global_id,
            RangeSpec::single(src_sub.mip_level, src_sub.array_slice),
            ResourceAccess::COPY_SOURCE,
        )?;
        Ok(())
    }

    fn write_footprint(&mut self, footprint: &CopyableFootprint) {
        self.writer.write_u64(footprint.offset);
        self.writer.write_u32(footprint.width);
        self.writer.write_u32(footprint.height);
        self.writer.write_u32(footprint.depth);
        self.writer.write_u32(footprint.row_pitch);
    }

    pub fn copy_texture_to_buffer(
        &mut self,
        texture: impl Into<ImmediateTarget<B>>,
        sub: Subresource,
        buffer: impl Into<ImmediateTarget<B>>,
        footprint: &CopyableFootprint,
        offset: [u32; 3],
    ) -> GraphResult<()> {
        let texture = self.resolve(texture.into())?;
        let buffer = self.resolve(buffer.into())?;

        let start = self.writer.begin(ImmediateOp::CopyTextureToBuffer, self.queue, 0);
        self.writer.write_handle(texture.handle);
        self.writer.write_handle(buffer.handle);
        self.writer.write_u32(sub.mip_level);
        self.writer.write_u32(sub.array_slice);
        self.write_footprint(footprint);
        for v in offset {
            self.writer.write_u32(v);
        }
        self.writer.write_u32(0);
        self.writer.end(start);

        self.track(
            texture.global_id,
            RangeSpec::single(sub.mip_level, sub.array_slice),
            ResourceAccess::COPY_SOURCE,
        )?;
        self.track(buffer.global_id, RangeSpec::Whole, ResourceAccess::COPY_DEST)?;
        Ok(())
    }

    pub fn copy_buffer_to_texture(
        &mut self,
        buffer: impl Into<ImmediateTarget<B>>,
        texture: impl Into<ImmediateTarget<B>>,
        sub: Subresource,
        footprint: &CopyableFootprint,
        offset: [u32; 3],
    ) -> GraphResult<()> {
        let buffer = self.resolve(buffer.into())?;
        let texture = self.resolve(texture.into())?;

        let start = self.writer.begin(ImmediateOp::CopyBufferToTexture, self.queue, 0);
        self.writer.write_handle(texture.handle);
        self.writer.write_handle(buffer.handle);
        self.writer.write_u32(sub.mip_level);
        self.writer.write_u32(sub.array_slice);
        self.write_footprint(footprint);
        for v in offset {
            self.writer.write_u32(v);
        }
        self.writer.write_u32(0);
        self.writer.end(start);

        self.track(buffer.global_id, RangeSpec::Whole, ResourceAccess::COPY_SOURCE)?;
        self.track(
            texture.global_id,
            RangeSpec::single(sub.mip_level, sub.array_slice),
            ResourceAccess::COPY_DEST,
        )?;
        Ok(())
    }

    /// Converts the access log into requirements and hands the recording
    /// over. Ranges still in the initial no-op state are skipped.
    /// Requirement order is stable across frames so the schedule is too.
    pub fn finalize(&mut self) -> FrameData<B> {
        let init = immediate_initial_state();
        let mut out = FrameData::default();
        out.bytecode = self.writer.take();

        let mut ids: Vec<u64> = self.trackers.keys().copied().collect();
        ids.sort_unstable();
        for global_id in ids {
            let tracker = &self.trackers[&global_id];
            let resource = match self.keep_alive.get(&global_id) {
                Some(r) => r.clone(),
                None => continue,
            };
            for segment in tracker.segments() {
                if segment.state == init {
                    continue;
                }
                out.requirements.push(ResourceRequirement {
                    resource: resource.clone(),
                    range: RangeSpec::from(segment.range),
                    state: segment.state,
                    kind: binding_kind_for_access(segment.state.access),
                });
            }
        }
        out.keep_alive = self.keep_alive.drain().map(|(_, v)| v).collect();
        self.trackers.clear();
        out
    }
}

fn binding_kind_for_access(access: ResourceAccess) -> BindingKind {
    if access.contains(ResourceAccess::COPY_DEST) {
        BindingKind::CopyDest
    } else if access.contains(ResourceAccess::COPY_SOURCE) {
        BindingKind::CopySource
    } else if access.contains(ResourceAccess::RENDER_TARGET) {
        BindingKind::RenderTarget
    } else if access.intersects(ResourceAccess::DEPTH_READ_WRITE | ResourceAccess::DEPTH_READ) {
        BindingKind::DepthStencil
    } else if access.contains(ResourceAccess::UNORDERED_ACCESS) {
        BindingKind::UnorderedAccess
    } else {
        BindingKind::ShaderResource
    }
}

/// Walks the bytecode in record order and re-emits each command on the
/// given command list. The registry maps recorded handles back to live
/// resources; stale handles fail the replay.
pub unsafe fn replay<B: GpuBackend>(
    bytecode: &[u8],
    cmd: &mut B::CommandList,
    registry: &ResourceRegistry<B>,
) -> GraphResult<()> {
    let mut reader = BytecodeReader::new(bytecode);
    let lookup = |handle: ResourceHandle| -> GraphResult<&Arc<GraphResource<B>>> {
        registry.resolve(handle).ok_or(GraphError::NotFound)
    };

    while let Some((header, end)) = reader.next_record()? {
        match header.op {
            ImmediateOp::CopyBufferRegion => {
                let dst = reader.read_handle()?;
                let src = reader.read_handle()?;
                let dst_offset = reader.read_u64()?;
                let src_offset = reader.read_u64()?;
                let num_bytes = reader.read_u64()?;
                cmd.copy_buffer_region(
                    lookup(src)?.backend(),
                    lookup(dst)?.backend(),
                    &basalt_core::gpu::BufferCopyRegion {
                        src_offset,
                        dst_offset,
                        size: num_bytes,
                    },
                );
            }
            ImmediateOp::ClearRtv => {
                let slot = reader.read_slot()?;
                let color = [
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                ];
                cmd.clear_rtv(slot, color);
            }
            ImmediateOp::ClearDsv => {
                let slot = reader.read_slot()?;
                let depth = reader.read_f32()?;
                let packed = reader.read_u32()?;
                cmd.clear_dsv(
                    slot,
                    (packed >> 8) & 1 == 1,
                    depth,
                    (packed >> 16) & 1 == 1,
                    (packed & 0xff) as u8,
                );
            }
            ImmediateOp::ClearUavF32 => {
                let info = reader.read_uav_clear_info()?;
                let values = [
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                ];
                cmd.clear_uav_f32(&info, values);
            }
            ImmediateOp::ClearUavU32 => {
                let info = reader.read_uav_clear_info()?;
                let values = [
                    reader.read_u32()?,
                    reader.read_u32()?,
                    reader.read_u32()?,
                    reader.read_u32()?,
                ];
                cmd.clear_uav_u32(&info, values);
            }
            ImmediateOp::CopyTextureRegion => {
                let dst = reader.read_handle()?;
                let src = reader.read_handle()?;
                let dst_sub = Subresource {
                    mip_level: reader.read_u32()?,
                    array_slice: reader.read_u32()?,
                };
                let src_sub = Subresource {
                    mip_level: reader.read_u32()?,
                    array_slice: reader.read_u32()?,
                };
                let dst_offset = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
                let src_offset = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
                let extent = Extent3d::new(reader.read_u32()?, reader.read_u32()?, reader.read_u32()?);
                cmd.copy_texture_region(
                    lookup(src)?.backend(),
                    lookup(dst)?.backend(),
                    &TextureCopyRegion {
                        src_subresource: src_sub,
                        src_offset,
                        dst_subresource: dst_sub,
                        dst_offset,
                        extent,
                    },
                );
            }
            ImmediateOp::CopyTextureRegions => {
                let dst = reader.read_handle()?;
                let src = reader.read_handle()?;
                let dst_sub = Subresource {
                    mip_level: reader.read_u32()?,
                    array_slice: reader.read_u32()?,
                };
                let src_sub = Subresource {
                    mip_level: reader.read_u32()?,
                    array_slice: reader.read_u32()?,
                };
                let count = reader.read_u32()?;
                let _pad = reader.read_u32()?;
                for _ in 0..count {
                    let b = Box3d {
                        left: reader.read_u32()?,
                        top: reader.read_u32()?,
                        front: reader.read_u32()?,
                        right: reader.read_u32()?,
                        bottom: reader.read_u32()?,
                        back: reader.read_u32()?,
                    };
                    cmd.copy_texture_region(
                        lookup(src)?.backend(),
                        lookup(dst)?.backend(),
                        &TextureCopyRegion {
                            src_subresource: src_sub,
                            src_offset: [b.left, b.top, b.front],
                            dst_subresource: dst_sub,
                            dst_offset: [b.left, b.top, b.front],
                            extent: Extent3d::new(b.right - b.left, b.bottom - b.top, b.back - b.front),
                        },
                    );
                }
            }
            ImmediateOp::CopyTextureToBuffer | ImmediateOp::CopyBufferToTexture => {
                let texture = reader.read_handle()?;
                let buffer = reader.read_handle()?;
                let sub = Subresource {
                    mip_level: reader.read_u32()?,
                    array_slice: reader.read_u32()?,
                };
                let offset = reader.read_u64()?;
                let width = reader.read_u32()?;
                let height = reader.read_u32()?;
                let depth = reader.read_u32()?;
                let row_pitch = reader.read_u32()?;
                let texture_offset = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
                let _pad = reader.read_u32()?;
                let texture_res = lookup(texture)?;
                let region = BufferTextureCopyRegion {
                    buffer_footprint: CopyableFootprint {
                        offset,
                        format: texture_res.desc().format,
                        width,
                        height,
                        depth,
                        row_pitch,
                    },
                    texture_subresource: sub,
                    texture_offset,
                    extent: Extent3d::new(width, height, depth),
                };
                if header.op == ImmediateOp::CopyTextureToBuffer {
                    cmd.copy_texture_to_buffer(texture_res.backend(), lookup(buffer)?.backend(), &region);
                } else {
                    cmd.copy_buffer_to_texture(lookup(buffer)?.backend(), texture_res.backend(), &region);
                }
            }
        }
        reader.skip_to(end);
    }
    Ok(())
}
