use super::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scissor {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

bitflags! {
  #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
  pub struct ShaderStages: u32 {
    const VERTEX   = 0b1;
    const PIXEL    = 0b10;
    const COMPUTE  = 0b100;
    const MESH     = 0b1000;
    const ALL      = 0b1111;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

pub struct RenderTargetBinding<'a, B: GpuBackend> {
    pub texture: &'a B::Resource,
    pub subresource: Subresource,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Option<ClearValue>,
}

pub struct DepthStencilBinding<'a, B: GpuBackend> {
    pub texture: &'a B::Resource,
    pub subresource: Subresource,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Option<ClearValue>,
    pub read_only: bool,
}

pub struct PassBeginInfo<'a, B: GpuBackend> {
    pub render_targets: &'a [RenderTargetBinding<'a, B>],
    pub depth_stencil: Option<DepthStencilBinding<'a, B>>,
}

#[derive(Debug, Clone)]
pub struct BufferCopyRegion {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct TextureCopyRegion {
    pub src_subresource: Subresource,
    pub src_offset: [u32; 3],
    pub dst_subresource: Subresource,
    pub dst_offset: [u32; 3],
    pub extent: Extent3d,
}

#[derive(Debug, Clone)]
pub struct BufferTextureCopyRegion {
    pub buffer_footprint: CopyableFootprint,
    pub texture_subresource: Subresource,
    pub texture_offset: [u32; 3],
    pub extent: Extent3d,
}

pub trait CommandAllocator: Send {
    unsafe fn reset(&mut self) -> Result<(), GpuError>;
}

/// Recording surface of one command list. Entry points mirror the queue
/// classes they are legal on; recording onto the wrong queue class is a
/// backend-level validation error, not checked here.
pub trait CommandList<B: GpuBackend>: Send {
    unsafe fn begin(&mut self, allocator: &mut B::CommandAllocator) -> Result<(), GpuError>;
    unsafe fn finish(&mut self) -> Result<(), GpuError>;

    unsafe fn begin_pass(&mut self, info: &PassBeginInfo<B>);
    unsafe fn end_pass(&mut self);

    unsafe fn barriers(&mut self, batch: &BarrierBatch<B>);

    unsafe fn bind_layout(&mut self, layout: &B::PipelineLayout);
    unsafe fn bind_pipeline(&mut self, pipeline: &B::Pipeline);
    unsafe fn set_descriptor_heaps(
        &mut self,
        cbv_srv_uav: &B::DescriptorHeap,
        sampler: Option<&B::DescriptorHeap>,
    );
    unsafe fn push_constants(
        &mut self,
        stages: ShaderStages,
        set: u32,
        binding: u32,
        offset: u32,
        data: &[u32],
    );

    unsafe fn set_viewports(&mut self, viewports: &[Viewport]);
    unsafe fn set_scissors(&mut self, scissors: &[Scissor]);
    unsafe fn set_primitive_topology(&mut self, topology: PrimitiveTopology);
    unsafe fn set_vertex_buffers(&mut self, buffers: &[(&B::Resource, u64)]);
    unsafe fn set_index_buffer(&mut self, buffer: &B::Resource, offset: u64, format: IndexFormat);

    unsafe fn draw(&mut self, vertices: u32, instances: u32, first_vertex: u32, first_instance: u32);
    unsafe fn draw_indexed(
        &mut self,
        indices: u32,
        instances: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    unsafe fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);
    unsafe fn dispatch_mesh(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);
    unsafe fn execute_indirect(
        &mut self,
        signature: &B::CommandSignature,
        args: &B::Resource,
        args_offset: u64,
        count_buffer: Option<&B::Resource>,
        count_offset: u64,
        max_count: u32,
    );

    unsafe fn copy_buffer_region(
        &mut self,
        src: &B::Resource,
        dst: &B::Resource,
        region: &BufferCopyRegion,
    );
    unsafe fn copy_texture_region(
        &mut self,
        src: &B::Resource,
        dst: &B::Resource,
        region: &TextureCopyRegion,
    );
    unsafe fn copy_texture_to_buffer(
        &mut self,
        src: &B::Resource,
        dst: &B::Resource,
        region: &BufferTextureCopyRegion,
    );
    unsafe fn copy_buffer_to_texture(
        &mut self,
        src: &B::Resource,
        dst: &B::Resource,
        region: &BufferTextureCopyRegion,
    );

    unsafe fn clear_rtv(&mut self, rtv: DescriptorSlot, color: [f32; 4]);
    unsafe fn clear_dsv(
        &mut self,
        dsv: DescriptorSlot,
        clear_depth: bool,
        depth: f32,
        clear_stencil: bool,
        stencil: u8,
    );
    unsafe fn clear_uav_u32(&mut self, info: &UavClearInfo, values: [u32; 4]);
    unsafe fn clear_uav_f32(&mut self, info: &UavClearInfo, values: [f32; 4]);

    unsafe fn begin_query(&mut self, pool: &B::QueryPool, index: u32);
    unsafe fn end_query(&mut self, pool: &B::QueryPool, index: u32);
    unsafe fn write_timestamp(&mut self, pool: &B::QueryPool, index: u32);
    unsafe fn resolve_query_data(
        &mut self,
        pool: &B::QueryPool,
        first: u32,
        count: u32,
        destination: &B::Resource,
        dst_offset: u64,
    );
    unsafe fn reset_queries(&mut self, pool: &B::QueryPool, first: u32, count: u32);

    unsafe fn begin_label(&mut self, label: &str);
    unsafe fn end_label(&mut self);
}
