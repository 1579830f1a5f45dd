bitflags! {
  #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
  pub struct ResourceAccess: u32 {
    const COMMON            = 0b1;
    const VERTEX_BUFFER     = 0b10;
    const CONSTANT_BUFFER   = 0b100;
    const INDEX_BUFFER      = 0b1000;
    const RENDER_TARGET     = 0b10000;
    const UNORDERED_ACCESS  = 0b100000;
    const DEPTH_READ_WRITE  = 0b1000000;
    const DEPTH_READ        = 0b10000000;
    const SHADER_RESOURCE   = 0b100000000;
    const INDIRECT_ARGUMENT = 0b1000000000;
    const COPY_DEST         = 0b10000000000;
    const COPY_SOURCE       = 0b100000000000;
    const AS_READ           = 0b1000000000000;
    const AS_WRITE          = 0b10000000000000;
  }
}

impl ResourceAccess {
    pub fn write_mask() -> ResourceAccess {
        ResourceAccess::RENDER_TARGET
            | ResourceAccess::DEPTH_READ_WRITE
            | ResourceAccess::COPY_DEST
            | ResourceAccess::UNORDERED_ACCESS
            | ResourceAccess::AS_WRITE
    }

    pub fn is_write(&self) -> bool {
        self.intersects(Self::write_mask())
    }

    /// Number of distinct read states set. Multi-read combinations force a
    /// generic-read layout.
    pub fn read_state_count(&self) -> u32 {
        if self.contains(ResourceAccess::SHADER_RESOURCE | ResourceAccess::DEPTH_READ) {
            log::warn!("SHADER_RESOURCE and DEPTH_READ set on the same access; this combination is not supported");
        }
        let reads = ResourceAccess::SHADER_RESOURCE
            | ResourceAccess::DEPTH_READ
            | ResourceAccess::RENDER_TARGET
            | ResourceAccess::COPY_SOURCE
            | ResourceAccess::INDEX_BUFFER
            | ResourceAccess::VERTEX_BUFFER
            | ResourceAccess::CONSTANT_BUFFER;
        (*self & reads).bits().count_ones()
    }
}

/// The physical arrangement the GPU expects a subresource to be in.
/// Queue-class variants pin a layout to the graphics or compute queue
/// family the way enhanced-barrier APIs do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ResourceLayout {
    #[default]
    Undefined,
    Common,
    Present,
    GenericRead,
    RenderTarget,
    UnorderedAccess,
    DepthReadWrite,
    DepthRead,
    ShaderResource,
    CopySource,
    CopyDest,
    ResolveSource,
    ResolveDest,
    ShadingRateSource,

    DirectCommon,
    DirectGenericRead,
    DirectUnorderedAccess,
    DirectShaderResource,
    DirectCopySource,
    DirectCopyDest,

    ComputeCommon,
    ComputeGenericRead,
    ComputeUnorderedAccess,
    ComputeShaderResource,
    ComputeCopySource,
    ComputeCopyDest,
}

impl ResourceLayout {
    pub fn is_unordered_access(&self) -> bool {
        matches!(
            self,
            ResourceLayout::UnorderedAccess
                | ResourceLayout::DirectUnorderedAccess
                | ResourceLayout::ComputeUnorderedAccess
        )
    }
}

/// Pipeline stage category at which a barrier synchronizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ResourceSync {
    #[default]
    None,
    All,
    Draw,
    IndexInput,
    VertexShading,
    PixelShading,
    DepthStencil,
    RenderTarget,
    ComputeShading,
    Raytracing,
    Copy,
    Resolve,
    ExecuteIndirect,
    Predication,
    AllShading,
    NonPixelShading,
    ClearUnorderedAccessView,
    BuildAccelerationStructure,
    CopyAccelerationStructure,
    SyncSplit,
}

impl ResourceSync {
    /// Whether a compute queue can express this sync point. Anything else has
    /// to be synchronized on the graphics queue.
    pub fn is_compute_compatible(&self) -> bool {
        matches!(
            self,
            ResourceSync::None | ResourceSync::All | ResourceSync::ComputeShading
        )
    }
}

/// Full per-subresource state triple tracked by the render graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ResourceState {
    pub access: ResourceAccess,
    pub layout: ResourceLayout,
    pub sync: ResourceSync,
}

impl ResourceState {
    pub const fn new(access: ResourceAccess, layout: ResourceLayout, sync: ResourceSync) -> Self {
        Self {
            access,
            layout,
            sync,
        }
    }

    /// State of a resource that has never been used: common access with the
    /// layout left undefined.
    pub const fn initial() -> Self {
        Self::new(
            ResourceAccess::COMMON,
            ResourceLayout::Undefined,
            ResourceSync::None,
        )
    }

    pub fn is_uav(&self) -> bool {
        self.access.contains(ResourceAccess::UNORDERED_ACCESS) || self.layout.is_unordered_access()
    }
}

/// Derives the layout implied by an access combination. Write accesses each
/// imply their single layout; multiple read accesses fall back to the
/// queue-class generic read layout.
pub fn layout_for_access(access: ResourceAccess, direct_queue: bool) -> ResourceLayout {
    if access.contains(ResourceAccess::COMMON) {
        return ResourceLayout::Common;
    }
    if access.contains(ResourceAccess::UNORDERED_ACCESS) {
        return ResourceLayout::UnorderedAccess;
    }
    if access.contains(ResourceAccess::RENDER_TARGET) {
        return ResourceLayout::RenderTarget;
    }
    if access.contains(ResourceAccess::DEPTH_READ_WRITE) {
        return ResourceLayout::DepthReadWrite;
    }
    if access.contains(ResourceAccess::COPY_SOURCE) {
        return ResourceLayout::CopySource;
    }
    if access.contains(ResourceAccess::COPY_DEST) {
        return ResourceLayout::CopyDest;
    }

    if access.read_state_count() > 1 {
        return if direct_queue {
            ResourceLayout::DirectGenericRead
        } else {
            ResourceLayout::ComputeGenericRead
        };
    }
    if access.contains(ResourceAccess::SHADER_RESOURCE) {
        return ResourceLayout::ShaderResource;
    }
    if access.contains(ResourceAccess::DEPTH_READ) {
        return ResourceLayout::DepthRead;
    }
    if access.intersects(
        ResourceAccess::INDEX_BUFFER | ResourceAccess::VERTEX_BUFFER | ResourceAccess::CONSTANT_BUFFER,
    ) {
        return ResourceLayout::GenericRead;
    }
    ResourceLayout::Common
}

/// Sync point for an access on a compute-style pass.
pub fn compute_sync_for_access(access: ResourceAccess) -> ResourceSync {
    if access.contains(ResourceAccess::INDIRECT_ARGUMENT) {
        ResourceSync::ExecuteIndirect
    } else {
        ResourceSync::ComputeShading
    }
}

/// Sync point for an access on a render-style pass. A single category maps
/// to its own sync point; mixing categories widens to a full pipeline sync.
pub fn render_sync_for_access(access: ResourceAccess) -> ResourceSync {
    let needs_common = access.contains(ResourceAccess::COMMON);
    let needs_shading = access.intersects(
        ResourceAccess::VERTEX_BUFFER
            | ResourceAccess::CONSTANT_BUFFER
            | ResourceAccess::SHADER_RESOURCE
            | ResourceAccess::UNORDERED_ACCESS,
    );
    let needs_index_input = access.contains(ResourceAccess::INDEX_BUFFER);
    let needs_render_target = access.contains(ResourceAccess::RENDER_TARGET);
    let needs_depth_stencil =
        access.intersects(ResourceAccess::DEPTH_READ | ResourceAccess::DEPTH_READ_WRITE);
    let needs_copy = access.intersects(ResourceAccess::COPY_SOURCE | ResourceAccess::COPY_DEST);
    let needs_indirect = access.contains(ResourceAccess::INDIRECT_ARGUMENT);
    let needs_raytracing = access.contains(ResourceAccess::AS_READ);
    let needs_build_as = access.contains(ResourceAccess::AS_WRITE);

    let category_count = needs_common as u32
        + needs_shading as u32
        + needs_index_input as u32
        + needs_render_target as u32
        + needs_depth_stencil as u32
        + needs_copy as u32
        + needs_indirect as u32
        + needs_raytracing as u32
        + needs_build_as as u32;

    if category_count == 0 {
        return ResourceSync::None;
    }
    if category_count > 1 {
        return ResourceSync::All;
    }

    if needs_common {
        ResourceSync::All
    } else if needs_shading {
        ResourceSync::AllShading
    } else if needs_index_input {
        ResourceSync::IndexInput
    } else if needs_render_target {
        ResourceSync::RenderTarget
    } else if needs_depth_stencil {
        ResourceSync::DepthStencil
    } else if needs_copy {
        ResourceSync::Copy
    } else if needs_indirect {
        ResourceSync::ExecuteIndirect
    } else if needs_build_as {
        ResourceSync::BuildAccelerationStructure
    } else {
        ResourceSync::Raytracing
    }
}

/// Checks that an access combination is expressible in the given layout.
pub fn validate_layout_access(layout: ResourceLayout, access: ResourceAccess) -> bool {
    if access.contains(ResourceAccess::DEPTH_READ | ResourceAccess::DEPTH_READ_WRITE) {
        return false;
    }
    let allowed = match layout {
        ResourceLayout::Common => {
            ResourceAccess::COMMON
                | ResourceAccess::SHADER_RESOURCE
                | ResourceAccess::COPY_DEST
                | ResourceAccess::COPY_SOURCE
        }
        ResourceLayout::DirectCommon | ResourceLayout::ComputeCommon => {
            ResourceAccess::COMMON
                | ResourceAccess::SHADER_RESOURCE
                | ResourceAccess::COPY_DEST
                | ResourceAccess::COPY_SOURCE
                | ResourceAccess::UNORDERED_ACCESS
        }
        ResourceLayout::GenericRead => {
            ResourceAccess::SHADER_RESOURCE
                | ResourceAccess::COPY_SOURCE
                | ResourceAccess::VERTEX_BUFFER
                | ResourceAccess::CONSTANT_BUFFER
                | ResourceAccess::INDEX_BUFFER
        }
        ResourceLayout::DirectGenericRead => {
            ResourceAccess::SHADER_RESOURCE
                | ResourceAccess::COPY_SOURCE
                | ResourceAccess::DEPTH_READ
                | ResourceAccess::VERTEX_BUFFER
                | ResourceAccess::CONSTANT_BUFFER
                | ResourceAccess::INDEX_BUFFER
        }
        ResourceLayout::ComputeGenericRead => {
            ResourceAccess::SHADER_RESOURCE | ResourceAccess::COPY_SOURCE
        }
        ResourceLayout::RenderTarget => ResourceAccess::RENDER_TARGET,
        ResourceLayout::UnorderedAccess
        | ResourceLayout::DirectUnorderedAccess
        | ResourceLayout::ComputeUnorderedAccess => ResourceAccess::UNORDERED_ACCESS,
        ResourceLayout::DepthReadWrite => {
            ResourceAccess::DEPTH_READ_WRITE | ResourceAccess::DEPTH_READ
        }
        ResourceLayout::DepthRead => ResourceAccess::DEPTH_READ,
        ResourceLayout::ShaderResource
        | ResourceLayout::DirectShaderResource
        | ResourceLayout::ComputeShaderResource => ResourceAccess::SHADER_RESOURCE,
        ResourceLayout::CopySource
        | ResourceLayout::DirectCopySource
        | ResourceLayout::ComputeCopySource => ResourceAccess::COPY_SOURCE,
        ResourceLayout::CopyDest
        | ResourceLayout::DirectCopyDest
        | ResourceLayout::ComputeCopyDest => ResourceAccess::COPY_DEST,
        // Undefined, Present, resolve and shading-rate layouts carry
        // whatever access the transition that leaves them declares.
        _ => return true,
    };
    (access & !allowed).is_empty()
}
