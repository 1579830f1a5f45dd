use super::*;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceDimension {
    Buffer,
    Texture1D,
    Texture2D,
    Texture3D,
    AccelerationStructure,
}

impl ResourceDimension {
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            ResourceDimension::Buffer | ResourceDimension::AccelerationStructure
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum HeapKind {
    #[default]
    DeviceLocal,
    Upload,
    Readback,
}

bitflags! {
  #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
  pub struct ResourceFlags: u32 {
    const RENDER_TARGET          = 0b1;
    const DEPTH_STENCIL          = 0b10;
    const UNORDERED_ACCESS       = 0b100;
    const CROSS_ADAPTER          = 0b1000;
    const ACCELERATION_STRUCTURE = 0b10000;
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Box3d {
    pub left: u32,
    pub top: u32,
    pub front: u32,
    pub right: u32,
    pub bottom: u32,
    pub back: u32,
}

/// Creation-time description of a logical GPU resource. Buffers use
/// `extent.width` as their byte size and have exactly one subresource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDesc {
    pub dimension: ResourceDimension,
    pub format: Format,
    pub extent: Extent3d,
    pub mip_levels: u32,
    pub array_size: u32,
    pub heap_kind: HeapKind,
    pub flags: ResourceFlags,
    pub clear_value: Option<ClearValue>,
}

impl ResourceDesc {
    pub fn buffer(size: u64, heap_kind: HeapKind) -> Self {
        Self {
            dimension: ResourceDimension::Buffer,
            format: Format::Unknown,
            extent: Extent3d::new(size as u32, 1, 1),
            mip_levels: 1,
            array_size: 1,
            heap_kind,
            flags: ResourceFlags::empty(),
            clear_value: None,
        }
    }

    pub fn texture_2d(format: Format, width: u32, height: u32, mip_levels: u32, array_size: u32) -> Self {
        Self {
            dimension: ResourceDimension::Texture2D,
            format,
            extent: Extent3d::new(width, height, 1),
            mip_levels,
            array_size,
            heap_kind: HeapKind::DeviceLocal,
            flags: ResourceFlags::empty(),
            clear_value: None,
        }
    }

    pub fn with_flags(mut self, flags: ResourceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_buffer(&self) -> bool {
        self.dimension.is_buffer()
    }

    pub fn subresource_count(&self) -> u32 {
        if self.is_buffer() {
            1
        } else {
            self.mip_levels * self.array_size
        }
    }

    pub fn buffer_size(&self) -> u64 {
        debug_assert!(self.is_buffer());
        self.extent.width as u64
    }
}

/// One (mip, slice) coordinate of a texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Subresource {
    pub mip_level: u32,
    pub array_slice: u32,
}

/// Fully resolved contiguous subresource rectangle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct SubresourceRange {
    pub first_mip: u32,
    pub mip_count: u32,
    pub first_slice: u32,
    pub slice_count: u32,
}

impl SubresourceRange {
    pub const fn new(first_mip: u32, mip_count: u32, first_slice: u32, slice_count: u32) -> Self {
        Self {
            first_mip,
            mip_count,
            first_slice,
            slice_count,
        }
    }

    pub fn single(mip_level: u32, array_slice: u32) -> Self {
        Self::new(mip_level, 1, array_slice, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.mip_count == 0 || self.slice_count == 0
    }

    pub fn subresource_count(&self) -> u32 {
        self.mip_count * self.slice_count
    }
}

/// Row-major placement of one texture subresource inside a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CopyableFootprint {
    pub offset: u64,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub row_pitch: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ResourceAllocationInfo {
    pub size: u64,
    pub alignment: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ResidencyPriority {
    Minimum,
    Low,
    #[default]
    Normal,
    High,
    Maximum,
}

pub trait Resource: Send + Sync {
    fn desc(&self) -> &ResourceDesc;
    fn handle(&self) -> ResourceHandle;

    /// Maps a byte range of a CPU-visible resource. Returns `None` for
    /// device-local resources.
    unsafe fn map(&self, offset: u64, length: u64) -> Option<*mut u8>;
    unsafe fn unmap(&self, offset: u64, length: u64);
}
