#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Format {
    #[default]
    Unknown,

    R32G32B32A32_Typeless,
    R32G32B32A32_Float,
    R32G32B32A32_UInt,
    R32G32B32A32_SInt,
    R32G32B32_Typeless,
    R32G32B32_Float,
    R32G32B32_UInt,
    R32G32B32_SInt,
    R16G16B16A16_Typeless,
    R16G16B16A16_Float,
    R16G16B16A16_UNorm,
    R16G16B16A16_UInt,
    R16G16B16A16_SNorm,
    R16G16B16A16_SInt,
    R32G32_Typeless,
    R32G32_Float,
    R32G32_UInt,
    R32G32_SInt,
    R10G10B10A2_Typeless,
    R10G10B10A2_UNorm,
    R10G10B10A2_UInt,
    R11G11B10_Float,
    R8G8B8A8_Typeless,
    R8G8B8A8_UNorm,
    R8G8B8A8_UNorm_sRGB,
    R8G8B8A8_UInt,
    R8G8B8A8_SNorm,
    R8G8B8A8_SInt,
    R16G16_Typeless,
    R16G16_Float,
    R16G16_UNorm,
    R16G16_UInt,
    R16G16_SNorm,
    R16G16_SInt,
    R32_Typeless,
    D32_Float,
    R32_Float,
    R32_UInt,
    R32_SInt,
    R8G8_Typeless,
    R8G8_UNorm,
    R8G8_UInt,
    R8G8_SNorm,
    R8G8_SInt,
    R16_Typeless,
    R16_Float,
    R16_UNorm,
    R16_UInt,
    R16_SNorm,
    R16_SInt,
    R8_Typeless,
    R8_UNorm,
    R8_UInt,
    R8_SNorm,
    R8_SInt,
    B8G8R8A8_Typeless,
    B8G8R8A8_UNorm,
    B8G8R8A8_UNorm_sRGB,
    BC1_Typeless,
    BC1_UNorm,
    BC1_UNorm_sRGB,
    BC2_Typeless,
    BC2_UNorm,
    BC2_UNorm_sRGB,
    BC3_Typeless,
    BC3_UNorm,
    BC3_UNorm_sRGB,
    BC4_Typeless,
    BC4_UNorm,
    BC4_SNorm,
    BC5_Typeless,
    BC5_UNorm,
    BC5_SNorm,
    BC6H_Typeless,
    BC6H_UF16,
    BC6H_SF16,
    BC7_Typeless,
    BC7_UNorm,
    BC7_UNorm_sRGB,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FormatBlockInfo {
    pub block_width: u32,
    pub block_height: u32,
    pub bytes_per_block: u32,
    pub is_compressed: bool,
}

impl Format {
    pub fn is_depth(&self) -> bool {
        matches!(self, Format::D32_Float)
    }

    pub fn is_compressed(&self) -> bool {
        self.block_info().is_compressed
    }

    /// Bytes per texel for uncompressed formats; 0 for block-compressed
    /// (use `block_info` for those).
    pub fn element_size(&self) -> u32 {
        use Format::*;
        match self {
            R32G32B32A32_Typeless | R32G32B32A32_Float | R32G32B32A32_UInt | R32G32B32A32_SInt => 16,
            R32G32B32_Typeless | R32G32B32_Float | R32G32B32_UInt | R32G32B32_SInt => 12,
            R16G16B16A16_Typeless | R16G16B16A16_Float | R16G16B16A16_UNorm | R16G16B16A16_UInt
            | R16G16B16A16_SNorm | R16G16B16A16_SInt => 8,
            R32G32_Typeless | R32G32_Float | R32G32_UInt | R32G32_SInt => 8,
            R10G10B10A2_Typeless | R10G10B10A2_UNorm | R10G10B10A2_UInt | R11G11B10_Float => 4,
            R8G8B8A8_Typeless | R8G8B8A8_UNorm | R8G8B8A8_UNorm_sRGB | R8G8B8A8_UInt
            | R8G8B8A8_SNorm | R8G8B8A8_SInt => 4,
            R16G16_Typeless | R16G16_Float | R16G16_UNorm | R16G16_UInt | R16G16_SNorm
            | R16G16_SInt => 4,
            R32_Typeless | D32_Float | R32_Float | R32_UInt | R32_SInt => 4,
            B8G8R8A8_Typeless | B8G8R8A8_UNorm | B8G8R8A8_UNorm_sRGB => 4,
            R8G8_Typeless | R8G8_UNorm | R8G8_UInt | R8G8_SNorm | R8G8_SInt => 2,
            R16_Typeless | R16_Float | R16_UNorm | R16_UInt | R16_SNorm | R16_SInt => 2,
            R8_Typeless | R8_UNorm | R8_UInt | R8_SNorm | R8_SInt => 1,
            _ => 0,
        }
    }

    pub fn block_info(&self) -> FormatBlockInfo {
        use Format::*;
        match self {
            BC1_Typeless | BC1_UNorm | BC1_UNorm_sRGB | BC4_Typeless | BC4_UNorm | BC4_SNorm => {
                FormatBlockInfo {
                    block_width: 4,
                    block_height: 4,
                    bytes_per_block: 8,
                    is_compressed: true,
                }
            }
            BC2_Typeless | BC2_UNorm | BC2_UNorm_sRGB | BC3_Typeless | BC3_UNorm | BC3_UNorm_sRGB
            | BC5_Typeless | BC5_UNorm | BC5_SNorm | BC6H_Typeless | BC6H_UF16 | BC6H_SF16
            | BC7_Typeless | BC7_UNorm | BC7_UNorm_sRGB => FormatBlockInfo {
                block_width: 4,
                block_height: 4,
                bytes_per_block: 16,
                is_compressed: true,
            },
            _ => FormatBlockInfo {
                block_width: 1,
                block_height: 1,
                bytes_per_block: self.element_size(),
                is_compressed: false,
            },
        }
    }
}

/// Clear value bound to a format at resource creation or clear recording.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

impl ClearValue {
    pub const BLACK: ClearValue = ClearValue::Color([0.0, 0.0, 0.0, 1.0]);

    pub fn matches_format(&self, format: Format) -> bool {
        match self {
            ClearValue::Color(_) => !format.is_depth(),
            ClearValue::DepthStencil { .. } => format.is_depth(),
        }
    }
}
