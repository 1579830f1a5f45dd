use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Graphics,
    Mesh,
    Compute,
}

/// Opaque, pre-compiled pipeline state. Shader compilation and PSO caching
/// live behind the backend; the graph only binds.
pub trait Pipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub stages: ShaderStages,
    pub offset: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineLayoutDesc {
    pub push_constants: Vec<PushConstantRange>,
}

pub trait PipelineLayout: Send + Sync {
    fn desc(&self) -> &PipelineLayoutDesc;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndirectArgumentKind {
    Draw,
    DrawIndexed,
    Dispatch,
    DispatchMesh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandSignatureDesc {
    pub argument: IndirectArgumentKind,
    pub stride: u32,
}

pub trait CommandSignature: Send + Sync {
    fn desc(&self) -> &CommandSignatureDesc;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Wrap,
    Mirror,
    Clamp,
    Border,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mip_filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub max_anisotropy: f32,
    pub min_lod: f32,
    pub max_lod: Option<f32>,
}

pub trait Sampler: Send + Sync {
    fn desc(&self) -> &SamplerDesc;
}
