#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Timestamp,
    PipelineStatistics,
}

bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct PipelineStatFlags: u32 {
    const MESH_INVOCATIONS = 0b1;
    const MESH_PRIMITIVES  = 0b10;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryPoolDesc {
    pub kind: QueryKind,
    pub count: u32,
    pub stats_mask: PipelineStatFlags,
}

/// Size and layout of one resolved query element in the readback buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryResultInfo {
    pub element_size: u64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineStatField {
    pub stat: PipelineStatFlags,
    pub byte_offset: u32,
    pub supported: bool,
}

pub trait QueryPool: Send + Sync {
    fn desc(&self) -> &QueryPoolDesc;
    fn result_info(&self) -> QueryResultInfo;
    fn stat_field(&self, stat: PipelineStatFlags) -> Option<PipelineStatField>;
}
