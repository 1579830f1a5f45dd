use basalt_core::gpu::{GpuError, ResourceAccess, ResourceLayout};
use thiserror::Error;

use crate::identifier::ResourceIdentifier;

/// Errors surfaced by graph compilation and execution. Compilation errors
/// abort the frame; device-lost latches and fails every later frame.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("render graph contains a dependency cycle")]
    Cycle,

    #[error("state conflict on resource {id}: access {access:?} is not valid in layout {layout:?}")]
    StateConflict {
        id: u64,
        access: ResourceAccess,
        layout: ResourceLayout,
    },

    #[error("conflicting requirements for overlapping subresources of resource {id}")]
    RequirementConflict { id: u64 },

    #[error("no resource or provider registered for identifier `{0}`")]
    MissingProvider(ResourceIdentifier),

    #[error("provider returned nothing for advertised identifier `{0}`")]
    ProviderFailed(ResourceIdentifier),

    #[error("resource identifier `{0}` is already registered")]
    AlreadyExists(ResourceIdentifier),

    #[error("resource not found")]
    NotFound,

    #[error("impossible placement for aliased resources (alias group {0})")]
    AliasHazard(usize),

    #[error("conflicting access states recorded for one range within a single pass")]
    InternalStateConflict,

    #[error("no descriptor available for dynamically cleared resource {id}")]
    MissingDescriptor { id: u64 },

    #[error("immediate bytecode underflow")]
    BytecodeUnderflow,

    #[error("pass `{0}` registered twice in one frame")]
    DuplicatePass(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("device lost: {0}")]
    DeviceLost(GpuError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl GraphError {
    pub fn from_gpu(e: GpuError) -> Self {
        if e.is_device_lost() {
            GraphError::DeviceLost(e)
        } else {
            GraphError::Gpu(e)
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
