use std::sync::Arc;

use basalt_core::gpu::{GpuBackend, ResourceState};
use smallvec::SmallVec;

use crate::range::RangeSpec;
use crate::registry::ResourceResolver;
use crate::resource::GraphResource;

/// How a pass binds a required resource. Drives descriptor handling at
/// execution; scheduling only cares about the resulting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    ShaderResource,
    UnorderedAccess,
    RenderTarget,
    DepthStencil,
    IndirectArgument,
    CopySource,
    CopyDest,
    VertexBuffer,
    IndexBuffer,
    ConstantBuffer,
}

/// One fully resolved `(resource, range, state)` a pass needs before it
/// runs.
pub struct ResourceRequirement<B: GpuBackend> {
    pub resource: Arc<GraphResource<B>>,
    pub range: RangeSpec,
    pub state: ResourceState,
    pub kind: BindingKind,
}

impl<B: GpuBackend> Clone for ResourceRequirement<B> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            range: self.range,
            state: self.state,
            kind: self.kind,
        }
    }
}

/// A state some range will be left in by the pass itself, opaque to the
/// graph. Anything else touching the resource is pushed out of the batch.
pub struct InternalTransition<B: GpuBackend> {
    pub resource: Arc<GraphResource<B>>,
    pub range: RangeSpec,
    pub final_state: ResourceState,
}

impl<B: GpuBackend> Clone for InternalTransition<B> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            range: self.range,
            final_state: self.final_state,
        }
    }
}

/// Everything a pass declared through its builder. `frame_requirements`
/// starts each frame as a copy of the static list and grows by whatever the
/// immediate recording discovered.
pub struct PassParameters<B: GpuBackend> {
    pub static_requirements: Vec<ResourceRequirement<B>>,
    pub frame_requirements: Vec<ResourceRequirement<B>>,
    pub internal_transitions: Vec<InternalTransition<B>>,
    pub is_geometry_pass: bool,
    pub phases: SmallVec<[u32; 4]>,
}

impl<B: GpuBackend> Default for PassParameters<B> {
    fn default() -> Self {
        Self {
            static_requirements: Vec::new(),
            frame_requirements: Vec::new(),
            internal_transitions: Vec::new(),
            is_geometry_pass: false,
            phases: SmallVec::new(),
        }
    }
}

impl<B: GpuBackend> Clone for PassParameters<B> {
    fn clone(&self) -> Self {
        Self {
            static_requirements: self.static_requirements.clone(),
            frame_requirements: self.frame_requirements.clone(),
            internal_transitions: self.internal_transitions.clone(),
            is_geometry_pass: self.is_geometry_pass,
            phases: self.phases.clone(),
        }
    }
}

impl<B: GpuBackend> PassParameters<B> {
    /// Resets the per-frame view back to the static declaration.
    pub fn begin_frame(&mut self) {
        self.frame_requirements = self.static_requirements.clone();
    }
}

/// What a builder recorded before resolution: identifiers resolve late,
/// resolvers fan out at structural compile time.
pub enum RequirementBinding<B: GpuBackend> {
    Identifier(crate::identifier::ResourceIdentifier),
    Resource(Arc<GraphResource<B>>),
    Resolver(Arc<dyn ResourceResolver<B>>),
}

impl<B: GpuBackend> Clone for RequirementBinding<B> {
    fn clone(&self) -> Self {
        match self {
            RequirementBinding::Identifier(id) => RequirementBinding::Identifier(id.clone()),
            RequirementBinding::Resource(r) => RequirementBinding::Resource(r.clone()),
            RequirementBinding::Resolver(r) => RequirementBinding::Resolver(r.clone()),
        }
    }
}
