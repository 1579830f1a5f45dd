use std::sync::Arc;

use basalt_core::gpu::{
    compute_sync_for_access, layout_for_access, render_sync_for_access, validate_layout_access,
    GpuBackend, ResourceAccess, ResourceState,
};
use smallvec::SmallVec;

use crate::error::{GraphError, GraphResult};
use crate::identifier::ResourceIdentifier;
use crate::params::{
    BindingKind, InternalTransition, PassParameters, RequirementBinding, ResourceRequirement,
};
use crate::range::RangeSpec;
use crate::registry::{ResourceRegistry, ResourceResolver};
use crate::resource::GraphResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassBuilderKind {
    Render,
    Compute,
}

struct DeclaredRequirement<B: GpuBackend> {
    binding: RequirementBinding<B>,
    range: RangeSpec,
    access: ResourceAccess,
    kind: BindingKind,
    allow_failure: bool,
}

struct DeclaredInternalTransition<B: GpuBackend> {
    binding: RequirementBinding<B>,
    range: RangeSpec,
    final_state: ResourceState,
}

/// Anything a requirement can be declared against: an identifier (resolved
/// at finalize), a resource, or a resolver (fans out at finalize).
pub trait IntoBinding<B: GpuBackend> {
    fn into_binding(self) -> RequirementBinding<B>;
}

impl<B: GpuBackend> IntoBinding<B> for ResourceIdentifier {
    fn into_binding(self) -> RequirementBinding<B> {
        RequirementBinding::Identifier(self)
    }
}

impl<B: GpuBackend> IntoBinding<B> for &ResourceIdentifier {
    fn into_binding(self) -> RequirementBinding<B> {
        RequirementBinding::Identifier(self.clone())
    }
}

impl<B: GpuBackend> IntoBinding<B> for &str {
    fn into_binding(self) -> RequirementBinding<B> {
        RequirementBinding::Identifier(ResourceIdentifier::new(self))
    }
}

impl<B: GpuBackend> IntoBinding<B> for Arc<GraphResource<B>> {
    fn into_binding(self) -> RequirementBinding<B> {
        RequirementBinding::Resource(self)
    }
}

impl<B: GpuBackend> IntoBinding<B> for &Arc<GraphResource<B>> {
    fn into_binding(self) -> RequirementBinding<B> {
        RequirementBinding::Resource(self.clone())
    }
}

impl<B: GpuBackend> IntoBinding<B> for Arc<dyn ResourceResolver<B>> {
    fn into_binding(self) -> RequirementBinding<B> {
        RequirementBinding::Resolver(self)
    }
}

/// Declarative description of one pass's resource usage. Requirements are
/// recorded in call order; resolution happens once per structural compile.
pub struct PassBuilder<B: GpuBackend> {
    kind: PassBuilderKind,
    declared: Vec<DeclaredRequirement<B>>,
    internal: Vec<DeclaredInternalTransition<B>>,
    is_geometry_pass: bool,
    phases: SmallVec<[u32; 4]>,
}

pub type RenderPassBuilder<B> = PassBuilder<B>;
pub type ComputePassBuilder<B> = PassBuilder<B>;

impl<B: GpuBackend> PassBuilder<B> {
    pub fn render() -> Self {
        Self::new(PassBuilderKind::Render)
    }

    pub fn compute() -> Self {
        Self::new(PassBuilderKind::Compute)
    }

    fn new(kind: PassBuilderKind) -> Self {
        Self {
            kind,
            declared: Vec::new(),
            internal: Vec::new(),
            is_geometry_pass: false,
            phases: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> PassBuilderKind {
        self.kind
    }

    fn push(
        mut self,
        binding: RequirementBinding<B>,
        range: RangeSpec,
        access: ResourceAccess,
        kind: BindingKind,
    ) -> Self {
        self.declared.push(DeclaredRequirement {
            binding,
            range,
            access,
            kind,
            allow_failure: false,
        });
        self
    }

    pub fn with_shader_resource(self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::SHADER_RESOURCE,
            BindingKind::ShaderResource,
        )
    }

    pub fn with_unordered_access(self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::UNORDERED_ACCESS,
            BindingKind::UnorderedAccess,
        )
    }

    pub fn with_render_target(mut self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        debug_assert_eq!(self.kind, PassBuilderKind::Render);
        self.is_geometry_pass = true;
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::RENDER_TARGET,
            BindingKind::RenderTarget,
        )
    }

    pub fn with_depth_read_write(mut self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        debug_assert_eq!(self.kind, PassBuilderKind::Render);
        self.is_geometry_pass = true;
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::DEPTH_READ_WRITE,
            BindingKind::DepthStencil,
        )
    }

    pub fn with_depth_read(self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::DEPTH_READ,
            BindingKind::DepthStencil,
        )
    }

    pub fn with_indirect_arguments(self, binding: impl IntoBinding<B>) -> Self {
        self.push(
            binding.into_binding(),
            RangeSpec::Whole,
            ResourceAccess::INDIRECT_ARGUMENT,
            BindingKind::IndirectArgument,
        )
    }

    pub fn with_copy_src(self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::COPY_SOURCE,
            BindingKind::CopySource,
        )
    }

    pub fn with_copy_dst(self, binding: impl IntoBinding<B>, range: RangeSpec) -> Self {
        self.push(
            binding.into_binding(),
            range,
            ResourceAccess::COPY_DEST,
            BindingKind::CopyDest,
        )
    }

    pub fn with_vertex_buffer(self, binding: impl IntoBinding<B>) -> Self {
        self.push(
            binding.into_binding(),
            RangeSpec::Whole,
            ResourceAccess::VERTEX_BUFFER,
            BindingKind::VertexBuffer,
        )
    }

    pub fn with_index_buffer(self, binding: impl IntoBinding<B>) -> Self {
        self.push(
            binding.into_binding(),
            RangeSpec::Whole,
            ResourceAccess::INDEX_BUFFER,
            BindingKind::IndexBuffer,
        )
    }

    pub fn with_constant_buffer(self, binding: impl IntoBinding<B>) -> Self {
        self.push(
            binding.into_binding(),
            RangeSpec::Whole,
            ResourceAccess::CONSTANT_BUFFER,
            BindingKind::ConstantBuffer,
        )
    }

    /// Marks the most recently declared requirement as optional: if its
    /// identifier cannot be resolved, the requirement is dropped instead of
    /// failing the compile.
    pub fn optional(mut self) -> Self {
        if let Some(last) = self.declared.last_mut() {
            last.allow_failure = true;
        }
        self
    }

    /// Declares that the pass itself will bring `range` to `final_state`
    /// during execution. The graph treats this as an opaque write: no other
    /// consumer of the resource shares the batch.
    pub fn requires_internal_transition(
        mut self,
        binding: impl IntoBinding<B>,
        range: RangeSpec,
        final_state: ResourceState,
    ) -> Self {
        self.internal.push(DeclaredInternalTransition {
            binding: binding.into_binding(),
            range,
            final_state,
        });
        self
    }

    pub fn in_phase(mut self, phase: u32) -> Self {
        if !self.phases.contains(&phase) {
            self.phases.push(phase);
        }
        self
    }

    fn state_for(&self, access: ResourceAccess) -> ResourceState {
        let direct_queue = self.kind == PassBuilderKind::Render;
        let layout = layout_for_access(access, direct_queue);
        let sync = match self.kind {
            PassBuilderKind::Render => render_sync_for_access(access),
            PassBuilderKind::Compute => compute_sync_for_access(access),
        };
        ResourceState::new(access, layout, sync)
    }

    fn resolve_binding(
        registry: &mut ResourceRegistry<B>,
        binding: &RequirementBinding<B>,
        allow_failure: bool,
    ) -> GraphResult<Vec<Arc<GraphResource<B>>>> {
        match binding {
            RequirementBinding::Identifier(id) => {
                match registry.request_shared(id, allow_failure)? {
                    Some(resource) => Ok(vec![resource]),
                    None => Ok(Vec::new()),
                }
            }
            RequirementBinding::Resource(resource) => {
                registry.register_anonymous(resource.clone());
                Ok(vec![resource.clone()])
            }
            RequirementBinding::Resolver(resolver) => {
                let resources = resolver.resolve();
                for r in &resources {
                    registry.register_anonymous(r.clone());
                }
                Ok(resources)
            }
        }
    }

    /// Resolves every declared binding against the registry and produces
    /// the pass parameter block the scheduler consumes.
    pub fn finalize(&self, registry: &mut ResourceRegistry<B>) -> GraphResult<PassParameters<B>> {
        let mut params = PassParameters::<B>::default();
        params.is_geometry_pass = self.is_geometry_pass;
        params.phases = self.phases.clone();

        for decl in &self.declared {
            let state = self.state_for(decl.access);
            if !validate_layout_access(state.layout, state.access) {
                return Err(GraphError::StateConflict {
                    id: 0,
                    access: state.access,
                    layout: state.layout,
                });
            }
            for resource in Self::resolve_binding(registry, &decl.binding, decl.allow_failure)? {
                params.static_requirements.push(ResourceRequirement {
                    resource,
                    range: decl.range,
                    state,
                    kind: decl.kind,
                });
            }
        }

        for decl in &self.internal {
            for resource in Self::resolve_binding(registry, &decl.binding, false)? {
                params.internal_transitions.push(InternalTransition {
                    resource,
                    range: decl.range,
                    final_state: decl.final_state,
                });
            }
        }

        // Consumer conflict: one pass asking for overlapping subresources
        // in two different states can never be satisfied by a single
        // transition set.
        for i in 0..params.static_requirements.len() {
            for j in (i + 1)..params.static_requirements.len() {
                let a = &params.static_requirements[i];
                let b = &params.static_requirements[j];
                if a.resource.global_id() != b.resource.global_id() || a.state == b.state {
                    continue;
                }
                let ra = a
                    .range
                    .resolve(a.resource.mip_count(), a.resource.slice_count());
                let rb = b
                    .range
                    .resolve(b.resource.mip_count(), b.resource.slice_count());
                if crate::range::ranges_overlap(&ra, &rb) {
                    return Err(GraphError::RequirementConflict {
                        id: a.resource.global_id(),
                    });
                }
            }
        }

        params.frame_requirements = params.static_requirements.clone();
        Ok(params)
    }
}
