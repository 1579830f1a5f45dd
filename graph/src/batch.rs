use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use basalt_core::gpu::GpuBackend;

use crate::resource::GraphResource;
use crate::tracker::ResourceTransition;

/// One scheduling unit: a contiguous run of passes per queue with a single
/// cross-queue synchronization boundary. Pass entries are indices into the
/// frame pass list. Wait fields are `Some(value)` when the flag is set;
/// de-duplication clears them back to `None`.
pub struct PassBatch<B: GpuBackend> {
    pub render_passes: Vec<usize>,
    pub compute_passes: Vec<usize>,

    pub render_transitions: Vec<ResourceTransition>,
    pub compute_transitions: Vec<ResourceTransition>,
    /// Transitions that must run on the graphics queue after its last pass,
    /// pinning cross-queue order for a later compute consumer.
    pub batch_end_transitions: Vec<ResourceTransition>,

    pub render_transition_fence_value: u64,
    pub render_completion_fence_value: u64,
    pub compute_transition_fence_value: u64,
    pub compute_completion_fence_value: u64,

    pub render_transition_signal: bool,
    pub render_completion_signal: bool,
    pub compute_transition_signal: bool,
    pub compute_completion_signal: bool,

    pub compute_wait_on_render_before_transition: Option<u64>,
    pub compute_wait_on_render_before_execution: Option<u64>,
    pub render_wait_on_compute_before_transition: Option<u64>,
    pub render_wait_on_compute_before_execution: Option<u64>,

    /// Every resource any committed pass required this batch.
    pub touched_resources: HashSet<u64>,
    /// Resources some pass will transition internally during execution.
    pub internally_transitioned: HashSet<u64>,
    /// Resources whose trackers this batch has already driven; later
    /// candidates are checked against these for conflicting states.
    pub trackers: HashMap<u64, Arc<GraphResource<B>>>,
}

impl<B: GpuBackend> Default for PassBatch<B> {
    fn default() -> Self {
        Self {
            render_passes: Vec::new(),
            compute_passes: Vec::new(),
            render_transitions: Vec::new(),
            compute_transitions: Vec::new(),
            batch_end_transitions: Vec::new(),
            render_transition_fence_value: 0,
            render_completion_fence_value: 0,
            compute_transition_fence_value: 0,
            compute_completion_fence_value: 0,
            render_transition_signal: false,
            render_completion_signal: false,
            compute_transition_signal: false,
            compute_completion_signal: false,
            compute_wait_on_render_before_transition: None,
            compute_wait_on_render_before_execution: None,
            render_wait_on_compute_before_transition: None,
            render_wait_on_compute_before_execution: None,
            touched_resources: HashSet::new(),
            internally_transitioned: HashSet::new(),
            trackers: HashMap::new(),
        }
    }
}

impl<B: GpuBackend> PassBatch<B> {
    pub fn is_empty(&self) -> bool {
        self.render_passes.is_empty() && self.compute_passes.is_empty()
    }
}
