use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use basalt_core::gpu::{GpuBackend, GpuError, ResourceAccess};
use parking_lot::Mutex;
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::batch::PassBatch;
use crate::builders::PassBuilder;
use crate::error::{GraphError, GraphResult};
use crate::identifier::ResourceIdentifier;
use crate::immediate::ImmediateCommandList;
use crate::params::{PassParameters, ResourceRequirement};
use crate::pass::{DescriptorSource, GraphPass, ImmediateContext, PassKind, PassRunMask};
use crate::range::{ranges_overlap, RangeSpec};
use crate::registry::{ResourceProvider, ResourceRegistry, ResourceResolver};
use crate::resource::GraphResource;

pub(crate) struct MasterPass<B: GpuBackend> {
    pub name: SmartString,
    pub kind: PassKind,
    pub pass: Arc<Mutex<dyn GraphPass<B>>>,
    pub builder: PassBuilder<B>,
    pub params: PassParameters<B>,
    pub stats_index: Option<u32>,
}

/// One schedulable pass for the current frame. Splitting a conflicted
/// immediate recording produces two of these sharing the same body.
pub struct FramePass<B: GpuBackend> {
    pub name: SmartString,
    pub kind: PassKind,
    pub pass: Arc<Mutex<dyn GraphPass<B>>>,
    pub params: PassParameters<B>,
    pub bytecode: Vec<u8>,
    pub keep_alive: Vec<Arc<GraphResource<B>>>,
    pub run: PassRunMask,
    pub stats_index: Option<u32>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AccessKind {
    Read,
    Write,
}

struct Node {
    pass_index: usize,
    is_compute: bool,
    original_order: u32,
    access_by_id: HashMap<u64, AccessKind>,
    touched_ids: Vec<u64>,
    uav_ids: Vec<u64>,
    out_edges: Vec<usize>,
    in_edges: Vec<usize>,
    indegree: u32,
    criticality: u32,
}

#[derive(Default)]
struct SeqState {
    last_writer: Option<usize>,
    reads_since_write: Vec<usize>,
}

/// Per-frame scheduling state. Batches move out of `current` into
/// `closed` as they fill up; histories map resource ids to the last batch
/// index that transitioned, produced or touched them per queue.
struct ScheduleState<B: GpuBackend> {
    closed: Vec<PassBatch<B>>,
    current: PassBatch<B>,
    current_index: usize,
    compute_uavs: HashSet<u64>,
    render_uavs: HashSet<u64>,
    render_transition_hist: HashMap<u64, usize>,
    compute_transition_hist: HashMap<u64, usize>,
    render_producer_hist: HashMap<u64, usize>,
    compute_producer_hist: HashMap<u64, usize>,
    render_usage_hist: HashMap<u64, usize>,
    compute_usage_hist: HashMap<u64, usize>,
}

/// Compiles declaratively described passes into ordered batches with
/// transitions and cross-queue fences, then owns the result until the
/// executor walks it. Holds no global state; everything lives on the
/// instance.
pub struct RenderGraph<B: GpuBackend> {
    pub(crate) registry: ResourceRegistry<B>,
    pub(crate) resources_by_id: HashMap<u64, Arc<GraphResource<B>>>,
    pub(crate) master_passes: Vec<MasterPass<B>>,
    pub(crate) frame_passes: Vec<FramePass<B>>,
    pub(crate) batches: Vec<PassBatch<B>>,
    alias_groups: Vec<Vec<u64>>,
    resource_to_alias_group: HashMap<u64, usize>,
    graphics_fence_counter: u64,
    compute_fence_counter: u64,
    pub(crate) device_lost: Option<GpuError>,
}

impl<B: GpuBackend> Default for RenderGraph<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GpuBackend> RenderGraph<B> {
    pub fn new() -> Self {
        Self {
            registry: ResourceRegistry::new(),
            resources_by_id: HashMap::new(),
            master_passes: Vec::new(),
            frame_passes: Vec::new(),
            batches: Vec::new(),
            alias_groups: Vec::new(),
            resource_to_alias_group: HashMap::new(),
            graphics_fence_counter: 0,
            compute_fence_counter: 0,
            device_lost: None,
        }
    }

    pub fn registry(&self) -> &ResourceRegistry<B> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ResourceRegistry<B> {
        &mut self.registry
    }

    pub fn batches(&self) -> &[PassBatch<B>] {
        &self.batches
    }

    pub fn frame_passes(&self) -> &[FramePass<B>] {
        &self.frame_passes
    }

    pub fn add_render_pass(
        &mut self,
        name: &str,
        pass: Arc<Mutex<dyn GraphPass<B>>>,
        builder: PassBuilder<B>,
    ) -> GraphResult<()> {
        self.add_pass(name, PassKind::Render, pass, builder, false)
    }

    pub fn add_compute_pass(
        &mut self,
        name: &str,
        pass: Arc<Mutex<dyn GraphPass<B>>>,
        builder: PassBuilder<B>,
    ) -> GraphResult<()> {
        self.add_pass(name, PassKind::Compute, pass, builder, false)
    }

    /// Prepends a pass so it sequences before everything already added.
    /// Hosts use this to pin an upload pass at the head of the frame; a
    /// readback tail is just a regular `add_render_pass` added last.
    pub fn add_render_pass_front(
        &mut self,
        name: &str,
        pass: Arc<Mutex<dyn GraphPass<B>>>,
        builder: PassBuilder<B>,
    ) -> GraphResult<()> {
        self.add_pass(name, PassKind::Render, pass, builder, true)
    }

    fn add_pass(
        &mut self,
        name: &str,
        kind: PassKind,
        pass: Arc<Mutex<dyn GraphPass<B>>>,
        builder: PassBuilder<B>,
        front: bool,
    ) -> GraphResult<()> {
        if self.master_passes.iter().any(|p| p.name.as_str() == name) {
            return Err(GraphError::DuplicatePass(name.to_string()));
        }
        let entry = MasterPass {
            name: SmartString::from(name),
            kind,
            pass,
            builder,
            params: PassParameters::default(),
            stats_index: None,
        };
        if front {
            self.master_passes.insert(0, entry);
        } else {
            self.master_passes.push(entry);
        }
        Ok(())
    }

    pub fn add_resource(&mut self, resource: Arc<GraphResource<B>>) {
        self.registry.register_anonymous(resource.clone());
        self.resources_by_id
            .insert(resource.global_id(), resource);
    }

    pub fn register_resource(
        &mut self,
        id: &ResourceIdentifier,
        resource: Arc<GraphResource<B>>,
    ) -> GraphResult<()> {
        self.registry.register(id, resource.clone())?;
        self.resources_by_id
            .insert(resource.global_id(), resource);
        Ok(())
    }

    pub fn register_provider(&mut self, provider: Arc<dyn ResourceProvider<B>>) -> GraphResult<()> {
        self.registry.register_provider(provider)
    }

    pub fn register_resolver(
        &mut self,
        id: &ResourceIdentifier,
        resolver: Arc<dyn ResourceResolver<B>>,
    ) -> GraphResult<()> {
        self.registry.register_resolver(id, resolver)
    }

    /// Resolves every pass builder against the registry and rebuilds alias
    /// groups. Must run once before the first `compile_frame` and again
    /// after the pass list or providers change.
    pub fn compile_structural(&mut self) -> GraphResult<()> {
        self.batches.clear();

        for i in 0..self.master_passes.len() {
            let params = self.master_passes[i].builder.finalize(&mut self.registry)?;
            self.master_passes[i].params = params;
        }

        self.resources_by_id = self
            .registry
            .resources()
            .map(|r| (r.global_id(), r.clone()))
            .collect();

        self.build_alias_groups();
        Ok(())
    }

    /// Connected components over symmetric alias links, found with a BFS.
    /// Members of one group schedule as a single resource.
    fn build_alias_groups(&mut self) {
        self.alias_groups.clear();
        self.resource_to_alias_group.clear();

        let mut adjacency: HashMap<u64, SmallVec<[u64; 4]>> = HashMap::new();
        for resource in self.resources_by_id.values() {
            let aliases = resource.alias_ids();
            if aliases.is_empty() {
                continue;
            }
            adjacency.insert(resource.global_id(), aliases);
        }

        let mut visited: HashSet<u64> = HashSet::new();
        let mut ids: Vec<u64> = adjacency.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if visited.contains(&id) {
                continue;
            }
            let mut group = Vec::new();
            let mut queue = std::collections::VecDeque::new();
            queue.push_back(id);
            visited.insert(id);
            while let Some(current) = queue.pop_front() {
                group.push(current);
                if let Some(neighbors) = adjacency.get(&current) {
                    for &other in neighbors {
                        if visited.insert(other) {
                            queue.push_back(other);
                        }
                    }
                }
            }
            let index = self.alias_groups.len();
            for &member in &group {
                self.resource_to_alias_group.insert(member, index);
            }
            self.alias_groups.push(group);
        }
    }

    fn expand_scheduling_ids(&self, id: u64) -> SmallVec<[u64; 8]> {
        match self.resource_to_alias_group.get(&id) {
            Some(&group) => SmallVec::from_slice(&self.alias_groups[group]),
            None => {
                let mut out = SmallVec::new();
                out.push(id);
                out
            }
        }
    }

    pub(crate) fn next_graphics_fence_value(&mut self) -> u64 {
        self.graphics_fence_counter += 1;
        self.graphics_fence_counter
    }

    pub(crate) fn next_compute_fence_value(&mut self) -> u64 {
        self.compute_fence_counter += 1;
        self.compute_fence_counter
    }

    fn open_batch(&mut self) -> PassBatch<B> {
        let mut batch = PassBatch::default();
        batch.render_transition_fence_value = self.next_graphics_fence_value();
        batch.render_completion_fence_value = self.next_graphics_fence_value();
        batch.compute_transition_fence_value = self.next_compute_fence_value();
        batch.compute_completion_fence_value = self.next_compute_fence_value();
        batch
    }

    /// Re-records immediate commands, folds the discovered requirements
    /// back into each pass, and schedules the frame into batches.
    pub fn compile_frame(
        &mut self,
        frame_index: u32,
        descriptors: &dyn DescriptorSource<B>,
    ) -> GraphResult<()> {
        self.batches.clear();
        self.frame_passes.clear();

        self.record_immediate_passes(frame_index, descriptors)?;

        // Immediate recording can pull new resources in through providers.
        self.resources_by_id = self
            .registry
            .resources()
            .map(|r| (r.global_id(), r.clone()))
            .collect();

        let nodes = self.build_nodes()?;
        let nodes = Self::build_dependency_graph(nodes)?;
        self.schedule(nodes);
        self.append_loop_back_batch();
        self.deduplicate_waits();

        #[cfg(debug_assertions)]
        self.validate_batches();

        Ok(())
    }

    fn record_immediate_passes(
        &mut self,
        frame_index: u32,
        descriptors: &dyn DescriptorSource<B>,
    ) -> GraphResult<()> {
        for i in 0..self.master_passes.len() {
            let (name, kind, pass, mut params, stats_index) = {
                let mp = &self.master_passes[i];
                (
                    mp.name.clone(),
                    mp.kind,
                    mp.pass.clone(),
                    mp.params.clone(),
                    mp.stats_index,
                )
            };
            params.begin_frame();

            let frame_data = {
                let mut list = ImmediateCommandList::new(
                    &mut self.registry,
                    descriptors,
                    kind == PassKind::Render,
                );
                {
                    let mut ctx = ImmediateContext {
                        list: &mut list,
                        frame_index,
                    };
                    pass.lock().execute_immediate(&mut ctx)?;
                }
                list.finalize()
            };

            let conflict =
                requirements_conflict(&params.static_requirements, &frame_data.requirements);

            if conflict {
                // Split: the immediate half runs first, the retained half
                // follows with the original static requirements.
                let mut immediate_params = PassParameters::<B>::default();
                immediate_params.static_requirements = frame_data.requirements.clone();
                immediate_params.frame_requirements = frame_data.requirements;
                self.frame_passes.push(FramePass {
                    name: name.clone(),
                    kind,
                    pass: pass.clone(),
                    params: immediate_params,
                    bytecode: frame_data.bytecode,
                    keep_alive: frame_data.keep_alive,
                    run: PassRunMask::IMMEDIATE,
                    stats_index,
                });
                self.frame_passes.push(FramePass {
                    name,
                    kind,
                    pass,
                    params,
                    bytecode: Vec::new(),
                    keep_alive: Vec::new(),
                    run: PassRunMask::RETAINED,
                    stats_index,
                });
            } else {
                let run = if frame_data.bytecode.is_empty() {
                    PassRunMask::RETAINED
                } else {
                    PassRunMask::RETAINED | PassRunMask::IMMEDIATE
                };
                params
                    .frame_requirements
                    .extend(frame_data.requirements.into_iter());
                self.frame_passes.push(FramePass {
                    name,
                    kind,
                    pass,
                    params,
                    bytecode: frame_data.bytecode,
                    keep_alive: frame_data.keep_alive,
                    run,
                    stats_index,
                });
            }
        }
        Ok(())
    }

    fn build_nodes(&self) -> GraphResult<Vec<Node>> {
        let mut nodes = Vec::with_capacity(self.frame_passes.len());
        for (i, fp) in self.frame_passes.iter().enumerate() {
            let mut node = Node {
                pass_index: i,
                is_compute: fp.kind == PassKind::Compute,
                original_order: i as u32,
                access_by_id: HashMap::new(),
                touched_ids: Vec::new(),
                uav_ids: Vec::new(),
                out_edges: Vec::new(),
                in_edges: Vec::new(),
                indegree: 0,
                criticality: 0,
            };

            let mut touched: HashSet<u64> = HashSet::new();
            let mut uavs: HashSet<u64> = HashSet::new();
            let mut groups_touched: HashMap<usize, u64> = HashMap::new();

            let mut mark = |node: &mut Node, rid: u64, kind: AccessKind, is_uav: bool| {
                touched.insert(rid);
                if is_uav {
                    uavs.insert(rid);
                }
                node.access_by_id
                    .entry(rid)
                    .and_modify(|k| {
                        // Write dominates when a pass touches a resource twice.
                        if kind == AccessKind::Write {
                            *k = AccessKind::Write;
                        }
                    })
                    .or_insert(kind);
            };

            for req in &fp.params.frame_requirements {
                let base = req.resource.global_id();
                if let Some(&group) = self.resource_to_alias_group.get(&base) {
                    if let Some(&other) = groups_touched.get(&group) {
                        if other != base {
                            return Err(GraphError::AliasHazard(group));
                        }
                    }
                    groups_touched.insert(group, base);
                }
                let write = req.state.access.is_write();
                let is_uav = req.state.is_uav();
                for rid in self.expand_scheduling_ids(base) {
                    mark(
                        &mut node,
                        rid,
                        if write {
                            AccessKind::Write
                        } else {
                            AccessKind::Read
                        },
                        is_uav,
                    );
                }
            }

            // Internal transitions count as writes for scheduling.
            for internal in &fp.params.internal_transitions {
                let base = internal.resource.global_id();
                for rid in self.expand_scheduling_ids(base) {
                    mark(&mut node, rid, AccessKind::Write, false);
                }
            }

            node.touched_ids = touched.into_iter().collect();
            node.uav_ids = uavs.into_iter().collect();
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Dependency edges from per-resource access sequences: readers hang
    /// off the last writer, a writer depends on the last writer and every
    /// read since. Criticality is the longest remaining path.
    fn build_dependency_graph(mut nodes: Vec<Node>) -> GraphResult<Vec<Node>> {
        let mut seq: HashMap<u64, SeqState> = HashMap::new();
        let mut edge_set: HashSet<u64> = HashSet::new();

        let mut add_edge =
            |from: usize, to: usize, nodes: &mut Vec<Node>, edge_set: &mut HashSet<u64>| {
                if from == to {
                    return;
                }
                let key = ((from as u64) << 32) | to as u64;
                if !edge_set.insert(key) {
                    return;
                }
                nodes[from].out_edges.push(to);
                nodes[to].in_edges.push(from);
                nodes[to].indegree += 1;
            };

        // Dependencies follow the original declaration order.
        for i in 0..nodes.len() {
            let accesses: Vec<(u64, AccessKind)> = nodes[i]
                .access_by_id
                .iter()
                .map(|(&rid, &kind)| (rid, kind))
                .collect();
            for (rid, kind) in accesses {
                let state = seq.entry(rid).or_default();
                match kind {
                    AccessKind::Read => {
                        if let Some(writer) = state.last_writer {
                            add_edge(writer, i, &mut nodes, &mut edge_set);
                        }
                        state.reads_since_write.push(i);
                    }
                    AccessKind::Write => {
                        if let Some(writer) = state.last_writer {
                            add_edge(writer, i, &mut nodes, &mut edge_set);
                        }
                        let readers = std::mem::take(&mut state.reads_since_write);
                        state.last_writer = Some(i);
                        for reader in readers {
                            add_edge(reader, i, &mut nodes, &mut edge_set);
                        }
                    }
                }
            }
        }

        // Topological order, cycle detection and criticality in one sweep.
        let mut indegrees: Vec<u32> = nodes.iter().map(|n| n.indegree).collect();
        let mut queue: Vec<usize> = (0..nodes.len()).filter(|&i| indegrees[i] == 0).collect();
        let mut topo = Vec::with_capacity(nodes.len());
        let mut head = 0;
        while head < queue.len() {
            let u = queue[head];
            head += 1;
            topo.push(u);
            for j in 0..nodes[u].out_edges.len() {
                let v = nodes[u].out_edges[j];
                indegrees[v] -= 1;
                if indegrees[v] == 0 {
                    queue.push(v);
                }
            }
        }
        if topo.len() != nodes.len() {
            return Err(GraphError::Cycle);
        }
        for &u in topo.iter().rev() {
            let best = nodes[u]
                .out_edges
                .iter()
                .map(|&v| 1 + nodes[v].criticality)
                .max()
                .unwrap_or(0);
            nodes[u].criticality = best;
        }

        Ok(nodes)
    }

    /// Greedy list scheduling: at every step the best-scoring ready pass
    /// that fits the open batch is committed; when nothing fits, the batch
    /// closes. The fallback force-commits into an empty batch so an overly
    /// strict fit test cannot livelock the loop.
    fn schedule(&mut self, nodes: Vec<Node>) {
        let mut state = ScheduleState {
            closed: Vec::new(),
            current: self.open_batch(),
            current_index: 0,
            compute_uavs: HashSet::new(),
            render_uavs: HashSet::new(),
            render_transition_hist: HashMap::new(),
            compute_transition_hist: HashMap::new(),
            render_producer_hist: HashMap::new(),
            compute_producer_hist: HashMap::new(),
            render_usage_hist: HashMap::new(),
            compute_usage_hist: HashMap::new(),
        };

        let mut indegrees: Vec<u32> = nodes.iter().map(|n| n.indegree).collect();
        let mut ready: Vec<usize> = (0..nodes.len()).filter(|&i| indegrees[i] == 0).collect();
        let mut in_batch = vec![false; nodes.len()];
        let mut batch_members: Vec<usize> = Vec::new();
        let mut remaining = nodes.len();

        while remaining > 0 {
            let batch_has_compute = !state.current.compute_passes.is_empty();
            let batch_has_render = !state.current.render_passes.is_empty();

            let mut best: Option<(usize, f64)> = None;
            for (ri, &ni) in ready.iter().enumerate() {
                let node = &nodes[ni];
                let params = &self.frame_passes[node.pass_index].params;

                // No Render->Compute dependency within one batch.
                if node.is_compute && batch_has_render {
                    let has_render_pred_in_batch = node
                        .in_edges
                        .iter()
                        .any(|&pred| in_batch[pred] && !nodes[pred].is_compute);
                    if has_render_pred_in_batch {
                        continue;
                    }
                }

                let other_uavs = if node.is_compute {
                    &state.render_uavs
                } else {
                    &state.compute_uavs
                };
                if self.batch_split_needed(params, &state.current, other_uavs) {
                    continue;
                }

                let mut reuse = 0i32;
                let mut fresh = 0i32;
                for rid in &node.touched_ids {
                    if state.current.touched_resources.contains(rid) {
                        reuse += 1;
                    } else {
                        fresh += 1;
                    }
                }
                let mut score = 3.0 * reuse as f64 - fresh as f64;
                if node.is_compute && !batch_has_compute {
                    score += 2.0;
                }
                if !node.is_compute && !batch_has_render {
                    score += 2.0;
                }
                score += 0.05 * node.criticality as f64;
                score += 1e-6 * (nodes.len() as u32 - node.original_order) as f64;

                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((ri, score));
                }
            }

            let chosen_ready_index = match best {
                Some((ri, _)) => ri,
                None => {
                    if !state.current.is_empty() {
                        self.close_batch(&mut state, &mut in_batch, &mut batch_members);
                        continue;
                    }
                    // Nothing fits an empty batch; force the front in
                    // rather than spinning.
                    log::warn!(
                        "no ready pass fits an empty batch; forcing one in (fit test too strict?)"
                    );
                    0
                }
            };

            let node_index = ready.swap_remove(chosen_ready_index);
            self.commit_pass(&nodes[node_index], &mut state);
            in_batch[node_index] = true;
            batch_members.push(node_index);

            for &succ in &nodes[node_index].out_edges {
                indegrees[succ] -= 1;
                if indegrees[succ] == 0 {
                    ready.push(succ);
                }
            }
            remaining -= 1;
        }

        if !state.current.is_empty() {
            state.closed.push(std::mem::take(&mut state.current));
        }
        self.batches = state.closed;
    }

    fn close_batch(
        &mut self,
        state: &mut ScheduleState<B>,
        in_batch: &mut [bool],
        batch_members: &mut Vec<usize>,
    ) {
        for &member in batch_members.iter() {
            in_batch[member] = false;
        }
        batch_members.clear();

        let finished = std::mem::replace(&mut state.current, self.open_batch());
        state.closed.push(finished);
        state.compute_uavs.clear();
        state.render_uavs.clear();
        state.current_index += 1;
    }

    /// The fit test: a candidate forces a new batch when it transitions a
    /// resource the batch already drove, consumes something internally
    /// transitioned, or trips the cross-queue UAV hazard. First use of a
    /// resource in a batch never splits. Alias-group members count as one
    /// resource throughout.
    fn batch_split_needed(
        &self,
        params: &PassParameters<B>,
        batch: &PassBatch<B>,
        other_queue_uavs: &HashSet<u64>,
    ) -> bool {
        for internal in &params.internal_transitions {
            for rid in self.expand_scheduling_ids(internal.resource.global_id()) {
                if batch.touched_resources.contains(&rid) {
                    return true;
                }
            }
        }

        for req in &params.frame_requirements {
            let id = req.resource.global_id();

            for rid in self.expand_scheduling_ids(id) {
                if batch.internally_transitioned.contains(&rid) {
                    return true;
                }
                // An active alias sibling means the memory holds another
                // resource's contents; activation needs a batch boundary.
                if rid != id && batch.touched_resources.contains(&rid) {
                    return true;
                }
                if req.state.is_uav() && other_queue_uavs.contains(&rid) {
                    return true;
                }
            }

            if let Some(resource) = batch.trackers.get(&id) {
                if resource.tracker().lock().would_modify(req.range, req.state) {
                    return true;
                }
            }
        }
        false
    }

    fn commit_pass(&mut self, node: &Node, state: &mut ScheduleState<B>) {
        let pass_index = node.pass_index;
        let is_compute = node.is_compute;
        let params = self.frame_passes[pass_index].params.clone();
        let mut transitioned_this_pass: HashSet<u64> = HashSet::new();

        for req in &params.frame_requirements {
            self.add_transition(is_compute, req, state, &mut transitioned_this_pass);
            let id = req.resource.global_id();
            if req.state.access.is_write() {
                let hist = if is_compute {
                    &mut state.compute_producer_hist
                } else {
                    &mut state.render_producer_hist
                };
                hist.insert(id, state.current_index);
            }
        }

        if is_compute {
            state.current.compute_passes.push(pass_index);
        } else {
            state.current.render_passes.push(pass_index);
        }

        for internal in &params.internal_transitions {
            let id = internal.resource.global_id();
            let mut scratch = Vec::new();
            internal
                .resource
                .tracker()
                .lock()
                .apply(internal.range, id, internal.final_state, &mut scratch);
            state.current.internally_transitioned.insert(id);
        }

        for req in &params.frame_requirements {
            let id = req.resource.global_id();
            state.current.touched_resources.insert(id);
            let usage = if is_compute {
                &mut state.compute_usage_hist
            } else {
                &mut state.render_usage_hist
            };
            usage.insert(id, state.current_index);
        }

        if is_compute {
            state.compute_uavs.extend(node.uav_ids.iter().copied());
        } else {
            state.render_uavs.extend(node.uav_ids.iter().copied());
        }

        self.apply_synchronization(is_compute, &params, state, &transitioned_this_pass);
    }

    /// Applies one requirement to its tracker and routes the emitted
    /// transitions. Transitions a compute pass needs whose source sync the
    /// compute queue cannot express run at the end of the last graphics
    /// batch that touched the resource instead.
    fn add_transition(
        &mut self,
        is_compute: bool,
        req: &ResourceRequirement<B>,
        state: &mut ScheduleState<B>,
        transitioned_this_pass: &mut HashSet<u64>,
    ) {
        let resource = &req.resource;
        let id = resource.global_id();

        let mut transitions = Vec::new();
        resource
            .tracker()
            .lock()
            .apply(req.range, id, req.state, &mut transitions);

        if !transitions.is_empty() {
            transitioned_this_pass.insert(id);
        }
        state.current.trackers.insert(id, resource.clone());

        if transitions.is_empty() {
            return;
        }

        let needs_graphics_source = is_compute
            && transitions
                .iter()
                .any(|t| !t.prev.sync.is_compute_compatible());

        if needs_graphics_source {
            for transition in transitions {
                let target = state
                    .render_usage_hist
                    .get(&transition.resource_id)
                    .copied()
                    .filter(|&g| g < state.current_index && g < state.closed.len());
                match target {
                    Some(gfx_batch) => {
                        state.closed[gfx_batch]
                            .batch_end_transitions
                            .push(transition);
                        state
                            .render_transition_hist
                            .insert(transition.resource_id, gfx_batch);
                    }
                    None => {
                        log::warn!(
                            "graphics-sourced transition for resource {} has no prior graphics batch; keeping it on the compute queue",
                            transition.resource_id
                        );
                        state
                            .compute_transition_hist
                            .insert(transition.resource_id, state.current_index);
                        state.current.compute_transitions.push(transition);
                    }
                }
            }
        } else if is_compute {
            for transition in transitions {
                state
                    .compute_transition_hist
                    .insert(transition.resource_id, state.current_index);
                state.current.compute_transitions.push(transition);
            }
        } else {
            for transition in transitions {
                state
                    .render_transition_hist
                    .insert(transition.resource_id, state.current_index);
                state.current.render_transitions.push(transition);
            }
        }
    }

    /// Establishes cross-queue waits for the freshly committed pass: its
    /// transitions wait for the other queue's last transition or use of
    /// the affected resources, its execution waits for the other queue's
    /// last producer. The producing batch gets its completion signal
    /// enabled in the same step.
    fn apply_synchronization(
        &mut self,
        is_compute: bool,
        params: &PassParameters<B>,
        state: &mut ScheduleState<B>,
        transitioned_this_pass: &HashSet<u64>,
    ) {
        let (transition_hist, producer_hist, usage_hist) = if is_compute {
            (
                &state.render_transition_hist,
                &state.render_producer_hist,
                &state.render_usage_hist,
            )
        } else {
            (
                &state.compute_transition_hist,
                &state.compute_producer_hist,
                &state.compute_usage_hist,
            )
        };

        let mut latest_transition: Option<usize> = None;
        let mut latest_producer: Option<usize> = None;
        let mut latest_usage: Option<usize> = None;

        let mut fold = |slot: &mut Option<usize>, value: Option<usize>| {
            if let Some(v) = value {
                *slot = Some(slot.map_or(v, |s| s.max(v)));
            }
        };

        for req in &params.frame_requirements {
            for rid in self.expand_scheduling_ids(req.resource.global_id()) {
                fold(&mut latest_transition, transition_hist.get(&rid).copied());
                fold(&mut latest_producer, producer_hist.get(&rid).copied());
            }
        }
        // Only transitions this batch performs care about foreign usage.
        for &id in transitioned_this_pass {
            for rid in self.expand_scheduling_ids(id) {
                fold(&mut latest_usage, usage_hist.get(&rid).copied());
            }
        }

        let before_transition = latest_transition
            .into_iter()
            .chain(latest_usage)
            .max()
            .filter(|&b| b < state.current_index);
        let before_execution = latest_producer.filter(|&b| b < state.current_index);

        if let Some(b) = before_transition {
            let value = if is_compute {
                state.closed[b].render_completion_signal = true;
                state.closed[b].render_completion_fence_value
            } else {
                state.closed[b].compute_completion_signal = true;
                state.closed[b].compute_completion_fence_value
            };
            let slot = if is_compute {
                &mut state.current.compute_wait_on_render_before_transition
            } else {
                &mut state.current.render_wait_on_compute_before_transition
            };
            *slot = Some(slot.map_or(value, |v| v.max(value)));
        }

        if let Some(b) = before_execution {
            let value = if is_compute {
                state.closed[b].render_completion_signal = true;
                state.closed[b].render_completion_fence_value
            } else {
                state.closed[b].compute_completion_signal = true;
                state.closed[b].compute_completion_fence_value
            };
            let slot = if is_compute {
                &mut state.current.compute_wait_on_render_before_execution
            } else {
                &mut state.current.render_wait_on_compute_before_execution
            };
            *slot = Some(slot.map_or(value, |v| v.max(value)));
        }
    }

    /// The frame's closing batch: every tracked resource returns to
    /// `(Common, Common, All)` so the next frame starts from a known
    /// state.
    fn append_loop_back_batch(&mut self) {
        use basalt_core::gpu::{ResourceLayout, ResourceState, ResourceSync};

        let flush_state = ResourceState::new(
            ResourceAccess::COMMON,
            ResourceLayout::Common,
            ResourceSync::All,
        );

        // The flush runs on the graphics queue and may touch resources the
        // last compute batch still has in flight. The wait is elided again
        // if an earlier render wait already covers that value.
        let mut compute_wait = None;
        for batch in self.batches.iter_mut().rev() {
            if !batch.compute_passes.is_empty() {
                batch.compute_completion_signal = true;
                compute_wait = Some(batch.compute_completion_fence_value);
                break;
            }
        }

        let mut loop_batch = PassBatch::default();
        loop_batch.render_wait_on_compute_before_transition = compute_wait;
        let mut ids: Vec<u64> = self.resources_by_id.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let resource = &self.resources_by_id[&id];
            resource.tracker().lock().apply(
                RangeSpec::Whole,
                id,
                flush_state,
                &mut loop_batch.render_transitions,
            );
        }
        self.batches.push(loop_batch);
    }

    /// Clears waits whose fence value a previous wait on the same queue
    /// already satisfied.
    fn deduplicate_waits(&mut self) {
        let mut last_compute_wait = 0u64;
        let mut last_render_wait = 0u64;
        for batch in &mut self.batches {
            for wait in [
                &mut batch.compute_wait_on_render_before_transition,
                &mut batch.compute_wait_on_render_before_execution,
            ] {
                if let Some(value) = *wait {
                    if value <= last_compute_wait {
                        *wait = None;
                    } else {
                        last_compute_wait = value;
                    }
                }
            }
            for wait in [
                &mut batch.render_wait_on_compute_before_transition,
                &mut batch.render_wait_on_compute_before_execution,
            ] {
                if let Some(value) = *wait {
                    if value <= last_render_wait {
                        *wait = None;
                    } else {
                        last_render_wait = value;
                    }
                }
            }
        }
    }

    /// Debug-only sanity check: no two transitions in one batch may drive
    /// an overlapping range of the same resource to different states.
    #[cfg(debug_assertions)]
    fn validate_batches(&self) {
        use crate::tracker::ResourceTransition;

        for (bi, batch) in self.batches.iter().enumerate() {
            let all: Vec<&ResourceTransition> = batch
                .render_transitions
                .iter()
                .chain(batch.compute_transitions.iter())
                .collect();
            for (i, a) in all.iter().enumerate() {
                for b in all.iter().skip(i + 1) {
                    if a.resource_id == b.resource_id
                        && ranges_overlap(&a.range, &b.range)
                        && a.next != b.next
                    {
                        panic!(
                            "batch {} holds conflicting transitions for resource {}",
                            bi, a.resource_id
                        );
                    }
                }
            }
        }
    }
}

/// Overlapping ranges of one resource wanted in two different states by
/// the retained and immediate halves of the same pass.
fn requirements_conflict<B: GpuBackend>(
    retained: &[ResourceRequirement<B>],
    immediate: &[ResourceRequirement<B>],
) -> bool {
    for ra in retained {
        let rid = ra.resource.global_id();
        let a = ra
            .range
            .resolve(ra.resource.mip_count(), ra.resource.slice_count());
        if a.is_empty() {
            continue;
        }
        for ib in immediate {
            if ib.resource.global_id() != rid {
                continue;
            }
            let b = ib
                .range
                .resolve(ib.resource.mip_count(), ib.resource.slice_count());
            if b.is_empty() {
                continue;
            }
            if ranges_overlap(&a, &b) && ra.state != ib.state {
                return true;
            }
        }
    }
    false
}
