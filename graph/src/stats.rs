use std::collections::HashMap;

use basalt_core::gpu::{
    CommandList as _, Device as _, GpuBackend, HeapKind, PipelineStatFlags, QueryKind,
    QueryPool as _, QueryPoolDesc, QueryResultInfo, QueueKind, Resource as _, ResourceDesc,
};
use smartstring::alias::String as SmartString;

use crate::error::{GraphError, GraphResult};

const EMA_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
pub struct PassTimingStats {
    pub ema_ms: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeshShadingStats {
    pub invocations_ema: f64,
    pub primitives_ema: f64,
}

struct QueueSlots<B: GpuBackend> {
    timestamp_readback: Option<B::Resource>,
    mesh_readback: Option<B::Resource>,
    /// Timestamp indices recorded per frame slot, coalesced at resolve.
    recorded: HashMap<u32, Vec<u32>>,
    /// Ranges resolved to the readback buffer, read on frame completion.
    pending: HashMap<u32, Vec<(u32, u32)>>,
}

/// Timestamp and pipeline-statistics queries around every pass, folded
/// into exponentially weighted moving averages. Two timestamp slots per
/// pass per frame in flight; one pipeline-stats slot per geometry pass.
pub struct StatisticsManager<B: GpuBackend> {
    frames_in_flight: u32,
    timestamp_frequency: u64,
    collect_pipeline_statistics: bool,

    pass_names: Vec<SmartString>,
    is_geometry: Vec<bool>,
    timing: Vec<PassTimingStats>,
    mesh_stats: Vec<MeshShadingStats>,

    timestamp_pool: Option<B::QueryPool>,
    pipeline_stats_pool: Option<B::QueryPool>,
    timestamp_info: QueryResultInfo,
    pipeline_info: QueryResultInfo,
    queues: HashMap<QueueKind, QueueSlots<B>>,
    pool_capacity: u32,
}

impl<B: GpuBackend> StatisticsManager<B> {
    pub fn new(frames_in_flight: u32, timestamp_frequency: u64) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            timestamp_frequency: timestamp_frequency.max(1),
            collect_pipeline_statistics: false,
            pass_names: Vec::new(),
            is_geometry: Vec::new(),
            timing: Vec::new(),
            mesh_stats: Vec::new(),
            timestamp_pool: None,
            pipeline_stats_pool: None,
            timestamp_info: QueryResultInfo {
                element_size: 8,
                count: 0,
            },
            pipeline_info: QueryResultInfo {
                element_size: 0,
                count: 0,
            },
            queues: HashMap::new(),
            pool_capacity: 0,
        }
    }

    pub fn set_collect_pipeline_statistics(&mut self, collect: bool) {
        self.collect_pipeline_statistics = collect;
    }

    pub fn register_pass(&mut self, name: &str, is_geometry: bool) -> u32 {
        self.pass_names.push(SmartString::from(name));
        self.is_geometry.push(is_geometry);
        self.timing.push(PassTimingStats::default());
        self.mesh_stats.push(MeshShadingStats::default());
        (self.pass_names.len() - 1) as u32
    }

    pub fn mark_geometry_pass(&mut self, index: u32) {
        if let Some(flag) = self.is_geometry.get_mut(index as usize) {
            *flag = true;
        }
    }

    pub fn pass_count(&self) -> u32 {
        self.pass_names.len() as u32
    }

    pub fn timing(&self, index: u32) -> Option<PassTimingStats> {
        self.timing.get(index as usize).copied()
    }

    pub fn mesh_shading(&self, index: u32) -> Option<MeshShadingStats> {
        self.mesh_stats.get(index as usize).copied()
    }

    pub fn register_queue(&mut self, kind: QueueKind) {
        // Slots are created lazily in setup_query_pools; remember the kind.
        self.queues.entry(kind).or_insert_with(|| QueueSlots {
            timestamp_readback: None,
            mesh_readback: None,
            recorded: HashMap::new(),
            pending: HashMap::new(),
        });
    }

    /// (Re)creates pools and readback buffers sized for the registered
    /// passes. Called again whenever the pass count outgrows the pools.
    pub unsafe fn setup_query_pools(&mut self, device: &B::Device) -> GraphResult<()> {
        let num_passes = self.pass_names.len() as u32;
        if num_passes == 0 {
            log::warn!("no passes registered; skipping query pool setup");
            return Ok(());
        }

        let timestamp_desc = QueryPoolDesc {
            kind: QueryKind::Timestamp,
            count: num_passes * 2 * self.frames_in_flight,
            stats_mask: PipelineStatFlags::empty(),
        };
        let stats_desc = QueryPoolDesc {
            kind: QueryKind::PipelineStatistics,
            count: num_passes * self.frames_in_flight,
            stats_mask: PipelineStatFlags::MESH_INVOCATIONS | PipelineStatFlags::MESH_PRIMITIVES,
        };

        let timestamp_pool = device
            .create_query_pool(&timestamp_desc)
            .map_err(GraphError::from_gpu)?;
        let pipeline_pool = device
            .create_query_pool(&stats_desc)
            .map_err(GraphError::from_gpu)?;
        self.timestamp_info = timestamp_pool.result_info();
        self.pipeline_info = pipeline_pool.result_info();

        let ts_size = self.timestamp_info.element_size * self.timestamp_info.count as u64;
        let ps_size = (self.pipeline_info.element_size * self.pipeline_info.count as u64).max(8);

        let kinds: Vec<QueueKind> = self.queues.keys().copied().collect();
        for kind in kinds {
            let ts = device
                .create_resource(
                    &ResourceDesc::buffer(ts_size, HeapKind::Readback),
                    Some("timestamp_readback"),
                )
                .map_err(GraphError::from_gpu)?;
            let ps = device
                .create_resource(
                    &ResourceDesc::buffer(ps_size, HeapKind::Readback),
                    Some("pipeline_stats_readback"),
                )
                .map_err(GraphError::from_gpu)?;
            let slots = self.queues.get_mut(&kind).unwrap();
            slots.timestamp_readback = Some(ts);
            slots.mesh_readback = Some(ps);
            slots.recorded.clear();
            slots.pending.clear();
        }

        self.timestamp_pool = Some(timestamp_pool);
        self.pipeline_stats_pool = Some(pipeline_pool);
        self.pool_capacity = num_passes;
        Ok(())
    }

    pub fn needs_pool_rebuild(&self) -> bool {
        self.pass_names.len() as u32 > self.pool_capacity
    }

    pub unsafe fn begin_query(
        &mut self,
        pass_index: u32,
        frame_index: u32,
        queue: QueueKind,
        cmd: &mut B::CommandList,
    ) {
        let num_passes = self.pass_names.len() as u32;
        if pass_index >= num_passes {
            return;
        }
        let Some(pool) = self.timestamp_pool.as_ref() else {
            return;
        };
        let ts_index = (frame_index * num_passes + pass_index) * 2;
        cmd.write_timestamp(pool, ts_index);

        if self.collect_pipeline_statistics && self.is_geometry[pass_index as usize] {
            if let Some(stats_pool) = self.pipeline_stats_pool.as_ref() {
                cmd.begin_query(stats_pool, frame_index * num_passes + pass_index);
            }
        }
        if let Some(slots) = self.queues.get_mut(&queue) {
            slots.recorded.entry(frame_index).or_default().push(ts_index);
        }
    }

    pub unsafe fn end_query(
        &mut self,
        pass_index: u32,
        frame_index: u32,
        queue: QueueKind,
        cmd: &mut B::CommandList,
    ) {
        let num_passes = self.pass_names.len() as u32;
        if pass_index >= num_passes {
            return;
        }
        let Some(pool) = self.timestamp_pool.as_ref() else {
            return;
        };
        let ts_index = (frame_index * num_passes + pass_index) * 2 + 1;
        cmd.write_timestamp(pool, ts_index);

        if self.collect_pipeline_statistics && self.is_geometry[pass_index as usize] {
            if let Some(stats_pool) = self.pipeline_stats_pool.as_ref() {
                cmd.end_query(stats_pool, frame_index * num_passes + pass_index);
            }
        }
        if let Some(slots) = self.queues.get_mut(&queue) {
            slots.recorded.entry(frame_index).or_default().push(ts_index);
        }
    }

    /// Resolves the frame's recorded timestamps as contiguous ranges into
    /// the queue's readback buffer, plus pipeline stats for geometry
    /// passes inside those ranges.
    pub unsafe fn resolve_queries(
        &mut self,
        frame_index: u32,
        queue: QueueKind,
        cmd: &mut B::CommandList,
    ) {
        let num_passes = self.pass_names.len() as u32;
        let Some(timestamp_pool) = self.timestamp_pool.as_ref() else {
            return;
        };
        let Some(slots) = self.queues.get_mut(&queue) else {
            return;
        };
        let Some(mut recorded) = slots.recorded.remove(&frame_index) else {
            return;
        };
        if recorded.is_empty() {
            return;
        }

        recorded.sort_unstable();
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        let mut start = recorded[0];
        let mut prev = recorded[0];
        for &index in &recorded[1..] {
            if index == prev + 1 {
                prev = index;
            } else {
                ranges.push((start, prev - start + 1));
                start = index;
                prev = index;
            }
        }
        ranges.push((start, prev - start + 1));

        let ts_stride = self.timestamp_info.element_size;
        let ps_stride = self.pipeline_info.element_size;

        for &(first, count) in &ranges {
            let Some(ts_readback) = slots.timestamp_readback.as_ref() else {
                return;
            };
            cmd.resolve_query_data(timestamp_pool, first, count, ts_readback, ts_stride * first as u64);
            slots.pending.entry(frame_index).or_default().push((first, count));

            if !self.collect_pipeline_statistics {
                continue;
            }
            let Some(stats_pool) = self.pipeline_stats_pool.as_ref() else {
                continue;
            };
            let mut index = first;
            while index < first + count {
                let pass = (index / 2) % num_passes;
                if self.is_geometry[pass as usize] {
                    let ps_index = frame_index * num_passes + pass;
                    if let Some(ps_readback) = slots.mesh_readback.as_ref() {
                        cmd.resolve_query_data(stats_pool, ps_index, 1, ps_readback, ps_stride * ps_index as u64);
                    }
                }
                index += 2;
            }
        }
    }

    /// Reads the frame's resolved data back and folds it into the EMAs.
    /// The caller checks fence completion first; this never blocks.
    pub unsafe fn on_frame_complete(&mut self, frame_index: u32, queue: QueueKind) {
        let num_passes = self.pass_names.len() as u32;
        if num_passes == 0 {
            return;
        }
        let ts_stride = self.timestamp_info.element_size;
        let ps_stride = self.pipeline_info.element_size;
        let to_ms = 1000.0 / self.timestamp_frequency as f64;
        let collect_stats = self.collect_pipeline_statistics;

        let mesh_field_offsets = self.pipeline_stats_pool.as_ref().map(|pool| {
            (
                pool.stat_field(PipelineStatFlags::MESH_INVOCATIONS),
                pool.stat_field(PipelineStatFlags::MESH_PRIMITIVES),
            )
        });

        let Some(slots) = self.queues.get_mut(&queue) else {
            return;
        };
        let Some(pending) = slots.pending.remove(&frame_index) else {
            return;
        };

        for (first, count) in pending {
            let map_offset = ts_stride * first as u64;
            let map_size = ts_stride * count as u64;
            let Some(ts_readback) = slots.timestamp_readback.as_ref() else {
                continue;
            };
            let Some(ts_ptr) = ts_readback.map(map_offset, map_size) else {
                continue;
            };
            let ts_bytes = std::slice::from_raw_parts(ts_ptr as *const u8, map_size as usize);

            let mut index = first;
            while index + 1 < first + count {
                let local = (index - first) as u64;
                let t0 = read_u64(ts_bytes, local * ts_stride);
                let t1 = read_u64(ts_bytes, (local + 1) * ts_stride);
                let ms = t1.saturating_sub(t0) as f64 * to_ms;

                let pass = ((index / 2) % num_passes) as usize;
                let ema = &mut self.timing[pass].ema_ms;
                *ema = *ema * (1.0 - EMA_ALPHA) + ms * EMA_ALPHA;

                if collect_stats && self.is_geometry[pass] {
                    if let Some((invocations_field, primitives_field)) = mesh_field_offsets {
                        let ps_index = (frame_index * num_passes) as u64 + (pass as u64);
                        let ps_offset = ps_stride * ps_index;
                        if let Some(ps_ptr) = slots
                            .mesh_readback
                            .as_ref()
                            .and_then(|b| b.map(ps_offset, ps_stride))
                        {
                            let ps_bytes =
                                std::slice::from_raw_parts(ps_ptr as *const u8, ps_stride as usize);
                            let mesh = &mut self.mesh_stats[pass];
                            if let Some(field) = invocations_field.filter(|f| f.supported) {
                                let v = read_u64(ps_bytes, field.byte_offset as u64) as f64;
                                mesh.invocations_ema =
                                    mesh.invocations_ema * (1.0 - EMA_ALPHA) + v * EMA_ALPHA;
                            }
                            if let Some(field) = primitives_field.filter(|f| f.supported) {
                                let v = read_u64(ps_bytes, field.byte_offset as u64) as f64;
                                mesh.primitives_ema =
                                    mesh.primitives_ema * (1.0 - EMA_ALPHA) + v * EMA_ALPHA;
                            }
                            if let Some(b) = slots.mesh_readback.as_ref() {
                                b.unmap(0, 0);
                            }
                        }
                    }
                }

                index += 2;
            }

            ts_readback.unmap(0, 0);
        }
    }

    pub fn clear_all(&mut self) {
        self.timestamp_pool = None;
        self.pipeline_stats_pool = None;
        self.pass_names.clear();
        self.is_geometry.clear();
        self.timing.clear();
        self.mesh_stats.clear();
        self.queues.clear();
        self.pool_capacity = 0;
    }
}

unsafe fn read_u64(bytes: &[u8], offset: u64) -> u64 {
    let offset = offset as usize;
    let mut value = [0u8; 8];
    value.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(value)
}
