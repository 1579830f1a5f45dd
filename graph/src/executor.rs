use std::collections::VecDeque;

use basalt_core::gpu::{
    CommandList as _, Device as _, GpuBackend, GpuError, QueueKind, Queue as _, Timeline as _,
    TimelinePoint,
};

use crate::barriers::assemble_barriers;
use crate::error::{GraphError, GraphResult};
use crate::graph::RenderGraph;
use crate::pass::{DescriptorSource, PassRunMask, RenderContext};
use crate::recording::{CommandRecordingManager, ComputeMode};
use crate::stats::StatisticsManager;
use crate::tracker::ResourceTransition;

/// Process-wide knobs injected into the executor; the graph itself stays
/// free of global state.
#[derive(Debug, Clone, Copy)]
pub struct GraphSettings {
    pub use_async_compute: bool,
    pub collect_pipeline_statistics: bool,
    pub frames_in_flight: u32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            use_async_compute: true,
            collect_pipeline_statistics: false,
            frames_in_flight: 2,
        }
    }
}

/// Per-frame inputs to `FrameExecutor::execute`.
pub struct FrameContext<'a, B: GpuBackend> {
    pub device: &'a B::Device,
    pub descriptors: &'a dyn DescriptorSource<B>,
    /// Slot in the frames-in-flight ring.
    pub frame_index: u32,
    /// Monotone frame number, also used as the start-of-frame fence value.
    pub frame: u64,
}

struct PendingFrame {
    frame: u64,
    frame_index: u32,
    graphics_value: u64,
    compute_value: u64,
    async_compute: bool,
}

/// Owns the per-queue timelines and drives a compiled graph through one
/// frame: recompile, replay immediate bytecode, emit barriers, fence the
/// queues, recycle command lists. A device-lost error latches and fails
/// every later frame.
pub struct FrameExecutor<B: GpuBackend> {
    graphics_timeline: B::Timeline,
    compute_timeline: B::Timeline,
    frame_start_timeline: B::Timeline,
    stats: StatisticsManager<B>,
    settings: GraphSettings,
    pending_frames: VecDeque<PendingFrame>,
    device_lost: Option<GpuError>,
}

impl<B: GpuBackend> FrameExecutor<B> {
    pub fn new(device: &B::Device, settings: GraphSettings) -> GraphResult<Self> {
        let graphics_timeline =
            unsafe { device.create_timeline(0) }.map_err(GraphError::from_gpu)?;
        let compute_timeline =
            unsafe { device.create_timeline(0) }.map_err(GraphError::from_gpu)?;
        let frame_start_timeline =
            unsafe { device.create_timeline(0) }.map_err(GraphError::from_gpu)?;

        let mut stats = StatisticsManager::new(
            settings.frames_in_flight,
            device.timestamp_frequency(QueueKind::Graphics),
        );
        stats.register_queue(QueueKind::Graphics);
        if settings.use_async_compute && device.queue(QueueKind::Compute).is_some() {
            stats.register_queue(QueueKind::Compute);
        }

        Ok(Self {
            graphics_timeline,
            compute_timeline,
            frame_start_timeline,
            stats,
            settings,
            pending_frames: VecDeque::new(),
            device_lost: None,
        })
    }

    pub fn stats(&self) -> &StatisticsManager<B> {
        &self.stats
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.is_some()
    }

    /// Runs one frame. Compilation errors abort the frame and leave the
    /// device untouched; device-lost errors latch.
    pub fn execute(
        &mut self,
        graph: &mut RenderGraph<B>,
        ctx: &FrameContext<'_, B>,
    ) -> GraphResult<()> {
        if let Some(reason) = self.device_lost {
            return Err(GraphError::DeviceLost(reason));
        }

        let result = self.execute_inner(graph, ctx);
        if let Err(GraphError::DeviceLost(reason)) = &result {
            self.device_lost = Some(*reason);
            graph.device_lost = Some(*reason);
            if let Some(report) = unsafe { ctx.device.device_lost_report() } {
                log::error!("{}", report);
            } else {
                log::error!("device lost: {}", reason);
            }
        }
        result
    }

    fn execute_inner(
        &mut self,
        graph: &mut RenderGraph<B>,
        ctx: &FrameContext<'_, B>,
    ) -> GraphResult<()> {
        // Register newly added passes with the statistics surface before
        // compiling so frame passes inherit their indices.
        for mp in &mut graph.master_passes {
            if mp.stats_index.is_none() {
                let index = self
                    .stats
                    .register_pass(&mp.name, mp.params.is_geometry_pass);
                mp.stats_index = Some(index);
            }
        }
        if self.stats.needs_pool_rebuild() {
            unsafe { self.stats.setup_query_pools(ctx.device)? };
        }
        self.stats
            .set_collect_pipeline_statistics(self.settings.collect_pipeline_statistics);

        graph.compile_frame(ctx.frame_index, ctx.descriptors)?;

        // Read back statistics for frames whose fences completed. Never
        // blocks; frames that are still in flight stay queued.
        unsafe {
            let graphics_done = self.graphics_timeline.completed_value();
            let compute_done = self.compute_timeline.completed_value();
            while let Some(front) = self.pending_frames.front() {
                let ready = graphics_done >= front.graphics_value
                    && (!front.async_compute || compute_done >= front.compute_value);
                if !ready {
                    break;
                }
                let front = self.pending_frames.pop_front().unwrap();
                self.stats.on_frame_complete(front.frame_index, QueueKind::Graphics);
                if front.async_compute {
                    self.stats.on_frame_complete(front.frame_index, QueueKind::Compute);
                }
                ctx.device.flush_deletion_queue(front.frame);
            }
        }

        let graphics_queue = ctx
            .device
            .queue(QueueKind::Graphics)
            .ok_or(GraphError::Gpu(GpuError::NotFound))?;
        let compute_queue = if self.settings.use_async_compute {
            ctx.device.queue(QueueKind::Compute)
        } else {
            None
        };

        let mode = if compute_queue.is_some() {
            ComputeMode::Async
        } else {
            ComputeMode::AliasToGraphics
        };
        let Self {
            graphics_timeline,
            compute_timeline,
            frame_start_timeline,
            stats,
            settings: _,
            pending_frames,
            device_lost: _,
        } = self;

        let manager = CommandRecordingManager::<B>::new(
            ctx.device,
            (graphics_queue, &*graphics_timeline),
            compute_queue.map(|q| (q, &*compute_timeline)),
            mode,
        );
        let alias = manager.is_alias();
        let epoch = ctx.frame as u32;

        unsafe {
            // Inter-frame start sync so async compute never races resources
            // still written at the end of the previous frame's graphics work.
            if !alias {
                manager
                    .queue(QueueKind::Graphics)
                    .signal(&TimelinePoint {
                        timeline: &*frame_start_timeline,
                        value: ctx.frame,
                    })
                    .map_err(GraphError::from_gpu)?;
                manager
                    .queue(QueueKind::Compute)
                    .wait(&TimelinePoint {
                        timeline: &*frame_start_timeline,
                        value: ctx.frame,
                    })
                    .map_err(GraphError::from_gpu)?;
            }

            for batch in &graph.batches {
                // Compute side of the batch.
                if let Some(value) = batch.compute_wait_on_render_before_transition {
                    if !alias {
                        manager
                            .queue(QueueKind::Compute)
                            .wait(&TimelinePoint {
                                timeline: &*graphics_timeline,
                                value,
                            })
                            .map_err(GraphError::from_gpu)?;
                    }
                }

                if !batch.compute_transitions.is_empty() {
                    record_transitions(graph, &manager, QueueKind::Compute, epoch, &batch.compute_transitions)?;
                }

                if let Some(value) = batch.compute_wait_on_render_before_execution {
                    if !alias {
                        manager
                            .queue(QueueKind::Compute)
                            .wait(&TimelinePoint {
                                timeline: &*graphics_timeline,
                                value,
                            })
                            .map_err(GraphError::from_gpu)?;
                    }
                }

                if batch.compute_transition_signal && !alias {
                    manager.flush(
                        QueueKind::Compute,
                        Some(batch.compute_transition_fence_value),
                    )?;
                }

                run_passes(
                    graph,
                    stats,
                    &manager,
                    &batch.compute_passes,
                    QueueKind::Compute,
                    ctx,
                    epoch,
                )?;

                if batch.compute_completion_signal && !alias {
                    manager.flush(
                        QueueKind::Compute,
                        Some(batch.compute_completion_fence_value),
                    )?;
                }

                // Graphics side of the batch.
                if let Some(value) = batch.render_wait_on_compute_before_transition {
                    if !alias {
                        manager
                            .queue(QueueKind::Graphics)
                            .wait(&TimelinePoint {
                                timeline: &*compute_timeline,
                                value,
                            })
                            .map_err(GraphError::from_gpu)?;
                    }
                }

                if !batch.render_transitions.is_empty() {
                    record_transitions(graph, &manager, QueueKind::Graphics, epoch, &batch.render_transitions)?;
                }

                if batch.render_transition_signal && !alias {
                    manager.flush(
                        QueueKind::Graphics,
                        Some(batch.render_transition_fence_value),
                    )?;
                }

                if let Some(value) = batch.render_wait_on_compute_before_execution {
                    if !alias {
                        manager
                            .queue(QueueKind::Graphics)
                            .wait(&TimelinePoint {
                                timeline: &*compute_timeline,
                                value,
                            })
                            .map_err(GraphError::from_gpu)?;
                    }
                }

                let signal_now =
                    batch.batch_end_transitions.is_empty() && batch.render_completion_signal;

                run_passes(
                    graph,
                    stats,
                    &manager,
                    &batch.render_passes,
                    QueueKind::Graphics,
                    ctx,
                    epoch,
                )?;

                if signal_now && !alias {
                    manager.flush(
                        QueueKind::Graphics,
                        Some(batch.render_completion_fence_value),
                    )?;
                }

                // Cross-queue hand-off: end-of-batch transitions run on the
                // producing graphics queue after its last pass.
                if !batch.batch_end_transitions.is_empty() {
                    record_transitions(
                        graph,
                        &manager,
                        QueueKind::Graphics,
                        epoch,
                        &batch.batch_end_transitions,
                    )?;
                    if !alias {
                        manager.flush(
                            QueueKind::Graphics,
                            Some(batch.render_completion_fence_value),
                        )?;
                    }
                }
            }

            // End of frame: flush leftovers with a final signal per queue so
            // statistics readback and pool recycling can track completion.
            let graphics_end = graph.next_graphics_fence_value();
            let compute_end = graph.next_compute_fence_value();
            manager.flush(QueueKind::Graphics, Some(graphics_end))?;
            if !alias {
                manager.flush(QueueKind::Compute, Some(compute_end))?;
            }
            manager.end_frame();

            pending_frames.push_back(PendingFrame {
                frame: ctx.frame,
                frame_index: ctx.frame_index,
                graphics_value: graphics_end,
                compute_value: compute_end,
                async_compute: !alias,
            });
        }

        Ok(())
    }
}

fn record_transitions<B: GpuBackend>(
    graph: &RenderGraph<B>,
    manager: &CommandRecordingManager<'_, B>,
    kind: QueueKind,
    epoch: u32,
    transitions: &[ResourceTransition],
) -> GraphResult<()> {
    manager.with_open_list(kind, epoch, |cmd| {
        let batch = assemble_barriers::<B, _>(transitions, |id| {
            graph.resources_by_id.get(&id).map(|arc| arc.as_ref())
        });
        if !batch.is_empty() {
            unsafe { cmd.barriers(&batch) };
        }
        Ok(())
    })
}

fn run_passes<B: GpuBackend>(
    graph: &RenderGraph<B>,
    stats: &mut StatisticsManager<B>,
    manager: &CommandRecordingManager<'_, B>,
    pass_indices: &[usize],
    kind: QueueKind,
    ctx: &FrameContext<'_, B>,
    epoch: u32,
) -> GraphResult<()> {
    if pass_indices.is_empty() {
        return Ok(());
    }
    for &pass_index in pass_indices {
        let fp = &graph.frame_passes[pass_index];
        manager.with_open_list(kind, epoch, |cmd| {
            unsafe { cmd.begin_label(&fp.name) };

            if fp.run.contains(PassRunMask::IMMEDIATE) && !fp.bytecode.is_empty() {
                unsafe { crate::immediate::replay::<B>(&fp.bytecode, cmd, &graph.registry)? };
            }

            if let Some(stats_index) = fp.stats_index {
                unsafe { stats.begin_query(stats_index, ctx.frame_index, kind, cmd) };
            }

            if fp.run.contains(PassRunMask::RETAINED) {
                let mut render_ctx = RenderContext {
                    device: ctx.device,
                    cmd: &mut *cmd,
                    queue_kind: kind,
                    frame_index: ctx.frame_index,
                    frame: ctx.frame,
                };
                fp.pass.lock().execute(&mut render_ctx)?;
            }

            if let Some(stats_index) = fp.stats_index {
                unsafe { stats.end_query(stats_index, ctx.frame_index, kind, cmd) };
            }

            unsafe { cmd.end_label() };
            Ok(())
        })?;
    }

    manager.with_open_list(kind, epoch, |cmd| {
        unsafe { stats.resolve_queries(ctx.frame_index, kind, cmd) };
        Ok(())
    })?;
    Ok(())
}
