use std::cell::RefCell;
use std::collections::VecDeque;

use basalt_core::gpu::{
    CommandAllocator as _, CommandList as _, Device as _, GpuBackend, Queue as _, QueueKind,
    Submission, Timeline as _, TimelinePoint, QUEUE_KIND_COUNT,
};
use thread_local::ThreadLocal;

use crate::error::{GraphError, GraphResult};

pub struct CommandListPair<B: GpuBackend> {
    pub allocator: B::CommandAllocator,
    pub list: B::CommandList,
}

/// Recycles allocator/list pairs against queue fence values. A pair handed
/// back with a fence value stays in flight until `recycle_completed` sees
/// that value finished.
pub struct CommandListPool<B: GpuBackend> {
    kind: QueueKind,
    available: Vec<CommandListPair<B>>,
    in_flight: VecDeque<(u64, CommandListPair<B>)>,
}

impl<B: GpuBackend> CommandListPool<B> {
    pub fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            available: Vec::new(),
            in_flight: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Pops a reset pair, creating one when the free list is empty.
    pub unsafe fn request(&mut self, device: &B::Device) -> GraphResult<CommandListPair<B>> {
        if let Some(mut pair) = self.available.pop() {
            pair.allocator.reset().map_err(GraphError::from_gpu)?;
            return Ok(pair);
        }
        let allocator = device
            .create_command_allocator(self.kind)
            .map_err(GraphError::from_gpu)?;
        let list = device
            .create_command_list(self.kind)
            .map_err(GraphError::from_gpu)?;
        Ok(CommandListPair { allocator, list })
    }

    pub fn recycle(&mut self, pair: CommandListPair<B>, fence_value: u64) {
        if fence_value == 0 {
            self.available.push(pair);
        } else {
            self.in_flight.push_back((fence_value, pair));
        }
    }

    /// Returns every pair whose tagged fence value has completed to the
    /// free list.
    pub fn recycle_completed(&mut self, completed_value: u64) {
        while let Some((value, _)) = self.in_flight.front() {
            if *value > completed_value {
                break;
            }
            let (_, pair) = self.in_flight.pop_front().unwrap();
            self.available.push(pair);
        }
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeMode {
    Async,
    AliasToGraphics,
}

struct QueueBinding<'d, B: GpuBackend> {
    queue: &'d B::Queue,
    timeline: &'d B::Timeline,
    pool: RefCell<CommandListPool<B>>,
}

struct PerQueueCtx<B: GpuBackend> {
    pair: CommandListPair<B>,
    epoch: u32,
    dirty: bool,
}

struct ThreadState<B: GpuBackend> {
    ctxs: [Option<PerQueueCtx<B>>; QUEUE_KIND_COUNT],
}

impl<B: GpuBackend> Default for ThreadState<B> {
    fn default() -> Self {
        Self {
            ctxs: [None, None, None],
        }
    }
}

/// Hands out one open command list per queue kind per recording thread.
/// Lists are epoch-tagged: a worker that wakes up in a new frame gets a
/// fresh list instead of appending to a stale one. In alias mode compute
/// requests are rebound to the graphics queue and no cross-queue fences
/// are touched by the caller.
pub struct CommandRecordingManager<'d, B: GpuBackend> {
    device: &'d B::Device,
    bindings: [Option<QueueBinding<'d, B>>; QUEUE_KIND_COUNT],
    compute_mode: ComputeMode,
    tls: ThreadLocal<RefCell<ThreadState<B>>>,
}

impl<'d, B: GpuBackend> CommandRecordingManager<'d, B> {
    pub fn new(
        device: &'d B::Device,
        graphics: (&'d B::Queue, &'d B::Timeline),
        compute: Option<(&'d B::Queue, &'d B::Timeline)>,
        compute_mode: ComputeMode,
    ) -> Self {
        let mut bindings: [Option<QueueBinding<'d, B>>; QUEUE_KIND_COUNT] = [None, None, None];
        bindings[QueueKind::Graphics.index()] = Some(QueueBinding {
            queue: graphics.0,
            timeline: graphics.1,
            pool: RefCell::new(CommandListPool::new(QueueKind::Graphics)),
        });
        if let Some((queue, timeline)) = compute {
            bindings[QueueKind::Compute.index()] = Some(QueueBinding {
                queue,
                timeline,
                pool: RefCell::new(CommandListPool::new(QueueKind::Compute)),
            });
        }
        Self {
            device,
            bindings,
            compute_mode,
            tls: ThreadLocal::new(),
        }
    }

    fn resolve(&self, kind: QueueKind) -> QueueKind {
        match (kind, self.compute_mode) {
            (QueueKind::Compute, ComputeMode::AliasToGraphics) => QueueKind::Graphics,
            (QueueKind::Compute, ComputeMode::Async)
                if self.bindings[QueueKind::Compute.index()].is_none() =>
            {
                QueueKind::Graphics
            }
            _ => kind,
        }
    }

    pub fn is_alias(&self) -> bool {
        self.resolve(QueueKind::Compute) == QueueKind::Graphics
    }

    fn binding(&self, kind: QueueKind) -> &QueueBinding<'d, B> {
        self.bindings[self.resolve(kind).index()]
            .as_ref()
            .expect("graphics binding always exists")
    }

    pub fn queue(&self, kind: QueueKind) -> &'d B::Queue {
        self.binding(kind).queue
    }

    pub fn timeline(&self, kind: QueueKind) -> &'d B::Timeline {
        self.binding(kind).timeline
    }

    /// Runs `f` against the calling thread's open list for `kind`,
    /// opening a new one when none exists or the frame epoch moved on.
    pub fn with_open_list<R>(
        &self,
        kind: QueueKind,
        epoch: u32,
        f: impl FnOnce(&mut B::CommandList) -> GraphResult<R>,
    ) -> GraphResult<R> {
        let kind = self.resolve(kind);
        let binding = self.binding(kind);
        let tls = self.tls.get_or_default();
        let mut tls = tls.borrow_mut();
        let ctx = &mut tls.ctxs[kind.index()];

        let stale = ctx.as_ref().map_or(false, |c| c.epoch != epoch);
        if stale {
            // A leftover list from a previous frame is submitted without a
            // signal; the end-of-frame flush already fenced its work.
            let old = ctx.take().unwrap();
            self.submit_pair(binding, old, None)?;
        }

        if ctx.is_none() {
            let mut pair = unsafe { binding.pool.borrow_mut().request(self.device)? };
            unsafe { pair.list.begin(&mut pair.allocator) }.map_err(GraphError::from_gpu)?;
            *ctx = Some(PerQueueCtx {
                pair,
                epoch,
                dirty: false,
            });
        }

        let ctx = ctx.as_mut().unwrap();
        ctx.dirty = true;
        f(&mut ctx.pair.list)
    }

    fn submit_pair(
        &self,
        binding: &QueueBinding<'d, B>,
        mut ctx: PerQueueCtx<B>,
        signal: Option<u64>,
    ) -> GraphResult<u64> {
        unsafe { ctx.pair.list.finish() }.map_err(GraphError::from_gpu)?;

        let signals: Vec<TimelinePoint<'_, B>> = signal
            .map(|value| TimelinePoint {
                timeline: binding.timeline,
                value,
            })
            .into_iter()
            .collect();
        let lists = [&ctx.pair.list];
        unsafe {
            binding.queue.submit(&Submission {
                command_lists: &lists,
                waits: &[],
                signals: &signals,
            })
        }
        .map_err(GraphError::from_gpu)?;

        let fence_value = signal.unwrap_or(0);
        binding.pool.borrow_mut().recycle(ctx.pair, fence_value);
        Ok(fence_value)
    }

    /// Closes and submits the calling thread's open list for `kind` if it
    /// recorded anything, optionally signaling the queue's timeline.
    pub fn flush(&self, kind: QueueKind, signal: Option<u64>) -> GraphResult<u64> {
        let kind = self.resolve(kind);
        let binding = self.binding(kind);
        let tls = self.tls.get_or_default();
        let mut tls = tls.borrow_mut();

        let ctx = match tls.ctxs[kind.index()].take() {
            Some(ctx) => ctx,
            None => {
                // Nothing recorded; a pure signal still has to reach the
                // queue so waiters make progress.
                if let Some(value) = signal {
                    unsafe {
                        binding.queue.signal(&TimelinePoint {
                            timeline: binding.timeline,
                            value,
                        })
                    }
                    .map_err(GraphError::from_gpu)?;
                    return Ok(value);
                }
                return Ok(0);
            }
        };

        if !ctx.dirty {
            binding.pool.borrow_mut().recycle(ctx.pair, 0);
            if let Some(value) = signal {
                unsafe {
                    binding.queue.signal(&TimelinePoint {
                        timeline: binding.timeline,
                        value,
                    })
                }
                .map_err(GraphError::from_gpu)?;
                return Ok(value);
            }
            return Ok(0);
        }

        self.submit_pair(binding, ctx, signal)
    }

    /// Recycles pool entries whose fences completed. Call once per frame
    /// after the final flush.
    pub fn end_frame(&self) {
        for binding in self.bindings.iter().flatten() {
            let completed = unsafe { binding.timeline.completed_value() };
            binding.pool.borrow_mut().recycle_completed(completed);
        }
    }
}
