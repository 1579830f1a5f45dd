use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Compute,
    Copy,
}

pub const QUEUE_KIND_COUNT: usize = 3;

impl QueueKind {
    pub fn index(&self) -> usize {
        match self {
            QueueKind::Graphics => 0,
            QueueKind::Compute => 1,
            QueueKind::Copy => 2,
        }
    }
}

/// A point on a timeline: wait for it or signal it.
pub struct TimelinePoint<'a, B: GpuBackend> {
    pub timeline: &'a B::Timeline,
    pub value: u64,
}

impl<'a, B: GpuBackend> Clone for TimelinePoint<'a, B> {
    fn clone(&self) -> Self {
        Self {
            timeline: self.timeline,
            value: self.value,
        }
    }
}

pub struct Submission<'a, B: GpuBackend> {
    pub command_lists: &'a [&'a B::CommandList],
    pub waits: &'a [TimelinePoint<'a, B>],
    pub signals: &'a [TimelinePoint<'a, B>],
}

pub trait Queue<B: GpuBackend>: Send + Sync {
    fn kind(&self) -> QueueKind;
    unsafe fn submit(&self, submission: &Submission<B>) -> Result<(), GpuError>;
    unsafe fn signal(&self, point: &TimelinePoint<B>) -> Result<(), GpuError>;
    unsafe fn wait(&self, point: &TimelinePoint<B>) -> Result<(), GpuError>;
}
