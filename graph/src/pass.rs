use basalt_core::gpu::{DescriptorSlot, GpuBackend, QueueKind, UavClearInfo};

use crate::error::GraphResult;
use crate::immediate::ImmediateCommandList;
use crate::resource::GraphResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Render,
    Compute,
}

bitflags! {
  /// Which halves of a pass run this frame. A conflict between immediate
  /// and static requirements splits one logical pass into an immediate part
  /// and a retained part sharing the same body.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct PassRunMask: u8 {
    const RETAINED  = 0b1;
    const IMMEDIATE = 0b10;
  }
}

/// Hands the recorder descriptor slots for dynamically cleared targets.
/// Implemented by whoever owns the descriptor allocator; lifetime is tied
/// to the executor's scope.
pub trait DescriptorSource<B: GpuBackend>: Sync {
    fn rtv(&self, resource: &GraphResource<B>, mip: u32, slice: u32) -> Option<DescriptorSlot>;
    fn dsv(&self, resource: &GraphResource<B>, mip: u32, slice: u32) -> Option<DescriptorSlot>;
    fn uav_clear_info(
        &self,
        resource: &GraphResource<B>,
        mip: u32,
        slice: u32,
    ) -> Option<UavClearInfo>;
}

/// Descriptor source for graphs that never record dynamic clears.
pub struct NoDescriptors;

impl<B: GpuBackend> DescriptorSource<B> for NoDescriptors {
    fn rtv(&self, _: &GraphResource<B>, _: u32, _: u32) -> Option<DescriptorSlot> {
        None
    }
    fn dsv(&self, _: &GraphResource<B>, _: u32, _: u32) -> Option<DescriptorSlot> {
        None
    }
    fn uav_clear_info(&self, _: &GraphResource<B>, _: u32, _: u32) -> Option<UavClearInfo> {
        None
    }
}

/// Retained-mode execution context: the open command list for the pass's
/// queue plus per-frame values.
pub struct RenderContext<'a, B: GpuBackend> {
    pub device: &'a B::Device,
    pub cmd: &'a mut B::CommandList,
    pub queue_kind: QueueKind,
    pub frame_index: u32,
    pub frame: u64,
}

/// Immediate-mode recording context handed to `execute_immediate`.
pub struct ImmediateContext<'a, 'g, B: GpuBackend> {
    pub list: &'a mut ImmediateCommandList<'g, B>,
    pub frame_index: u32,
}

/// A pass body. `execute` records retained commands each frame after the
/// immediate bytecode replays; `execute_immediate` optionally records
/// dynamic copies and clears whose requirements fold back into the graph.
pub trait GraphPass<B: GpuBackend>: Send {
    fn execute(&mut self, ctx: &mut RenderContext<'_, B>) -> GraphResult<()>;

    fn execute_immediate(&mut self, _ctx: &mut ImmediateContext<'_, '_, B>) -> GraphResult<()> {
        Ok(())
    }
}
