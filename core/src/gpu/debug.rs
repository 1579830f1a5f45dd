use std::fmt;

use super::*;

/// Command-level breadcrumb markers recorded by debug-enabled backends and
/// read back after a device removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreadcrumbOp {
    SetMarker,
    BeginEvent,
    EndEvent,
    Draw,
    DrawIndexed,
    Dispatch,
    DispatchMesh,
    ExecuteIndirect,
    CopyBufferRegion,
    CopyTextureRegion,
    CopyBufferToTexture,
    CopyTextureToBuffer,
    ClearRenderTargetView,
    ClearDepthStencilView,
    ClearUnorderedAccessView,
    ResolveSubresource,
    ResolveQueryData,
    Barrier,
    Present,
}

impl BreadcrumbOp {
    pub fn name(&self) -> &'static str {
        match self {
            BreadcrumbOp::SetMarker => "SetMarker",
            BreadcrumbOp::BeginEvent => "BeginEvent",
            BreadcrumbOp::EndEvent => "EndEvent",
            BreadcrumbOp::Draw => "Draw",
            BreadcrumbOp::DrawIndexed => "DrawIndexed",
            BreadcrumbOp::Dispatch => "Dispatch",
            BreadcrumbOp::DispatchMesh => "DispatchMesh",
            BreadcrumbOp::ExecuteIndirect => "ExecuteIndirect",
            BreadcrumbOp::CopyBufferRegion => "CopyBufferRegion",
            BreadcrumbOp::CopyTextureRegion => "CopyTextureRegion",
            BreadcrumbOp::CopyBufferToTexture => "CopyBufferToTexture",
            BreadcrumbOp::CopyTextureToBuffer => "CopyTextureToBuffer",
            BreadcrumbOp::ClearRenderTargetView => "ClearRenderTargetView",
            BreadcrumbOp::ClearDepthStencilView => "ClearDepthStencilView",
            BreadcrumbOp::ClearUnorderedAccessView => "ClearUnorderedAccessView",
            BreadcrumbOp::ResolveSubresource => "ResolveSubresource",
            BreadcrumbOp::ResolveQueryData => "ResolveQueryData",
            BreadcrumbOp::Barrier => "Barrier",
            BreadcrumbOp::Present => "Present",
        }
    }
}

/// Allocation classes a page fault can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationKind {
    CommittedResource,
    Heap,
    QueryHeap,
    DescriptorHeap,
    CommandAllocator,
    Pipeline,
    Fence,
    Internal,
}

impl AllocationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AllocationKind::CommittedResource => "CommittedResource",
            AllocationKind::Heap => "Heap",
            AllocationKind::QueryHeap => "QueryHeap",
            AllocationKind::DescriptorHeap => "DescriptorHeap",
            AllocationKind::CommandAllocator => "CommandAllocator",
            AllocationKind::Pipeline => "Pipeline",
            AllocationKind::Fence => "Fence",
            AllocationKind::Internal => "Internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreadcrumbTrail {
    pub queue: QueueKind,
    pub list_name: Option<String>,
    pub ops: Vec<BreadcrumbOp>,
    /// Index of the last op known to have completed, if the backend can
    /// narrow it down.
    pub last_completed: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PageFaultInfo {
    pub address: u64,
    pub allocation: AllocationKind,
    pub allocation_name: Option<String>,
}

/// Structured report assembled once when the device is lost.
#[derive(Debug, Clone)]
pub struct DeviceLostReport {
    pub reason: GpuError,
    pub trails: Vec<BreadcrumbTrail>,
    pub page_fault: Option<PageFaultInfo>,
}

impl fmt::Display for DeviceLostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "device lost: {}", self.reason)?;
        for trail in &self.trails {
            writeln!(
                f,
                "  queue {:?}, list {}:",
                trail.queue,
                trail.list_name.as_deref().unwrap_or("<unnamed>")
            )?;
            for (i, op) in trail.ops.iter().enumerate() {
                let marker = match trail.last_completed {
                    Some(last) if (i as u32) == last => " <- last completed",
                    _ => "",
                };
                writeln!(f, "    [{}] {}{}", i, op.name(), marker)?;
            }
        }
        if let Some(fault) = &self.page_fault {
            writeln!(
                f,
                "  page fault at {:#x} in {} allocation {}",
                fault.address,
                fault.allocation.name(),
                fault.allocation_name.as_deref().unwrap_or("<unnamed>")
            )?;
        }
        Ok(())
    }
}
