use basalt_core::gpu::{
    BarrierBatch, BufferBarrier, GpuBackend, ResourceLayout, TextureBarrier,
};

use crate::resource::GraphResource;
use crate::tracker::ResourceTransition;

/// Assembles tracker transitions into one backend barrier batch. Texture
/// and buffer forms are picked by dimensionality; adjacent ranges on the
/// same resource with identical state endpoints collapse into one record.
pub fn assemble_barriers<'a, B, F>(
    transitions: &[ResourceTransition],
    mut resolve: F,
) -> BarrierBatch<'a, B>
where
    B: GpuBackend,
    F: FnMut(u64) -> Option<&'a GraphResource<B>>,
{
    let mut batch = BarrierBatch::<B>::default();

    for transition in transitions {
        let resource = match resolve(transition.resource_id) {
            Some(r) => r,
            None => {
                log::warn!(
                    "transition references unknown resource {}",
                    transition.resource_id
                );
                continue;
            }
        };

        if resource.desc().is_buffer() {
            batch.buffers.push(BufferBarrier {
                buffer: resource.backend(),
                offset: 0,
                length: resource.desc().buffer_size(),
                old_sync: transition.prev.sync,
                new_sync: transition.next.sync,
                old_access: transition.prev.access,
                new_access: transition.next.access,
                queue_ownership: None,
            });
        } else {
            let discard = transition.prev.layout == ResourceLayout::Undefined;
            let barrier = TextureBarrier {
                texture: resource.backend(),
                range: transition.range,
                old_sync: transition.prev.sync,
                new_sync: transition.next.sync,
                old_access: transition.prev.access,
                new_access: transition.next.access,
                old_layout: transition.prev.layout,
                new_layout: transition.next.layout,
                discard,
                queue_ownership: None,
            };

            if let Some(last) = batch.textures.last_mut() {
                if last.texture == barrier.texture && can_collapse(last, &barrier) {
                    last.range = merged_range(&last.range, &barrier.range);
                    continue;
                }
            }
            batch.textures.push(barrier);
        }
    }

    batch
}

fn can_collapse<B: GpuBackend>(a: &TextureBarrier<B>, b: &TextureBarrier<B>) -> bool {
    a.old_sync == b.old_sync
        && a.new_sync == b.new_sync
        && a.old_access == b.old_access
        && a.new_access == b.new_access
        && a.old_layout == b.old_layout
        && a.new_layout == b.new_layout
        && a.discard == b.discard
        && crate::range::rectangles_adjacent(&a.range, &b.range)
}

fn merged_range(
    a: &basalt_core::gpu::SubresourceRange,
    b: &basalt_core::gpu::SubresourceRange,
) -> basalt_core::gpu::SubresourceRange {
    crate::range::rect_bounding(a, b)
}
