use basalt_core::gpu::{ResourceState, SubresourceRange};

use crate::range::{range_intersection, ranges_overlap, RangeSpec};

/// One uniform-state region of the subresource plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSegment {
    pub range: SubresourceRange,
    pub state: ResourceState,
}

/// A transition a barrier has to implement. Carries both endpoints of the
/// state triple so barrier assembly never has to re-read tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTransition {
    pub resource_id: u64,
    pub range: SubresourceRange,
    pub prev: ResourceState,
    pub next: ResourceState,
}

/// Tracks `(access, layout, sync)` per subresource as a set of
/// non-overlapping segments covering the full mip x slice plane. Ranges
/// come in symbolically and are resolved against the tracked extents.
#[derive(Debug, Clone)]
pub struct StateTracker {
    mip_count: u32,
    slice_count: u32,
    segments: Vec<StateSegment>,
}

impl StateTracker {
    pub fn new(mip_count: u32, slice_count: u32, initial: ResourceState) -> Self {
        debug_assert!(mip_count > 0 && slice_count > 0);
        Self {
            mip_count,
            slice_count,
            segments: vec![StateSegment {
                range: SubresourceRange::new(0, mip_count, 0, slice_count),
                state: initial,
            }],
        }
    }

    /// Tracker for a buffer: a single subresource.
    pub fn for_buffer(initial: ResourceState) -> Self {
        Self::new(1, 1, initial)
    }

    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    pub fn slice_count(&self) -> u32 {
        self.slice_count
    }

    pub fn segments(&self) -> &[StateSegment] {
        &self.segments
    }

    /// Whether applying `want` to `range` would change any covered state.
    pub fn would_modify(&self, range: RangeSpec, want: ResourceState) -> bool {
        let target = range.resolve(self.mip_count, self.slice_count);
        if target.is_empty() {
            return false;
        }
        self.segments
            .iter()
            .any(|seg| seg.state != want && ranges_overlap(&seg.range, &target))
    }

    /// Brings `range` to `want`, emitting one transition per differing
    /// overlapped region. Segments are split around the target and adjacent
    /// equal-state segments are merged back together afterwards.
    pub fn apply(
        &mut self,
        range: RangeSpec,
        resource_id: u64,
        want: ResourceState,
        out: &mut Vec<ResourceTransition>,
    ) {
        let target = range.resolve(self.mip_count, self.slice_count);
        if target.is_empty() {
            return;
        }

        let mut rebuilt: Vec<StateSegment> = Vec::with_capacity(self.segments.len() + 4);
        let mut changed = false;

        for seg in &self.segments {
            let overlap = match range_intersection(&seg.range, &target) {
                Some(o) => o,
                None => {
                    rebuilt.push(*seg);
                    continue;
                }
            };

            if seg.state != want {
                out.push(ResourceTransition {
                    resource_id,
                    range: overlap,
                    prev: seg.state,
                    next: want,
                });
                changed = true;
            }

            // The covered part joins the target segment below; keep the
            // complement in its previous state.
            for rest in subtract(&seg.range, &overlap) {
                rebuilt.push(StateSegment {
                    range: rest,
                    state: seg.state,
                });
            }
        }

        rebuilt.push(StateSegment {
            range: target,
            state: want,
        });
        self.segments = rebuilt;
        if changed || self.segments.len() > 1 {
            self.merge();
        }
        debug_assert_eq!(self.covered_subresources(), self.mip_count * self.slice_count);
    }

    fn covered_subresources(&self) -> u32 {
        self.segments.iter().map(|s| s.range.subresource_count()).sum()
    }

    fn merge(&mut self) {
        loop {
            let mut merged = false;
            'outer: for i in 0..self.segments.len() {
                for j in (i + 1)..self.segments.len() {
                    if self.segments[i].state != self.segments[j].state {
                        continue;
                    }
                    if let Some(union) = rect_union(&self.segments[i].range, &self.segments[j].range)
                    {
                        self.segments[i].range = union;
                        self.segments.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
            if !merged {
                break;
            }
        }
    }
}

/// Rectangular complement of `hole` in `rect`. `hole` must be contained in
/// `rect`; yields up to four disjoint rectangles.
fn subtract(rect: &SubresourceRange, hole: &SubresourceRange) -> Vec<SubresourceRange> {
    let mut out = Vec::with_capacity(4);
    let rect_mip_end = rect.first_mip + rect.mip_count;
    let rect_slice_end = rect.first_slice + rect.slice_count;
    let hole_mip_end = hole.first_mip + hole.mip_count;
    let hole_slice_end = hole.first_slice + hole.slice_count;

    // Bands above and below the hole across the full slice extent of rect.
    if hole.first_mip > rect.first_mip {
        out.push(SubresourceRange::new(
            rect.first_mip,
            hole.first_mip - rect.first_mip,
            rect.first_slice,
            rect.slice_count,
        ));
    }
    if hole_mip_end < rect_mip_end {
        out.push(SubresourceRange::new(
            hole_mip_end,
            rect_mip_end - hole_mip_end,
            rect.first_slice,
            rect.slice_count,
        ));
    }
    // Left and right remainders within the hole's mip band.
    if hole.first_slice > rect.first_slice {
        out.push(SubresourceRange::new(
            hole.first_mip,
            hole.mip_count,
            rect.first_slice,
            hole.first_slice - rect.first_slice,
        ));
    }
    if hole_slice_end < rect_slice_end {
        out.push(SubresourceRange::new(
            hole.first_mip,
            hole.mip_count,
            hole_slice_end,
            rect_slice_end - hole_slice_end,
        ));
    }
    out
}

/// Union of two rectangles when the result is itself a rectangle.
fn rect_union(a: &SubresourceRange, b: &SubresourceRange) -> Option<SubresourceRange> {
    if a.first_mip == b.first_mip && a.mip_count == b.mip_count {
        if a.first_slice + a.slice_count == b.first_slice {
            return Some(SubresourceRange::new(
                a.first_mip,
                a.mip_count,
                a.first_slice,
                a.slice_count + b.slice_count,
            ));
        }
        if b.first_slice + b.slice_count == a.first_slice {
            return Some(SubresourceRange::new(
                a.first_mip,
                a.mip_count,
                b.first_slice,
                a.slice_count + b.slice_count,
            ));
        }
    }
    if a.first_slice == b.first_slice && a.slice_count == b.slice_count {
        if a.first_mip + a.mip_count == b.first_mip {
            return Some(SubresourceRange::new(
                a.first_mip,
                a.mip_count + b.mip_count,
                a.first_slice,
                a.slice_count,
            ));
        }
        if b.first_mip + b.mip_count == a.first_mip {
            return Some(SubresourceRange::new(
                b.first_mip,
                a.mip_count + b.mip_count,
                a.first_slice,
                a.slice_count,
            ));
        }
    }
    None
}
