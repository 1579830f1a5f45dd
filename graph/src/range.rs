use basalt_core::gpu::SubresourceRange;

/// Symbolic subresource range. Resolution against the owning resource's
/// mip and slice counts happens as late as possible so the same range can
/// describe resources of different shapes. A count of zero means "all
/// remaining from the first index".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangeSpec {
    #[default]
    Whole,
    Range {
        first_mip: u32,
        mip_count: u32,
        first_slice: u32,
        slice_count: u32,
    },
}

impl RangeSpec {
    pub fn single(mip: u32, slice: u32) -> Self {
        RangeSpec::Range {
            first_mip: mip,
            mip_count: 1,
            first_slice: slice,
            slice_count: 1,
        }
    }

    pub fn mips(first_mip: u32, mip_count: u32) -> Self {
        RangeSpec::Range {
            first_mip,
            mip_count,
            first_slice: 0,
            slice_count: 0,
        }
    }

    /// Resolves to a concrete range. Out-of-bounds first indices produce an
    /// empty range rather than clamping into neighboring subresources.
    pub fn resolve(&self, total_mips: u32, total_slices: u32) -> SubresourceRange {
        match *self {
            RangeSpec::Whole => SubresourceRange::new(0, total_mips, 0, total_slices),
            RangeSpec::Range {
                first_mip,
                mip_count,
                first_slice,
                slice_count,
            } => {
                if first_mip >= total_mips || first_slice >= total_slices {
                    return SubresourceRange::new(first_mip, 0, first_slice, 0);
                }
                let mips = if mip_count == 0 {
                    total_mips - first_mip
                } else {
                    mip_count.min(total_mips - first_mip)
                };
                let slices = if slice_count == 0 {
                    total_slices - first_slice
                } else {
                    slice_count.min(total_slices - first_slice)
                };
                SubresourceRange::new(first_mip, mips, first_slice, slices)
            }
        }
    }
}

impl From<SubresourceRange> for RangeSpec {
    fn from(r: SubresourceRange) -> Self {
        RangeSpec::Range {
            first_mip: r.first_mip,
            mip_count: r.mip_count,
            first_slice: r.first_slice,
            slice_count: r.slice_count,
        }
    }
}

pub fn ranges_overlap(a: &SubresourceRange, b: &SubresourceRange) -> bool {
    let a_mip_end = a.first_mip + a.mip_count;
    let b_mip_end = b.first_mip + b.mip_count;
    let a_slice_end = a.first_slice + a.slice_count;
    let b_slice_end = b.first_slice + b.slice_count;
    a.first_mip < b_mip_end
        && b.first_mip < a_mip_end
        && a.first_slice < b_slice_end
        && b.first_slice < a_slice_end
}

pub fn range_intersection(a: &SubresourceRange, b: &SubresourceRange) -> Option<SubresourceRange> {
    if !ranges_overlap(a, b) {
        return None;
    }
    let first_mip = a.first_mip.max(b.first_mip);
    let mip_end = (a.first_mip + a.mip_count).min(b.first_mip + b.mip_count);
    let first_slice = a.first_slice.max(b.first_slice);
    let slice_end = (a.first_slice + a.slice_count).min(b.first_slice + b.slice_count);
    Some(SubresourceRange::new(
        first_mip,
        mip_end - first_mip,
        first_slice,
        slice_end - first_slice,
    ))
}

/// Whether two disjoint rectangles share a full edge, i.e. their union is
/// itself a rectangle.
pub(crate) fn rectangles_adjacent(a: &SubresourceRange, b: &SubresourceRange) -> bool {
    if a.first_mip == b.first_mip && a.mip_count == b.mip_count {
        return a.first_slice + a.slice_count == b.first_slice
            || b.first_slice + b.slice_count == a.first_slice;
    }
    if a.first_slice == b.first_slice && a.slice_count == b.slice_count {
        return a.first_mip + a.mip_count == b.first_mip
            || b.first_mip + b.mip_count == a.first_mip;
    }
    false
}

pub(crate) fn rect_bounding(a: &SubresourceRange, b: &SubresourceRange) -> SubresourceRange {
    let first_mip = a.first_mip.min(b.first_mip);
    let mip_end = (a.first_mip + a.mip_count).max(b.first_mip + b.mip_count);
    let first_slice = a.first_slice.min(b.first_slice);
    let slice_end = (a.first_slice + a.slice_count).max(b.first_slice + b.slice_count);
    SubresourceRange::new(
        first_mip,
        mip_end - first_mip,
        first_slice,
        slice_end - first_slice,
    )
}
