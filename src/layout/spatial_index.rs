// R-tree candidate pair search for overlap resolution.
//
// The tree is bulk-loaded from the current sibling rects once per pass and
// thrown away afterwards; it is never updated incrementally. Each rect queries
// the envelopes within MAX_DISPLACEMENT of it, which is O(n log n) instead of
// testing every pair. Pushes earlier in the pass can move a rect into a
// neighbour that was clear when the tree was built, so candidates are not
// limited to pairs that already overlap; the resolver re-tests every candidate
// against the live rects.

use rstar::{AABB, RTree, RTreeObject};

use super::Rect;
use super::overlap::{MAX_DISPLACEMENT, OverlapStrategy};

/// A sibling rect tagged with its index in the pass input.
#[derive(Debug, Clone, Copy)]
struct IndexedRect {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedRect {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(rect: &Rect) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.x, rect.y], [rect.right(), rect.bottom()])
}

fn reach_of(rect: &Rect) -> AABB<[f64; 2]> {
    envelope_of(&rect.pad(MAX_DISPLACEMENT, MAX_DISPLACEMENT))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialIndexStrategy;

impl OverlapStrategy for SpatialIndexStrategy {
    fn candidate_pairs(&self, rects: &[Rect]) -> Vec<(usize, usize)> {
        if rects.len() < 2 {
            return Vec::new();
        }
        let items: Vec<IndexedRect> = rects
            .iter()
            .enumerate()
            .map(|(index, r)| IndexedRect { index, envelope: envelope_of(r) })
            .collect();
        let tree = RTree::bulk_load(items);

        let mut pairs = Vec::new();
        for (i, rect) in rects.iter().enumerate() {
            for hit in tree.locate_in_envelope_intersecting(&reach_of(rect)) {
                if hit.index > i {
                    pairs.push((i, hit.index));
                }
            }
        }
        // Same processing order as the pairwise strategy.
        pairs.sort_unstable();
        pairs
    }
}
