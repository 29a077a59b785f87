//! Region quadtree over particle positions for radius queries.
//!
//! Built in one shot from a particle slice and never mutated afterward.
//! Nodes do not store their own bounds; the caller recomputes child boxes
//! during descent, which keeps a node at the size of its payload.

use crate::geometry::{Bounds, Vec2};
use crate::particle::Particle;

/// Maximum particles stored in a leaf before it splits.
pub const LEAF_CAPACITY: usize = 256;

/// Depth at which splitting stops regardless of occupancy.
///
/// More than `LEAF_CAPACITY` coincident particles can never be separated
/// by splitting; past this depth the build accepts an oversized leaf so
/// that degenerate inputs terminate. No jitter is applied, keeping the
/// build a pure function of its input.
pub const MAX_DEPTH: u32 = 24;

/// Child quadrant layout: bit 0 selects east, bit 1 selects south.
///
/// ```text
///  min ------------------+
///   |    0 (NW) | 1 (NE) |
///   |-----------+--------|
///   |    2 (SW) | 3 (SE) |
///   +------------------ max
/// ```
enum Node {
    Leaf { particles: Vec<Particle> },
    Internal { children: [Box<Node>; 4] },
}

/// Quadtree over a fixed particle population.
pub struct QuadTree {
    root: Node,
    bounds: Bounds,
}

impl QuadTree {
    /// Build a tree over `particles`, deriving the enclosing bounds from
    /// their positions.
    pub fn build(particles: &[Particle]) -> Self {
        let bounds = Bounds::enclosing(particles.iter().map(|p| p.position));
        let root = build_node(particles.to_vec(), &bounds, 0);
        Self { root, bounds }
    }

    /// Bounding box of the particles the tree was built from.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Collect every particle strictly within `radius` of `position`.
    ///
    /// `out` is cleared before the descent. Result order is a
    /// deterministic function of the tree structure: preorder over the
    /// surviving children, then leaf insertion order.
    pub fn query_into(&self, position: Vec2, radius: f32, out: &mut Vec<Particle>) {
        out.clear();
        query_node(&self.root, &self.bounds, position, radius, out);
    }
}

/// Bounds of child `quadrant` within `bounds`.
#[inline]
fn child_bounds(bounds: &Bounds, quadrant: usize) -> Bounds {
    let pivot = bounds.center();
    let half = (bounds.max - bounds.min) * 0.5;
    let min = Vec2::new(
        if quadrant & 1 != 0 { pivot.x } else { bounds.min.x },
        if quadrant & 2 != 0 { pivot.y } else { bounds.min.y },
    );
    Bounds::new(min, min + half)
}

fn build_node(particles: Vec<Particle>, bounds: &Bounds, depth: u32) -> Node {
    if particles.len() <= LEAF_CAPACITY || depth >= MAX_DEPTH {
        return Node::Leaf { particles };
    }

    let pivot = bounds.center();
    let mut quads: [Vec<Particle>; 4] = Default::default();
    for p in particles {
        // `<=` goes low, `>` goes high: the four quadrants partition the
        // plane and no particle lands in two of them.
        let east = (p.position.x > pivot.x) as usize;
        let south = (p.position.y > pivot.y) as usize;
        quads[east | (south << 1)].push(p);
    }

    let children = quads
        .into_iter()
        .enumerate()
        .map(|(i, quad)| Box::new(build_node(quad, &child_bounds(bounds, i), depth + 1)))
        .collect::<Vec<_>>()
        .try_into()
        .unwrap_or_else(|_| unreachable!("exactly four quadrants"));

    Node::Internal { children }
}

fn query_node(
    node: &Node,
    bounds: &Bounds,
    position: Vec2,
    radius: f32,
    out: &mut Vec<Particle>,
) {
    match node {
        Node::Leaf { particles } => {
            for p in particles {
                if (position - p.position).length() < radius {
                    out.push(*p);
                }
            }
        }
        Node::Internal { children } => {
            for (i, child) in children.iter().enumerate() {
                let cb = child_bounds(bounds, i);
                if cb.distance_to_point(position) <= radius {
                    query_node(child, &cb, position, radius, out);
                }
            }
        }
    }
}
