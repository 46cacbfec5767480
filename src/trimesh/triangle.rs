use core::fmt;

use crate::utils::types::{TriIdx, VertexIdx};

/// One mesh triangle: three vertex indices in counter-clockwise order plus
/// three neighbor slots.
///
/// Slot `k` holds the triangle across the edge opposite vertex `k`, or `None`
/// when that edge lies on the mesh boundary.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Triangle {
    pub vertices: [VertexIdx; 3],
    pub neighbors: [Option<TriIdx>; 3],
}

impl Triangle {
    pub const fn new(vertices: [VertexIdx; 3], neighbors: [Option<TriIdx>; 3]) -> Self {
        Self {
            vertices,
            neighbors,
        }
    }

    /// Check if `v` is one of the corners.
    pub fn has_vertex(&self, v: VertexIdx) -> bool {
        self.vertices.contains(&v)
    }

    /// The slot at which vertex `v` sits.
    pub fn slot_of(&self, v: VertexIdx) -> Option<usize> {
        self.vertices.iter().position(|&w| w == v)
    }

    /// The two endpoints of the edge opposite slot `k`, in winding order.
    pub const fn edge_opposite(&self, k: usize) -> [VertexIdx; 2] {
        [self.vertices[(k + 1) % 3], self.vertices[(k + 2) % 3]]
    }

    /// The slot whose neighbor is triangle `t`.
    pub fn neighbor_slot_to(&self, t: TriIdx) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(t))
    }

    /// Rotate the corner records so that the vertex at `slot` comes first.
    ///
    /// Vertices and neighbor slots move in one combined permutation; they are
    /// never reordered independently, which keeps slot `k` opposite vertex `k`.
    pub const fn rotated_to_front(&self, slot: usize) -> Self {
        let v = &self.vertices;
        let n = &self.neighbors;
        Self {
            vertices: [v[slot % 3], v[(slot + 1) % 3], v[(slot + 2) % 3]],
            neighbors: [n[slot % 3], n[(slot + 1) % 3], n[(slot + 2) % 3]],
        }
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Triangle: {} -> {} -> {}",
            self.vertices[0], self.vertices[1], self.vertices[2]
        )
    }
}
