//! Point location by scanning the live triangles.

use anyhow::{bail, Ok, Result};

use crate::{
    predicates::{classify_point, PointClass},
    trimesh::TriArena,
    utils::types::{TriIdx, Vertex2},
};

/// Where a query point landed in the mesh.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Location {
    /// Strictly inside one triangle.
    Interior(TriIdx),
    /// On the edge opposite `slot` of `tri`, shared with `neighbor`.
    OnEdge {
        tri: TriIdx,
        neighbor: TriIdx,
        slot: usize,
    },
}

/// Find the triangle containing `p`, or the pair of triangles straddling the
/// edge `p` lies on.
///
/// The on-edge partner comes from the stored adjacency slot, never from a
/// second scan. A point no live triangle contains is out of bounds; the
/// bootstrap triangle is built with margin, so this only happens for input
/// that violates the caller's contract.
pub fn containing_triangle(
    arena: &TriArena,
    vertices: &[Vertex2],
    p: &Vertex2,
    eps: f64,
) -> Result<Location> {
    for (idx, tri) in arena.iter() {
        let [a, b, c] = tri.vertices.map(|v| vertices[v]);

        match classify_point(&a, &b, &c, p, eps)? {
            PointClass::Inside => return Ok(Location::Interior(idx)),
            PointClass::OnEdge(slot) => {
                let Some(neighbor) = tri.neighbors[slot] else {
                    bail!("Point {p:?} out of bounds: it lies on a boundary edge");
                };
                return Ok(Location::OnEdge {
                    tri: idx,
                    neighbor,
                    slot,
                });
            }
            PointClass::Outside => (),
        }
    }

    bail!("Point {p:?} out of bounds: no triangle contains it")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{predicates::DEFAULT_TOLERANCE, trimesh::Triangle};

    /// Two counter-clockwise triangles sharing the edge (0, 2):
    /// a unit square split along its diagonal.
    fn square_mesh() -> (TriArena, Vec<Vertex2>) {
        let vertices = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut arena = TriArena::new();
        let t0 = arena.insert(Triangle::new([0, 1, 2], [None, None, None]));
        let t1 = arena.insert(Triangle::new([0, 2, 3], [None, None, None]));
        arena.get_mut(t0).unwrap().neighbors[1] = Some(t1);
        arena.get_mut(t1).unwrap().neighbors[2] = Some(t0);
        assert!(arena.is_sound());

        (arena, vertices)
    }

    #[test]
    fn test_locate_interior() {
        let (arena, vertices) = square_mesh();

        let location =
            containing_triangle(&arena, &vertices, &[0.75, 0.25], DEFAULT_TOLERANCE).unwrap();
        assert_eq!(location, Location::Interior(0));

        let location =
            containing_triangle(&arena, &vertices, &[0.25, 0.75], DEFAULT_TOLERANCE).unwrap();
        assert_eq!(location, Location::Interior(1));
    }

    #[test]
    fn test_locate_on_shared_edge() {
        let (arena, vertices) = square_mesh();

        // The diagonal (0, 2) is opposite vertex 1 in the first triangle and
        // opposite vertex 3 in the second.
        let location =
            containing_triangle(&arena, &vertices, &[0.5, 0.5], DEFAULT_TOLERANCE).unwrap();
        match location {
            Location::OnEdge {
                tri,
                neighbor,
                slot,
            } => {
                let mut edge = arena.get(tri).unwrap().edge_opposite(slot);
                edge.sort_unstable();
                assert_eq!(edge, [0, 2]);
                assert!(arena.get(neighbor).unwrap().neighbor_slot_to(tri).is_some());
            }
            Location::Interior(_) => panic!("expected the on-edge case"),
        }
    }

    #[test]
    fn test_locate_on_boundary_edge_fails() {
        let (arena, vertices) = square_mesh();

        // (0.5, 0.0) lies on the bottom boundary edge, which has no neighbor.
        let result = containing_triangle(&arena, &vertices, &[0.5, 0.0], DEFAULT_TOLERANCE);
        assert!(result.is_err());
    }

    #[test]
    fn test_locate_out_of_bounds_fails() {
        let (arena, vertices) = square_mesh();

        let result = containing_triangle(&arena, &vertices, &[2.0, 2.0], DEFAULT_TOLERANCE);
        assert!(result.is_err());
    }
}
