use crate::{
    locate::{containing_triangle, Location},
    predicates::{circumcircle_contains, DEFAULT_TOLERANCE},
    trimesh::{TriArena, Triangle},
    utils::types::{Edge2, TriIdx, Triangle2, Vertex2, VertexIdx},
};
use anyhow::{bail, Ok, Result};
use log::error;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Number of bootstrap vertices seeded before the input points.
const NUM_BOOTSTRAP_VERTICES: usize = 3;

/// A 2D Delaunay triangulation built by incremental insertion.
///
/// Construction seeds a bootstrap super-triangle around the input, inserts
/// the points one at a time (locate, split, edge-flip repair) and finally
/// strips the bootstrap again, so the result covers exactly the convex hull
/// of the input.
///
/// ```
/// use tessella::Triangulation;
///
/// let points = vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [1.5, 2.0]];
///
/// let mut triangulation = Triangulation::new(None); // specify tolerance here
/// triangulation.triangulate(&points).unwrap();
///
/// assert_eq!(triangulation.triangles().len(), 2);
/// ```
pub struct Triangulation {
    pub mesh: TriArena,
    pub vertices: Vec<Vertex2>,
    tolerance: f64,
    time_locating: u128,
    time_splitting: u128,
    time_flipping: u128,
}

impl Default for Triangulation {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Triangulation {
    pub const fn new(tolerance: Option<f64>) -> Self {
        Self {
            mesh: TriArena::new(),
            vertices: Vec::new(),
            tolerance: match tolerance {
                Some(eps) => eps,
                None => DEFAULT_TOLERANCE,
            },
            time_locating: 0,
            time_splitting: 0,
            time_flipping: 0,
        }
    }

    /// Triangulate a set of points.
    ///
    /// Points are inserted in input order. Any previous result is discarded;
    /// nothing is retained across calls.
    pub fn triangulate(&mut self, points: &[Vertex2]) -> Result<()> {
        if points.len() < 3 {
            bail!("Needs at least 3 vertices to compute a 2D triangulation!");
        }

        self.mesh = TriArena::new();
        self.vertices.clear();
        self.time_locating = 0;
        self.time_splitting = 0;
        self.time_flipping = 0;

        let now = std::time::Instant::now();
        self.insert_bootstrap_tri(points);
        log::trace!(
            "Bootstrap triangle inserted in {:.4} µs",
            now.elapsed().as_micros()
        );

        log::debug!("Inserting {} vertices", points.len());

        for v_idx in NUM_BOOTSTRAP_VERTICES..self.vertices.len() {
            self.insert_v_helper(v_idx)?;
        }

        let now = std::time::Instant::now();
        self.strip_bootstrap()?;
        log::trace!("Bootstrap stripped in {:.4} µs", now.elapsed().as_micros());

        self.log_time();

        Ok(())
    }

    /// Seed the mesh with a super-triangle strictly containing the bounding
    /// box of `points`, with margin well over half the box extent on every
    /// side.
    ///
    /// The bootstrap vertices take indices 0, 1 and 2; the input points
    /// follow in input order.
    fn insert_bootstrap_tri(&mut self, points: &[Vertex2]) {
        let mut min = points[0];
        let mut max = points[0];
        for p in points {
            min[0] = min[0].min(p[0]);
            min[1] = min[1].min(p[1]);
            max[0] = max[0].max(p[0]);
            max[1] = max[1].max(p[1]);
        }

        let cx = (min[0] + max[0]) / 2.0;
        let cy = (min[1] + max[1]) / 2.0;
        let extent = (max[0] - min[0]).max(max[1] - min[1]);
        // A zero-extent cloud still gets a well-formed bootstrap.
        let m = if extent > 0.0 { extent } else { 1.0 };

        self.vertices.push([cx - 20.0 * m, cy - 10.0 * m]);
        self.vertices.push([cx + 20.0 * m, cy - 10.0 * m]);
        self.vertices.push([cx, cy + 20.0 * m]);
        self.vertices.extend_from_slice(points);

        self.mesh
            .insert(Triangle::new([0, 1, 2], [None, None, None]));
    }

    /// Insert one vertex: locate it, split the containing triangle(s) and
    /// repair the Delaunay property around it.
    fn insert_v_helper(&mut self, v_idx: VertexIdx) -> Result<()> {
        let v = self.vertices[v_idx];

        let now = std::time::Instant::now();
        let location = containing_triangle(&self.mesh, &self.vertices, &v, self.tolerance)?;
        self.time_locating += now.elapsed().as_micros();

        let now = std::time::Instant::now();
        let mut tris_to_verify: Vec<TriIdx> = match location {
            Location::Interior(tri) => self.mesh.split_1_to_3(tri, v_idx)?.to_vec(),
            Location::OnEdge { tri, slot, .. } => {
                self.mesh.split_2_to_4(tri, slot, v_idx)?.to_vec()
            }
        };
        self.time_splitting += now.elapsed().as_micros();

        // Lawson repair: every queued triangle has v as a corner; the edge to
        // test is the one opposite v. A flip keeps v in both results, so they
        // simply go back on the stack.
        let now = std::time::Instant::now();
        while let Some(tri_idx) = tris_to_verify.pop() {
            if let Some(slot) = self.should_flip_tri(tri_idx, v_idx)? {
                let [t0, t1] = self.mesh.flip_edge(tri_idx, slot)?;
                tris_to_verify.push(t0);
                tris_to_verify.push(t1);
            }
        }
        self.time_flipping += now.elapsed().as_micros();

        Ok(())
    }

    /// Decide whether the edge of `tri_idx` opposite the just inserted vertex
    /// has to be flipped.
    ///
    /// Returns the slot to flip across, or `None` for boundary edges, edges
    /// that are already locally Delaunay, and an opposite vertex sitting
    /// exactly on the circumcircle (the termination tie-break).
    fn should_flip_tri(&self, tri_idx: TriIdx, v_idx: VertexIdx) -> Result<Option<usize>> {
        let tri = self.mesh.get(tri_idx)?;

        let Some(slot) = tri.slot_of(v_idx) else {
            return Ok(None); // stale queue entry
        };
        let Some(nb_idx) = tri.neighbors[slot] else {
            return Ok(None); // boundary edge
        };

        let nb = self.mesh.get(nb_idx)?;
        let Some(back) = nb.neighbor_slot_to(tri_idx) else {
            bail!("Adjacency asymmetry: triangle {nb_idx} has no slot referencing {tri_idx}");
        };
        let opposite = nb.vertices[back];

        let [a, b, c] = tri.vertices.map(|v| self.vertices[v]);
        if circumcircle_contains(&a, &b, &c, &self.vertices[opposite], self.tolerance)? {
            Ok(Some(slot))
        } else {
            Ok(None)
        }
    }

    /// Remove every triangle touching a bootstrap vertex, clear the neighbor
    /// links that pointed at one and rebase the surviving vertex indices down
    /// by the bootstrap count.
    fn strip_bootstrap(&mut self) -> Result<()> {
        let doomed: Vec<TriIdx> = self
            .mesh
            .iter()
            .filter(|(_, tri)| tri.vertices.iter().any(|&v| v < NUM_BOOTSTRAP_VERTICES))
            .map(|(idx, _)| idx)
            .collect();

        for &idx in &doomed {
            self.mesh.remove(idx)?;
        }

        for idx in self.mesh.handles() {
            let mut tri = *self.mesh.get(idx)?;
            for neighbor in &mut tri.neighbors {
                if neighbor.is_some_and(|n| !self.mesh.contains(n)) {
                    *neighbor = None;
                }
            }
            for v in &mut tri.vertices {
                *v -= NUM_BOOTSTRAP_VERTICES;
            }
            *self.mesh.get_mut(idx)? = tri;
        }

        self.vertices.drain(..NUM_BOOTSTRAP_VERTICES);

        Ok(())
    }

    /// The triangles as vertex-index triples, in handle order.
    pub fn triangles(&self) -> Vec<[VertexIdx; 3]> {
        self.mesh.iter().map(|(_, tri)| tri.vertices).collect()
    }

    /// The triangles with coordinates substituted for vertex indices.
    pub fn triangles_coord(&self) -> Vec<Triangle2> {
        self.mesh
            .iter()
            .map(|(_, tri)| tri.vertices.map(|v| self.vertices[v]))
            .collect()
    }

    /// The unordered edges of the mesh, each exactly once.
    pub fn edges(&self) -> Vec<[VertexIdx; 2]> {
        let mut edges: Vec<[VertexIdx; 2]> = Vec::new();
        for (_, tri) in self.mesh.iter() {
            for k in 0..3 {
                let mut edge = tri.edge_opposite(k);
                edge.sort_unstable();
                edges.push(edge);
            }
        }
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// The edges with coordinates substituted for vertex indices.
    pub fn edges_coord(&self) -> Vec<Edge2> {
        self.edges()
            .iter()
            .map(|edge| edge.map(|v| self.vertices[v]))
            .collect()
    }

    /// Get the vertices.
    #[must_use]
    pub const fn vertices(&self) -> &Vec<Vertex2> {
        &self.vertices
    }

    /// The number of triangles in the triangulation.
    pub fn num_tris(&self) -> usize {
        self.mesh.num_tris()
    }

    /// Check the empty-circumcircle property: no vertex may lie strictly
    /// inside the circumcircle of any triangle.
    pub fn is_delaunay(&self) -> Result<bool> {
        for (_, tri) in self.mesh.iter() {
            let [a, b, c] = tri.vertices.map(|v| self.vertices[v]);

            for (v_idx, v) in self.vertices.iter().enumerate() {
                if tri.has_vertex(v_idx) {
                    continue;
                }
                if circumcircle_contains(&a, &b, &c, v, self.tolerance)? {
                    error!("Vertex {v_idx} lies inside the circumcircle of {tri}");
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Checks the empty-circumcircle property in a parallel manner using
    /// `rayon`s `par_iter()`.
    ///
    /// Returns the fraction of triangles without a violation, `1.0` meaning
    /// fully Delaunay.
    #[must_use]
    pub fn is_delaunay_p(&self) -> f64 {
        let handles = self.mesh.handles();
        if handles.is_empty() {
            return 1.0;
        }
        let num_tris = handles.len();

        let num_violated: f64 = handles
            .into_par_iter()
            .map(|tri_idx| {
                let tri = self.mesh.get(tri_idx).unwrap();
                let [a, b, c] = tri.vertices.map(|v| self.vertices[v]);

                let violation = self.vertices.iter().enumerate().find(|&(v_idx, v)| {
                    !tri.has_vertex(v_idx)
                        && circumcircle_contains(&a, &b, &c, v, self.tolerance).unwrap()
                });

                if violation.is_some() {
                    1.0
                } else {
                    0.0
                }
            })
            .sum();

        1.0 - num_violated / num_tris as f64
    }

    /// Check the structural invariants of the mesh.
    pub fn is_sound(&self) -> Result<bool> {
        if self.mesh.is_sound() {
            Ok(true)
        } else {
            error!("Triangulation is not sound!");
            Ok(false)
        }
    }

    fn log_time(&self) {
        log::debug!("-------------------------------------------");
        log::debug!("Time elapsed:");
        log::debug!("Locates computed in {} μs", self.time_locating);
        log::debug!("Splits computed in {} μs", self.time_splitting);
        log::debug!("Flips computed in {} μs", self.time_flipping);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{predicates::orientation, test_utils::sample_vertices_2d};
    use std::cmp::Ordering;

    const NUM_VERTICES_LIST: [usize; 6] = [3, 5, 10, 50, 100, 500];

    fn triangulate(points: &[Vertex2]) -> Triangulation {
        let mut triangulation = Triangulation::new(None);
        triangulation.triangulate(points).unwrap();
        triangulation
    }

    fn verify_triangulation(triangulation: &Triangulation) {
        assert!(triangulation.is_delaunay().unwrap());
        assert!(triangulation.is_sound().unwrap());
    }

    /// Triangles as coordinate triples, canonically ordered for set
    /// comparison across different insertion orders.
    fn canonical_triangles(triangulation: &Triangulation) -> Vec<Triangle2> {
        let cmp_vertices = |p: &Vertex2, q: &Vertex2| -> Ordering {
            p[0].total_cmp(&q[0]).then(p[1].total_cmp(&q[1]))
        };

        let mut tris = triangulation.triangles_coord();
        for tri in &mut tris {
            tri.sort_by(cmp_vertices);
        }
        tris.sort_by(|s, t| {
            s.iter()
                .zip(t.iter())
                .map(|(p, q)| cmp_vertices(p, q))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        tris
    }

    #[test]
    fn test_delaunay_2d() {
        for n in NUM_VERTICES_LIST {
            let vertices = sample_vertices_2d(n, None);

            let triangulation = triangulate(&vertices);

            verify_triangulation(&triangulation);
            assert_eq!(triangulation.vertices().len(), n);
        }
    }

    #[test]
    fn test_insufficient_points() {
        let mut triangulation = Triangulation::new(None);
        let result = triangulation.triangulate(&[[0.0, 0.0], [1.0, 0.0]]);

        assert!(result.is_err());
        assert_eq!(triangulation.num_tris(), 0);
    }

    #[test]
    fn test_quad_yields_two_triangles() {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [1.5, 2.0]];

        let triangulation = triangulate(&points);
        verify_triangulation(&triangulation);

        let tris = triangulation.triangles();
        assert_eq!(tris.len(), 2);

        // The two triangles share exactly one edge.
        let shared: Vec<VertexIdx> = tris[0]
            .iter()
            .filter(|v| tris[1].contains(v))
            .copied()
            .collect();
        assert_eq!(shared.len(), 2);

        // Together they cover the convex hull of the four points (area 1.25),
        // which also rules out crossing edges.
        let area: f64 = triangulation
            .triangles_coord()
            .iter()
            .map(|t| orientation(&t[0], &t[1], &t[2]) / 2.0)
            .sum();
        assert!((area - 1.25).abs() < 1e-12);

        // Quad: four hull edges plus the shared diagonal.
        assert_eq!(triangulation.edges().len(), 5);
    }

    #[test]
    fn test_point_on_edge_splits_four_ways() {
        // The first four points triangulate into two triangles sharing the
        // edge from (0, 0) to (4, 0); the fifth lies exactly on it.
        let points = [[0.0, 0.0], [4.0, 0.0], [2.0, 4.0], [2.0, -4.0], [2.0, 0.0]];

        let triangulation = triangulate(&points);
        verify_triangulation(&triangulation);

        let tris = triangulation.triangles();
        assert_eq!(tris.len(), 4);

        // All four fan around the on-edge vertex, none is degenerate and no
        // triangle repeats.
        let mut sorted: Vec<[VertexIdx; 3]> = Vec::new();
        for tri in &triangulation.triangles_coord() {
            assert!(orientation(&tri[0], &tri[1], &tri[2]).abs() > 0.0);
        }
        for tri in &tris {
            assert!(tri.contains(&4));
            let mut t = *tri;
            t.sort_unstable();
            sorted.push(t);
        }
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn test_interior_point_yields_fan() {
        // The fourth point lies inside the triangle of the first three.
        let points = [[0.0, 0.0], [6.0, 0.0], [3.0, 6.0], [3.0, 2.0]];

        let triangulation = triangulate(&points);
        verify_triangulation(&triangulation);

        let tris = triangulation.triangles();
        assert_eq!(tris.len(), 3);
        for tri in &tris {
            assert!(tri.contains(&3));
        }
    }

    #[test]
    fn test_euler_formula() {
        for n in [10, 100] {
            let vertices = sample_vertices_2d(n, None);

            let triangulation = triangulate(&vertices);

            // V - E + F = 2, counting the outer face.
            let v = triangulation.vertices().len() as i64;
            let e = triangulation.edges().len() as i64;
            let f = triangulation.num_tris() as i64 + 1;
            assert_eq!(v - e + f, 2);
        }
    }

    #[test]
    fn test_order_invariance() {
        let vertices = sample_vertices_2d(50, None);
        let mut reversed = vertices.clone();
        reversed.reverse();

        let forward = triangulate(&vertices);
        let backward = triangulate(&reversed);

        assert_eq!(
            canonical_triangles(&forward),
            canonical_triangles(&backward)
        );
    }

    #[test]
    fn test_coordinate_views_match_index_views() {
        let vertices = sample_vertices_2d(20, None);

        let triangulation = triangulate(&vertices);

        // Vertices are the input points, re-indexed from zero.
        assert_eq!(triangulation.vertices(), &vertices);

        for (tri, coords) in triangulation
            .triangles()
            .iter()
            .zip(triangulation.triangles_coord())
        {
            assert_eq!(tri.map(|v| vertices[v]), coords);
        }
        for (edge, coords) in triangulation
            .edges()
            .iter()
            .zip(triangulation.edges_coord())
        {
            assert_eq!(edge.map(|v| vertices[v]), coords);
        }
    }

    #[test]
    fn test_parallel_delaunay_check() {
        let vertices = sample_vertices_2d(200, None);

        let triangulation = triangulate(&vertices);

        assert_eq!(triangulation.is_delaunay_p(), 1.0);
    }
}
