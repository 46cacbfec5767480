use anyhow::{bail, Ok, Result};

use super::triangle::Triangle;
use crate::utils::types::{TriIdx, VertexIdx};

/// Arena of mesh triangles with stable handles.
///
/// Triangles reference each other by handle, so removal must never shift
/// surviving entries. A removed slot is tombstoned and recycled through a
/// free list; a handle stays valid for as long as its triangle lives.
///
/// The structural edits ([`Self::split_1_to_3`], [`Self::split_2_to_4`],
/// [`Self::flip_edge`]) produce triangles with fully wired adjacency and
/// re-point the affected outer neighbors exactly once. Where possible they
/// reuse the replaced triangles' handles, which keeps untouched outer
/// references valid without a patch.
#[derive(Debug, Default)]
pub struct TriArena {
    slots: Vec<Option<Triangle>>,
    free: Vec<TriIdx>,
}

impl TriArena {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Add a triangle, reusing a tombstoned slot when one is free.
    pub fn insert(&mut self, tri: Triangle) -> TriIdx {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(tri);
            idx
        } else {
            self.slots.push(Some(tri));
            self.slots.len() - 1
        }
    }

    /// Tombstone a triangle and recycle its slot.
    ///
    /// Neighbor slots of other triangles still referencing `idx` are the
    /// caller's responsibility; the driver clears them during the bootstrap
    /// strip.
    pub fn remove(&mut self, idx: TriIdx) -> Result<Triangle> {
        match self.slots.get_mut(idx).and_then(Option::take) {
            Some(tri) => {
                self.free.push(idx);
                Ok(tri)
            }
            None => bail!("Triangle handle {idx} is not live"),
        }
    }

    pub fn get(&self, idx: TriIdx) -> Result<&Triangle> {
        match self.slots.get(idx).and_then(Option::as_ref) {
            Some(tri) => Ok(tri),
            None => bail!("Triangle handle {idx} is not live"),
        }
    }

    pub fn get_mut(&mut self, idx: TriIdx) -> Result<&mut Triangle> {
        match self.slots.get_mut(idx).and_then(Option::as_mut) {
            Some(tri) => Ok(tri),
            None => bail!("Triangle handle {idx} is not live"),
        }
    }

    /// Check if `idx` refers to a live triangle.
    pub fn contains(&self, idx: TriIdx) -> bool {
        self.slots.get(idx).is_some_and(Option::is_some)
    }

    /// The number of live triangles.
    pub fn num_tris(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Iterate over the live triangles with their handles, in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (TriIdx, &Triangle)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|tri| (idx, tri)))
    }

    /// The handles of all live triangles, in handle order.
    pub fn handles(&self) -> Vec<TriIdx> {
        self.iter().map(|(idx, _)| idx).collect()
    }

    /// Interior split: triangle `abc` containing the new vertex `p` becomes
    /// `pbc`, `apc`, `abp`.
    ///
    /// Each new triangle inherits the outer neighbor across its outer edge;
    /// the three are mutually adjacent across the edges through `p`. The
    /// original handle is reused for `pbc`, so the outer neighbor across `bc`
    /// needs no patch.
    pub fn split_1_to_3(&mut self, t: TriIdx, p: VertexIdx) -> Result<[TriIdx; 3]> {
        let old = *self.get(t)?;
        let [a, b, c] = old.vertices;
        let [na, nb, nc] = old.neighbors;

        let t1 = self.insert(Triangle::new([a, p, c], [Some(t), nb, None]));
        let t2 = self.insert(Triangle::new([a, b, p], [Some(t), Some(t1), nc]));
        self.get_mut(t1)?.neighbors[2] = Some(t2);
        *self.get_mut(t)? = Triangle::new([p, b, c], [na, Some(t1), Some(t2)]);

        self.patch_neighbor(nb, t, t1)?;
        self.patch_neighbor(nc, t, t2)?;

        Ok([t, t1, t2])
    }

    /// Edge split: the new vertex `p` lies on the edge opposite slot `k` of
    /// `t`; `t` and its neighbor across that edge become four triangles
    /// fanned around `p`.
    ///
    /// Each of the four inherits one outer neighbor from whichever original
    /// triangle owned that edge. The handles of `t` and its neighbor are
    /// reused for the first and third result.
    pub fn split_2_to_4(&mut self, t: TriIdx, k: usize, p: VertexIdx) -> Result<[TriIdx; 4]> {
        // Rotate both triangles so their non-shared vertex comes first: t
        // becomes `b, c, a` with p on `ca`, the neighbor becomes `d, a, c`.
        let old_t = self.get(t)?.rotated_to_front(k);
        let Some(u) = old_t.neighbors[0] else {
            bail!("Edge split across a boundary edge of triangle {t}");
        };
        let uk = match self.get(u)?.neighbor_slot_to(t) {
            Some(slot) => slot,
            None => bail!("Adjacency asymmetry: triangle {u} has no slot referencing {t}"),
        };
        let old_u = self.get(u)?.rotated_to_front(uk);

        let [b, c, a] = old_t.vertices;
        let [_, nab, nbc] = old_t.neighbors;
        let [d, a2, c2] = old_u.vertices;
        let [_, ncd, nda] = old_u.neighbors;
        if [a2, c2] != [a, c] {
            bail!("Adjacency mismatch across the split edge of triangles {t} and {u}");
        }

        let t1 = self.insert(Triangle::new([b, p, a], [Some(u), nab, Some(t)]));
        let u1 = self.insert(Triangle::new([d, p, c], [Some(t), ncd, Some(u)]));
        *self.get_mut(t)? = Triangle::new([b, c, p], [Some(u1), Some(t1), nbc]);
        *self.get_mut(u)? = Triangle::new([d, a, p], [Some(t1), Some(u1), nda]);

        self.patch_neighbor(nab, t, t1)?;
        self.patch_neighbor(ncd, u, u1)?;

        Ok([t, t1, u, u1])
    }

    /// Replace the edge shared by `t` (across slot `k`) and its neighbor
    /// with the other diagonal of their quadrilateral.
    ///
    /// Both handles are reused; the two triangles keep the vertex at slot `k`
    /// of `t` as a corner.
    pub fn flip_edge(&mut self, t: TriIdx, k: usize) -> Result<[TriIdx; 2]> {
        let old_t = self.get(t)?.rotated_to_front(k);
        let Some(n) = old_t.neighbors[0] else {
            bail!("Cannot flip a boundary edge of triangle {t}");
        };
        let nk = match self.get(n)?.neighbor_slot_to(t) {
            Some(slot) => slot,
            None => bail!("Adjacency asymmetry: triangle {n} has no slot referencing {t}"),
        };
        let old_n = self.get(n)?.rotated_to_front(nk);

        let [p, u, w] = old_t.vertices;
        let [_, nwp, npu] = old_t.neighbors;
        let [d, w2, u2] = old_n.vertices;
        let [_, nud, ndw] = old_n.neighbors;
        if w2 != w || u2 != u {
            bail!("Adjacency mismatch across the flipped edge of triangles {t} and {n}");
        }

        *self.get_mut(t)? = Triangle::new([p, u, d], [nud, Some(n), npu]);
        *self.get_mut(n)? = Triangle::new([p, d, w], [ndw, nwp, Some(t)]);

        self.patch_neighbor(nud, n, t)?;
        self.patch_neighbor(nwp, t, n)?;

        Ok([t, n])
    }

    /// Check adjacency symmetry: every neighbor link must be answered by a
    /// back link across an edge with the same two endpoints.
    pub fn is_sound(&self) -> bool {
        let mut sound = true;

        for (idx, tri) in self.iter() {
            for k in 0..3 {
                let Some(nb_idx) = tri.neighbors[k] else {
                    continue;
                };
                let Some(nb) = self.slots.get(nb_idx).and_then(Option::as_ref) else {
                    log::error!("{tri}: neighbor {nb_idx} at slot {k} is not live");
                    sound = false;
                    continue;
                };
                let Some(back) = nb.neighbor_slot_to(idx) else {
                    log::error!("{tri}: neighbor {nb_idx} has no back link to {idx}");
                    sound = false;
                    continue;
                };

                let mut edge = tri.edge_opposite(k);
                let mut back_edge = nb.edge_opposite(back);
                edge.sort_unstable();
                back_edge.sort_unstable();
                if edge != back_edge {
                    log::error!("{tri}: shared edge with {nb_idx} disagrees on its endpoints");
                    sound = false;
                }
            }
        }

        sound
    }

    /// Re-point the slot of `from` that references `old` at `new`.
    ///
    /// No-op for boundary (`None`) neighbors and for handle-reusing edits
    /// where `old == new`.
    fn patch_neighbor(&mut self, from: Option<TriIdx>, old: TriIdx, new: TriIdx) -> Result<()> {
        let Some(from) = from else {
            return Ok(());
        };
        let tri = self.get_mut(from)?;
        match tri.neighbor_slot_to(old) {
            Some(k) => {
                tri.neighbors[k] = Some(new);
                Ok(())
            }
            None => bail!("Adjacency asymmetry: triangle {from} has no slot referencing {old}"),
        }
    }
}
