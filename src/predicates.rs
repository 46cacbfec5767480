//! Fixed-precision geometric predicates.
//!
//! All tests are signed-determinant formulations with a single tolerance
//! value threaded through by the caller. A determinant too close to zero to
//! classify (flat triangle, singular edge system) is an error, never an
//! arbitrary answer.

use anyhow::{bail, Ok, Result};
use nalgebra::{Matrix2, Matrix3, Vector2};

use crate::utils::types::Vertex2;

/// Tolerance used when the caller does not supply one.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// How a point relates to a triangle.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum PointClass {
    /// Strictly interior.
    Inside,
    /// Not in the closed triangle.
    Outside,
    /// On the edge opposite vertex slot `k` (within tolerance).
    OnEdge(usize),
}

/// Signed doubled area of the triangle `abc`; positive for counter-clockwise order.
pub fn orientation(a: &Vertex2, b: &Vertex2, c: &Vertex2) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Check if `p` lies strictly inside the circumcircle of the counter-clockwise
/// triangle `abc`.
///
/// A point within `eps` of the circle counts as outside; this tie-break is
/// what lets the flip loop terminate on co-circular input.
pub fn circumcircle_contains(
    a: &Vertex2,
    b: &Vertex2,
    c: &Vertex2,
    p: &Vertex2,
    eps: f64,
) -> Result<bool> {
    if orientation(a, b, c).abs() <= eps {
        bail!(
            "Degenerate predicate: circumcircle of a flat triangle {:?} {:?} {:?}",
            a,
            b,
            c
        );
    }

    let row = |v: &Vertex2| {
        let dx = v[0] - p[0];
        let dy = v[1] - p[1];
        [dx, dy, dx * dx + dy * dy]
    };
    let [r0, r1, r2] = [row(a), row(b), row(c)];

    #[rustfmt::skip]
    let m = Matrix3::new(
        r0[0], r0[1], r0[2],
        r1[0], r1[1], r1[2],
        r2[0], r2[1], r2[2],
    );

    Ok(m.determinant() > eps)
}

/// Classify `p` against the triangle `abc` via its parametric coordinates.
///
/// Solves `p = a + u * (b - a) + v * (c - a)` and maps `(u, v)` to
/// [PointClass]: strictly interior when `u > 0`, `v > 0`, `u + v < 1`
/// outside the `eps` band, on an edge when one of the three conditions sits
/// within the band (and the point is on that edge's segment), outside
/// otherwise.
pub fn classify_point(
    a: &Vertex2,
    b: &Vertex2,
    c: &Vertex2,
    p: &Vertex2,
    eps: f64,
) -> Result<PointClass> {
    let m = Matrix2::new(b[0] - a[0], c[0] - a[0], b[1] - a[1], c[1] - a[1]);

    if m.determinant().abs() <= eps {
        bail!(
            "Degenerate predicate: spanning edges of {:?} {:?} {:?} are collinear",
            a,
            b,
            c
        );
    }

    let rhs = Vector2::new(p[0] - a[0], p[1] - a[1]);
    let Some(uv) = m.lu().solve(&rhs) else {
        bail!("Degenerate predicate: edge system for {:?} is singular", p);
    };

    let (u, v) = (uv[0], uv[1]);
    let w = u + v;

    if u > eps && v > eps && w < 1.0 - eps {
        return Ok(PointClass::Inside);
    }

    // Edge bands, constrained to the segment. Slot k names the edge opposite
    // vertex k: v = 0 is ab (opposite c), u = 0 is ca (opposite b),
    // u + v = 1 is bc (opposite a).
    let in_range = |t: f64| (-eps..=1.0 + eps).contains(&t);
    if v.abs() <= eps && in_range(u) {
        return Ok(PointClass::OnEdge(2));
    }
    if u.abs() <= eps && in_range(v) {
        return Ok(PointClass::OnEdge(1));
    }
    if (w - 1.0).abs() <= eps && in_range(u) && in_range(v) {
        return Ok(PointClass::OnEdge(0));
    }

    Ok(PointClass::Outside)
}
