use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

const DEGENERATE_PLANE_EPS: f64 = 1e-12;

/// Signed torsion angle p1-p2-p3-p4 in radians, in (-π, π].
///
/// Uses the right-hand rule: looking down p2→p3, a positive angle is a clockwise rotation
/// of p1 onto p4. Returns `None` when three consecutive points are collinear, where the
/// torsion is undefined.
pub fn dihedral_radians(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
) -> Option<f64> {
    let b1 = p2 - p1;
    let b2 = p3 - p2;
    let b3 = p4 - p3;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let b2_norm = b2.norm();
    if n1.norm_squared() < DEGENERATE_PLANE_EPS
        || n2.norm_squared() < DEGENERATE_PLANE_EPS
        || b2_norm < DEGENERATE_PLANE_EPS
    {
        return None;
    }

    let y = n1.cross(&n2).dot(&b2) / b2_norm;
    let x = n1.dot(&n2);
    Some(wrap_radians(y.atan2(x)))
}

/// Signed torsion angle in degrees, in (-180, 180].
pub fn dihedral_degrees(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
) -> Option<f64> {
    dihedral_radians(p1, p2, p3, p4).map(f64::to_degrees)
}

/// Cartesian gradient of the torsion angle with respect to the four positions.
///
/// Returns `None` for the same degenerate geometries as [`dihedral_radians`].
pub fn dihedral_gradient(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
) -> Option<[Vector3<f64>; 4]> {
    let f = p1 - p2;
    let g = p2 - p3;
    let h = p4 - p3;

    let a = f.cross(&g);
    let b = h.cross(&g);
    let a2 = a.norm_squared();
    let b2 = b.norm_squared();
    let g_norm = g.norm();
    if a2 < DEGENERATE_PLANE_EPS || b2 < DEGENERATE_PLANE_EPS || g_norm < DEGENERATE_PLANE_EPS {
        return None;
    }

    let fg = f.dot(&g);
    let hg = h.dot(&g);

    let d1 = a * (-g_norm / a2);
    let d4 = b * (g_norm / b2);
    let d2 = a * (g_norm / a2) + a * (fg / (a2 * g_norm)) - b * (hg / (b2 * g_norm));
    let d3 = b * (-g_norm / b2) - a * (fg / (a2 * g_norm)) + b * (hg / (b2 * g_norm));

    Some([d1, d2, d3, d4])
}

/// Maps an angle in degrees onto [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Maps an angle in radians onto (-π, π].
pub fn wrap_radians(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
