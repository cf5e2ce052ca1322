//! Rotation conversions in the host's conventions.
//!
//! Matrices are indexed `m[column][row]` and Euler angles are XYZ, applied
//! X first. A tracking rotation points a local axis at a direction while
//! keeping the local Y axis as close to world up (+Z) as possible.

/// 3x3 rotation matrix, `m[column][row]`.
pub type Matrix3 = [[f64; 3]; 3];

const WORLD_UP: [f64; 3] = [0.0, 0.0, 1.0];
const WORLD_Y: [f64; 3] = [0.0, 1.0, 0.0];

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = dot(v, v).sqrt();
    (len > f64::EPSILON).then(|| v.map(|c| c / len))
}

/// Part of `reference` orthogonal to the unit vector `axis`, normalized.
fn orthogonal_part(reference: [f64; 3], axis: [f64; 3]) -> Option<[f64; 3]> {
    let d = dot(reference, axis);
    normalize([
        reference[0] - d * axis[0],
        reference[1] - d * axis[1],
        reference[2] - d * axis[2],
    ])
}

/// Rotation matrix of a unit quaternion `(w, x, y, z)`.
#[must_use]
pub fn quaternion_to_matrix(q: [f64; 4]) -> Matrix3 {
    let s = std::f64::consts::SQRT_2;
    let (q0, q1, q2, q3) = (s * q[0], s * q[1], s * q[2], s * q[3]);

    let qda = q0 * q1;
    let qdb = q0 * q2;
    let qdc = q0 * q3;
    let qaa = q1 * q1;
    let qab = q1 * q2;
    let qac = q1 * q3;
    let qbb = q2 * q2;
    let qbc = q2 * q3;
    let qcc = q3 * q3;

    [
        [1.0 - qbb - qcc, qdc + qab, -qdb + qac],
        [-qdc + qab, 1.0 - qaa - qcc, qda + qbc],
        [qdb + qac, -qda + qbc, 1.0 - qaa - qbb],
    ]
}

/// Converts a rotation matrix to XYZ Euler angles.
///
/// Of the two equivalent Euler triples the one with the smaller total
/// magnitude is returned.
#[must_use]
pub fn matrix_to_euler(m: &Matrix3) -> [f64; 3] {
    let cy = m[0][0].hypot(m[0][1]);

    if cy > 16.0 * f64::from(f32::EPSILON) {
        let e1 = [
            m[1][2].atan2(m[2][2]),
            (-m[0][2]).atan2(cy),
            m[0][1].atan2(m[0][0]),
        ];
        let e2 = [
            (-m[1][2]).atan2(-m[2][2]),
            (-m[0][2]).atan2(-cy),
            (-m[0][1]).atan2(-m[0][0]),
        ];
        let magnitude = |e: &[f64; 3]| e.iter().map(|a| a.abs()).sum::<f64>();
        if magnitude(&e1) > magnitude(&e2) {
            e2
        } else {
            e1
        }
    } else {
        [(-m[2][1]).atan2(m[1][1]), (-m[0][2]).atan2(cy), 0.0]
    }
}

/// Rotation matrix of XYZ Euler angles.
#[must_use]
pub fn euler_to_matrix(e: [f64; 3]) -> Matrix3 {
    let (si, ci) = e[0].sin_cos();
    let (sj, cj) = e[1].sin_cos();
    let (sh, ch) = e[2].sin_cos();
    let cc = ci * ch;
    let cs = ci * sh;
    let sc = si * ch;
    let ss = si * sh;

    [
        [cj * ch, cj * sh, -sj],
        [sj * sc - cs, sj * ss + cc, cj * si],
        [sj * cc + ss, sj * cs - sc, cj * ci],
    ]
}

/// Converts a unit quaternion `(w, x, y, z)` to XYZ Euler angles.
#[must_use]
pub fn quaternion_to_euler(q: [f64; 4]) -> [f64; 3] {
    matrix_to_euler(&quaternion_to_matrix(q))
}

/// Converts XYZ Euler angles to a unit quaternion `(w, x, y, z)`.
#[must_use]
pub fn euler_to_quaternion(e: [f64; 3]) -> [f64; 4] {
    let (si, ci) = (e[0] * 0.5).sin_cos();
    let (sj, cj) = (e[1] * 0.5).sin_cos();
    let (sh, ch) = (e[2] * 0.5).sin_cos();
    let cc = ci * ch;
    let cs = ci * sh;
    let sc = si * ch;
    let ss = si * sh;

    [
        cj * cc + sj * ss,
        cj * sc - sj * cs,
        cj * ss + sj * cc,
        cj * cs - sj * sc,
    ]
}

/// `a * b`.
#[must_use]
pub fn mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// `m * v`.
#[must_use]
pub fn transform(m: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    [0, 1, 2].map(|row| (0..3).map(|k| m[k][row] * v[k]).sum())
}

/// Rotation whose local +Z axis points along `direction`, with local Y
/// kept toward world up. When `direction` is vertical, local Y is kept
/// toward world Y instead.
///
/// Returns `None` for a zero-length direction.
#[must_use]
pub fn track_z(direction: [f64; 3]) -> Option<Matrix3> {
    let z = normalize(direction)?;
    let y = orthogonal_part(WORLD_UP, z).or_else(|| orthogonal_part(WORLD_Y, z))?;
    let x = cross(y, z);
    Some([x, y, z])
}

/// Camera rotation looking along `forward` (local -Z) with local Y up.
#[must_use]
pub fn look_along(forward: [f64; 3]) -> Option<Matrix3> {
    track_z(forward.map(|c| -c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_euler_matrix_roundtrip() {
        for e in [[0.1, 0.2, 0.3], [-1.0, 0.5, 2.5], [0.0, 0.0, 0.0]] {
            assert!(close(matrix_to_euler(&euler_to_matrix(e)), e), "{e:?}");
        }
    }

    #[test]
    fn test_euler_matrix_matches_quaternion() {
        let e = [0.4, -0.3, 1.2];
        let a = euler_to_matrix(e);
        let b = quaternion_to_matrix(euler_to_quaternion(e));
        for col in 0..3 {
            assert!(close(a[col], b[col]));
        }
    }

    #[test]
    fn test_look_along_horizontal() {
        let m = look_along([0.0, 5.0, 0.0]).unwrap();
        assert!(close(matrix_to_euler(&m), [FRAC_PI_2, 0.0, 0.0]));
        assert!(close(transform(&m, [0.0, 0.0, -1.0]), [0.0, 1.0, 0.0]));
        assert!(close(transform(&m, [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_look_straight_down_is_identity() {
        let m = look_along([0.0, 0.0, -2.0]).unwrap();
        assert!(close(matrix_to_euler(&m), [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_track_z_is_orthonormal() {
        let m = track_z([1.0, -2.0, 0.5]).unwrap();
        for i in 0..3 {
            assert!((dot(m[i], m[i]) - 1.0).abs() < 1e-12);
            assert!(dot(m[i], m[(i + 1) % 3]).abs() < 1e-12);
        }
        assert!(close(cross(m[0], m[1]), m[2]));
        assert!(track_z([0.0; 3]).is_none());
    }

    #[test]
    fn test_mul_with_identity() {
        let identity = euler_to_matrix([0.0; 3]);
        let m = euler_to_matrix([0.3, 0.1, -0.7]);
        assert_eq!(mul(&m, &identity), m);
        assert!(close(
            transform(&mul(&m, &euler_to_matrix([0.0, 0.0, FRAC_PI_2])), [1.0, 0.0, 0.0]),
            transform(&m, [0.0, 1.0, 0.0])
        ));
    }
}
