use serde::Serialize;
use std::ops;
use thiserror::Error;

use super::constants::ORTHO_TOL;

fn float_equals(x: f64, y: f64) -> bool {
    (x - y).abs() < 1e-10
}

#[derive(Debug, Copy, Clone, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3 { x, y, z }
    }

    pub fn zero() -> Vec3 {
        Vec3::new(0.0, 0.0, 0.0)
    }

    pub fn dot(&self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm2(&self) -> f64 {
        self.dot(*self)
    }

    pub fn norm(&self) -> f64 {
        self.norm2().sqrt()
    }

    pub fn normalized(&self) -> Vec3 {
        let n = self.norm();
        Vec3::new(self.x / n, self.y / n, self.z / n)
    }

    pub fn distance(&self, other: Vec3) -> f64 {
        (*self - other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(a: [f64; 3]) -> Vec3 {
        Vec3::new(a[0], a[1], a[2])
    }
}

impl ops::Add for Vec3 {
    type Output = Self;

    fn add(self, other: Vec3) -> Self::Output {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, other: Vec3) -> Self::Output {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl ops::Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl ops::Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl ops::Div<f64> for Vec3 {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Vec3::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl PartialEq for Vec3 {
    fn eq(&self, other: &Self) -> bool {
        float_equals(self.x, other.x) && float_equals(self.y, other.y) && float_equals(self.z, other.z)
    }
}

/// Unsigned angle between two vectors, in degrees, in [0, 180].
pub fn angle_deg(a: Vec3, b: Vec3) -> f64 {
    let c = a.cross(b).norm();
    let d = a.dot(b);
    c.atan2(d).to_degrees()
}

/// Signed angle from `a` to `b` about `axis`, in degrees, in (-180, 180].
pub fn signed_angle_deg(a: Vec3, b: Vec3, axis: Vec3) -> f64 {
    let n = axis.normalized();
    let s = a.cross(b).dot(n);
    let c = a.dot(b) - a.dot(n) * b.dot(n);
    s.atan2(c).to_degrees()
}

/// 3x3 matrix, row-major. When used as a base orientation the columns are
/// the x, y and z axes of the frame expressed in world coordinates.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct Mat3 {
    pub m: [[f64; 3]; 3],
}

impl Mat3 {
    pub fn identity() -> Mat3 {
        Mat3 {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn from_cols(x: Vec3, y: Vec3, z: Vec3) -> Mat3 {
        Mat3 {
            m: [[x.x, y.x, z.x], [x.y, y.y, z.y], [x.z, y.z, z.z]],
        }
    }

    pub fn col(&self, i: usize) -> Vec3 {
        Vec3::new(self.m[0][i], self.m[1][i], self.m[2][i])
    }

    pub fn transpose(&self) -> Mat3 {
        let mut t = Mat3::identity();
        for r in 0..3 {
            for c in 0..3 {
                t.m[r][c] = self.m[c][r];
            }
        }
        t
    }

    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        )
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Rodrigues rotation about `axis` (need not be unit) by `angle_deg` degrees.
    pub fn rotation(axis: Vec3, angle_deg: f64) -> Mat3 {
        let u = axis.normalized();
        let a = angle_deg.to_radians();
        let (s, c) = a.sin_cos();
        let t = 1.0 - c;
        Mat3 {
            m: [
                [
                    t * u.x * u.x + c,
                    t * u.x * u.y - s * u.z,
                    t * u.x * u.z + s * u.y,
                ],
                [
                    t * u.x * u.y + s * u.z,
                    t * u.y * u.y + c,
                    t * u.y * u.z - s * u.x,
                ],
                [
                    t * u.x * u.z - s * u.y,
                    t * u.y * u.z + s * u.x,
                    t * u.z * u.z + c,
                ],
            ],
        }
    }

    /// Maximum absolute deviation of transpose(R)*R from the identity.
    pub fn orthonormality_error(&self) -> f64 {
        let p = self.transpose() * *self;
        let mut worst: f64 = 0.0;
        for r in 0..3 {
            for c in 0..3 {
                let target = if r == c { 1.0 } else { 0.0 };
                worst = worst.max((p.m[r][c] - target).abs());
            }
        }
        worst
    }

    pub fn is_rotation(&self) -> bool {
        self.orthonormality_error() < ORTHO_TOL && self.determinant() > 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|row| row.iter().all(|v| v.is_finite()))
    }
}

impl ops::Mul for Mat3 {
    type Output = Self;

    fn mul(self, other: Mat3) -> Self::Output {
        let mut out = Mat3::identity();
        for r in 0..3 {
            for c in 0..3 {
                let mut acc = 0.0;
                for k in 0..3 {
                    acc += self.m[r][k] * other.m[k][c];
                }
                out.m[r][c] = acc;
            }
        }
        out
    }
}

impl PartialEq for Mat3 {
    fn eq(&self, other: &Self) -> bool {
        for r in 0..3 {
            for c in 0..3 {
                if !float_equals(self.m[r][c], other.m[r][c]) {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Debug, Copy, Clone)]
struct Quaternion {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl Quaternion {
    fn to_matrix(self) -> Mat3 {
        let Quaternion { w, x, y, z } = self;
        Mat3 {
            m: [
                [
                    1.0 - 2.0 * (y * y + z * z),
                    2.0 * (x * y - w * z),
                    2.0 * (x * z + w * y),
                ],
                [
                    2.0 * (x * y + w * z),
                    1.0 - 2.0 * (x * x + z * z),
                    2.0 * (y * z - w * x),
                ],
                [
                    2.0 * (x * z - w * y),
                    2.0 * (y * z + w * x),
                    1.0 - 2.0 * (x * x + y * y),
                ],
            ],
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FitError {
    #[error("superposition needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("point sets differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("degenerate point configuration, rotation is not unique")]
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    /// Maps standard coordinates into the experimental frame.
    pub rotation: Mat3,
    /// centroid(experimental) - rotation * centroid(standard).
    pub translation: Vec3,
    pub rms: f64,
}

impl Superposition {
    pub fn apply(&self, p: Vec3) -> Vec3 {
        self.rotation.mul_vec(p) + self.translation
    }
}

fn centroid(points: &[Vec3]) -> Vec3 {
    let mut acc = Vec3::zero();
    for p in points {
        acc = acc + *p;
    }
    acc / points.len() as f64
}

/// Cyclic Jacobi diagonalisation of a symmetric 4x4 matrix. Returns the
/// eigenvalues and the matrix whose columns are the eigenvectors.
fn jacobi4(mut a: [[f64; 4]; 4]) -> ([f64; 4], [[f64; 4]; 4]) {
    let mut v = [[0.0; 4]; 4];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..64 {
        let mut off = 0.0;
        for p in 0..3 {
            for q in p + 1..4 {
                off += a[p][q] * a[p][q];
            }
        }
        if off < 1.0e-24 {
            break;
        }
        for p in 0..3 {
            for q in p + 1..4 {
                if a[p][q].abs() < 1.0e-18 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..4 {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..4 {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for k in 0..4 {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    ([a[0][0], a[1][1], a[2][2], a[3][3]], v)
}

/// Kabsch least-squares superposition of two equal-length point sets, via
/// the quaternion eigenvalue formulation. The returned rotation maps
/// `standard` onto `experimental`.
pub fn fit(standard: &[Vec3], experimental: &[Vec3]) -> Result<Superposition, FitError> {
    if standard.len() != experimental.len() {
        return Err(FitError::LengthMismatch(standard.len(), experimental.len()));
    }
    let n = standard.len();
    if n < 3 {
        return Err(FitError::TooFewPoints(n));
    }

    let cs = centroid(standard);
    let ce = centroid(experimental);

    let mut s = [[0.0; 3]; 3];
    for k in 0..n {
        let p = standard[k] - cs;
        let q = experimental[k] - ce;
        let pa = [p.x, p.y, p.z];
        let qa = [q.x, q.y, q.z];
        for a in 0..3 {
            for b in 0..3 {
                s[a][b] += pa[a] * qa[b];
            }
        }
    }

    let key = [
        [
            s[0][0] + s[1][1] + s[2][2],
            s[1][2] - s[2][1],
            s[2][0] - s[0][2],
            s[0][1] - s[1][0],
        ],
        [
            s[1][2] - s[2][1],
            s[0][0] - s[1][1] - s[2][2],
            s[0][1] + s[1][0],
            s[2][0] + s[0][2],
        ],
        [
            s[2][0] - s[0][2],
            s[0][1] + s[1][0],
            s[1][1] - s[0][0] - s[2][2],
            s[1][2] + s[2][1],
        ],
        [
            s[0][1] - s[1][0],
            s[2][0] + s[0][2],
            s[1][2] + s[2][1],
            s[2][2] - s[0][0] - s[1][1],
        ],
    ];

    let (eigenvalues, vectors) = jacobi4(key);
    let mut best = 0;
    for i in 1..4 {
        if eigenvalues[i] > eigenvalues[best] {
            best = i;
        }
    }
    let mut second = f64::NEG_INFINITY;
    for (i, &ev) in eigenvalues.iter().enumerate() {
        if i != best && ev > second {
            second = ev;
        }
    }
    let scale = eigenvalues[best].abs().max(1.0);
    if (eigenvalues[best] - second) / scale < 1.0e-9 {
        return Err(FitError::Degenerate);
    }

    let q = Quaternion {
        w: vectors[0][best],
        x: vectors[1][best],
        y: vectors[2][best],
        z: vectors[3][best],
    };
    let rotation = q.to_matrix();
    if !rotation.is_finite() || !rotation.is_rotation() {
        return Err(FitError::Degenerate);
    }
    let translation = ce - rotation.mul_vec(cs);

    let mut dev2 = 0.0;
    for k in 0..n {
        let mapped = rotation.mul_vec(standard[k]) + translation;
        dev2 += (mapped - experimental[k]).norm2();
    }
    let rms = (dev2 / n as f64).sqrt();

    Ok(Superposition {
        rotation,
        translation,
        rms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_ops() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-1.0, 0.5, 2.0);
        assert_eq!(a + b, Vec3::new(0.0, 2.5, 5.0));
        assert_eq!(a - b, Vec3::new(2.0, 1.5, 1.0));
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert!(float_equals(a.dot(b), 7.0));
    }

    #[test]
    fn vec3_cross_follows_right_hand_rule() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(x), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn angle_measures() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        let z = Vec3::new(0.0, 0.0, 1.0);
        assert!((angle_deg(x, y) - 90.0).abs() < 1e-12);
        assert!((angle_deg(x, x) - 0.0).abs() < 1e-12);
        assert!((signed_angle_deg(x, y, z) - 90.0).abs() < 1e-12);
        assert!((signed_angle_deg(y, x, z) + 90.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_about_z() {
        let r = Mat3::rotation(Vec3::new(0.0, 0.0, 1.0), 90.0);
        let v = r.mul_vec(Vec3::new(1.0, 0.0, 0.0));
        assert!((v - Vec3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert!(r.is_rotation());
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn matrix_product_and_transpose() {
        let a = Mat3::rotation(Vec3::new(0.0, 0.0, 1.0), 30.0);
        let b = Mat3::rotation(Vec3::new(0.0, 0.0, 1.0), 60.0);
        let ab = a * b;
        let expected = Mat3::rotation(Vec3::new(0.0, 0.0, 1.0), 90.0);
        assert_eq!(ab, expected);
        assert_eq!(a.transpose() * a, Mat3::identity());
    }

    #[test]
    fn fit_recovers_known_rotation() {
        let standard = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 0.5),
        ];
        let r = Mat3::rotation(Vec3::new(0.3, -0.5, 1.0), 47.0);
        let t = Vec3::new(5.0, -2.0, 1.5);
        let experimental: Vec<Vec3> = standard.iter().map(|p| r.mul_vec(*p) + t).collect();

        let sup = fit(&standard, &experimental).unwrap();
        assert!(sup.rms < 1e-9);
        for rr in 0..3 {
            for cc in 0..3 {
                assert!((sup.rotation.m[rr][cc] - r.m[rr][cc]).abs() < 1e-9);
            }
        }
        assert!((sup.translation - t).norm() < 1e-9);
    }

    #[test]
    fn fit_is_self_inverse() {
        let standard = vec![
            Vec3::new(0.2, 0.1, 0.0),
            Vec3::new(1.1, -0.4, 0.3),
            Vec3::new(-0.7, 0.9, -0.2),
            Vec3::new(0.4, 1.3, 0.8),
            Vec3::new(-1.0, -1.0, 0.1),
        ];
        let r = Mat3::rotation(Vec3::new(1.0, 2.0, -1.0), -112.0);
        let t = Vec3::new(-3.0, 7.0, 0.25);
        let experimental: Vec<Vec3> = standard.iter().map(|p| r.mul_vec(*p) + t).collect();

        let sup = fit(&standard, &experimental).unwrap();
        let mapped: Vec<Vec3> = standard.iter().map(|p| sup.apply(*p)).collect();
        let again = fit(&mapped, &experimental).unwrap();
        assert!(again.rms <= 1e-6);
        assert!((again.rotation.m[0][0] - 1.0).abs() < 1e-6);
        assert!((again.rotation.m[1][1] - 1.0).abs() < 1e-6);
        assert!((again.rotation.m[2][2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fit_reports_residual_rms() {
        // Two flat triangles, one slightly scaled: rms must be non-zero.
        let standard = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-0.5, 0.8, 0.0),
            Vec3::new(-0.5, -0.8, 0.0),
        ];
        let experimental = vec![
            Vec3::new(1.1, 0.0, 0.0),
            Vec3::new(-0.55, 0.88, 0.0),
            Vec3::new(-0.55, -0.88, 0.0),
        ];
        let sup = fit(&standard, &experimental).unwrap();
        assert!(sup.rms > 0.01 && sup.rms < 0.2);
    }

    #[test]
    fn fit_rejects_small_and_mismatched_input() {
        let two = vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)];
        assert_eq!(fit(&two, &two), Err(FitError::TooFewPoints(2)));

        let three = vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        assert_eq!(
            fit(&two, &three),
            Err(FitError::LengthMismatch(2, 3))
        );
    }

    #[test]
    fn fit_rejects_collinear_points() {
        let line: Vec<Vec3> = (0..5).map(|i| Vec3::new(i as f64, 0.0, 0.0)).collect();
        assert_eq!(fit(&line, &line), Err(FitError::Degenerate));
    }
}
