//! 4x4 matrix utilities for placing solids and building cameras
//!
//! Matrices are column-major (`m[column][row]`), matching the WGSL `mat4x4<f32>`
//! layout so they can be uploaded without transposition. Projection matrices
//! map depth to wgpu's `[0, 1]` clip range.

use crate::Vec3;

/// 4x4 matrix type (column-major)
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multiply two 4x4 matrices: result = a * b
///
/// In column-major convention, this applies b first, then a.
#[allow(clippy::needless_range_loop)]
pub fn mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut result = [[0.0f32; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }

    result
}

/// Transform a homogeneous vector: result = M * v
pub fn transform(m: Mat4, v: [f32; 4]) -> [f32; 4] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2] + m[3][0] * v[3],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2] + m[3][1] * v[3],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2] + m[3][2] * v[3],
        m[0][3] * v[0] + m[1][3] * v[1] + m[2][3] * v[2] + m[3][3] * v[3],
    ]
}

/// Transform a point (w = 1) by an affine matrix
pub fn transform_point(m: Mat4, p: Vec3) -> Vec3 {
    let r = transform(m, [p.x, p.y, p.z, 1.0]);
    Vec3::new(r[0], r[1], r[2])
}

/// Transform a direction (w = 0) by an affine matrix
pub fn transform_vector(m: Mat4, v: Vec3) -> Vec3 {
    let r = transform(m, [v.x, v.y, v.z, 0.0]);
    Vec3::new(r[0], r[1], r[2])
}

/// Translation matrix
pub fn translation(t: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[3][0] = t.x;
    m[3][1] = t.y;
    m[3][2] = t.z;
    m
}

/// Non-uniform scale matrix
pub fn scaling(s: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[0][0] = s.x;
    m[1][1] = s.y;
    m[2][2] = s.z;
    m
}

/// Create a rotation matrix in the plane of two axes (0=X, 1=Y, 2=Z).
///
/// Rotates axis `p1` towards axis `p2` by `angle` radians.
pub fn plane_rotation(angle: f32, p1: usize, p2: usize) -> Mat4 {
    let cs = angle.cos();
    let sn = angle.sin();

    let mut m = IDENTITY;
    m[p1][p1] = cs;
    m[p2][p2] = cs;
    m[p1][p2] = sn;
    m[p2][p1] = -sn;
    m
}

/// Rotation about the X axis (radians)
pub fn rotation_x(angle: f32) -> Mat4 {
    plane_rotation(angle, 1, 2)
}

/// Rotation about the Y axis (radians)
pub fn rotation_y(angle: f32) -> Mat4 {
    plane_rotation(angle, 2, 0)
}

/// Rotation about the Z axis (radians)
pub fn rotation_z(angle: f32) -> Mat4 {
    plane_rotation(angle, 0, 1)
}

/// Euler rotation in degrees, applied X first, then Y, then Z.
pub fn rotation_euler_degrees(angles: Vec3) -> Mat4 {
    let rx = rotation_x(angles.x.to_radians());
    let ry = rotation_y(angles.y.to_radians());
    let rz = rotation_z(angles.z.to_radians());
    mul(rz, mul(ry, rx))
}

/// Compose translate * rotate * scale
pub fn compose(translate: Vec3, rotate_degrees: Vec3, scale: Vec3) -> Mat4 {
    mul(translation(translate), mul(rotation_euler_degrees(rotate_degrees), scaling(scale)))
}

/// Right-handed perspective projection with depth mapped to `[0, 1]`
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov_y / 2.0).tan();
    let nf = 1.0 / (near - far);

    [
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, far * nf, -1.0],
        [0.0, 0.0, near * far * nf, 0.0],
    ]
}

/// Right-handed look-at view matrix
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let f = (target - eye).normalized();
    let s = f.cross(up).normalized();
    let u = s.cross(f);

    [
        [s.x, u.x, -f.x, 0.0],
        [s.y, u.y, -f.y, 0.0],
        [s.z, u.z, -f.z, 0.0],
        [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
    ]
}

/// Transpose a matrix
pub fn transpose(m: Mat4) -> Mat4 {
    [
        [m[0][0], m[1][0], m[2][0], m[3][0]],
        [m[0][1], m[1][1], m[2][1], m[3][1]],
        [m[0][2], m[1][2], m[2][2], m[3][2]],
        [m[0][3], m[1][3], m[2][3], m[3][3]],
    ]
}

/// Determinant of the upper-left 3x3 (linear) part
///
/// Negative for transforms that mirror geometry, which flips triangle winding.
pub fn determinant3(m: Mat4) -> f32 {
    m[0][0] * (m[1][1] * m[2][2] - m[2][1] * m[1][2])
        - m[1][0] * (m[0][1] * m[2][2] - m[2][1] * m[0][2])
        + m[2][0] * (m[0][1] * m[1][2] - m[1][1] * m[0][2])
}

/// Inverse-transpose of the linear part, embedded in a 4x4 matrix
///
/// Used to carry normals through non-uniform scaling. Singular matrices
/// fall back to the identity.
pub fn normal_matrix(m: Mat4) -> Mat4 {
    let det = determinant3(m);
    if det.abs() < f32::EPSILON {
        return IDENTITY;
    }
    let inv_det = 1.0 / det;

    // Cofactor matrix of the 3x3 block equals det * inverse-transpose.
    let c = |a: usize, b: usize, c: usize, d: usize| m[a][b] * m[c][d];
    let mut r = IDENTITY;
    r[0][0] = (c(1, 1, 2, 2) - c(2, 1, 1, 2)) * inv_det;
    r[0][1] = (c(2, 0, 1, 2) - c(1, 0, 2, 2)) * inv_det;
    r[0][2] = (c(1, 0, 2, 1) - c(2, 0, 1, 1)) * inv_det;
    r[1][0] = (c(2, 1, 0, 2) - c(0, 1, 2, 2)) * inv_det;
    r[1][1] = (c(0, 0, 2, 2) - c(2, 0, 0, 2)) * inv_det;
    r[1][2] = (c(2, 0, 0, 1) - c(0, 0, 2, 1)) * inv_det;
    r[2][0] = (c(0, 1, 1, 2) - c(1, 1, 0, 2)) * inv_det;
    r[2][1] = (c(1, 0, 0, 2) - c(0, 0, 1, 2)) * inv_det;
    r[2][2] = (c(0, 0, 1, 1) - c(1, 0, 0, 1)) * inv_det;
    r
}
