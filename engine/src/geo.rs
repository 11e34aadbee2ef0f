//! Small spherical geometry helpers on plain `[f32; 3]` / `[f64; 3]` arrays.

/// Dot product of 3D vectors.
#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of 3D vectors.
#[inline]
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

/// Euclidean norm of a 3D vector.
#[inline]
pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Normalize a 3D vector (returns zero if input is zero).
#[inline]
pub fn normalize(mut a: [f64; 3]) -> [f64; 3] {
    let n = norm(a);
    if n > 0.0 {
        a[0] /= n;
        a[1] /= n;
        a[2] /= n;
    }
    a
}

/// Widen an `f32` vector.
#[inline]
pub fn to_f64(a: [f32; 3]) -> [f64; 3] {
    [a[0] as f64, a[1] as f64, a[2] as f64]
}

/// Narrow an `f64` vector.
#[inline]
pub fn to_f32(a: [f64; 3]) -> [f32; 3] {
    [a[0] as f32, a[1] as f32, a[2] as f32]
}

/// Dot product in single precision.
#[inline]
pub fn dot32(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product in single precision.
#[inline]
pub fn cross32(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

/// Length in single precision.
#[inline]
pub fn norm32(a: [f32; 3]) -> f32 {
    dot32(a, a).sqrt()
}

/// Great-circle angle (radians) between two unit vectors.
#[inline]
pub fn arc_angle(a_unit: [f64; 3], b_unit: [f64; 3]) -> f64 {
    // angle = atan2(|a×b|, a·b)
    let s = norm(cross(a_unit, b_unit));
    let d = dot(a_unit, b_unit).clamp(-1.0, 1.0);
    s.atan2(d).abs()
}

/// Local tangent basis at unit position r_hat: (east, north).
#[inline]
pub fn local_basis(r_hat: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    // Use Z as reference; if near-parallel, fall back to Y
    let z = [0.0_f64, 0.0, 1.0];
    let mut e = cross(z, r_hat);
    if norm(e) < 1e-12 {
        let y = [0.0_f64, 1.0, 0.0];
        e = cross(y, r_hat);
    }
    let east = normalize(e);
    let north = normalize(cross(r_hat, east));
    (east, north)
}

/// Rotate `r` about unit `axis` by angle `theta` (radians) using the Rodrigues formula.
pub fn rotate_about_axis(r: [f64; 3], axis: [f64; 3], theta: f64) -> [f64; 3] {
    let (st, ct) = theta.sin_cos();
    let kxr = cross(axis, r);
    let kdotr = dot(axis, r);
    [
        r[0] * ct + kxr[0] * st + axis[0] * kdotr * (1.0 - ct),
        r[1] * ct + kxr[1] * st + axis[1] * kdotr * (1.0 - ct),
        r[2] * ct + kxr[2] * st + axis[2] * kdotr * (1.0 - ct),
    ]
}

/// Uniformly distributed point on the unit sphere from two uniform samples in `[0, 1)`.
pub fn point_from_unit_samples(u: f64, v: f64) -> [f64; 3] {
    let lat = (2.0 * u - 1.0).asin();
    let lon = 2.0 * std::f64::consts::PI * v;
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Hermite smoothstep of `x` between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
