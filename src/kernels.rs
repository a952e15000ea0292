//! Velocity influence kernels: the velocity (and optionally the velocity gradient) induced at a
//! target by a single source element.
//!
//! Naming follows `kernel_NS_MT`:
//! - `N` is the dimension of the source element (0 = point, 2 = triangular panel)
//! - `S` is the source type: `v` for vortex, `s` for source
//! - `M` is the dimension of the target element
//! - `T` is `p` for a singular target point, or `b` for a thick-cored target blob. A trailing `g`
//!   means the velocity gradient is returned too.
//!
//! None of these apply the 1/4π factor. Callers multiply by it once, after all sources are
//! accumulated. Results are contributions to add to the target, never values to overwrite it.

use std::ops::{Add, AddAssign, Mul};

use lin_alg::f64::Vec3;

/// Velocity gradient at a target. Each field is the derivative of `(u, v, w)` with respect
/// to one coordinate: `d_dx = (∂u/∂x, ∂v/∂x, ∂w/∂x)`, etc.
#[derive(Clone, Copy, Debug)]
pub struct VelGrad {
    pub d_dx: Vec3,
    pub d_dy: Vec3,
    pub d_dz: Vec3,
}

impl Default for VelGrad {
    fn default() -> Self {
        Self::new_zero()
    }
}

impl VelGrad {
    pub fn new_zero() -> Self {
        Self {
            d_dx: Vec3::new_zero(),
            d_dy: Vec3::new_zero(),
            d_dz: Vec3::new_zero(),
        }
    }

    /// `(s · ∇) u`; the vortex-stretching term for a particle of strength `s`.
    pub fn stretch(&self, s: Vec3) -> Vec3 {
        self.d_dx * s.x + self.d_dy * s.y + self.d_dz * s.z
    }

    /// ∇ · u. Zero (to rounding) for any field induced by these kernels.
    pub fn divergence(&self) -> f64 {
        self.d_dx.x + self.d_dy.y + self.d_dz.z
    }
}

impl Add for VelGrad {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            d_dx: self.d_dx + rhs.d_dx,
            d_dy: self.d_dy + rhs.d_dy,
            d_dz: self.d_dz + rhs.d_dz,
        }
    }
}

impl AddAssign for VelGrad {
    fn add_assign(&mut self, rhs: Self) {
        self.d_dx += rhs.d_dx;
        self.d_dy += rhs.d_dy;
        self.d_dz += rhs.d_dz;
    }
}

impl Mul<f64> for VelGrad {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            d_dx: self.d_dx * rhs,
            d_dy: self.d_dy * rhs,
            d_dz: self.d_dz * rhs,
        }
    }
}

/// `1 / (|d|² + core_sq)^(3/2)`. `core_sq` is the desingularization term.
fn inv_r3(diff: Vec3, core_sq: f64) -> f64 {
    let r2 = diff.dot(diff) + core_sq;
    1. / (r2 * r2.sqrt())
}

/// Shared by the gradient kernels. `core_sq` holds the summed squared radii.
fn vortex_with_grad(src: Vec3, src_str: Vec3, tgt: Vec3, core_sq: f64) -> (Vec3, VelGrad) {
    let diff = tgt - src;
    let r2 = diff.dot(diff) + core_sq;
    let r3 = 1. / (r2 * r2.sqrt());

    let s_x_d = src_str.cross(diff);
    let vel = s_x_d * r3;

    // Chain-rule factor on the separation, plus the antisymmetric strength terms.
    let bbb = -3. * r3 / r2;
    let s = src_str;

    let grad = VelGrad {
        d_dx: s_x_d * (bbb * diff.x) + Vec3::new(0., s.z, -s.y) * r3,
        d_dy: s_x_d * (bbb * diff.y) + Vec3::new(-s.z, 0., s.x) * r3,
        d_dz: s_x_d * (bbb * diff.z) + Vec3::new(s.y, -s.x, 0.) * r3,
    };

    (vel, grad)
}

/// Thick-cored vortex particle on a singular point.
pub fn kernel_0v_0p(src: Vec3, src_r: f64, src_str: Vec3, tgt: Vec3) -> Vec3 {
    let diff = tgt - src;
    src_str.cross(diff) * inv_r3(diff, src_r * src_r)
}

/// Thick-cored vortex particle on a thick-cored blob. Both radii desingularize, so mutual
/// induction between two blobs is symmetric.
pub fn kernel_0v_0b(src: Vec3, src_r: f64, src_str: Vec3, tgt: Vec3, tgt_r: f64) -> Vec3 {
    let diff = tgt - src;
    src_str.cross(diff) * inv_r3(diff, src_r * src_r + tgt_r * tgt_r)
}

/// Thick-cored point source of scalar strength `src_str` on a singular point.
pub fn kernel_0s_0p(src: Vec3, src_r: f64, src_str: f64, tgt: Vec3) -> Vec3 {
    let diff = tgt - src;
    diff * (src_str * inv_r3(diff, src_r * src_r))
}

/// Thick-cored point source on a thick-cored blob.
pub fn kernel_0s_0b(src: Vec3, src_r: f64, src_str: f64, tgt: Vec3, tgt_r: f64) -> Vec3 {
    let diff = tgt - src;
    diff * (src_str * inv_r3(diff, src_r * src_r + tgt_r * tgt_r))
}

/// Thick-cored vortex particle on a singular point, with gradients.
pub fn kernel_0v_0pg(src: Vec3, src_r: f64, src_str: Vec3, tgt: Vec3) -> (Vec3, VelGrad) {
    vortex_with_grad(src, src_str, tgt, src_r * src_r)
}

/// Thick-cored vortex particle on a thick-cored blob, with gradients.
pub fn kernel_0v_0bg(
    src: Vec3,
    src_r: f64,
    src_str: Vec3,
    tgt: Vec3,
    tgt_r: f64,
) -> (Vec3, VelGrad) {
    vortex_with_grad(src, src_str, tgt, src_r * src_r + tgt_r * tgt_r)
}

/// The four source points of the collapsed triangle quadrature: the centroid, then one point
/// pulled toward each corner. Each carries 1/4 of the panel strength.
pub fn quad_points(tri: &[Vec3; 3]) -> [Vec3; 4] {
    let [a, b, c] = *tri;
    [
        (a + b + c) / 3.,
        (a * 4. + b + c) / 6.,
        (a + b * 4. + c) / 6.,
        (a + b + c * 4.) / 6.,
    ]
}

/// Panel centroid.
pub fn centroid(tri: &[Vec3; 3]) -> Vec3 {
    (tri[0] + tri[1] + tri[2]) / 3.
}

/// Constant-strength vortex panel on a singular point. `src_str` is the absolute (area-scaled)
/// panel strength. Only accurate when the target is far from the panel relative to its size.
pub fn kernel_2_0p(tri: &[Vec3; 3], src_str: Vec3, tgt: Vec3) -> Vec3 {
    let s = src_str * 0.25;
    let mut result = Vec3::new_zero();

    for p in quad_points(tri) {
        result += kernel_0v_0p(p, 0., s, tgt);
    }

    result
}

/// Constant-strength source panel on a singular point.
pub fn kernel_2s_0p(tri: &[Vec3; 3], src_str: f64, tgt: Vec3) -> Vec3 {
    let s = src_str * 0.25;
    let mut result = Vec3::new_zero();

    for p in quad_points(tri) {
        result += kernel_0s_0p(p, 0., s, tgt);
    }

    result
}

/// Constant-strength vortex panel on a thick-cored blob.
pub fn kernel_2_0b(tri: &[Vec3; 3], src_str: Vec3, tgt: Vec3, tgt_r: f64) -> Vec3 {
    let s = src_str * 0.25;
    let mut result = Vec3::new_zero();

    for p in quad_points(tri) {
        result += kernel_0v_0b(p, 0., s, tgt, tgt_r);
    }

    result
}

/// Constant-strength source panel on a thick-cored blob.
pub fn kernel_2s_0b(tri: &[Vec3; 3], src_str: f64, tgt: Vec3, tgt_r: f64) -> Vec3 {
    let s = src_str * 0.25;
    let mut result = Vec3::new_zero();

    for p in quad_points(tri) {
        result += kernel_0s_0b(p, 0., s, tgt, tgt_r);
    }

    result
}

/// Constant-strength vortex panel on a singular point, with gradients.
pub fn kernel_2_0pg(tri: &[Vec3; 3], src_str: Vec3, tgt: Vec3) -> (Vec3, VelGrad) {
    let s = src_str * 0.25;
    let mut vel = Vec3::new_zero();
    let mut grad = VelGrad::new_zero();

    for p in quad_points(tri) {
        let (v, g) = kernel_0v_0pg(p, 0., s, tgt);
        vel += v;
        grad += g;
    }

    (vel, grad)
}

/// Constant-strength vortex panel on a thick-cored blob, with gradients.
pub fn kernel_2_0bg(tri: &[Vec3; 3], src_str: Vec3, tgt: Vec3, tgt_r: f64) -> (Vec3, VelGrad) {
    let s = src_str * 0.25;
    let mut vel = Vec3::new_zero();
    let mut grad = VelGrad::new_zero();

    for p in quad_points(tri) {
        let (v, g) = kernel_0v_0bg(p, 0., s, tgt, tgt_r);
        vel += v;
        grad += g;
    }

    (vel, grad)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn tri() -> [Vec3; 3] {
        [
            Vec3::new(0., 0., 0.),
            Vec3::new(1., 0., 0.),
            Vec3::new(0., 1., 0.),
        ]
    }

    #[test]
    fn coincident_blob_is_bounded() {
        let p = Vec3::new(0.3, -0.2, 1.1);
        let s = Vec3::new(1., 2., 3.);

        let v = kernel_0v_0p(p, 0.1, s, p);
        assert!(v.x.is_finite() && v.y.is_finite() && v.z.is_finite());
        assert_eq!(v.x, 0.);
        assert_eq!(v.y, 0.);
        assert_eq!(v.z, 0.);

        let v = kernel_0v_0b(p, 0.1, s, p, 0.1);
        assert!(v.magnitude().is_finite());
    }

    #[test]
    fn near_coincident_blob_stays_bounded() {
        let s = Vec3::new(0., 0., 1.);
        let r = 0.05;
        // |v| <= |s| |d| / (d² + r²)^1.5, which peaks near d = r / sqrt(2).
        let bound = 1. / (r * r);
        for i in 1..100 {
            let tgt = Vec3::new(i as f64 * 1.0e-4, 0., 0.);
            let v = kernel_0v_0p(Vec3::new_zero(), r, s, tgt);
            assert!(v.magnitude() < bound);
        }
    }

    #[test]
    fn zero_strength_gives_zero() {
        let v = kernel_0v_0p(Vec3::new(1., 1., 1.), 0.2, Vec3::new_zero(), Vec3::new(0., 1., 0.));
        assert_eq!(v.magnitude(), 0.);

        let (v, g) = kernel_0v_0bg(
            Vec3::new(1., 1., 1.),
            0.2,
            Vec3::new_zero(),
            Vec3::new(0., 1., 0.),
            0.2,
        );
        assert_eq!(v.magnitude(), 0.);
        assert_eq!(g.d_dx.magnitude() + g.d_dy.magnitude() + g.d_dz.magnitude(), 0.);
    }

    #[test]
    fn point_vortex_direction() {
        // A z-aligned vortex at the origin turns +x targets toward +y.
        let v = kernel_0v_0p(Vec3::new_zero(), 0., Vec3::new(0., 0., 1.), Vec3::new(2., 0., 0.));
        assert_relative_eq!(v.x, 0.);
        assert_relative_eq!(v.y, 2. / 8.);
        assert_relative_eq!(v.z, 0.);
    }

    #[test]
    fn blob_mutual_induction_is_symmetric() {
        let a = Vec3::new(0., 0., 0.);
        let b = Vec3::new(0.5, 0.2, -0.1);
        let s = Vec3::new(0.3, 0.7, -1.);

        let ab = kernel_0v_0b(a, 0.1, s, b, 0.3);
        let ba = kernel_0v_0b(b, 0.3, s, a, 0.1);

        // Swapping roles flips the separation, so the induced velocity flips sign.
        assert_relative_eq!(ab.x, -ba.x, epsilon = 1e-14);
        assert_relative_eq!(ab.y, -ba.y, epsilon = 1e-14);
        assert_relative_eq!(ab.z, -ba.z, epsilon = 1e-14);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let src = Vec3::new(0.1, -0.3, 0.2);
        let s = Vec3::new(0.4, -0.2, 0.9);
        let tgt = Vec3::new(0.7, 0.5, -0.4);
        let r = 0.15;
        let h = 1.0e-6;

        let (vel, grad) = kernel_0v_0pg(src, r, s, tgt);
        let vel_direct = kernel_0v_0p(src, r, s, tgt);
        assert_relative_eq!(vel.x, vel_direct.x, epsilon = 1e-14);

        let cols = [
            (Vec3::new(h, 0., 0.), grad.d_dx),
            (Vec3::new(0., h, 0.), grad.d_dy),
            (Vec3::new(0., 0., h), grad.d_dz),
        ];
        for (dh, col) in cols {
            let fd = (kernel_0v_0p(src, r, s, tgt + dh) - kernel_0v_0p(src, r, s, tgt - dh)) / (2. * h);
            assert_relative_eq!(fd.x, col.x, epsilon = 1e-6);
            assert_relative_eq!(fd.y, col.y, epsilon = 1e-6);
            assert_relative_eq!(fd.z, col.z, epsilon = 1e-6);
        }

        assert!(grad.divergence().abs() < 1e-10);
    }

    #[test]
    fn blob_gradient_matches_finite_difference() {
        let src = Vec3::new(0., 0., 0.);
        let s = Vec3::new(1., 0., 0.5);
        let tgt = Vec3::new(0.2, 0.1, 0.05);
        let h = 1.0e-6;

        let (_, grad) = kernel_0v_0bg(src, 0.1, s, tgt, 0.2);
        let dh = Vec3::new(0., h, 0.);
        let fd = (kernel_0v_0b(src, 0.1, s, tgt + dh, 0.2) - kernel_0v_0b(src, 0.1, s, tgt - dh, 0.2))
            / (2. * h);

        assert_relative_eq!(fd.x, grad.d_dy.x, epsilon = 1e-5);
        assert_relative_eq!(fd.y, grad.d_dy.y, epsilon = 1e-5);
        assert_relative_eq!(fd.z, grad.d_dy.z, epsilon = 1e-5);
    }

    #[test]
    fn panel_far_field_matches_point_vortex() {
        let tri = tri();
        let s = Vec3::new(0.2, -0.5, 0.);
        let c = centroid(&tri);
        let dir = Vec3::new(0.3, 0.5, 0.8).to_normalized();

        let mut prev_err = f64::MAX;
        for dist in [5., 20., 80., 320.] {
            let tgt = c + dir * dist;
            let panel = kernel_2_0p(&tri, s, tgt);
            let point = kernel_0v_0p(c, 0., s, tgt);

            let rel_err = (panel - point).magnitude() / point.magnitude();
            assert!(rel_err < prev_err);
            prev_err = rel_err;
        }
        assert!(prev_err < 1.0e-4);
    }

    #[test]
    fn source_panel_far_field_matches_point_source() {
        let tri = tri();
        let c = centroid(&tri);
        let tgt = c + Vec3::new(0., 0., 100.);

        let panel = kernel_2s_0p(&tri, 2., tgt);
        let point = kernel_0s_0p(c, 0., 2., tgt);
        assert_relative_eq!(panel.z, point.z, max_relative = 1.0e-4);

        let blob = kernel_2s_0b(&tri, 2., tgt, 0.01);
        assert_relative_eq!(blob.z, point.z, max_relative = 1.0e-4);
    }

    #[test]
    fn panel_gradient_variants_agree_with_velocity() {
        let tri = tri();
        let s = Vec3::new(1., 0.5, 0.);
        let tgt = Vec3::new(0.4, 0.3, 2.);

        let v = kernel_2_0p(&tri, s, tgt);
        let (vg, _) = kernel_2_0pg(&tri, s, tgt);
        assert_relative_eq!(v.x, vg.x, epsilon = 1e-14);
        assert_relative_eq!(v.y, vg.y, epsilon = 1e-14);

        let vb = kernel_2_0b(&tri, s, tgt, 0.1);
        let (vbg, gbg) = kernel_2_0bg(&tri, s, tgt, 0.1);
        assert_relative_eq!(vb.z, vbg.z, epsilon = 1e-14);
        assert!(gbg.divergence().abs() < 1e-10);
    }

    #[test]
    fn quad_points_average_to_centroid() {
        let tri = [
            Vec3::new(1., 2., 3.),
            Vec3::new(-1., 0., 4.),
            Vec3::new(2., -3., 0.5),
        ];
        let pts = quad_points(&tri);
        let avg = (pts[0] + pts[1] + pts[2] + pts[3]) / 4.;
        let c = centroid(&tri);
        assert_relative_eq!(avg.x, c.x, epsilon = 1e-14);
        assert_relative_eq!(avg.y, c.y, epsilon = 1e-14);
        assert_relative_eq!(avg.z, c.z, epsilon = 1e-14);
    }
}
