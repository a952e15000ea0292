use lin_alg::f64::Vec3;
use rayon::prelude::*;

use crate::kernels::VelGrad;

/// Advance positions by one explicit Euler step: `x += u dt`.
pub fn euler_step(posits: &mut [Vec3], vels: &[Vec3], dt: f64) {
    assert_eq!(posits.len(), vels.len(), "Position and velocity counts differ");

    posits
        .par_iter_mut()
        .zip(vels.par_iter())
        .for_each(|(x, u)| {
            *x += *u * dt;
        });
}

/// First-order vortex stretching: `s += (s · ∇)u dt`. Returns the largest resulting strength
/// magnitude.
pub fn stretch_euler(strengths: &mut [Vec3], grads: &[VelGrad], dt: f64) -> f64 {
    assert_eq!(strengths.len(), grads.len(), "Strength and gradient counts differ");

    strengths
        .par_iter_mut()
        .zip(grads.par_iter())
        .map(|(s, grad)| {
            *s += grad.stretch(*s) * dt;
            s.magnitude()
        })
        .reduce(|| 0., f64::max)
}
