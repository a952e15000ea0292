//! Initial vorticity, as flat particle vectors of `(x, y, z, sx, sy, sz, r)` per particle. The
//! radius slot is a placeholder; the simulation overwrites it with its own core size.

use std::{
    f64::consts::{PI, TAU},
    fmt,
    fmt::Formatter,
};

use lin_alg::f64::Vec3;
use rand::Rng;

use crate::element_packet::PARTICLE_STRIDE;

pub trait FlowFeature: fmt::Display {
    /// Particles spaced about `ips` apart.
    fn init_particles(&self, ips: f64) -> Vec<f64>;
}

fn push_particle(result: &mut Vec<f64>, pos: Vec3, s: Vec3) {
    result.extend_from_slice(&[pos.x, pos.y, pos.z, s.x, s.y, s.z, 0.]);
}

#[derive(Clone, Debug)]
pub struct SingleParticle {
    pub pos: Vec3,
    pub strength: Vec3,
}

impl FlowFeature for SingleParticle {
    fn init_particles(&self, _ips: f64) -> Vec<f64> {
        let mut result = Vec::with_capacity(PARTICLE_STRIDE);
        push_particle(&mut result, self.pos, self.strength);
        result
    }
}

impl fmt::Display for SingleParticle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "single particle at {} {} {} with strength {} {} {}",
            self.pos.x, self.pos.y, self.pos.z, self.strength.x, self.strength.y, self.strength.z
        )
    }
}

/// Randomly placed particles filling a sphere, with total circulation `strength`. Strength
/// tapers to zero over the outer `softness` of the radius.
#[derive(Clone, Debug)]
pub struct VortexBlob {
    pub pos: Vec3,
    pub strength: Vec3,
    pub rad: f64,
    pub softness: f64,
}

impl VortexBlob {
    fn weight(&self, dist: f64) -> f64 {
        let inner = self.rad - self.softness;
        if dist <= inner {
            1.
        } else if dist >= self.rad {
            0.
        } else {
            0.5 + 0.5 * (PI * (dist - inner) / self.softness).cos()
        }
    }
}

impl FlowFeature for VortexBlob {
    fn init_particles(&self, ips: f64) -> Vec<f64> {
        // As many particles as a cubic lattice at `ips` spacing would put in the sphere.
        let vol = 4. / 3. * PI * self.rad.powi(3);
        let n = ((vol / ips.powi(3)).round() as usize).max(1);

        let mut rng = rand::rng();
        let mut posits = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);

        while posits.len() < n {
            let p = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ) * self.rad;
            let dist = p.magnitude();
            if dist > self.rad {
                continue;
            }
            posits.push(self.pos + p);
            weights.push(self.weight(dist));
        }

        let total: f64 = weights.iter().sum();
        let mut result = Vec::with_capacity(n * PARTICLE_STRIDE);
        for (p, w) in posits.into_iter().zip(weights) {
            let s = if total > 0. {
                self.strength * (w / total)
            } else {
                self.strength / n as f64
            };
            push_particle(&mut result, p, s);
        }
        result
    }
}

impl fmt::Display for VortexBlob {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vortex blob at {} {} {}, radius {}, softness {}",
            self.pos.x, self.pos.y, self.pos.z, self.rad, self.softness
        )
    }
}

/// A thin vortex ring of circulation `circ`, centered on `pos`, in the plane normal to `normal`.
#[derive(Clone, Debug)]
pub struct VortexRing {
    pub pos: Vec3,
    pub normal: Vec3,
    pub major_rad: f64,
    pub circ: f64,
}

impl FlowFeature for VortexRing {
    fn init_particles(&self, ips: f64) -> Vec<f64> {
        let normal = self.normal.to_normalized();

        // Any in-plane unit vector will do as a start.
        let trial = if normal.x.abs() < 0.9 {
            Vec3::new(1., 0., 0.)
        } else {
            Vec3::new(0., 1., 0.)
        };
        let e1 = (trial - normal * trial.dot(normal)).to_normalized();
        let e2 = normal.cross(e1);

        let n = ((TAU * self.major_rad / ips).ceil() as usize).max(3);
        let dθ = TAU / n as f64;
        let seg_len = TAU * self.major_rad / n as f64;

        let mut result = Vec::with_capacity(n * PARTICLE_STRIDE);
        for i in 0..n {
            let θ = i as f64 * dθ;
            let radial = e1 * θ.cos() + e2 * θ.sin();
            let tangent = normal.cross(radial);
            push_particle(
                &mut result,
                self.pos + radial * self.major_rad,
                tangent * (self.circ * seg_len),
            );
        }
        result
    }
}

impl fmt::Display for VortexRing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vortex ring at {} {} {}, radius {}, circulation {}",
            self.pos.x, self.pos.y, self.pos.z, self.major_rad, self.circ
        )
    }
}
