//! Collections of point elements: vortex particles, tracers, and field points.

use std::{fmt, fmt::Formatter};

use lin_alg::f64::Vec3;
use log::info;

use crate::{
    body::{Body, BodyId},
    element_packet::ElementPacket,
    elements::{ElemType, ElementBase, MoveType, INV_FOUR_PI},
    error::{Result, SimError},
    integrate::stretch_euler,
    kernels::VelGrad,
    util::to_vec3s,
};

/// Packet values per particle that carries strength: `(sx, sy, sz, r)`.
const VALS_PER_STRENGTH_PT: usize = 4;

#[derive(Clone, Debug)]
pub struct Points {
    pub(crate) base: ElementBase,
    /// Vector strengths. Absent for inert points.
    s: Option<Vec<Vec3>>,
    /// Core radii. Zero means a singular point.
    r: Vec<f64>,
    /// Velocity gradients; only tracked for active, Lagrangian points, which need them for
    /// stretching.
    ug: Option<Vec<VelGrad>>,
    max_strength: f64,
}

/// Pull strengths and radii out of a packet's values.
fn parse_values(packet: &ElementPacket, e: ElemType) -> Result<(Option<Vec<Vec3>>, Vec<f64>)> {
    if packet.x.len() % 3 != 0 {
        return Err(SimError::PositionCount(packet.x.len()));
    }
    let n = packet.num_nodes();

    match e {
        ElemType::Active | ElemType::Reactive => {
            if packet.val.len() != n * VALS_PER_STRENGTH_PT {
                return Err(SimError::ValueCount {
                    vals: packet.val.len(),
                    elems: n,
                });
            }

            let mut s = Vec::with_capacity(n);
            let mut r = Vec::with_capacity(n);
            for v in packet.val.chunks_exact(VALS_PER_STRENGTH_PT) {
                // Reactive strengths are unknown until solved.
                if e == ElemType::Active {
                    s.push(Vec3::new(v[0], v[1], v[2]));
                } else {
                    s.push(Vec3::new_zero());
                }
                r.push(v[3]);
            }
            Ok((Some(s), r))
        }
        ElemType::Inert => {
            // Radius per point is optional; default to singular points.
            let r = if packet.val.len() == n {
                packet.val.clone()
            } else if packet.val.is_empty() {
                vec![0.; n]
            } else {
                return Err(SimError::ValueCount {
                    vals: packet.val.len(),
                    elems: n,
                });
            };
            Ok((None, r))
        }
    }
}

impl Points {
    pub fn new(
        packet: &ElementPacket,
        e: ElemType,
        m: MoveType,
        body: Option<BodyId>,
    ) -> Result<Self> {
        let (s, r) = parse_values(packet, e)?;
        let x = to_vec3s(&packet.x);
        let n = x.len();

        info!("  new collection with {n} points");

        let ug = if e == ElemType::Active && m == MoveType::Lagrangian {
            Some(vec![VelGrad::new_zero(); n])
        } else {
            None
        };

        Ok(Self {
            base: ElementBase::new(x, e, m, body),
            s,
            r,
            ug,
            max_strength: -1.,
        })
    }

    /// Append more points. Values follow the same layout as construction.
    pub fn add_new(&mut self, packet: &ElementPacket) -> Result<()> {
        let (s, r) = parse_values(packet, self.base.e)?;
        let x = to_vec3s(&packet.x);

        info!("  adding {} new points to collection...", x.len());

        self.base.append_nodes(&x);
        if let (Some(s_old), Some(s_new)) = (&mut self.s, s) {
            s_old.extend(s_new);
        }
        self.r.extend(r);
        if let Some(ug) = &mut self.ug {
            ug.resize(self.base.n, VelGrad::new_zero());
        }

        Ok(())
    }

    pub fn zero_vels(&mut self) {
        self.base.zero_vels();
        if let Some(ug) = &mut self.ug {
            for g in ug {
                *g = VelGrad::new_zero();
            }
        }
    }

    /// Add the freestream and apply 1/4π to velocities; gradients get the 1/4π only.
    pub fn finalize_vels(&mut self, fs: Vec3) {
        self.base.finalize_vels(fs);
        if let Some(ug) = &mut self.ug {
            for g in ug {
                *g = *g * INV_FOUR_PI;
            }
        }
    }

    pub fn zero_strengths(&mut self) {
        if let Some(s) = &mut self.s {
            for s in s {
                *s = Vec3::new_zero();
            }
        }
    }

    /// Advance one explicit Euler step. Active Lagrangian points stretch before they move,
    /// so both use the velocity field at the start of the step.
    pub fn move_elems(&mut self, time: f64, dt: f64, bodies: &[Body]) {
        match self.base.m {
            MoveType::Lagrangian => {
                if let (Some(s), Some(ug)) = (&mut self.s, &self.ug) {
                    let this_max = stretch_euler(s, ug, dt);
                    self.max_strength = if self.max_strength < 0. {
                        this_max
                    } else {
                        0.1 * this_max + 0.9 * self.max_strength
                    };
                }
                self.base.advect(dt);
            }
            MoveType::BodyBound => self.base.transform(time + dt, bodies),
            MoveType::Fixed => (),
        }
    }

    pub fn transform(&mut self, time: f64, bodies: &[Body]) {
        self.base.transform(time, bodies);
    }

    pub fn get_total_circ(&self) -> Vec3 {
        let mut result = Vec3::new_zero();
        if let Some(s) = &self.s {
            for s in s {
                result += *s;
            }
        }
        result
    }

    /// Sum of `s × x` over all points.
    pub fn get_total_impulse(&self) -> Vec3 {
        let mut result = Vec3::new_zero();
        if let Some(s) = &self.s {
            for (s, x) in s.iter().zip(&self.base.x) {
                result += s.cross(*x);
            }
        }
        result
    }

    pub fn get_max_str(&self) -> f64 {
        match &self.s {
            Some(s) => s.iter().map(|s| s.magnitude()).fold(0., f64::max),
            None => 0.,
        }
    }

    /// The running (smoothed) peak strength, updated each move.
    pub fn get_smoothed_max_str(&self) -> f64 {
        self.max_strength
    }

    pub fn get_n(&self) -> usize {
        self.base.n
    }

    pub fn get_pos(&self) -> &[Vec3] {
        &self.base.x
    }

    pub fn get_vel(&self) -> &[Vec3] {
        &self.base.u
    }

    pub fn get_str(&self) -> Option<&[Vec3]> {
        self.s.as_deref()
    }

    pub fn get_rad(&self) -> &[f64] {
        &self.r
    }

    pub fn get_grads(&self) -> Option<&[VelGrad]> {
        self.ug.as_deref()
    }

    /// Thick-cored targets use the blob kernels; inert points are singular.
    pub fn is_blob(&self) -> bool {
        self.base.e != ElemType::Inert
    }

    pub(crate) fn targets_mut(&mut self) -> (&[Vec3], &[f64], &mut [Vec3], Option<&mut [VelGrad]>) {
        (
            &self.base.x,
            &self.r,
            &mut self.base.u,
            self.ug.as_deref_mut(),
        )
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, " {} {} Points", self.base.n, self.base)
    }
}
