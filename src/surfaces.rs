//! Triangulated surfaces: the boundary panels of the BEM.
//!
//! Each panel carries a 2-component vortex-sheet strength in its own tangent basis, an absolute
//! 3-vector strength derived from that, and optionally a source-sheet strength. Reactive panels
//! also carry 1 to 3 boundary-condition components, which set how many BEM unknowns they own.

use std::{fmt, fmt::Formatter};

use lin_alg::f64::Vec3;
use log::{debug, info};

use crate::{
    body::{Body, BodyId},
    element_packet::{ElementPacket, PARTICLE_STRIDE},
    elements::{ElemType, ElementBase, MoveType, INV_FOUR_PI},
    error::{Result, SimError},
    kernels::centroid,
    util::to_vec3s,
};

/// Augmented BEM rows (3 extra per closed moving body) are not used at present. The logic in
/// `is_augmented` is retained, but gated on this.
const AUGMENT_BEM: bool = false;

/// Orthonormal frame of one panel. `x1` runs from node 0 toward node 1; `x2` lies in the panel
/// plane, toward node 2. The normal points into the fluid for outward-wound (CCW) panels.
#[derive(Clone, Copy, Debug)]
pub struct Basis {
    pub x1: Vec3,
    pub x2: Vec3,
    pub norm: Vec3,
}

#[derive(Clone, Debug)]
pub struct Surfaces {
    pub(crate) base: ElementBase,
    np: usize,
    /// Node indices per panel.
    idx: Vec<[usize; 3]>,
    area: Vec<f64>,
    b: Vec<Basis>,
    /// Panel-center velocities. (Base velocities are per node)
    pu: Vec<Vec3>,
    /// Vortex sheet strengths along `x1` and `x2`.
    vs: Vec<[f64; 2]>,
    /// Boundary conditions; `bc[component][panel]`. Components are (normal), (x1, x2) or
    /// (x1, x2, normal).
    bc: Vec<Vec<f64>>,
    /// Source sheet strengths, if any.
    ss: Option<Vec<f64>>,
    /// Absolute panel strengths.
    ps: Vec<Vec3>,
    /// First row of this collection in the global BEM system.
    istart: usize,
    /// Enclosed volume; set only for body-bound collections.
    vol: Option<f64>,
    /// Untransformed geometric center.
    utc: Vec3,
    /// Transformed geometric center.
    tc: Vec3,
}

impl Surfaces {
    /// Build from nodes, connectivity, and per-panel values. Values are the fixed sheet strengths
    /// `(vs1, vs2)` for active surfaces, boundary conditions for reactive ones, and are ignored
    /// for inert ones.
    pub fn new(
        packet: &ElementPacket,
        e: ElemType,
        m: MoveType,
        body: Option<BodyId>,
    ) -> Result<Self> {
        packet.validate_panels()?;

        let x = to_vec3s(&packet.x);
        let nnodes = x.len();
        let nsurfs = packet.num_panels();

        let mut result = Self {
            base: ElementBase::new(x, e, m, body),
            np: 0,
            idx: Vec::new(),
            area: Vec::new(),
            b: Vec::new(),
            pu: Vec::new(),
            vs: Vec::new(),
            bc: Vec::new(),
            ss: None,
            ps: Vec::new(),
            istart: 0,
            vol: None,
            utc: Vec3::new_zero(),
            tc: Vec3::new_zero(),
        };

        if nsurfs == 0 {
            return Ok(result);
        }

        info!("  new collection with {nsurfs} panels and {nnodes} nodes");

        result.idx = packet
            .idx
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .collect();
        result.np = nsurfs;
        result.compute_bases(nsurfs);

        result.vs = vec![[0.; 2]; nsurfs];
        result.fill_values(&packet.val, 0)?;
        result.pu = vec![Vec3::new_zero(); nsurfs];
        result.vortex_sheet_to_panel_strength(nsurfs);

        if m == MoveType::BodyBound {
            result.set_geom_center();
        }
        result.tc = result.utc;

        Ok(result)
    }

    /// Write the packet's per-panel values into the arrays for panels `neold..`.
    fn fill_values(&mut self, val: &[f64], neold: usize) -> Result<()> {
        let nsurfs = self.vs.len() - neold;

        match self.base.e {
            ElemType::Active => {
                if val.len() != 2 * nsurfs {
                    return Err(SimError::ValueCount {
                        vals: val.len(),
                        elems: nsurfs,
                    });
                }
                for (vs, v) in self.vs[neold..].iter_mut().zip(val.chunks_exact(2)) {
                    *vs = [v[0], v[1]];
                }
            }
            ElemType::Reactive => {
                let nper = val.len() / nsurfs;
                if !(1..=3).contains(&nper) {
                    return Err(SimError::BcCount(nper));
                }

                if self.bc.is_empty() {
                    self.bc = vec![vec![0.; neold]; nper];
                } else if self.bc.len() != nper {
                    return Err(SimError::BcMismatch {
                        expected: self.bc.len(),
                        got: nper,
                    });
                }

                for (d, bc) in self.bc.iter_mut().enumerate() {
                    bc.extend((0..nsurfs).map(|i| val[nper * i + d]));
                }
            }
            ElemType::Inert => (),
        }

        Ok(())
    }

    /// Append nodes and panels. Indices in the packet refer to its own nodes.
    pub fn add_new(&mut self, packet: &ElementPacket) -> Result<()> {
        packet.validate_panels()?;

        let nsurfs = packet.num_panels();
        if nsurfs == 0 {
            return Ok(());
        }

        let nnold = self.base.n;
        let neold = self.np;
        let x = to_vec3s(&packet.x);

        info!(
            "  adding {nsurfs} new surface panels and {} new points to collection...",
            x.len()
        );

        // Check values before touching geometry, so a failure leaves us unchanged.
        let mut vs = self.vs.clone();
        vs.resize(neold + nsurfs, [0.; 2]);
        let old_vs = std::mem::replace(&mut self.vs, vs);
        let old_bc = self.bc.clone();
        if let Err(e) = self.fill_values(&packet.val, neold) {
            self.vs = old_vs;
            self.bc = old_bc;
            return Err(e);
        }

        self.base.append_nodes(&x);
        self.idx.extend(packet.idx.chunks_exact(3).map(|t| {
            [
                nnold + t[0] as usize,
                nnold + t[1] as usize,
                nnold + t[2] as usize,
            ]
        }));
        self.np += nsurfs;

        self.compute_bases(self.np);

        if let Some(ss) = &mut self.ss {
            ss.resize(self.np, 0.);
        }
        self.pu.resize(self.np, Vec3::new_zero());
        self.vortex_sheet_to_panel_strength(self.np);

        if self.base.m == MoveType::BodyBound {
            self.set_geom_center();
        }

        Ok(())
    }

    fn panel_nodes(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.idx[i];
        [self.base.x[a], self.base.x[b], self.base.x[c]]
    }

    /// Compute basis vectors and areas for panels past those already known, up to `nnew`.
    pub fn compute_bases(&mut self, nnew: usize) {
        assert_eq!(nnew, self.idx.len(), "Array size mismatch");

        let norig = self.b.len();
        self.b.reserve(nnew - norig);
        self.area.reserve(nnew - norig);

        for i in norig..nnew {
            let [n0, n1, n2] = self.panel_nodes(i);

            let x1 = n1 - n0;
            let base = x1.magnitude();
            let x1 = x1 / base;

            let x2 = n2 - n0;
            let x2 = x2 - x1 * x2.dot(x1);
            let height = x2.magnitude();
            let x2 = x2 / height;

            self.area.push(0.5 * base * height);
            self.b.push(Basis {
                x1,
                x2,
                norm: x1.cross(x2),
            });
        }
    }

    /// Discard and rebuild every panel's basis, eg after nodes move.
    fn recompute_all_bases(&mut self) {
        self.b.clear();
        self.area.clear();
        self.compute_bases(self.np);
    }

    /// Convert vortex sheet strengths to absolute panel strengths. Run this after any change to
    /// sheet strengths or bases.
    pub fn vortex_sheet_to_panel_strength(&mut self, num: usize) {
        assert_eq!(self.vs.len(), num, "Input array sizes do not match");
        assert_eq!(self.b.len(), num, "Input array sizes do not match");

        self.ps.clear();
        self.ps.extend(
            self.vs
                .iter()
                .zip(&self.b)
                .zip(&self.area)
                .map(|((vs, b), area)| (b.x1 * vs[0] + b.x2 * vs[1]) * *area),
        );
    }

    /// Assign solved sheet strengths, as interleaved `(vs1, vs2)` per panel.
    pub fn set_str(&mut self, offset: usize, count: usize, vals: &[f64]) -> Result<()> {
        if offset != 0 {
            return Err(SimError::NonzeroOffset(offset));
        }
        let expected = 2 * self.np;
        if vals.len() != expected || count != expected {
            return Err(SimError::StrengthSize {
                expected,
                got: vals.len().max(count),
            });
        }

        for (vs, v) in self.vs.iter_mut().zip(vals.chunks_exact(2)) {
            *vs = [v[0], v[1]];
        }
        self.vortex_sheet_to_panel_strength(self.np);

        Ok(())
    }

    /// Attach source sheet strengths, one per panel.
    pub fn set_src_str(&mut self, vals: &[f64]) -> Result<()> {
        if vals.len() != self.np {
            return Err(SimError::StrengthSize {
                expected: self.np,
                got: vals.len(),
            });
        }
        self.ss = Some(vals.to_vec());
        Ok(())
    }

    /// Distribute this collection's slice of a solved BEM unknown vector. The layout matches the
    /// RHS: per panel, one value per boundary-condition component. Tangential unknowns become
    /// vortex sheet strengths; a normal unknown becomes source sheet strength.
    pub fn set_bem_unknowns(&mut self, vals: &[f64]) -> Result<()> {
        let nunkn = self.bc.len();
        let expected = nunkn * self.np;
        if nunkn == 0 || vals.len() != expected {
            return Err(SimError::StrengthSize {
                expected,
                got: vals.len(),
            });
        }

        match nunkn {
            1 => self.set_src_str(vals),
            2 => self.set_str(0, vals.len(), vals),
            _ => {
                let mut tang = Vec::with_capacity(2 * self.np);
                let mut norm = Vec::with_capacity(self.np);
                for v in vals.chunks_exact(3) {
                    tang.extend_from_slice(&v[0..2]);
                    norm.push(v[2]);
                }
                self.set_str(0, tang.len(), &tang)?;
                self.set_src_str(&norm)
            }
        }
    }

    /// Whether the BEM system carries extra rows for this collection's rigid-body motion.
    pub fn is_augmented(&self, bodies: &[Body]) -> bool {
        let mut augment = match self.base.body(bodies) {
            // An internal flow bounded by the ground has nothing to augment.
            Some(body) => !(body.is_ground() && self.vol.unwrap_or(-1.) < 0.),
            None => false,
        };

        if self.base.e != ElemType::Reactive {
            augment = false;
        }

        augment && AUGMENT_BEM
    }

    pub fn get_max_bc_value(&self) -> f64 {
        self.bc
            .iter()
            .flatten()
            .fold(0., |acc: f64, v| acc.max(v.abs()))
    }

    pub fn set_first_row(&mut self, i: usize) {
        self.istart = i;
    }

    pub fn get_first_row(&self) -> usize {
        self.istart
    }

    /// BEM unknowns owned by this collection.
    pub fn get_num_rows(&self, bodies: &[Body]) -> usize {
        let aug = if self.is_augmented(bodies) { 3 } else { 0 };
        self.bc.len() * self.np + aug
    }

    pub fn get_next_row(&self, bodies: &[Body]) -> usize {
        self.istart + self.get_num_rows(bodies)
    }

    /// Add rigid-body velocity at the panel centers, scaled by `factor`: translation, plus
    /// rotation about the transformed geometric center.
    pub fn add_body_motion(&mut self, factor: f64, time: f64, bodies: &[Body]) {
        let Some(body) = self.base.body(bodies) else {
            return;
        };
        if body.is_ground() {
            return;
        }

        assert!(
            self.vol.is_some_and(|v| v > 0.),
            "Have not calculated transformed center, or volume is negative"
        );

        let vel = body.get_vel(time);
        let rotvel = body.get_rotvel_vec(time);

        for i in 0..self.np {
            let rel = centroid(&self.panel_nodes(i)) - self.tc;
            self.pu[i] += (vel + rotvel.cross(rel)) * factor;
        }
    }

    /// Volume and center from signed tetrahedra between the origin and each panel, over the
    /// untransformed nodes.
    pub fn set_geom_center(&mut self) {
        assert!(self.base.body.is_some(), "Body has not been set");
        let Some(ux) = &self.base.ux else {
            panic!("Untransformed positions have not been set");
        };

        info!("  computing geometric center of {} panels", self.np);

        let mut vsum = 0.;
        let mut csum = Vec3::new_zero();
        for [a, b, c] in &self.idx {
            let (a, b, c) = (ux[*a], ux[*b], ux[*c]);
            let this_vol = a.dot(b.cross(c)) / 6.;
            vsum += this_vol;
            csum += (a + b + c) * (0.25 * this_vol);
        }

        self.vol = Some(vsum);
        self.utc = if vsum.abs() > f64::EPSILON {
            csum / vsum
        } else {
            // Open or flat sheets enclose nothing; fall back to the node average.
            let mut sum = Vec3::new_zero();
            for p in ux {
                sum += *p;
            }
            sum / ux.len() as f64
        };

        debug!(
            "    geom center is {} {} {} and vol is {vsum}",
            self.utc.x, self.utc.y, self.utc.z
        );
    }

    /// Move the nodes to their pose at `time`, then rebuild bases and strengths, and the
    /// transformed center.
    pub fn transform(&mut self, time: f64, bodies: &[Body]) {
        self.base.transform(time, bodies);
        self.recompute_all_bases();
        self.vortex_sheet_to_panel_strength(self.np);

        self.tc = match self.base.body(bodies) {
            Some(body) if self.base.m == MoveType::BodyBound => {
                body.get_transform(time).apply(self.utc)
            }
            _ => self.utc,
        };
    }

    pub fn move_elems(&mut self, time: f64, dt: f64, bodies: &[Body]) {
        match self.base.m {
            MoveType::Lagrangian => {
                self.base.advect(dt);
                self.recompute_all_bases();
                self.vortex_sheet_to_panel_strength(self.np);
            }
            MoveType::BodyBound => self.transform(time + dt, bodies),
            MoveType::Fixed => (),
        }
    }

    pub fn zero_vels(&mut self) {
        for u in &mut self.pu {
            *u = Vec3::new_zero();
        }
        self.base.zero_vels();
    }

    /// Add the freestream and apply 1/4π, at panel centers and at nodes.
    pub fn finalize_vels(&mut self, fs: Vec3) {
        for u in &mut self.pu {
            *u = fs + *u * INV_FOUR_PI;
        }
        self.base.finalize_vels(fs);
    }

    pub fn zero_strengths(&mut self) {
        for vs in &mut self.vs {
            *vs = [0.; 2];
        }
        if let Some(ss) = &mut self.ss {
            for s in ss {
                *s = 0.;
            }
        }
        self.vortex_sheet_to_panel_strength(self.np);
    }

    /// Each panel as one particle, in the flat 7-per-particle layout: the centroid pushed
    /// `offset * vdelta` along the normal, the absolute strength, and core radius `vdelta`.
    pub fn represent_as_particles(&self, offset: f64, vdelta: f64) -> Vec<f64> {
        let dn = offset * vdelta;
        let mut result = Vec::with_capacity(self.np * PARTICLE_STRIDE);

        for i in 0..self.np {
            let pos = centroid(&self.panel_nodes(i)) + self.b[i].norm * dn;
            let s = self.ps[i];
            result.extend_from_slice(&[pos.x, pos.y, pos.z, s.x, s.y, s.z, vdelta]);
        }

        result
    }

    pub fn get_total_circ(&self, _time: f64) -> Vec3 {
        let mut result = Vec3::new_zero();
        if self.base.e == ElemType::Inert {
            return result;
        }

        let pts = self.represent_as_particles(0., 1.);
        for p in pts.chunks_exact(PARTICLE_STRIDE) {
            result += Vec3::new(p[3], p[4], p[5]);
        }
        result
    }

    /// Sum of `s × x` over the panels' particle representation.
    pub fn get_total_impulse(&self) -> Vec3 {
        let mut result = Vec3::new_zero();
        if self.base.e == ElemType::Inert {
            return result;
        }

        let pts = self.represent_as_particles(0., 1.);
        for p in pts.chunks_exact(PARTICLE_STRIDE) {
            let x = Vec3::new(p[0], p[1], p[2]);
            let s = Vec3::new(p[3], p[4], p[5]);
            result += s.cross(x);
        }
        result
    }

    /// Circulation of the solid-body rotation of the enclosed volume: `2 vol ω`.
    pub fn get_body_circ(&self, time: f64, bodies: &[Body]) -> Vec3 {
        let Some(body) = self.base.body(bodies) else {
            return Vec3::new_zero();
        };
        let Some(vol) = self.vol else {
            panic!("Volume has not been computed for a body-attached surface");
        };

        body.get_rotvel_vec(time) * (2. * vol)
    }

    pub fn get_max_str(&self) -> f64 {
        self.ps.iter().map(|s| s.magnitude()).fold(0., f64::max)
    }

    pub fn get_n(&self) -> usize {
        self.base.n
    }

    pub fn get_npanels(&self) -> usize {
        self.np
    }

    pub fn get_vol(&self) -> Option<f64> {
        self.vol
    }

    pub fn get_geom_center(&self) -> Vec3 {
        self.tc
    }

    pub fn get_pos(&self) -> &[Vec3] {
        &self.base.x
    }

    pub fn get_idx(&self) -> &[[usize; 3]] {
        &self.idx
    }

    pub fn get_bcs(&self) -> &[Vec<f64>] {
        &self.bc
    }

    /// Panel-center velocities.
    pub fn get_vel(&self) -> &[Vec3] {
        &self.pu
    }

    /// Absolute panel strengths.
    pub fn get_str(&self) -> &[Vec3] {
        &self.ps
    }

    pub fn get_bases(&self) -> &[Basis] {
        &self.b
    }

    pub fn get_area(&self) -> &[f64] {
        &self.area
    }

    pub fn get_vort_str(&self) -> &[[f64; 2]] {
        &self.vs
    }

    pub fn have_src_str(&self) -> bool {
        self.ss.is_some()
    }

    pub fn get_src_str(&self) -> Option<&[f64]> {
        self.ss.as_deref()
    }

    /// Corner positions of every panel.
    pub fn get_tris(&self) -> Vec<[Vec3; 3]> {
        (0..self.np).map(|i| self.panel_nodes(i)).collect()
    }

    pub fn get_centroids(&self) -> Vec<Vec3> {
        (0..self.np)
            .map(|i| centroid(&self.panel_nodes(i)))
            .collect()
    }

    pub(crate) fn vels_mut(&mut self) -> &mut [Vec3] {
        &mut self.pu
    }
}

impl fmt::Display for Surfaces {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, " {} {} Panels", self.np, self.base)
    }
}
