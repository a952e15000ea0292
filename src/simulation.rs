//! Top-level time stepping: vortex particles convected through a flow that also sees boundary
//! panels and a freestream. Steps can run on a background thread, with the caller polling for
//! completion.

use std::{
    panic,
    thread::{self, JoinHandle},
};

use lin_alg::f64::Vec3;
use log::{info, warn};

use crate::{
    body::{Body, BodyId},
    boundary_features::BoundaryFeature,
    collection::Collection,
    config::Config,
    diffusion::Diffusion,
    element_packet::{ElementPacket, PARTICLE_STRIDE},
    elements::{ElemType, MoveType},
    error::{Result, SimError},
    influence::{compute_influence, Sources},
    points::Points,
    rhs::vels_to_rhs_panels,
    surfaces::Surfaces,
};

/// Everything a step reads and writes. This moves to the worker thread for the duration of an
/// asynchronous step.
#[derive(Clone, Debug)]
pub struct FlowState {
    time: f64,
    dt: f64,
    fs: Vec3,
    /// Free vorticity.
    vort: Vec<Collection>,
    /// Boundaries; reactive panels whose strengths the BEM solves for.
    bdry: Vec<Collection>,
    /// Field points and tracers. Never sources.
    fldpt: Vec<Collection>,
    bodies: Vec<Body>,
    /// Right-hand side of the BEM system from the latest step.
    bem_rhs: Vec<f64>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            time: 0.,
            dt: 0.01,
            fs: Vec3::new_zero(),
            vort: Vec::new(),
            bdry: Vec::new(),
            fldpt: Vec::new(),
            bodies: Vec::new(),
            bem_rhs: Vec::new(),
        }
    }
}

fn snapshot_sources(colls: &[Collection]) -> Vec<Sources> {
    colls
        .iter()
        .filter_map(Sources::from_collection)
        .filter(|s| !s.is_empty())
        .collect()
}

impl FlowState {
    /// One explicit Euler convection step.
    pub fn step(&mut self) {
        let n: usize = self.vort.iter().map(|c| c.get_n()).sum();
        info!("taking step at t={} with n={n}", self.time);

        let time = self.time;
        let vort_srcs = snapshot_sources(&self.vort);

        if !self.bdry.is_empty() {
            info!("Solving for BEM RHS");
        }
        for targ in &mut self.bdry {
            info!("  Solving for velocities on{targ}");
            targ.zero_vels();
            for src in &vort_srcs {
                compute_influence(src, targ);
            }
        }

        let bdry_srcs = snapshot_sources(&self.bdry);

        if !self.bdry.is_empty() {
            info!("Solving for BEM matrix");
        }
        for targ in &mut self.bdry {
            info!("  Solving for influence coefficients on{targ}");
            for src in &bdry_srcs {
                compute_influence(src, targ);
            }
        }

        self.assemble_bem_rhs(time);

        if self.vort.len() + self.fldpt.len() > 0 {
            info!("Solving for velocities");
        }
        for targ in self.vort.iter_mut().chain(self.fldpt.iter_mut()) {
            info!("  Solving for velocities on{targ}");
            targ.zero_vels();
            for src in vort_srcs.iter().chain(&bdry_srcs) {
                compute_influence(src, targ);
            }
            targ.finalize_vels(self.fs);
        }

        info!("Convection step");
        for coll in self
            .vort
            .iter_mut()
            .chain(self.bdry.iter_mut())
            .chain(self.fldpt.iter_mut())
        {
            coll.move_elems(time, self.dt, &self.bodies);
        }

        self.time += self.dt;
        info!("Done");
    }

    /// Give each reactive boundary its first row in the global BEM system, in collection order.
    /// Returns the total row count.
    fn assign_bem_rows(&mut self) -> usize {
        let mut next = 0;

        for coll in &mut self.bdry {
            let Collection::Surfaces(surf) = coll else {
                continue;
            };
            if surf.base.get_elem_type() != ElemType::Reactive || surf.get_npanels() == 0 {
                continue;
            }

            surf.set_first_row(next);
            next = surf.get_next_row(&self.bodies);
        }

        next
    }

    /// Finalize boundary velocities, remove body motion, and stack each reactive collection's
    /// residuals into the global RHS, in row order.
    fn assemble_bem_rhs(&mut self, time: f64) {
        let num_rows = self.assign_bem_rows();
        let mut rhs = Vec::with_capacity(num_rows);

        for coll in &mut self.bdry {
            let Collection::Surfaces(surf) = coll else {
                continue;
            };
            if surf.base.get_elem_type() != ElemType::Reactive || surf.get_npanels() == 0 {
                continue;
            }

            surf.finalize_vels(self.fs);
            surf.add_body_motion(-1., time, &self.bodies);
            debug_assert_eq!(surf.get_first_row(), rhs.len());
            rhs.extend(vels_to_rhs_panels(surf));
        }

        self.bem_rhs = rhs;
    }

    pub fn get_time(&self) -> f64 {
        self.time
    }
}

pub struct Simulation {
    re: f64,
    dt: f64,
    fs: Vec3,
    diff: Diffusion,
    /// `None` while a step is running on the worker.
    state: Option<FlowState>,
    step_task: Option<JoinHandle<FlowState>>,
    /// Time when the running step launched.
    time_at_launch: f64,
    sim_is_initialized: bool,
    step_has_started: bool,
    step_is_finished: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            re: 100.,
            dt: 0.01,
            fs: Vec3::new_zero(),
            diff: Diffusion::default(),
            state: Some(FlowState::default()),
            step_task: None,
            time_at_launch: 0.,
            sim_is_initialized: false,
            step_has_started: false,
            step_is_finished: false,
        }
    }
}

impl Simulation {
    pub fn new(cfg: &Config) -> Self {
        Self {
            re: cfg.re,
            dt: cfg.dt,
            fs: cfg.freestream(),
            ..Default::default()
        }
    }

    fn state(&self) -> &FlowState {
        match &self.state {
            Some(s) => s,
            None => panic!("Flow state is unavailable while a step is in flight"),
        }
    }

    fn state_mut(&mut self) -> &mut FlowState {
        match &mut self.state {
            Some(s) => s,
            None => panic!("Flow state is unavailable while a step is in flight"),
        }
    }

    /// Numerical diffusion length, `sqrt(dt / re)`.
    pub fn get_hnu(&self) -> f64 {
        (self.dt / self.re).sqrt()
    }

    /// Nominal inter-particle spacing.
    pub fn get_ips(&self) -> f64 {
        self.diff.get_nom_sep_scaled() * self.get_hnu()
    }

    /// Particle core radius.
    pub fn get_vdelta(&self) -> f64 {
        self.diff.get_particle_overlap() * self.get_ips()
    }

    /// Choose the Reynolds number that gives this particle spacing, and turn off diffusion.
    pub fn set_re_for_ips(&mut self, ips: f64) {
        self.re = self.diff.get_nom_sep_scaled().powi(2) * self.dt / ips.powi(2);
        self.diff.set_diffuse(false);
    }

    pub fn get_re(&self) -> f64 {
        self.re
    }

    pub fn set_re(&mut self, re: f64) {
        self.re = re;
    }

    pub fn get_dt(&self) -> f64 {
        self.dt
    }

    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
    }

    pub fn get_fs(&self) -> Vec3 {
        self.fs
    }

    pub fn set_fs(&mut self, fs: Vec3) {
        self.fs = fs;
    }

    pub fn get_diffusion(&self) -> &Diffusion {
        &self.diff
    }

    pub fn get_time(&self) -> f64 {
        match &self.state {
            Some(s) => s.time,
            None => self.time_at_launch,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sim_is_initialized
    }

    pub fn set_initialized(&mut self) {
        self.sim_is_initialized = true;
    }

    /// Whether any step has completed and been collected since the last reset.
    pub fn has_results(&self) -> bool {
        self.step_is_finished
    }

    /// Take back the state from the worker, blocking until it finishes. Re-raises a panic
    /// from the step.
    fn join_step(&mut self) {
        let Some(task) = self.step_task.take() else {
            return;
        };
        match task.join() {
            Ok(state) => self.state = Some(state),
            Err(e) => panic::resume_unwind(e),
        }
        self.step_has_started = false;
    }

    /// Wait for any running step, then return to time 0, uninitialized, with no elements. Bodies
    /// are kept.
    pub fn reset(&mut self) {
        self.join_step();

        let state = self.state_mut();
        state.time = 0.;
        state.vort.clear();
        state.bdry.clear();
        state.fldpt.clear();
        state.bem_rhs.clear();

        self.time_at_launch = 0.;
        self.sim_is_initialized = false;
        self.step_has_started = false;
        self.step_is_finished = false;
    }

    /// Non-blocking. True if no step was ever launched, or if the launched step is done, in
    /// which case its results are collected.
    pub fn test_for_new_results(&mut self) -> bool {
        if !self.step_has_started {
            return true;
        }

        let done = self.step_task.as_ref().is_none_or(|t| t.is_finished());
        if done {
            self.join_step();
            self.step_is_finished = true;
        }
        done
    }

    /// Launch one step on a worker thread. Poll `test_for_new_results` before calling again.
    pub fn async_step(&mut self) {
        let Some(mut state) = self.state.take() else {
            warn!("A step is already in flight; not launching another");
            return;
        };

        state.dt = self.dt;
        state.fs = self.fs;
        self.time_at_launch = state.time;
        self.step_has_started = true;

        let task = thread::Builder::new()
            .name("vortex-step".to_owned())
            .spawn(move || {
                state.step();
                state
            })
            .expect("Unable to spawn the step thread");
        self.step_task = Some(task);
    }

    /// Run one step on the calling thread, after waiting out any step in flight.
    pub fn step(&mut self) {
        self.join_step();

        let (dt, fs) = (self.dt, self.fs);
        let state = self.state_mut();
        state.dt = dt;
        state.fs = fs;
        state.step();

        self.step_is_finished = true;
    }

    /// Add vortex particles from a flat `(x, y, z, sx, sy, sz, r)` vector. Radii are replaced
    /// with the current core size. Particles join the latest vorticity collection.
    pub fn add_particles(&mut self, mut particles: Vec<f64>) -> Result<()> {
        if particles.is_empty() {
            return Ok(());
        }
        if particles.len() % PARTICLE_STRIDE != 0 {
            return Err(SimError::ParticleVecLen(particles.len()));
        }

        let vdelta = self.get_vdelta();
        for p in particles.chunks_exact_mut(PARTICLE_STRIDE) {
            p[6] = vdelta;
        }
        let packet = ElementPacket::from_particles(&particles)?;

        let state = self.state_mut();
        match state.vort.last_mut() {
            Some(Collection::Points(pts)) => pts.add_new(&packet)?,
            _ => state.vort.push(Collection::Points(Points::new(
                &packet,
                ElemType::Active,
                MoveType::Lagrangian,
                None,
            )?)),
        }

        Ok(())
    }

    /// Add field points from flat `(x, y, z)` triples. Moving points are tracers; others stay
    /// fixed.
    pub fn add_fldpts(&mut self, posits: Vec<f64>, moves: bool) -> Result<()> {
        if posits.is_empty() {
            return Ok(());
        }

        let m = if moves {
            MoveType::Lagrangian
        } else {
            MoveType::Fixed
        };
        let packet = ElementPacket::new(posits, Vec::new(), Vec::new());

        let state = self.state_mut();
        let existing = state.fldpt.iter_mut().find(|c| c.get_move_type() == m);
        match existing {
            Some(Collection::Points(pts)) => pts.add_new(&packet)?,
            _ => state.fldpt.push(Collection::Points(Points::new(
                &packet,
                ElemType::Inert,
                m,
                None,
            )?)),
        }

        Ok(())
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        let bodies = &mut self.state_mut().bodies;
        bodies.push(body);
        BodyId(bodies.len() - 1)
    }

    /// Generate panels for a boundary feature, at the current particle spacing. They join an
    /// existing boundary on the same body with the same number of boundary conditions, or
    /// start a new one.
    pub fn add_boundary(&mut self, feature: &dyn BoundaryFeature) -> Result<()> {
        info!("Adding boundary: {feature}");

        let packet = feature.init_elements(self.get_ips())?;
        packet.validate_panels()?;
        let np = packet.num_panels();
        if np == 0 {
            return Ok(());
        }
        let nper = packet.val.len() / np;

        let body = feature.body();
        let state = self.state_mut();
        if let Some(id) = body {
            if id.0 >= state.bodies.len() {
                return Err(SimError::UnknownBody(id.0));
            }
        }
        let m = if body.is_some() {
            MoveType::BodyBound
        } else {
            MoveType::Fixed
        };

        let existing = state.bdry.iter_mut().position(|c| match c {
            Collection::Surfaces(s) => {
                s.base.get_body_id() == body && s.get_bcs().len() == nper
            }
            Collection::Points(_) => false,
        });

        let i = match existing {
            Some(i) => {
                if let Collection::Surfaces(surf) = &mut state.bdry[i] {
                    surf.add_new(&packet)?;
                }
                i
            }
            None => {
                let surf = Surfaces::new(&packet, ElemType::Reactive, m, body)?;
                state.bdry.push(Collection::Surfaces(surf));
                state.bdry.len() - 1
            }
        };

        // Place at the current time.
        let time = state.time;
        state.bdry[i].transform(time, &state.bodies);
        state.assign_bem_rows();

        Ok(())
    }

    pub fn get_nparts(&self) -> usize {
        self.state().vort.iter().map(|c| c.get_n()).sum()
    }

    pub fn get_npanels(&self) -> usize {
        self.state()
            .bdry
            .iter()
            .map(|c| match c {
                Collection::Surfaces(s) => s.get_npanels(),
                Collection::Points(_) => 0,
            })
            .sum()
    }

    pub fn get_nfldpts(&self) -> usize {
        self.state().fldpt.iter().map(|c| c.get_n()).sum()
    }

    /// Total node count over every collection.
    pub fn get_n(&self) -> usize {
        let s = self.state();
        s.vort
            .iter()
            .chain(&s.bdry)
            .chain(&s.fldpt)
            .map(|c| c.get_n())
            .sum()
    }

    pub fn vort(&self) -> &[Collection] {
        &self.state().vort
    }

    pub fn bdry(&self) -> &[Collection] {
        &self.state().bdry
    }

    pub fn fldpt(&self) -> &[Collection] {
        &self.state().fldpt
    }

    pub fn bodies(&self) -> &[Body] {
        &self.state().bodies
    }

    /// Right-hand side of the BEM system assembled during the latest step.
    pub fn bem_rhs(&self) -> &[f64] {
        &self.state().bem_rhs
    }

    /// Apply a solved BEM unknown vector, laid out like `bem_rhs`, to the boundary strengths.
    pub fn set_bem_solution(&mut self, vals: &[f64]) -> Result<()> {
        let state = self.state_mut();

        let num_rows = state.assign_bem_rows();
        if vals.len() != num_rows {
            return Err(SimError::StrengthSize {
                expected: num_rows,
                got: vals.len(),
            });
        }

        for coll in &mut state.bdry {
            let Collection::Surfaces(surf) = coll else {
                continue;
            };
            if surf.base.get_elem_type() != ElemType::Reactive || surf.get_npanels() == 0 {
                continue;
            }

            let start = surf.get_first_row();
            let end = surf.get_next_row(&state.bodies);
            surf.set_bem_unknowns(&vals[start..end])?;
        }

        Ok(())
    }

    /// Circulation of all free vorticity and boundary panels.
    pub fn total_circulation(&self) -> Vec3 {
        let s = self.state();
        let mut result = Vec3::new_zero();
        for c in s.vort.iter().chain(&s.bdry) {
            result += c.get_total_circ(s.time);
        }
        result
    }

    pub fn total_impulse(&self) -> Vec3 {
        let s = self.state();
        let mut result = Vec3::new_zero();
        for c in s.vort.iter().chain(&s.bdry) {
            result += c.get_total_impulse();
        }
        result
    }

    /// Circulation implied by the solid-body rotation of every body-bound boundary.
    pub fn body_circulation(&self) -> Vec3 {
        let s = self.state();
        let mut result = Vec3::new_zero();
        for c in &s.bdry {
            if let Collection::Surfaces(surf) = c {
                result += surf.get_body_circ(s.time, &s.bodies);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::boundary_features::Ovoid;

    #[test]
    fn length_scales() {
        let sim = Simulation::default();

        assert_relative_eq!(sim.get_hnu(), 0.01);
        assert_relative_eq!(sim.get_ips(), 8_f64.sqrt() * 0.01);
        assert_relative_eq!(sim.get_vdelta(), 1.5 * 8_f64.sqrt() * 0.01);
    }

    #[test]
    fn re_for_ips() {
        let mut sim = Simulation::default();
        sim.set_re_for_ips(0.05);

        assert_relative_eq!(sim.get_ips(), 0.05, epsilon = 1e-12);
        assert!(!sim.get_diffusion().get_diffuse());
    }

    #[test]
    fn particles_join_last_collection() {
        let mut sim = Simulation::default();
        sim.add_particles(vec![0., 0., 0., 0., 0., 1., 0.]).unwrap();
        sim.add_particles(vec![1., 0., 0., 0., 0., 1., 0., 2., 0., 0., 0., 0., 1., 0.])
            .unwrap();

        assert_eq!(sim.vort().len(), 1);
        assert_eq!(sim.get_nparts(), 3);
        assert!(matches!(
            sim.add_particles(vec![0.; 8]),
            Err(SimError::ParticleVecLen(8))
        ));
    }

    #[test]
    fn boundary_on_unknown_body() {
        let mut sim = Simulation::default();
        let sphere = Ovoid::new(Some(BodyId(3)), Vec3::new_zero(), 1.);
        assert!(matches!(
            sim.add_boundary(&sphere),
            Err(SimError::UnknownBody(3))
        ));
    }

    #[test]
    fn boundaries_merge_per_body() {
        let mut sim = Simulation::default();
        sim.set_re_for_ips(0.5);
        let id = sim.add_body(Body::new("sphere"));

        sim.add_boundary(&Ovoid::new(Some(id), Vec3::new_zero(), 1.))
            .unwrap();
        sim.add_boundary(&Ovoid::new(Some(id), Vec3::new(3., 0., 0.), 1.))
            .unwrap();
        sim.add_boundary(&Ovoid::new(None, Vec3::new(-3., 0., 0.), 1.))
            .unwrap();

        assert_eq!(sim.bdry().len(), 2);
        assert_eq!(sim.get_npanels(), 3 * 80);
    }

    #[test]
    fn synchronous_step_advances_time() {
        let mut sim = Simulation::default();
        sim.add_particles(vec![0., 0., 0., 0., 0., 1., 0.]).unwrap();
        sim.step();
        sim.step();

        assert_relative_eq!(sim.get_time(), 0.02);
        assert!(sim.has_results());
    }
}
