//! Node storage and lifecycle shared by every element collection.

use std::{f64::consts::PI, fmt, fmt::Formatter};

use lin_alg::f64::Vec3;

use crate::{
    body::{Body, BodyId},
    integrate::euler_step,
};

/// Applied to raw accumulated velocities once per step; the kernels leave it out.
pub const INV_FOUR_PI: f64 = 0.25 / PI;

/// How an element participates in the flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElemType {
    /// Fixed, known vorticity.
    Active,
    /// Vorticity unknown; solved for with the BEM.
    Reactive,
    /// Passive; doesn't affect the flow.
    Inert,
}

/// How an element moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveType {
    /// Moves with the local velocity.
    Lagrangian,
    /// Rigidly follows its attached body.
    BodyBound,
    Fixed,
}

#[derive(Clone, Debug)]
pub struct ElementBase {
    pub(crate) n: usize,
    /// Current (transformed) node positions.
    pub(crate) x: Vec<Vec3>,
    /// Untransformed reference positions. Present only if a body is attached.
    pub(crate) ux: Option<Vec<Vec3>>,
    pub(crate) u: Vec<Vec3>,
    pub(crate) e: ElemType,
    pub(crate) m: MoveType,
    pub(crate) body: Option<BodyId>,
}

impl ElementBase {
    pub fn new(x: Vec<Vec3>, e: ElemType, m: MoveType, body: Option<BodyId>) -> Self {
        let n = x.len();
        let ux = body.map(|_| x.clone());

        Self {
            n,
            x,
            ux,
            u: vec![Vec3::new_zero(); n],
            e,
            m,
            body,
        }
    }

    pub fn append_nodes(&mut self, new: &[Vec3]) {
        self.x.extend_from_slice(new);
        if let Some(ux) = &mut self.ux {
            ux.extend_from_slice(new);
        }
        self.n += new.len();
        self.u.resize(self.n, Vec3::new_zero());
    }

    pub fn zero_vels(&mut self) {
        for u in &mut self.u {
            *u = Vec3::new_zero();
        }
    }

    /// Add the freestream, and apply the 1/4π normalization.
    pub fn finalize_vels(&mut self, fs: Vec3) {
        for u in &mut self.u {
            *u = fs + *u * INV_FOUR_PI;
        }
    }

    /// Re-derive node positions from the untransformed ones, using the body's transform at `time`.
    pub fn transform(&mut self, time: f64, bodies: &[Body]) {
        let Some(body) = self.body(bodies) else {
            return;
        };
        let Some(ux) = &self.ux else {
            return;
        };

        let xform = body.get_transform(time);
        for (x, ux) in self.x.iter_mut().zip(ux) {
            *x = xform.apply(*ux);
        }
    }

    /// One explicit Euler step of the nodes, using their current velocity.
    pub fn advect(&mut self, dt: f64) {
        euler_step(&mut self.x, &self.u, dt);
    }

    pub fn body<'a>(&self, bodies: &'a [Body]) -> Option<&'a Body> {
        self.body.map(|id| &bodies[id.0])
    }

    pub fn get_n(&self) -> usize {
        self.n
    }

    pub fn get_pos(&self) -> &[Vec3] {
        &self.x
    }

    pub fn get_elem_type(&self) -> ElemType {
        self.e
    }

    pub fn get_move_type(&self) -> MoveType {
        self.m
    }

    pub fn get_body_id(&self) -> Option<BodyId> {
        self.body
    }
}

impl fmt::Display for ElementBase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let e = match self.e {
            ElemType::Active => "Active",
            ElemType::Reactive => "Reactive",
            ElemType::Inert => "Inert",
        };
        let m = match self.m {
            MoveType::Lagrangian => "Lagrangian",
            MoveType::BodyBound => "Body-bound",
            MoveType::Fixed => "Fixed",
        };
        write!(f, "{e} {m}")
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn finalize_scales_and_adds_freestream() {
        let mut base = ElementBase::new(
            vec![Vec3::new_zero(); 2],
            ElemType::Inert,
            MoveType::Lagrangian,
            None,
        );
        base.u[1] = Vec3::new(4. * PI, 0., 0.);
        base.finalize_vels(Vec3::new(1., 2., 3.));

        assert_relative_eq!(base.u[0].x, 1.);
        assert_relative_eq!(base.u[1].x, 2.);
        assert_relative_eq!(base.u[1].z, 3.);
    }

    #[test]
    fn untransformed_kept_only_with_body() {
        let x = vec![Vec3::new(1., 0., 0.)];
        let a = ElementBase::new(x.clone(), ElemType::Active, MoveType::Fixed, None);
        let b = ElementBase::new(x, ElemType::Active, MoveType::BodyBound, Some(BodyId(0)));
        assert!(a.ux.is_none());
        assert!(b.ux.is_some());
    }

    #[test]
    fn transform_follows_body() {
        let mut body = Body::new("mover");
        body.vel = Vec3::new(1., 0., 0.);
        let bodies = vec![body];

        let mut base = ElementBase::new(
            vec![Vec3::new(0., 1., 0.)],
            ElemType::Reactive,
            MoveType::BodyBound,
            Some(BodyId(0)),
        );
        base.transform(2., &bodies);
        assert_relative_eq!(base.x[0].x, 2.);
        assert_relative_eq!(base.x[0].y, 1.);

        // Untransformed positions are untouched, so transforms don't compound.
        base.transform(2., &bodies);
        assert_relative_eq!(base.x[0].x, 2.);
    }
}
