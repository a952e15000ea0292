//! The closed set of element collection kinds a simulation holds, and the operations that
//! forward to whichever kind is inside.

use std::{fmt, fmt::Formatter};

use lin_alg::f64::Vec3;

use crate::{
    body::{Body, BodyId},
    elements::{ElemType, MoveType},
    points::Points,
    surfaces::Surfaces,
};

#[derive(Clone, Debug)]
pub enum Collection {
    Points(Points),
    Surfaces(Surfaces),
}

impl Collection {
    pub fn zero_vels(&mut self) {
        match self {
            Self::Points(c) => c.zero_vels(),
            Self::Surfaces(c) => c.zero_vels(),
        }
    }

    pub fn finalize_vels(&mut self, fs: Vec3) {
        match self {
            Self::Points(c) => c.finalize_vels(fs),
            Self::Surfaces(c) => c.finalize_vels(fs),
        }
    }

    pub fn zero_strengths(&mut self) {
        match self {
            Self::Points(c) => c.zero_strengths(),
            Self::Surfaces(c) => c.zero_strengths(),
        }
    }

    pub fn move_elems(&mut self, time: f64, dt: f64, bodies: &[Body]) {
        match self {
            Self::Points(c) => c.move_elems(time, dt, bodies),
            Self::Surfaces(c) => c.move_elems(time, dt, bodies),
        }
    }

    pub fn transform(&mut self, time: f64, bodies: &[Body]) {
        match self {
            Self::Points(c) => c.transform(time, bodies),
            Self::Surfaces(c) => c.transform(time, bodies),
        }
    }

    /// Node count.
    pub fn get_n(&self) -> usize {
        match self {
            Self::Points(c) => c.get_n(),
            Self::Surfaces(c) => c.get_n(),
        }
    }

    pub fn get_total_circ(&self, time: f64) -> Vec3 {
        match self {
            Self::Points(c) => c.get_total_circ(),
            Self::Surfaces(c) => c.get_total_circ(time),
        }
    }

    pub fn get_total_impulse(&self) -> Vec3 {
        match self {
            Self::Points(c) => c.get_total_impulse(),
            Self::Surfaces(c) => c.get_total_impulse(),
        }
    }

    pub fn get_max_str(&self) -> f64 {
        match self {
            Self::Points(c) => c.get_max_str(),
            Self::Surfaces(c) => c.get_max_str(),
        }
    }

    pub fn get_elem_type(&self) -> ElemType {
        match self {
            Self::Points(c) => c.base.get_elem_type(),
            Self::Surfaces(c) => c.base.get_elem_type(),
        }
    }

    pub fn get_move_type(&self) -> MoveType {
        match self {
            Self::Points(c) => c.base.get_move_type(),
            Self::Surfaces(c) => c.base.get_move_type(),
        }
    }

    pub fn get_body_id(&self) -> Option<BodyId> {
        match self {
            Self::Points(c) => c.base.get_body_id(),
            Self::Surfaces(c) => c.base.get_body_id(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Points(c) => write!(f, "{c}"),
            Self::Surfaces(c) => write!(f, "{c}"),
        }
    }
}
