//! Rigid bodies, which carry body-bound element collections through space.
//!
//! Collections don't own their body; they hold a `BodyId` into the body list owned by the
//! simulation, and look it up when they need motion or a transform.

use lin_alg::f64::{Quaternion, Vec3};

/// The distinguished name of the stationary reference body.
pub const GROUND_NAME: &str = "ground";

/// Handle to a body in the simulation's body list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyId(pub usize);

/// Rotation about the origin of the untransformed frame, followed by a translation.
#[derive(Clone, Copy, Debug)]
pub struct RigidTransform {
    pub rotation: Quaternion,
    pub translation: Vec3,
}

impl RigidTransform {
    pub fn new_identity() -> Self {
        Self {
            rotation: Quaternion::new_identity(),
            translation: Vec3::new_zero(),
        }
    }

    pub fn apply(&self, posit: Vec3) -> Vec3 {
        self.rotation.rotate_vec(posit) + self.translation
    }
}

/// A body moving with constant translational and angular velocity.
#[derive(Clone, Debug)]
pub struct Body {
    pub name: String,
    /// Position at t = 0.
    pub pos: Vec3,
    pub vel: Vec3,
    /// Orientation at t = 0.
    pub orient: Quaternion,
    /// Angular velocity vector; rad per unit time.
    pub rotvel: Vec3,
}

impl Body {
    /// A body at rest at the origin.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            pos: Vec3::new_zero(),
            vel: Vec3::new_zero(),
            orient: Quaternion::new_identity(),
            rotvel: Vec3::new_zero(),
        }
    }

    pub fn new_ground() -> Self {
        Self::new(GROUND_NAME)
    }

    pub fn is_ground(&self) -> bool {
        self.name == GROUND_NAME
    }

    pub fn get_pos(&self, time: f64) -> Vec3 {
        self.pos + self.vel * time
    }

    pub fn get_vel(&self, _time: f64) -> Vec3 {
        self.vel
    }

    pub fn get_rotvel_vec(&self, _time: f64) -> Vec3 {
        self.rotvel
    }

    pub fn get_orient(&self, time: f64) -> Quaternion {
        let rate = self.rotvel.magnitude();
        if rate < f64::EPSILON {
            return self.orient;
        }

        Quaternion::from_axis_angle(self.rotvel / rate, rate * time) * self.orient
    }

    pub fn get_transform(&self, time: f64) -> RigidTransform {
        RigidTransform {
            rotation: self.get_orient(time),
            translation: self.get_pos(time),
        }
    }
}
