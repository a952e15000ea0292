//! Three-dimensional vortex particle flow, with boundaries represented as triangular panels
//! solved by the boundary element method.

#![allow(non_snake_case)]
#![allow(non_ascii_idents)]

pub mod body;
pub mod boundary_features;
pub mod collection;
pub mod config;
pub mod diagnostics;
pub mod diffusion;
pub mod element_packet;
pub mod elements;
pub mod error;
pub mod flow_features;
pub mod geom_import;
pub mod influence;
pub mod integrate;
pub mod kernels;
pub mod points;
pub mod rhs;
pub mod simulation;
pub mod surfaces;
pub mod util;

pub use error::{Result, SimError};
pub use simulation::Simulation;
