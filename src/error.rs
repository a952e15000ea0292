//! Error types for element ingestion, geometry import and config persistence.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Index array length {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("Position array length {0} is not a multiple of 3")]
    PositionCount(usize),

    #[error("Value array length {vals} is not a multiple of the element count {elems}")]
    ValueCount { vals: usize, elems: usize },

    #[error("Panel {panel} references node {node}, but there are only {num_nodes} nodes")]
    IndexOutOfRange {
        panel: usize,
        node: usize,
        num_nodes: usize,
    },

    #[error("Expected 1 to 3 boundary conditions per panel; got {0}")]
    BcCount(usize),

    #[error("Boundary condition count {got} does not match the existing {expected}")]
    BcMismatch { expected: usize, got: usize },

    #[error("Strength vector has {got} entries; expected {expected}")]
    StrengthSize { expected: usize, got: usize },

    #[error("Strength offset must be zero; got {0}")]
    NonzeroOffset(usize),

    #[error("Particle vector length {0} is not a multiple of 7")]
    ParticleVecLen(usize),

    #[error("No body with index {0}")]
    UnknownBody(usize),

    #[error("Geometry file {path} is unreadable: {reason}")]
    Geometry { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
