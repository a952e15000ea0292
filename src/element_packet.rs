//! A flat transfer object for moving geometry and strengths into the element collections,
//! without exposing their internal layout.

use crate::error::{Result, SimError};

/// Values per particle in a flat particle vector: position, strength, core radius.
pub const PARTICLE_STRIDE: usize = 7;

#[derive(Clone, Debug, Default)]
pub struct ElementPacket {
    /// Node positions; `(x, y, z)` triples.
    pub x: Vec<f64>,
    /// Triangle connectivity; triples of indices into the nodes. Empty for particles.
    pub idx: Vec<u32>,
    /// Per-element values: strengths, radii, or boundary conditions depending on the consumer.
    pub val: Vec<f64>,
}

impl ElementPacket {
    pub fn new(x: Vec<f64>, idx: Vec<u32>, val: Vec<f64>) -> Self {
        Self { x, idx, val }
    }

    /// Split a flat `(x, y, z, sx, sy, sz, r)` particle vector into positions, and
    /// `(sx, sy, sz, r)` values.
    pub fn from_particles(flat: &[f64]) -> Result<Self> {
        if flat.len() % PARTICLE_STRIDE != 0 {
            return Err(SimError::ParticleVecLen(flat.len()));
        }

        let n = flat.len() / PARTICLE_STRIDE;
        let mut x = Vec::with_capacity(n * 3);
        let mut val = Vec::with_capacity(n * 4);

        for part in flat.chunks_exact(PARTICLE_STRIDE) {
            x.extend_from_slice(&part[0..3]);
            val.extend_from_slice(&part[3..7]);
        }

        Ok(Self {
            x,
            idx: Vec::new(),
            val,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.x.len() / 3
    }

    pub fn num_panels(&self) -> usize {
        self.idx.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Check the array lengths, and that every index refers to an existing node.
    pub fn validate_panels(&self) -> Result<()> {
        if self.idx.len() % 3 != 0 {
            return Err(SimError::IndexCount(self.idx.len()));
        }
        if self.x.len() % 3 != 0 {
            return Err(SimError::PositionCount(self.x.len()));
        }

        let num_panels = self.num_panels();
        if num_panels > 0 && self.val.len() % num_panels != 0 {
            return Err(SimError::ValueCount {
                vals: self.val.len(),
                elems: num_panels,
            });
        }

        let num_nodes = self.num_nodes();
        for (i, &node) in self.idx.iter().enumerate() {
            if node as usize >= num_nodes {
                return Err(SimError::IndexOutOfRange {
                    panel: i / 3,
                    node: node as usize,
                    num_nodes,
                });
            }
        }

        Ok(())
    }

    /// Concatenate another packet onto this one, offsetting its indices past our nodes.
    pub fn append(&mut self, other: &ElementPacket) {
        let offset = self.num_nodes() as u32;

        self.x.extend_from_slice(&other.x);
        self.idx.extend(other.idx.iter().map(|i| i + offset));
        self.val.extend_from_slice(&other.val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particles_split_into_positions_and_values() {
        let flat = [1., 2., 3., 0.1, 0.2, 0.3, 0.5, 4., 5., 6., 0.4, 0.5, 0.6, 0.5];
        let packet = ElementPacket::from_particles(&flat).unwrap();

        assert_eq!(packet.num_nodes(), 2);
        assert_eq!(packet.x, vec![1., 2., 3., 4., 5., 6.]);
        assert_eq!(packet.val, vec![0.1, 0.2, 0.3, 0.5, 0.4, 0.5, 0.6, 0.5]);
        assert!(packet.idx.is_empty());
    }

    #[test]
    fn bad_particle_length() {
        let res = ElementPacket::from_particles(&[0.; 8]);
        assert!(matches!(res, Err(SimError::ParticleVecLen(8))));
    }

    #[test]
    fn index_out_of_range_is_rejected() {
        let packet = ElementPacket::new(vec![0.; 9], vec![0, 1, 3], vec![0.]);
        assert!(matches!(
            packet.validate_panels(),
            Err(SimError::IndexOutOfRange { node: 3, .. })
        ));
    }

    #[test]
    fn append_offsets_indices() {
        let mut a = ElementPacket::new(vec![0.; 9], vec![0, 1, 2], vec![0.]);
        let b = ElementPacket::new(vec![1.; 9], vec![0, 2, 1], vec![1.]);
        a.append(&b);

        assert_eq!(a.idx, vec![0, 1, 2, 3, 5, 4]);
        assert_eq!(a.num_nodes(), 6);
        assert!(a.validate_panels().is_ok());
    }
}
