//! The particle record and its binary wire layout.
//!
//! Particles cross worker boundaries and the filesystem as raw 24-byte
//! records, so the in-memory layout is the wire layout: `#[repr(C)]` with
//! no padding, identical on every worker (homogeneous-cluster assumption).

use bytemuck::{Pod, Zeroable};

use crate::geometry::Vec2;

/// Size in bytes of one particle record on the wire and on disk.
pub const PARTICLE_BYTES: usize = std::mem::size_of::<Particle>();

/// A point particle, immutable within a time step.
///
/// `id` is stable across the whole run and is used only to filter
/// self-pairs during force accumulation and to restore input-file order
/// for output.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Stable identity, unique across the population.
    pub id: i32,
    /// Particle mass.
    pub mass: f32,
    /// Current position.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
}

/// View a particle slice as its wire bytes, zero-copy.
#[inline]
pub fn as_bytes(particles: &[Particle]) -> &[u8] {
    bytemuck::cast_slice(particles)
}

/// Decode a wire buffer back into particles.
///
/// The buffer length must be a whole number of records; a ragged buffer
/// means a worker disagreed about the record layout, which is fatal.
pub fn from_bytes(bytes: &[u8]) -> Vec<Particle> {
    assert!(
        bytes.len() % PARTICLE_BYTES == 0,
        "particle buffer of {} bytes is not a whole number of {}-byte records",
        bytes.len(),
        PARTICLE_BYTES
    );
    bytemuck::pod_collect_to_vec(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_24_bytes_with_no_padding() {
        assert_eq!(PARTICLE_BYTES, 24);
        assert_eq!(std::mem::align_of::<Particle>(), 4);
    }

    #[test]
    fn byte_round_trip() {
        let particles = vec![
            Particle {
                id: 7,
                mass: 1.5,
                position: Vec2::new(1.0, -2.0),
                velocity: Vec2::new(0.25, 0.5),
            },
            Particle {
                id: -3,
                mass: 0.125,
                position: Vec2::new(1.0e6, 1.0e-6),
                velocity: Vec2::ZERO,
            },
        ];
        let bytes = as_bytes(&particles);
        assert_eq!(bytes.len(), 2 * PARTICLE_BYTES);
        assert_eq!(from_bytes(bytes), particles);
    }

    #[test]
    fn decode_survives_unaligned_input() {
        let p = Particle {
            id: 1,
            mass: 2.0,
            position: Vec2::new(3.0, 4.0),
            velocity: Vec2::new(5.0, 6.0),
        };
        // Shift the record into a deliberately misaligned buffer.
        let mut shifted = vec![0u8; PARTICLE_BYTES + 1];
        shifted[1..].copy_from_slice(as_bytes(std::slice::from_ref(&p)));
        assert_eq!(from_bytes(&shifted[1..]), vec![p]);
    }

    #[test]
    #[should_panic(expected = "whole number")]
    fn ragged_buffer_is_fatal() {
        from_bytes(&[0u8; 23]);
    }
}
