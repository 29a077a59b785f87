//! 2D short-range particle simulation kernel.
//!
//! Compute-focused core with no knowledge of workers or communication.
//!
//! # Modules
//! - [`geometry`] -- 2D vectors, axis-aligned rectangles, box distances.
//! - [`particle`] -- the 24-byte particle record and its wire layout.
//! - [`quadtree`] -- region quadtree answering radius queries.
//! - [`forces`] -- pure force and integration kernels.

#![warn(missing_docs)]

pub mod forces;
pub mod geometry;
pub mod particle;
pub mod quadtree;

pub use forces::{compute_force, update_particle};
pub use geometry::{Bounds, Vec2};
pub use particle::{Particle, PARTICLE_BYTES};
pub use quadtree::{QuadTree, LEAF_CAPACITY, MAX_DEPTH};
