//! Pure force and integration kernels.
//!
//! Both functions are free of simulation state: the drivers call them for
//! every (owned particle, neighbor) pair and particle respectively, and
//! identical inputs always produce identical outputs, which the
//! distributed-vs-reference validation relies on.

use crate::geometry::Vec2;
use crate::particle::Particle;

/// Gravitational coupling constant at benchmark scale.
const GRAVITY: f32 = 0.0667;

/// Below this separation the pair force is zero.
///
/// Keeps coincident pairs finite; the direction of a zero-length
/// separation is undefined anyway.
const MIN_SEPARATION: f32 = 1.0e-3;

/// Attractive force exerted on `target` by `other`.
///
/// Zero at or beyond `cull_radius` and for near-coincident pairs. The
/// self-pair is *not* special-cased here; callers filter by id equality
/// before accumulating.
#[inline]
pub fn compute_force(target: &Particle, other: &Particle, cull_radius: f32) -> Vec2 {
    let delta = other.position - target.position;
    let dist = delta.length();
    if dist >= cull_radius || dist < MIN_SEPARATION {
        return Vec2::ZERO;
    }
    // Inverse-square attraction along the separation direction.
    let strength = GRAVITY * target.mass * other.mass / (dist * dist);
    delta * (strength / dist)
}

/// Advance one particle by `delta_time` under `force` (semi-implicit
/// Euler: velocity first, then position with the new velocity).
#[inline]
pub fn update_particle(p: &Particle, force: Vec2, delta_time: f32) -> Particle {
    let velocity = p.velocity + force * (delta_time / p.mass);
    Particle {
        position: p.position + velocity * delta_time,
        velocity,
        ..*p
    }
}
