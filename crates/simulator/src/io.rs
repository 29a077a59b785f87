//! Binary particle file format.
//!
//! Little-endian throughout: an `i32` record count, then one 24-byte
//! record per particle -- `{ id: i32, mass: f32, pos_x, pos_y, vel_x,
//! vel_y }` packed with no padding. Unlike the wire between workers
//! (same-build raw casts), the file is a cross-platform contract, so
//! fields are encoded and decoded explicitly.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use kernel::{Particle, Vec2, PARTICLE_BYTES};

const HEADER_BYTES: usize = 4;

/// Load a particle population, preserving file order.
pub fn load_particles(path: &Path) -> Result<Vec<Particle>> {
    let bytes =
        fs::read(path).with_context(|| format!("reading particle file {}", path.display()))?;
    if bytes.len() < HEADER_BYTES {
        bail!("particle file {} has no header", path.display());
    }

    let count = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if count < 0 {
        bail!("particle file {} declares negative count {count}", path.display());
    }

    let body = &bytes[HEADER_BYTES..];
    let expected = count as usize * PARTICLE_BYTES;
    if body.len() != expected {
        bail!(
            "particle file {} declares {count} records ({expected} bytes) but carries {} bytes",
            path.display(),
            body.len()
        );
    }

    Ok(body.chunks_exact(PARTICLE_BYTES).map(decode_record).collect())
}

/// Write a particle population in file order.
pub fn save_particles(path: &Path, particles: &[Particle]) -> Result<()> {
    if particles.len() > i32::MAX as usize {
        bail!("population of {} exceeds the file format's count field", particles.len());
    }

    let mut bytes = Vec::with_capacity(HEADER_BYTES + particles.len() * PARTICLE_BYTES);
    bytes.extend_from_slice(&(particles.len() as i32).to_le_bytes());
    for p in particles {
        bytes.extend_from_slice(&p.id.to_le_bytes());
        bytes.extend_from_slice(&p.mass.to_le_bytes());
        bytes.extend_from_slice(&p.position.x.to_le_bytes());
        bytes.extend_from_slice(&p.position.y.to_le_bytes());
        bytes.extend_from_slice(&p.velocity.x.to_le_bytes());
        bytes.extend_from_slice(&p.velocity.y.to_le_bytes());
    }

    fs::write(path, bytes).with_context(|| format!("writing particle file {}", path.display()))
}

fn decode_record(record: &[u8]) -> Particle {
    let word = |i: usize| [record[i], record[i + 1], record[i + 2], record[i + 3]];
    Particle {
        id: i32::from_le_bytes(word(0)),
        mass: f32::from_le_bytes(word(4)),
        position: Vec2::new(f32::from_le_bytes(word(8)), f32::from_le_bytes(word(12))),
        velocity: Vec2::new(f32::from_le_bytes(word(16)), f32::from_le_bytes(word(20))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("particles-{tag}-{}.bin", std::process::id()))
    }

    #[test]
    fn round_trip_preserves_order_and_fields() {
        let particles = vec![
            Particle {
                id: 7,
                mass: 1.25,
                position: Vec2::new(-3.0, 4.5),
                velocity: Vec2::new(0.1, -0.2),
            },
            Particle {
                id: 3,
                mass: 2.0,
                position: Vec2::new(0.0, 0.0),
                velocity: Vec2::new(0.0, 0.0),
            },
            Particle {
                id: 9,
                mass: 0.5,
                position: Vec2::new(1.0e6, -1.0e-6),
                velocity: Vec2::new(42.0, -42.0),
            },
        ];

        let path = temp_path("roundtrip");
        save_particles(&path, &particles).unwrap();
        let loaded = load_particles(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, particles);
    }

    #[test]
    fn header_is_little_endian_count() {
        let path = temp_path("header");
        save_particles(&path, &[]).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
    }

    #[test]
    fn truncated_body_is_rejected() {
        let path = temp_path("truncated");
        // Header says two records, body carries one.
        let mut bytes = 2i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; PARTICLE_BYTES]);
        fs::write(&path, bytes).unwrap();
        assert!(load_particles(&path).is_err());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_rejected() {
        assert!(load_particles(Path::new("/nonexistent/particles.bin")).is_err());
    }
}
