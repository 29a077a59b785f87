//! Quadtree build/query timing sweep.
//!
//! Run with: cargo bench -p kernel --bench quadtree_scaling

use std::time::Instant;

use kernel::{Particle, QuadTree, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_population(n: usize) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| Particle {
            id: i as i32,
            mass: 1.0,
            position: Vec2::new(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0)),
            velocity: Vec2::ZERO,
        })
        .collect()
}

fn main() {
    for &n in &[10_000usize, 100_000, 500_000] {
        let particles = make_population(n);

        let start = Instant::now();
        let tree = QuadTree::build(&particles);
        let build = start.elapsed();

        let mut hits = Vec::new();
        let mut total_hits = 0usize;
        let start = Instant::now();
        for p in &particles {
            tree.query_into(p.position, 25.0, &mut hits);
            total_hits += hits.len();
        }
        let query = start.elapsed();

        println!(
            "n={:>7}  build={:>9.3?}  query-all={:>9.3?}  avg-hits={:.1}",
            n,
            build,
            query,
            total_hits as f64 / n as f64
        );
    }
}
