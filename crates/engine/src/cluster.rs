//! Cluster harness: one thread per worker over the channel transport.
//!
//! The harness validates the run configuration, spawns the workers,
//! collects the gathered population from the coordinator, and restores
//! canonical input order for output. A single-process reference simulator
//! lives here too; validation compares the two.

use std::thread;

use fxhash::FxHashMap;
use kernel::{compute_force, update_particle, Particle, QuadTree, Vec2};

use crate::comm::channel_world;
use crate::config::StepParameters;
use crate::error::{EngineError, EngineResult};
use crate::worker::{Worker, REBUILD_GRANULARITY};

/// Configuration of one cluster run.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Worker count; must be a positive perfect square.
    pub workers: usize,
    /// Number of iterations to simulate.
    pub iterations: usize,
    /// Step parameters shared by every worker.
    pub params: StepParameters,
    /// Iterations between redistributions.
    pub rebuild_granularity: usize,
}

impl ClusterConfig {
    /// Configuration with the default redistribution interval.
    pub fn new(workers: usize, iterations: usize, params: StepParameters) -> Self {
        Self {
            workers,
            iterations,
            params,
            rebuild_granularity: REBUILD_GRANULARITY,
        }
    }
}

/// Integer square root of the worker count, or an error if the count
/// cannot tile a square grid.
fn worker_grid_dim(workers: usize) -> EngineResult<usize> {
    let dim = (workers as f64).sqrt().round() as usize;
    if workers == 0 || dim * dim != workers {
        return Err(EngineError::WorkerCount(workers));
    }
    Ok(dim)
}

/// Run the distributed simulation and return the population in input
/// order.
pub fn run_cluster(config: &ClusterConfig, particles: &[Particle]) -> EngineResult<Vec<Particle>> {
    let dim = worker_grid_dim(config.workers)?;
    if config.rebuild_granularity == 0 {
        return Err(EngineError::RebuildGranularity);
    }
    config.params.validate()?;
    let id_index = build_id_index(particles)?;

    tracing::info!(
        workers = config.workers,
        dim,
        iterations = config.iterations,
        population = particles.len(),
        "starting cluster run"
    );

    let endpoints = channel_world(config.workers);
    let mut handles = Vec::with_capacity(config.workers);
    for comm in endpoints {
        let mirror = particles.to_vec();
        let params = config.params;
        let granularity = config.rebuild_granularity;
        let iterations = config.iterations;
        let handle = thread::Builder::new()
            .name(format!("worker-{}", comm.rank()))
            .spawn(move || Worker::new(comm, params, granularity, mirror).run(iterations))
            .map_err(EngineError::Spawn)?;
        handles.push(handle);
    }

    // The gathered population is identical on every worker; keep the
    // coordinator's copy but surface any worker's failure.
    let mut results = Vec::with_capacity(config.workers);
    for (rank, handle) in handles.into_iter().enumerate() {
        let result = handle
            .join()
            .map_err(|_| EngineError::WorkerPanic { rank })??;
        results.push(result);
    }
    let gathered = results.swap_remove(0);

    restore_input_order(gathered, &id_index)
}

/// Single-process reference simulator.
///
/// One quadtree over the whole population per iteration, the same force
/// accumulation and self-pair policy as the distributed workers, and the
/// input's particle order throughout. Validation compares `run_cluster`
/// against this.
pub fn run_single(
    particles: &[Particle],
    iterations: usize,
    params: &StepParameters,
) -> Vec<Particle> {
    let mut population = particles.to_vec();
    let mut hits = Vec::new();
    for _ in 0..iterations {
        let tree = QuadTree::build(&population);
        population = population
            .iter()
            .map(|p| {
                tree.query_into(p.position, params.cull_radius, &mut hits);
                let mut force = Vec2::ZERO;
                for q in &hits {
                    if q.id != p.id {
                        force += compute_force(p, q, params.cull_radius);
                    }
                }
                update_particle(p, force, params.delta_time)
            })
            .collect();
    }
    population
}

/// Map each particle id to its index in the loaded input.
///
/// Built once at startup; used only to restore output ordering.
pub fn build_id_index(particles: &[Particle]) -> EngineResult<FxHashMap<i32, usize>> {
    let mut index = FxHashMap::default();
    index.reserve(particles.len());
    for (i, p) in particles.iter().enumerate() {
        if index.insert(p.id, i).is_some() {
            return Err(EngineError::DuplicateParticle(p.id));
        }
    }
    Ok(index)
}

/// Reorder a gathered population back to input order.
pub fn restore_input_order(
    gathered: Vec<Particle>,
    id_index: &FxHashMap<i32, usize>,
) -> EngineResult<Vec<Particle>> {
    if gathered.len() != id_index.len() {
        return Err(EngineError::PopulationMismatch {
            expected: id_index.len(),
            got: gathered.len(),
        });
    }

    let mut ordered: Vec<Option<Particle>> = vec![None; gathered.len()];
    for p in gathered {
        let &slot = id_index
            .get(&p.id)
            .ok_or(EngineError::UnknownParticle(p.id))?;
        if ordered[slot].replace(p).is_some() {
            return Err(EngineError::DuplicateParticle(p.id));
        }
    }
    // Counts match and ids are unique, so every slot is filled.
    Ok(ordered.into_iter().flatten().collect())
}
