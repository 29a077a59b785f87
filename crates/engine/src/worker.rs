//! Per-worker simulation state and the iteration protocol.
//!
//! One `Worker` per rank, each single-threaded: computation runs to
//! completion between communicator calls, and every worker executes the
//! same sequence of collectives in the same order each iteration.

use kernel::{
    compute_force, particle, update_particle, Bounds, Particle, QuadTree, Vec2, PARTICLE_BYTES,
};

use crate::comm::WorldComm;
use crate::config::StepParameters;
use crate::error::EngineResult;
use crate::halo;
use crate::partition::GridPartition;

/// How many iterations pass between successive redistributions.
///
/// Redistribution allgathers the full population, while the halo exchange
/// only moves boundary overlap; running it every step would dominate the
/// iteration cost. The interval is a throughput/accuracy heuristic and is
/// configurable per run.
pub const REBUILD_GRANULARITY: usize = 8;

/// One worker's whole-run state.
pub struct Worker {
    comm: WorldComm,
    params: StepParameters,
    rebuild_granularity: usize,
    /// Per-axis extent of the worker grid; the world size is `dim * dim`.
    dim: usize,
    /// Full-population mirror; rendezvous buffer for redistribution and
    /// the final gather. Length is constant across the run.
    particles: Vec<Particle>,
    /// Particles currently owned by this worker.
    local: Vec<Particle>,
    /// Tight bounds of `local`, recomputed after every integration.
    bounds: Bounds,
    /// Byte count of every worker's local population, valid from the most
    /// recent redistribution until the next.
    list_sizes: Vec<usize>,
}

impl Worker {
    /// Create the worker for `comm`'s rank, mirroring the full population.
    ///
    /// The caller has already validated that the world size is a perfect
    /// square.
    pub fn new(
        comm: WorldComm,
        params: StepParameters,
        rebuild_granularity: usize,
        particles: Vec<Particle>,
    ) -> Self {
        let dim = (comm.size() as f64).sqrt() as usize;
        debug_assert_eq!(dim * dim, comm.size());
        let size = comm.size();
        Self {
            comm,
            params,
            rebuild_granularity,
            dim,
            particles,
            local: Vec::new(),
            bounds: Bounds::EMPTY,
            list_sizes: vec![0; size],
        }
    }

    /// Drive the full simulation and return the gathered population in
    /// worker-concatenated order (identical on every worker).
    pub fn run(mut self, iterations: usize) -> EngineResult<Vec<Particle>> {
        if iterations == 0 {
            // No collective ever runs; the mirror is still the loaded
            // population.
            return Ok(self.particles);
        }

        // All workers enter the timed region together.
        self.comm.barrier()?;

        for iteration in 0..iterations {
            if iteration % self.rebuild_granularity == 0 {
                self.redistribute(iteration)?;
            }
            self.step()?;
            self.comm.barrier()?;
        }

        // Final gather: every worker ends with the full population again.
        let gathered = self
            .comm
            .all_gather_varied(particle::as_bytes(&self.local), &self.list_sizes)?;
        Ok(particle::from_bytes(&gathered))
    }

    /// Reassign every particle to the worker owning its current position.
    fn redistribute(&mut self, iteration: usize) -> EngineResult<()> {
        let rank = self.comm.rank();

        let global = if iteration == 0 {
            // First call: the loaded population is already mirrored
            // everywhere, so the world bounds come from it directly.
            Bounds::enclosing(self.particles.iter().map(|p| p.position))
        } else {
            // Pull everyone's locals back into the mirror, then agree on
            // the world bounds from the advertised local bounds.
            let all_bounds = halo::advertise_bounds(&self.comm, &self.bounds)?;
            let gathered = self
                .comm
                .all_gather_varied(particle::as_bytes(&self.local), &self.list_sizes)?;
            self.particles = particle::from_bytes(&gathered);

            let mut global = Bounds::EMPTY;
            for b in &all_bounds {
                if !b.is_empty() {
                    global.expand(b.min);
                    global.expand(b.max);
                }
            }
            global
        };

        let partition = GridPartition::new(self.dim, &global);
        self.local = self
            .particles
            .iter()
            .filter(|p| partition.owner(p.position) == rank)
            .copied()
            .collect();

        // Share the new byte counts; the prefix sums derived from them
        // stay valid until the next redistribution.
        let own_bytes = (self.local.len() * PARTICLE_BYTES) as u64;
        let gathered_counts = self.comm.all_gather(&own_bytes.to_le_bytes())?;
        self.list_sizes = gathered_counts
            .iter()
            .map(|bytes| byte_count_from_wire(bytes))
            .collect();

        let total: usize = self.list_sizes.iter().sum();
        assert_eq!(
            total,
            self.particles.len() * PARTICLE_BYTES,
            "ownership must conserve the population"
        );

        self.bounds = Bounds::enclosing(self.local.iter().map(|p| p.position));
        tracing::debug!(
            rank,
            iteration,
            owned = self.local.len(),
            "redistributed particle ownership"
        );
        Ok(())
    }

    /// One simulation step: advertise bounds, exchange halos, rebuild the
    /// local quadtree, accumulate forces, integrate.
    fn step(&mut self) -> EngineResult<()> {
        let all_bounds = halo::advertise_bounds(&self.comm, &self.bounds)?;
        let neighbor_workers =
            halo::select_neighbors(&all_bounds, self.comm.rank(), self.params.cull_radius);
        let neighborhood =
            halo::exchange_halos(&self.comm, &self.local, &neighbor_workers, &self.list_sizes)?;

        let tree = QuadTree::build(&neighborhood);
        let mut hits = Vec::new();
        let mut bounds = Bounds::EMPTY;
        let mut next = Vec::with_capacity(self.local.len());
        for p in &self.local {
            tree.query_into(p.position, self.params.cull_radius, &mut hits);
            let mut force = Vec2::ZERO;
            for q in &hits {
                // The query returns the particle itself (distance zero);
                // the self-pair is filtered by id, never by position.
                if q.id != p.id {
                    force += compute_force(p, q, self.params.cull_radius);
                }
            }
            let updated = update_particle(p, force, self.params.delta_time);
            bounds.expand(updated.position);
            next.push(updated);
        }

        self.local = next;
        self.bounds = bounds;
        Ok(())
    }
}

/// Decode a byte count advertised through the collective.
fn byte_count_from_wire(bytes: &[u8]) -> usize {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf) as usize
}
