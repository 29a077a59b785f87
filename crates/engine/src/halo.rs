//! Per-iteration halo exchange.
//!
//! Three phases per iteration: every worker advertises the bounds of its
//! local population, selects the workers whose bounds lie within the cull
//! radius of its own, and swaps entire local populations with exactly that
//! set. A particle can only influence particles of another worker if the
//! two bounding rectangles are within the cull radius, so the combined
//! buffer is complete for force accumulation by construction.

use kernel::{particle, Bounds, Particle};

use crate::comm::{CommError, WorldComm, HALO_TAG};

/// Advertise `local` bounds; returns every worker's bounds by rank.
pub fn advertise_bounds(comm: &WorldComm, local: &Bounds) -> Result<Vec<Bounds>, CommError> {
    let gathered = comm.all_gather(bytemuck::bytes_of(local))?;
    Ok(gathered
        .iter()
        .map(|bytes| bytemuck::pod_read_unaligned(bytes))
        .collect())
}

/// Ranks whose population can influence ours: every `j != rank` with
/// rectangle distance within `radius`.
///
/// The distance is symmetric, so worker `j` selects us exactly when we
/// select `j` and every posted send has a matching receive.
pub fn select_neighbors(all_bounds: &[Bounds], rank: usize, radius: f32) -> Vec<usize> {
    let mine = &all_bounds[rank];
    (0..all_bounds.len())
        .filter(|&j| j != rank && all_bounds[j].distance_to(mine) <= radius)
        .collect()
}

/// Swap local populations with every selected neighbor and return the
/// combined neighborhood: received halos in neighbor order, then our own
/// particles.
///
/// Every send carries the same bytes. Each receive's length is the byte
/// count advertised at the last redistribution (`list_sizes[j]`, already
/// in bytes -- never rescaled here); halos land back to back at offsets
/// given by prefix-summing those counts over the neighbor list.
pub fn exchange_halos(
    comm: &WorldComm,
    local: &[Particle],
    neighbors: &[usize],
    list_sizes: &[usize],
) -> Result<Vec<Particle>, CommError> {
    let local_bytes = particle::as_bytes(local);
    for &j in neighbors {
        comm.post_send(j, HALO_TAG, local_bytes.to_vec())?;
    }

    let pending: Vec<_> = neighbors
        .iter()
        .map(|&j| comm.post_recv(j, HALO_TAG, list_sizes[j]))
        .collect();

    let halo_total: usize = neighbors.iter().map(|&j| list_sizes[j]).sum();
    let mut combined = Vec::with_capacity(halo_total + local_bytes.len());
    for recv in pending {
        combined.extend_from_slice(&recv.wait()?);
    }
    combined.extend_from_slice(local_bytes);
    Ok(particle::from_bytes(&combined))
}
