//! Channel-backed worker communicator.
//!
//! Workers run as threads, but all inter-worker traffic flows through the
//! endpoints built here: one FIFO channel per ordered worker pair, message
//! matching by (sender, receiver, tag) and posting order. Collectives are
//! built from the same point-to-point channels; every worker executes the
//! same collective sequence in the same order, so per-pair FIFO keeps them
//! matched, and reserved tags catch any protocol drift. A network
//! transport can replace this one without changing the protocol layers
//! above it.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

/// Tag shared by all halo point-to-point transfers.
pub const HALO_TAG: u32 = 0;

// Reserved tags for the collectives built on the same channels.
const TAG_BARRIER: u32 = u32::MAX;
const TAG_GATHER: u32 = u32::MAX - 1;
const TAG_GATHERV: u32 = u32::MAX - 2;

/// How long a receive may sit idle before the cluster is declared
/// stalled. There is no recovery; the failure propagates upward.
const STALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Transport failures. All of them are fatal to the run.
#[derive(Debug, Error)]
pub enum CommError {
    /// The destination worker's endpoint no longer exists.
    #[error("worker {to} is gone; send from worker {from} failed")]
    SendFailed {
        /// Sending rank.
        from: usize,
        /// Dead destination rank.
        to: usize,
    },

    /// The sending worker's endpoint dropped before delivering.
    #[error("worker {from} disconnected before sending to worker {at}")]
    Disconnected {
        /// Dead source rank.
        from: usize,
        /// Receiving rank.
        at: usize,
    },

    /// Nothing arrived within the stall timeout.
    #[error("receive from worker {from} at worker {at} timed out; cluster stalled")]
    Stalled {
        /// Expected source rank.
        from: usize,
        /// Receiving rank.
        at: usize,
    },

    /// A message arrived with the wrong tag: the peers disagree about the
    /// protocol sequence.
    #[error("tag mismatch on message from worker {from}: expected {expected:#x}, got {got:#x}")]
    TagMismatch {
        /// Source rank.
        from: usize,
        /// Tag this receive was posted for.
        expected: u32,
        /// Tag actually received.
        got: u32,
    },

    /// A message arrived with the wrong byte count.
    #[error("message from worker {from} carries {got} bytes, expected {expected}")]
    SizeMismatch {
        /// Source rank.
        from: usize,
        /// Advertised byte count.
        expected: usize,
        /// Received byte count.
        got: usize,
    },
}

struct Message {
    tag: u32,
    bytes: Vec<u8>,
}

/// One worker's endpoint into the cluster.
pub struct WorldComm {
    rank: usize,
    /// `peers[d]` delivers to rank `d`.
    peers: Vec<Sender<Message>>,
    /// `inboxes[s]` receives what rank `s` sent here.
    inboxes: Vec<Receiver<Message>>,
}

/// Build the endpoints of a `size`-worker world, indexed by rank.
pub fn channel_world(size: usize) -> Vec<WorldComm> {
    let mut senders: Vec<Vec<Sender<Message>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut inboxes: Vec<Vec<Option<Receiver<Message>>>> =
        (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

    for src in 0..size {
        for dst in 0..size {
            let (tx, rx) = unbounded();
            senders[src].push(tx);
            inboxes[dst][src] = Some(rx);
        }
    }

    senders
        .into_iter()
        .zip(inboxes)
        .enumerate()
        .map(|(rank, (peers, inbox_row))| WorldComm {
            rank,
            peers,
            inboxes: inbox_row.into_iter().flatten().collect(),
        })
        .collect()
}

impl WorldComm {
    /// This worker's rank in `[0, size)`.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers in the world.
    pub fn size(&self) -> usize {
        self.peers.len()
    }

    /// Post a non-blocking send of `bytes` to worker `to`.
    ///
    /// The channel is unbounded, so the call returns as soon as the
    /// message is enqueued.
    pub fn post_send(&self, to: usize, tag: u32, bytes: Vec<u8>) -> Result<(), CommError> {
        self.peers[to]
            .send(Message { tag, bytes })
            .map_err(|_| CommError::SendFailed { from: self.rank, to })
    }

    /// Post a receive of exactly `expected` bytes from worker `from`.
    ///
    /// Completion happens in [`PendingRecv::wait`]; posting itself does
    /// not block.
    pub fn post_recv(&self, from: usize, tag: u32, expected: usize) -> PendingRecv<'_> {
        PendingRecv {
            comm: self,
            from,
            tag,
            expected,
        }
    }

    fn recv(&self, from: usize, tag: u32) -> Result<Vec<u8>, CommError> {
        match self.inboxes[from].recv_timeout(STALL_TIMEOUT) {
            Ok(msg) if msg.tag == tag => Ok(msg.bytes),
            Ok(msg) => Err(CommError::TagMismatch {
                from,
                expected: tag,
                got: msg.tag,
            }),
            Err(RecvTimeoutError::Timeout) => Err(CommError::Stalled { from, at: self.rank }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CommError::Disconnected { from, at: self.rank })
            }
        }
    }

    /// Global synchronization point: returns once every worker has
    /// entered the barrier.
    pub fn barrier(&self) -> Result<(), CommError> {
        for to in 0..self.size() {
            if to != self.rank {
                self.post_send(to, TAG_BARRIER, Vec::new())?;
            }
        }
        for from in 0..self.size() {
            if from != self.rank {
                self.recv(from, TAG_BARRIER)?;
            }
        }
        Ok(())
    }

    /// All-to-all of one equal-size contribution per worker.
    ///
    /// Returns every worker's contribution indexed by rank, own
    /// contribution included.
    pub fn all_gather(&self, contribution: &[u8]) -> Result<Vec<Vec<u8>>, CommError> {
        for to in 0..self.size() {
            if to != self.rank {
                self.post_send(to, TAG_GATHER, contribution.to_vec())?;
            }
        }

        let mut gathered = vec![Vec::new(); self.size()];
        gathered[self.rank] = contribution.to_vec();
        for from in 0..self.size() {
            if from == self.rank {
                continue;
            }
            let bytes = self.recv(from, TAG_GATHER)?;
            if bytes.len() != contribution.len() {
                return Err(CommError::SizeMismatch {
                    from,
                    expected: contribution.len(),
                    got: bytes.len(),
                });
            }
            gathered[from] = bytes;
        }
        Ok(gathered)
    }

    /// Allgather with per-rank byte counts known to every worker.
    ///
    /// Returns the rank-ordered concatenation; each contribution lands at
    /// the offset obtained by prefix-summing `counts`.
    pub fn all_gather_varied(
        &self,
        contribution: &[u8],
        counts: &[usize],
    ) -> Result<Vec<u8>, CommError> {
        assert_eq!(counts.len(), self.size(), "one byte count per worker");
        assert_eq!(
            contribution.len(),
            counts[self.rank],
            "own contribution must match the advertised byte count"
        );

        let mut displs = Vec::with_capacity(self.size());
        let mut total = 0usize;
        for &count in counts {
            displs.push(total);
            total += count;
        }

        for to in 0..self.size() {
            if to != self.rank {
                self.post_send(to, TAG_GATHERV, contribution.to_vec())?;
            }
        }

        let mut gathered = vec![0u8; total];
        gathered[displs[self.rank]..displs[self.rank] + counts[self.rank]]
            .copy_from_slice(contribution);
        for from in 0..self.size() {
            if from == self.rank {
                continue;
            }
            let bytes = self.recv(from, TAG_GATHERV)?;
            if bytes.len() != counts[from] {
                return Err(CommError::SizeMismatch {
                    from,
                    expected: counts[from],
                    got: bytes.len(),
                });
            }
            gathered[displs[from]..displs[from] + counts[from]].copy_from_slice(&bytes);
        }
        Ok(gathered)
    }
}

/// A posted receive; completed by [`PendingRecv::wait`].
#[must_use = "a posted receive does nothing until waited on"]
pub struct PendingRecv<'a> {
    comm: &'a WorldComm,
    from: usize,
    tag: u32,
    expected: usize,
}

impl PendingRecv<'_> {
    /// Block until the message arrives, validating tag and byte count.
    pub fn wait(self) -> Result<Vec<u8>, CommError> {
        let bytes = self.comm.recv(self.from, self.tag)?;
        if bytes.len() != self.expected {
            return Err(CommError::SizeMismatch {
                from: self.from,
                expected: self.expected,
                got: bytes.len(),
            });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    /// Run `f` on every endpoint of a fresh world, one thread per rank,
    /// and return the outputs indexed by rank.
    fn with_world<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(WorldComm) -> T + Send + Sync + 'static + Clone,
    {
        let endpoints = channel_world(size);
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|comm| {
                let f = f.clone();
                thread::spawn(move || f(comm))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn world_has_dense_rank_space() {
        let world = channel_world(3);
        assert_eq!(world.len(), 3);
        for (i, comm) in world.iter().enumerate() {
            assert_eq!(comm.rank(), i);
            assert_eq!(comm.size(), 3);
        }
    }

    #[test]
    fn all_gather_collects_every_contribution() {
        let gathered = with_world(4, |comm| {
            let payload = [comm.rank() as u8; 5];
            comm.all_gather(&payload).unwrap()
        });
        for per_rank in gathered {
            assert_eq!(per_rank.len(), 4);
            for (src, bytes) in per_rank.iter().enumerate() {
                assert_eq!(bytes, &vec![src as u8; 5]);
            }
        }
    }

    #[test]
    fn all_gather_varied_concatenates_in_rank_order() {
        let counts = vec![1usize, 3, 0, 2];
        let gathered = with_world(4, move |comm| {
            let payload = vec![comm.rank() as u8; counts[comm.rank()]];
            comm.all_gather_varied(&payload, &counts).unwrap()
        });
        for bytes in gathered {
            assert_eq!(bytes, vec![0, 1, 1, 1, 3, 3]);
        }
    }

    #[test]
    fn point_to_point_preserves_posting_order() {
        let results = with_world(2, |comm| {
            if comm.rank() == 0 {
                comm.post_send(1, HALO_TAG, vec![1]).unwrap();
                comm.post_send(1, HALO_TAG, vec![2, 2]).unwrap();
                Vec::new()
            } else {
                let first = comm.post_recv(0, HALO_TAG, 1);
                let second = comm.post_recv(0, HALO_TAG, 2);
                let mut got = first.wait().unwrap();
                got.extend(second.wait().unwrap());
                got
            }
        });
        assert_eq!(results[1], vec![1, 2, 2]);
    }

    #[test]
    fn wrong_size_is_a_transport_error() {
        let results = with_world(2, |comm| {
            if comm.rank() == 0 {
                comm.post_send(1, HALO_TAG, vec![0; 7]).unwrap();
                true
            } else {
                let pending = comm.post_recv(0, HALO_TAG, 24);
                matches!(pending.wait(), Err(CommError::SizeMismatch { .. }))
            }
        });
        assert!(results[1]);
    }

    #[test]
    fn barrier_completes_for_everyone() {
        let results = with_world(4, |comm| comm.barrier().is_ok());
        assert!(results.into_iter().all(|ok| ok));
    }

    #[test]
    fn dropped_peer_surfaces_as_disconnect() {
        let endpoints = channel_world(2);
        let mut iter = endpoints.into_iter();
        let zero = iter.next().unwrap();
        let one = iter.next().unwrap();
        drop(one);
        assert!(matches!(
            zero.recv(1, HALO_TAG),
            Err(CommError::Disconnected { from: 1, at: 0 })
        ));
    }
}
