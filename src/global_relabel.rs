use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::debug;

use crate::{network::ResidualNetwork, solver::PushRelabel};

const UNSET: usize = usize::MAX;

impl ResidualNetwork {
    /// Exact residual distances to the sink, computed by a level-synchronous
    /// reverse BFS. Vertices that cannot reach the sink get `n`.
    pub fn sink_distances(&self) -> Vec<usize> {
        let distance: Vec<AtomicUsize> = (0..self.n).map(|_| AtomicUsize::new(UNSET)).collect();
        distance[self.sink].store(0, Ordering::Relaxed);
        let mut frontier = vec![self.sink];
        let mut level = 1;
        while !frontier.is_empty() {
            frontier = frontier
                .par_iter()
                .flat_map_iter(|&w| {
                    let distance = &distance;
                    self.out_edges(w).iter().filter_map(move |e| {
                        // `e.v` reaches `w` through the paired edge (v, w).
                        if e.reverse_residual() <= 0 {
                            return None;
                        }
                        distance[e.v]
                            .compare_exchange(UNSET, level, Ordering::Relaxed, Ordering::Relaxed)
                            .ok()
                            .map(|_| e.v)
                    })
                })
                .collect();
            level += 1;
        }
        distance
            .into_iter()
            .map(|d| match d.into_inner() {
                UNSET => self.n,
                d => d,
            })
            .collect()
    }
}

impl PushRelabel {
    /// Replaces every label by its exact distance to the sink, resets the
    /// current-arc cursors and rebuilds the active set from scratch.
    pub(crate) fn global_relabel(&mut self) {
        let network = &self.network;
        let n = network.n;
        let distance = network.sink_distances();
        network
            .vertices
            .par_iter()
            .zip(distance.par_iter())
            .for_each(|(vertex, &d)| {
                vertex.label.store(d, Ordering::Relaxed);
                vertex.new_label.store(d, Ordering::Relaxed);
                vertex.current.store(0, Ordering::Relaxed);
            });
        self.active = (0..n)
            .into_par_iter()
            .filter(|&u| {
                let d = distance[u];
                d > 0 && d < n && network.excess(u) > 0
            })
            .collect();
        self.work_since_last_gr = 0;
        self.stats.global_relabels += 1;
        debug!(
            reachable = distance.iter().filter(|&&d| d < n).count(),
            active = self.active.len(),
            "global relabel"
        );
    }
}
