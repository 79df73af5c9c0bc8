use rayon::prelude::*;

use crate::{
    error::{FlowError, Invariant},
    solver::PushRelabel,
};

impl PushRelabel {
    /// Verifies the terminal preflow: conservation at every vertex but the
    /// source, capacity bounds and pairing on every edge, valid labels on
    /// every unsaturated edge and no excess stranded below height `n`.
    pub fn check_correctness(&self) -> Result<(), FlowError> {
        let network = &self.network;
        let n = network.n;
        (0..n).into_par_iter().try_for_each(|u| {
            let label = network.label(u);
            let excess = network.excess(u);
            let mut outflow = 0isize;
            for edge in network.out_edges(u) {
                let flow = edge.flow();
                outflow += flow;
                let paired = network.edges[edge.pair].flow();
                if paired != -flow {
                    return Err(FlowError::violation(
                        u,
                        Invariant::ResidualPairing,
                        format!(
                            "edge to {} carries {} but its pair carries {}",
                            edge.v, flow, paired
                        ),
                    ));
                }
                if flow > edge.capacity || -flow > edge.residual_capacity {
                    return Err(FlowError::violation(
                        u,
                        Invariant::CapacityBound,
                        format!(
                            "edge to {} carries {} outside bounds [-{}, {}]",
                            edge.v, flow, edge.residual_capacity, edge.capacity
                        ),
                    ));
                }
                let head = network.label(edge.v);
                if edge.residual() > 0 && label > head + 1 {
                    return Err(FlowError::violation(
                        u,
                        Invariant::LabelValidity,
                        format!(
                            "unsaturated edge to {} drops from height {} to {}",
                            edge.v, label, head
                        ),
                    ));
                }
            }
            if u != network.source && outflow != -excess {
                return Err(FlowError::violation(
                    u,
                    Invariant::Conservation,
                    format!("excess {} but net outflow {}", excess, outflow),
                ));
            }
            if u != network.source && u != network.sink && excess > 0 && label < n {
                return Err(FlowError::violation(
                    u,
                    Invariant::LeftoverExcess,
                    format!("excess {} left at height {}", excess, label),
                ));
            }
            Ok(())
        })
    }
}
