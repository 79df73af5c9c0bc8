use std::sync::atomic::Ordering;

use crate::network::ResidualNetwork;

impl ResidualNetwork {
    /// Records `v` in `discovered` unless some other pusher already claimed
    /// it this round.
    pub(crate) fn push_active(&self, discovered: &mut Vec<usize>, v: usize) {
        if self.vertices[v]
            .is_discovered
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            discovered.push(v);
        }
    }

    /// Discharges `u` along admissible edges starting at its current arc.
    ///
    /// Pushed flow is staged in the heads' `added_excess`. Returns whether
    /// the cursor ran off the end of the edge list, i.e. `u` must be
    /// relabeled before it can push again.
    pub(crate) fn push(&self, u: usize, discovered: &mut Vec<usize>) -> (bool, usize) {
        let vertex = &self.vertices[u];
        let label = vertex.label();
        let edges = self.out_edges(u);
        let mut excess = vertex.excess();
        let mut current = vertex.current.load(Ordering::Relaxed);
        let mut pushes = 0;
        while excess > 0 && current < edges.len() {
            let edge = &edges[current];
            let head = &self.vertices[edge.v];
            let residual = edge.residual();
            if residual <= 0 || label <= head.label() {
                current += 1;
                continue;
            }
            let delta = residual.min(excess);
            edge.flow.fetch_add(delta, Ordering::Relaxed);
            self.edges[edge.pair]
                .flow
                .fetch_sub(delta, Ordering::Relaxed);
            excess -= delta;
            head.added_excess.fetch_add(delta, Ordering::Relaxed);
            self.push_active(discovered, edge.v);
            pushes += 1;
            if delta == residual {
                current += 1;
            }
        }
        vertex.excess.store(excess, Ordering::Relaxed);
        vertex.current.store(current, Ordering::Relaxed);
        if excess > 0 {
            self.push_active(discovered, u);
        }
        (current == edges.len(), pushes)
    }

    /// Stages `1 + min label` over the unsaturated out-edges of `u` (capped
    /// at `n`) in `new_label` and rewinds the current arc.
    pub(crate) fn relabel(&self, u: usize) {
        let n = self.n;
        let new_label = self
            .out_edges(u)
            .iter()
            .filter(|e| e.residual() > 0)
            .map(|e| self.label(e.v))
            .min()
            .map_or(n, |min| (min + 1).min(n));
        let vertex = &self.vertices[u];
        vertex.new_label.store(new_label, Ordering::Relaxed);
        vertex.current.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::Ordering;

    use crate::{instance::FlowInstance, network::ResidualNetwork};

    fn labeled(network: &ResidualNetwork, labels: &[usize]) {
        for (vertex, &label) in network.vertices.iter().zip(labels) {
            vertex.label.store(label, Ordering::Relaxed);
            vertex.new_label.store(label, Ordering::Relaxed);
        }
    }

    #[test]
    fn push_drains_excess_down_hill() {
        let instance =
            FlowInstance::from_arcs(4, 0, 3, &[(1, 2, 3), (1, 3, 10), (0, 1, 20)]).unwrap();
        let network = ResidualNetwork::build(&instance).unwrap();
        labeled(&network, &[4, 2, 1, 0]);
        network.vertices[1].excess.store(7, Ordering::Relaxed);

        let mut discovered = vec![];
        let (need_relabel, pushes) = network.push(1, &mut discovered);

        // edge to 2 saturates, edge to 3 takes the rest and stays current
        assert!(!need_relabel);
        assert_eq!(pushes, 2);
        assert_eq!(network.excess(1), 0);
        assert_eq!(network.vertices[1].current.load(Ordering::Relaxed), 1);
        assert_eq!(discovered, vec![2, 3]);
        assert_eq!(network.vertices[2].added_excess.load(Ordering::Relaxed), 3);
        assert_eq!(network.vertices[3].added_excess.load(Ordering::Relaxed), 4);
        for edge in network.edges.iter() {
            assert_eq!(edge.flow(), -network.edges[edge.pair].flow());
        }
    }

    #[test]
    fn leftover_excess_requests_relabel() {
        let instance = FlowInstance::from_arcs(3, 0, 2, &[(0, 1, 5), (1, 2, 3)]).unwrap();
        let network = ResidualNetwork::build(&instance).unwrap();
        labeled(&network, &[2, 1, 0]);
        let source_edge = &network.out_edges(0)[0];
        source_edge.flow.store(5, Ordering::Relaxed);
        network.edges[source_edge.pair]
            .flow
            .store(-5, Ordering::Relaxed);
        network.vertices[1].excess.store(5, Ordering::Relaxed);

        let mut discovered = vec![];
        let (need_relabel, _) = network.push(1, &mut discovered);
        assert!(need_relabel);
        assert_eq!(network.excess(1), 2);
        assert_eq!(discovered, vec![2, 1]);

        // only the edge back to the source is unsaturated
        network.relabel(1);
        assert_eq!(network.vertices[1].new_label.load(Ordering::Relaxed), 3);
        assert_eq!(network.label(1), 1);
        assert_eq!(network.vertices[1].current.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn push_active_claims_once() {
        let instance = FlowInstance::from_arcs(2, 0, 1, &[(0, 1, 1)]).unwrap();
        let network = ResidualNetwork::build(&instance).unwrap();
        let (mut a, mut b) = (vec![], vec![]);
        network.push_active(&mut a, 1);
        network.push_active(&mut b, 1);
        assert_eq!(a, vec![1]);
        assert!(b.is_empty());
    }

    #[test]
    fn relabel_without_residual_edges_lifts_to_n() {
        let instance = FlowInstance::from_arcs(3, 0, 2, &[(0, 1, 5), (1, 2, 3)]).unwrap();
        let network = ResidualNetwork::build(&instance).unwrap();
        labeled(&network, &[2, 1, 0]);
        network.relabel(2);
        assert_eq!(network.vertices[2].new_label.load(Ordering::Relaxed), 3);
    }
}
