//! Round-synchronous parallel push-relabel.
//!
//! Every round discharges all active vertices in parallel. Heights read
//! during a round are the ones committed at the previous round boundary
//! and pushed flow is staged in the receivers' `added_excess`, so the
//! result of a round does not depend on how its vertices are scheduled.
//! Exact heights are periodically restored by a global relabel once the
//! accumulated work passes `alpha * n + m` (scaled by `freq`).

use std::sync::atomic::Ordering;

use rayon::prelude::*;
use tracing::{info, trace};

use crate::{error::FlowError, instance::FlowInstance, network::ResidualNetwork};

#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Per-vertex weight of the global relabel threshold.
    pub alpha: usize,
    /// Flat work charged for every visit of an active vertex.
    pub beta: usize,
    /// Scale applied to the accumulated work before comparing it with the threshold.
    pub freq: f64,
    /// Run the correctness checker after termination.
    pub check: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            alpha: 6,
            beta: 12,
            freq: 0.5,
            check: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub rounds: usize,
    pub global_relabels: usize,
    pub relabels: usize,
    pub pushes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub max_flow: isize,
    pub stats: SolveStats,
}

pub struct PushRelabel {
    pub(crate) network: ResidualNetwork,
    pub(crate) active: Vec<usize>,
    pub(crate) work_since_last_gr: usize,
    pub(crate) config: SolverConfig,
    pub(crate) stats: SolveStats,
}

struct Discharge {
    vertex: usize,
    need_relabel: bool,
    pushes: usize,
    discovered: Vec<usize>,
}

impl PushRelabel {
    /// Builds the residual network and runs the initial global relabel.
    pub fn new(instance: &FlowInstance, config: SolverConfig) -> Result<Self, FlowError> {
        let network = ResidualNetwork::build(instance)?;
        let mut solver = PushRelabel {
            network,
            active: vec![],
            work_since_last_gr: 0,
            config,
            stats: SolveStats::default(),
        };
        solver.global_relabel();
        Ok(solver)
    }

    pub fn solve(instance: &FlowInstance, config: SolverConfig) -> Result<Solution, FlowError> {
        let mut solver = Self::new(instance, config)?;
        info!(
            n = solver.network.n,
            m = solver.network.m,
            source = solver.network.source,
            sink = solver.network.sink,
            "solving"
        );
        while solver.step() {}
        if config.check {
            solver.check_correctness()?;
        }
        let solution = Solution {
            max_flow: solver.flow_value(),
            stats: solver.stats,
        };
        info!(
            max_flow = solution.max_flow,
            rounds = solution.stats.rounds,
            global_relabels = solution.stats.global_relabels,
            "solved"
        );
        Ok(solution)
    }

    /// Runs one round. Returns `false` once no vertex is active.
    pub fn step(&mut self) -> bool {
        if self.active.is_empty() {
            return false;
        }
        self.round();
        self.stats.rounds += 1;

        let work: usize = self
            .active
            .par_iter()
            .map(|&v| self.network.vertices[v].work.load(Ordering::Relaxed))
            .sum();
        self.work_since_last_gr += work;
        trace!(
            round = self.stats.rounds,
            active = self.active.len(),
            work = self.work_since_last_gr,
            "round"
        );
        if self.work_since_last_gr as f64 * self.config.freq > self.relabel_threshold() {
            self.global_relabel();
        }
        !self.active.is_empty()
    }

    fn relabel_threshold(&self) -> f64 {
        self.config.alpha as f64 * self.network.n as f64 + self.network.m as f64
    }

    fn round(&mut self) {
        let network = &self.network;
        let n = network.n;
        let beta = self.config.beta;

        let discharges: Vec<Discharge> = self
            .active
            .par_iter()
            .map(|&u| {
                network.vertices[u].work.store(0, Ordering::Relaxed);
                let mut discovered = Vec::new();
                let (need_relabel, pushes) = network.push(u, &mut discovered);
                Discharge {
                    vertex: u,
                    need_relabel,
                    pushes,
                    discovered,
                }
            })
            .collect();

        // Relabeling starts after every push of the round has landed, so the
        // residual capacities it inspects are stable.
        let relabels: usize = discharges
            .par_iter()
            .map(|d| {
                let vertex = &network.vertices[d.vertex];
                let label = vertex.label();
                let relabel = d.need_relabel && label > 0 && label < n;
                if relabel {
                    network.relabel(d.vertex);
                }
                vertex
                    .work
                    .store(vertex.out_degree() + beta, Ordering::Relaxed);
                relabel as usize
            })
            .sum();

        discharges.par_iter().for_each(|d| {
            let vertex = &network.vertices[d.vertex];
            let new_label = vertex.new_label.load(Ordering::Relaxed);
            vertex.label.store(new_label, Ordering::Relaxed);
        });
        discharges
            .par_iter()
            .flat_map_iter(|d| d.discovered.iter())
            .for_each(|&v| {
                let vertex = &network.vertices[v];
                let added = vertex.added_excess.swap(0, Ordering::Relaxed);
                vertex.excess.fetch_add(added, Ordering::Relaxed);
                vertex.is_discovered.store(false, Ordering::Relaxed);
            });

        let sink = network.sink;
        let pushes: usize = discharges.iter().map(|d| d.pushes).sum();
        let active: Vec<usize> = discharges
            .into_par_iter()
            .flat_map_iter(|d| d.discovered)
            .filter(|&v| {
                let label = network.label(v);
                v != sink && label > 0 && label < n && network.excess(v) > 0
            })
            .collect();

        self.active = active;
        self.stats.relabels += relabels;
        self.stats.pushes += pushes;
    }

    /// Excess accumulated at the sink.
    pub fn flow_value(&self) -> isize {
        self.network.excess(self.network.sink)
    }

    pub fn network(&self) -> &ResidualNetwork {
        &self.network
    }

    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn work_since_last_gr(&self) -> usize {
        self.work_since_last_gr
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }
}

/// Maximum flow value of `instance` with the default configuration.
pub fn max_flow(instance: &FlowInstance) -> Result<isize, FlowError> {
    PushRelabel::solve(instance, SolverConfig::default()).map(|s| s.max_flow)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{dinic, generator::RandomInstance};

    fn diamond() -> FlowInstance {
        FlowInstance::from_arcs(4, 0, 3, &[(0, 1, 10), (0, 2, 10), (1, 3, 10), (2, 3, 10)])
            .unwrap()
    }

    fn detour() -> FlowInstance {
        // s=0, a=1, c=2, d=3, t=4; flow along s -> c -> d -> a only starts
        // once the source has been relabeled above c.
        FlowInstance::from_arcs(
            5,
            0,
            4,
            &[(0, 1, 10), (1, 4, 20), (0, 2, 10), (2, 3, 10), (3, 1, 10)],
        )
        .unwrap()
    }

    fn random_instances() -> impl Iterator<Item = FlowInstance> {
        (0..24u64).map(|seed| {
            RandomInstance {
                vertices: 8 + (seed as usize % 5) * 6,
                arcs: 20 + (seed as usize % 4) * 25,
                max_capacity: 1 + (seed as isize % 3) * 40,
                seed,
            }
            .generate()
            .unwrap()
        })
    }

    #[test]
    fn diamond_example() {
        assert_eq!(max_flow(&diamond()).unwrap(), 20);
    }

    #[test]
    fn bottleneck_example() {
        let instance = FlowInstance::from_arcs(3, 0, 2, &[(0, 1, 5), (1, 2, 3)]).unwrap();
        let solution = PushRelabel::solve(&instance, SolverConfig::default()).unwrap();
        assert_eq!(solution.max_flow, 3);
        assert_eq!(solution.stats.global_relabels, 1);
    }

    #[test]
    fn disconnected_sink() {
        let instance =
            FlowInstance::from_arcs(4, 0, 3, &[(0, 1, 5), (2, 3, 7), (3, 1, 2)]).unwrap();
        let mut solver = PushRelabel::new(&instance, SolverConfig::default()).unwrap();
        assert!(solver.active().is_empty());
        while solver.step() {}
        assert_eq!(solver.flow_value(), 0);
        let network = solver.network();
        assert!((0..network.n)
            .filter(|&u| u != network.source)
            .all(|u| network.excess(u) == 0));
        solver.check_correctness().unwrap();
    }

    #[test]
    fn zero_capacity_cut() {
        let instance = FlowInstance::from_arcs(3, 0, 2, &[(0, 1, 0), (1, 2, 9)]).unwrap();
        assert_eq!(max_flow(&instance).unwrap(), 0);
    }

    #[test]
    fn rerunning_gives_same_value() {
        let instance = random_instances().nth(7).unwrap();
        let first = max_flow(&instance).unwrap();
        for _ in 0..4 {
            assert_eq!(max_flow(&instance).unwrap(), first);
        }
    }

    #[test]
    fn work_threshold_triggers_global_relabel() {
        let eager = SolverConfig {
            alpha: 0,
            freq: 1.0,
            ..SolverConfig::default()
        };
        let mut solver = PushRelabel::new(&detour(), eager).unwrap();
        assert_eq!(solver.stats().global_relabels, 1);
        assert!(solver.step());
        // the source's visit alone exceeds m, so the counter was reset
        assert_eq!(solver.stats().global_relabels, 2);
        assert_eq!(solver.work_since_last_gr(), 0);
        while solver.step() {}
        solver.check_correctness().unwrap();
        assert_eq!(solver.flow_value(), 20);

        let lazy = SolverConfig {
            freq: 0.0,
            ..SolverConfig::default()
        };
        let solution = PushRelabel::solve(&detour(), lazy).unwrap();
        assert_eq!(solution.stats.global_relabels, 1);
        assert_eq!(solution.max_flow, 20);
    }

    #[test]
    fn invariants_hold_between_rounds() {
        for instance in random_instances().take(8) {
            let mut solver = PushRelabel::new(&instance, SolverConfig::default()).unwrap();
            let mut labels = solver.network().labels();
            loop {
                let more = solver.step();
                let network = solver.network();
                for (u, vertex) in network.vertices.iter().enumerate() {
                    assert!(vertex.label() >= labels[u], "height of {} decreased", u);
                    let out: isize = network.out_edges(u).iter().map(|e| e.flow()).sum();
                    if u != network.source {
                        assert_eq!(vertex.excess(), -out, "conservation at {}", u);
                    }
                }
                for edge in network.edges.iter() {
                    assert_eq!(edge.flow(), -network.edges[edge.pair].flow());
                    assert!(edge.flow() <= edge.capacity);
                    assert!(-edge.flow() <= edge.residual_capacity);
                }
                labels = network.labels();
                if !more {
                    break;
                }
            }
            solver.check_correctness().unwrap();
        }
    }

    #[test]
    fn agrees_with_reference_solver() {
        for instance in random_instances() {
            let expected = dinic::max_flow(&instance);
            for config in [
                SolverConfig::default(),
                SolverConfig {
                    alpha: 0,
                    freq: 4.0,
                    ..SolverConfig::default()
                },
                SolverConfig {
                    freq: 0.0,
                    ..SolverConfig::default()
                },
            ] {
                let solution = PushRelabel::solve(&instance, config).unwrap();
                assert_eq!(solution.max_flow, expected);
            }
        }
    }

    #[test]
    fn malformed_input_is_rejected() {
        let mut instance = diamond();
        instance.sink = instance.source;
        assert!(matches!(
            max_flow(&instance),
            Err(FlowError::MalformedInput(_))
        ));
    }
}
