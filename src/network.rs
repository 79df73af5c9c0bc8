use std::{
    ops::Range,
    sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering},
};

use rayon::prelude::*;

use crate::{error::FlowError, instance::FlowInstance};

/// One direction of a residual pair, stored in the edge arena of
/// [`ResidualNetwork`]. `pair` is the arena index of the opposite edge.
#[derive(Debug)]
pub struct Edge {
    pub u: usize,
    pub v: usize,
    pub capacity: isize,
    /// Capacity of the paired edge.
    pub residual_capacity: isize,
    pub flow: AtomicIsize,
    pub pair: usize,
}

impl Edge {
    pub fn flow(&self) -> isize {
        self.flow.load(Ordering::Relaxed)
    }

    /// Flow that can still be pushed from `u` to `v`.
    pub fn residual(&self) -> isize {
        self.capacity - self.flow()
    }

    /// Flow that can still be pushed back from `v` to `u`.
    pub fn reverse_residual(&self) -> isize {
        self.residual_capacity + self.flow()
    }
}

#[derive(Debug)]
pub struct Vertex {
    pub label: AtomicUsize,
    /// Label computed this round, published into `label` at the round boundary.
    pub new_label: AtomicUsize,
    pub excess: AtomicIsize,
    /// Pushes received this round, folded into `excess` at the round boundary.
    pub added_excess: AtomicIsize,
    pub is_discovered: AtomicBool,
    pub work: AtomicUsize,
    /// Current-arc cursor, relative to `edges.start`.
    pub current: AtomicUsize,
    pub edges: Range<usize>,
}

impl Vertex {
    fn new(edges: Range<usize>) -> Self {
        Vertex {
            label: AtomicUsize::new(0),
            new_label: AtomicUsize::new(0),
            excess: AtomicIsize::new(0),
            added_excess: AtomicIsize::new(0),
            is_discovered: AtomicBool::new(false),
            work: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            edges,
        }
    }

    pub fn label(&self) -> usize {
        self.label.load(Ordering::Relaxed)
    }

    pub fn excess(&self) -> isize {
        self.excess.load(Ordering::Relaxed)
    }

    pub fn out_degree(&self) -> usize {
        self.edges.len()
    }
}

/// Vertices plus a flat arena of edges; vertex `u` owns the edges in
/// `vertices[u].edges`. Nothing is resized after [`ResidualNetwork::build`].
#[derive(Debug)]
pub struct ResidualNetwork {
    pub n: usize,
    pub m: usize,
    pub source: usize,
    pub sink: usize,
    pub vertices: Box<[Vertex]>,
    pub edges: Box<[Edge]>,
}

impl ResidualNetwork {
    pub fn build(instance: &FlowInstance) -> Result<Self, FlowError> {
        let n = instance.n;
        if n == 0 {
            return Err(FlowError::malformed("instance has no vertices"));
        }
        if instance.adjacency.len() != n {
            return Err(FlowError::malformed(format!(
                "expected {} adjacency lists, found {}",
                n,
                instance.adjacency.len()
            )));
        }
        if instance.source >= n || instance.sink >= n {
            return Err(FlowError::malformed(format!(
                "terminal out of range (source {}, sink {}, n {})",
                instance.source, instance.sink, n
            )));
        }
        if instance.source == instance.sink {
            return Err(FlowError::malformed(format!(
                "source and sink coincide at vertex {}",
                instance.source
            )));
        }

        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0);
        for edges in instance.adjacency.iter() {
            offsets.push(offsets[offsets.len() - 1] + edges.len());
        }
        let m = offsets[n];
        if m == 0 {
            return Err(FlowError::malformed("instance has no edges"));
        }
        if instance.m != m {
            return Err(FlowError::malformed(format!(
                "instance claims {} edges but its adjacency lists hold {}",
                instance.m, m
            )));
        }

        let mut edges = Vec::with_capacity(m);
        for (u, list) in instance.adjacency.iter().enumerate() {
            for &(v, capacity) in list.iter() {
                if v >= n {
                    return Err(FlowError::malformed(format!(
                        "edge ({}, {}) references a vertex outside 0..{}",
                        u, v, n
                    )));
                }
                if capacity < 0 {
                    return Err(FlowError::malformed(format!(
                        "edge ({}, {}) has negative capacity {}",
                        u, v, capacity
                    )));
                }
                edges.push(Edge {
                    u,
                    v,
                    capacity,
                    residual_capacity: 0,
                    flow: AtomicIsize::new(0),
                    pair: usize::MAX,
                });
            }
        }

        // Sorting by the unordered endpoint pair puts both directions of
        // every residual pair next to each other.
        let mut keys: Vec<(usize, usize, usize)> = edges
            .par_iter()
            .enumerate()
            .map(|(id, e)| (e.u.min(e.v), e.u.max(e.v), id))
            .collect();
        keys.par_sort_unstable();

        let mut groups = keys.chunk_by(|a, b| (a.0, a.1) == (b.0, b.1));
        if let Some(group) = groups.find(|group| {
            group.len() != 2 || edges[group[0].2].u == edges[group[1].2].u
        }) {
            let (a, b, _) = group[0];
            return Err(FlowError::malformed(format!(
                "vertex pair ({}, {}) has {} edge(s) instead of one per direction",
                a,
                b,
                group.len()
            )));
        }
        for pair in keys.chunks_exact(2) {
            let (x, y) = (pair[0].2, pair[1].2);
            edges[x].pair = y;
            edges[y].pair = x;
            edges[x].residual_capacity = edges[y].capacity;
            edges[y].residual_capacity = edges[x].capacity;
        }

        // The source excess stands in for unbounded supply, so everything
        // the source can send must fit below it.
        instance.adjacency[instance.source]
            .iter()
            .try_fold(0isize, |total, &(_, capacity)| total.checked_add(capacity))
            .ok_or_else(|| {
                FlowError::malformed(format!(
                    "capacities out of source {} sum past {}",
                    instance.source,
                    isize::MAX
                ))
            })?;

        let vertices: Box<[Vertex]> = offsets
            .windows(2)
            .map(|w| Vertex::new(w[0]..w[1]))
            .collect();
        vertices[instance.source]
            .excess
            .store(isize::MAX, Ordering::Relaxed);

        Ok(ResidualNetwork {
            n,
            m,
            source: instance.source,
            sink: instance.sink,
            vertices,
            edges: edges.into_boxed_slice(),
        })
    }

    pub fn out_edges(&self, u: usize) -> &[Edge] {
        &self.edges[self.vertices[u].edges.clone()]
    }

    pub fn label(&self, u: usize) -> usize {
        self.vertices[u].label()
    }

    pub fn excess(&self, u: usize) -> isize {
        self.vertices[u].excess()
    }

    pub fn labels(&self) -> Vec<usize> {
        self.vertices.iter().map(Vertex::label).collect()
    }
}
