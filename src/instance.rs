use std::{
    collections::{HashMap, HashSet},
    fs::File,
    path::Path,
};

use anyhow::Context;
use serde::Deserialize;

use crate::error::FlowError;

/// A parsed max-flow problem.
///
/// `adjacency[u]` lists `(v, capacity)` pairs and is symmetric: whenever
/// `(v, c)` appears in `adjacency[u]`, some `(u, c')` appears in
/// `adjacency[v]` (with `c' == 0` if the input only named one direction).
#[derive(Debug, Clone)]
pub struct FlowInstance {
    pub n: usize,
    pub m: usize,
    pub source: usize,
    pub sink: usize,
    pub adjacency: Box<[Box<[(usize, isize)]>]>,
}

/// On-disk JSON form: vertices are 0-based, arcs are `[u, v, capacity]`.
#[derive(Deserialize, Debug)]
struct JsonInstance {
    vertices: usize,
    source: usize,
    sink: usize,
    arcs: Box<[(usize, usize, isize)]>,
}

impl FlowInstance {
    /// Builds a symmetric instance from a list of directed arcs.
    ///
    /// Parallel arcs are merged by summing their capacities. The opposite
    /// direction of every arc is inserted with capacity 0 unless the input
    /// names it explicitly.
    pub fn from_arcs(
        n: usize,
        source: usize,
        sink: usize,
        arcs: &[(usize, usize, isize)],
    ) -> Result<Self, FlowError> {
        if n == 0 {
            return Err(FlowError::malformed("instance has no vertices"));
        }
        if arcs.is_empty() {
            return Err(FlowError::malformed("instance has no arcs"));
        }
        if source >= n || sink >= n {
            return Err(FlowError::malformed(format!(
                "terminal out of range (source {}, sink {}, n {})",
                source, sink, n
            )));
        }
        if source == sink {
            return Err(FlowError::malformed(format!(
                "source and sink coincide at vertex {}",
                source
            )));
        }

        let mut adjacency: Vec<Vec<(usize, isize)>> = vec![vec![]; n];
        // (u, v) -> position of v in adjacency[u]
        let mut position = HashMap::with_capacity(arcs.len() * 2);
        let mut explicit = HashSet::with_capacity(arcs.len());
        for &(u, v, cap) in arcs {
            if u >= n || v >= n {
                return Err(FlowError::malformed(format!(
                    "arc ({}, {}) references a vertex outside 0..{}",
                    u, v, n
                )));
            }
            if u == v {
                return Err(FlowError::malformed(format!("self-loop at vertex {}", u)));
            }
            if cap < 0 {
                return Err(FlowError::malformed(format!(
                    "arc ({}, {}) has negative capacity {}",
                    u, v, cap
                )));
            }
            let forward = *position.entry((u, v)).or_insert_with(|| {
                adjacency[u].push((v, 0));
                adjacency[u].len() - 1
            });
            position.entry((v, u)).or_insert_with(|| {
                adjacency[v].push((u, 0));
                adjacency[v].len() - 1
            });
            let slot = &mut adjacency[u][forward].1;
            *slot = if explicit.insert((u, v)) {
                cap
            } else {
                slot.checked_add(cap).ok_or_else(|| {
                    FlowError::malformed(format!("capacity overflow on arc ({}, {})", u, v))
                })?
            };
        }

        let adjacency: Box<[Box<[(usize, isize)]>]> = adjacency
            .into_iter()
            .map(Vec::into_boxed_slice)
            .collect();
        let m = adjacency.iter().map(|edges| edges.len()).sum();
        Ok(FlowInstance {
            n,
            m,
            source,
            sink,
            adjacency,
        })
    }

    pub fn load_json<S: AsRef<Path>>(x: S) -> anyhow::Result<Self> {
        let path = x.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let raw: JsonInstance = simd_json::from_reader(file)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Self::from_arcs(raw.vertices, raw.source, raw.sink, &raw.arcs).map_err(Into::into)
    }

    /// Arcs with positive capacity, in adjacency order.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize, isize)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(u, edges)| {
            edges
                .iter()
                .copied()
                .filter(|&(_, cap)| cap > 0)
                .map(move |(v, cap)| (u, v, cap))
        })
    }
}
