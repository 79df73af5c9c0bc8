use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{error::FlowError, instance::FlowInstance};

/// Seeded random instance: `arcs` arcs between distinct random vertices
/// with capacities in `0..=max_capacity`. Vertex 0 is the source and the
/// last vertex the sink.
#[derive(Debug, Clone, Copy)]
pub struct RandomInstance {
    pub vertices: usize,
    pub arcs: usize,
    pub max_capacity: isize,
    pub seed: u64,
}

impl RandomInstance {
    pub fn generate(&self) -> Result<FlowInstance, FlowError> {
        if self.vertices < 2 {
            return Err(FlowError::malformed(
                "a random instance needs at least two vertices",
            ));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = self.vertices;
        let arcs: Vec<_> = (0..self.arcs)
            .map(|_| {
                let u = rng.random_range(0..n);
                // shift past `u` so the arc is never a loop
                let v = (u + rng.random_range(1..n)) % n;
                let cap = rng.random_range(0..=self.max_capacity.max(0) as i64);
                (u, v, cap as isize)
            })
            .collect();
        FlowInstance::from_arcs(n, 0, n - 1, &arcs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_seed_same_instance() {
        let config = RandomInstance {
            vertices: 10,
            arcs: 30,
            max_capacity: 9,
            seed: 42,
        };
        let a: Vec<_> = config.generate().unwrap().arcs().collect();
        let b: Vec<_> = config.generate().unwrap().arcs().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn arcs_are_in_range() {
        let instance = RandomInstance {
            vertices: 6,
            arcs: 50,
            max_capacity: 3,
            seed: 7,
        }
        .generate()
        .unwrap();
        assert_eq!((instance.source, instance.sink), (0, 5));
        for (u, v, cap) in instance.arcs() {
            assert!(u < 6 && v < 6 && u != v);
            // merged parallel arcs may exceed a single draw
            assert!(cap > 0 && cap <= 3 * 50);
        }
    }

    #[test]
    fn full_capacity_range() {
        let instance = RandomInstance {
            vertices: 4,
            arcs: 1,
            max_capacity: isize::MAX,
            seed: 3,
        }
        .generate()
        .unwrap();
        assert_eq!(instance.m, 2);
        assert!(instance.arcs().all(|(u, v, _)| u != v));
    }
}
