//! Sequential Dinic solver, used to cross-check the parallel solver.

use std::collections::VecDeque;

use crate::instance::FlowInstance;

struct Link {
    head: usize,
    cap: isize,
    flow: isize,
}

pub struct LevelGraph {
    /// arcs leaving each node, as indices into `arcs`
    adjacency: Vec<Vec<usize>>,
    /// arc `id ^ 1` is the reverse of arc `id`
    arcs: Vec<Link>,
    level: Vec<usize>,
    /// next arc to try in the blocking-flow search
    pointer: Vec<usize>,
    source: usize,
    sink: usize,
}

impl LevelGraph {
    pub fn new(n: usize, source: usize, sink: usize) -> Self {
        LevelGraph {
            adjacency: vec![vec![]; n],
            arcs: vec![],
            level: vec![usize::MAX; n],
            pointer: vec![0; n],
            source,
            sink,
        }
    }

    pub fn from_instance(instance: &FlowInstance) -> Self {
        let mut graph = Self::new(instance.n, instance.source, instance.sink);
        for (u, v, cap) in instance.arcs() {
            graph.add_arc(u, v, cap);
        }
        graph
    }

    pub fn add_arc(&mut self, from: usize, to: usize, cap: isize) {
        let id = self.arcs.len();
        self.arcs.push(Link {
            head: to,
            cap,
            flow: 0,
        });
        self.arcs.push(Link {
            head: from,
            cap: 0,
            flow: 0,
        });
        self.adjacency[from].push(id);
        self.adjacency[to].push(id + 1);
    }

    fn bfs(&mut self) -> bool {
        self.level.fill(usize::MAX);
        self.pointer.fill(0);
        let mut queue = VecDeque::new();
        queue.push_back(self.source);
        self.level[self.source] = 0;
        while let Some(u) = queue.pop_front() {
            for &id in &self.adjacency[u] {
                let arc = &self.arcs[id];
                if arc.cap - arc.flow < 1 || self.level[arc.head] != usize::MAX {
                    continue;
                }
                self.level[arc.head] = self.level[u] + 1;
                queue.push_back(arc.head);
            }
        }
        self.level[self.sink] != usize::MAX
    }

    fn dfs(&mut self, u: usize, budget: isize) -> isize {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            if u == self.sink || budget == 0 {
                return budget;
            }
            while self.pointer[u] < self.adjacency[u].len() {
                let id = self.adjacency[u][self.pointer[u]];
                let head = self.arcs[id].head;
                let space = self.arcs[id].cap - self.arcs[id].flow;
                if space > 0 && self.level[head] == self.level[u] + 1 {
                    let pushed = self.dfs(head, budget.min(space));
                    if pushed > 0 {
                        self.arcs[id].flow += pushed;
                        self.arcs[id ^ 1].flow -= pushed;
                        return pushed;
                    }
                }
                self.pointer[u] += 1;
            }
            0
        })
    }

    pub fn calculate_flow(&mut self) -> isize {
        let mut total = 0;
        while self.bfs() {
            loop {
                let pushed = self.dfs(self.source, isize::MAX);
                if pushed < 1 {
                    break;
                }
                total += pushed;
            }
        }
        total
    }
}

pub fn max_flow(instance: &FlowInstance) -> isize {
    LevelGraph::from_instance(instance).calculate_flow()
}
