use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::Action;

/// Directed file-level dependency graph: an edge from an input file to every
/// output file it feeds.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

/// Build the graph from the action list plus the encrypted → decrypted pairs
/// contributed by the decryption stage.
pub fn build_graph(actions: &[Action], crypt_pairs: &[(PathBuf, PathBuf)]) -> DependencyGraph {
    let mut graph = DependencyGraph::default();
    for action in actions {
        for target in &action.targets {
            for input in &action.inputs {
                graph.add_edge(input.clone(), target.clone());
            }
        }
    }
    for (encrypted, decrypted) in crypt_pairs {
        graph.add_edge(encrypted.clone(), decrypted.clone());
    }
    graph
}

impl DependencyGraph {
    pub fn add_edge(&mut self, from: PathBuf, to: PathBuf) {
        self.edges.entry(from).or_default().insert(to);
    }

    pub fn neighbours(&self, node: &Path) -> impl Iterator<Item = &PathBuf> {
        self.edges.get(node).into_iter().flatten()
    }

    /// Every file that participates in at least one cycle.
    ///
    /// Each node with outgoing edges is used as an independent traversal
    /// root with its own visited set, so a cyclic node is reported relative
    /// to every root that can reach it. Graphs are small; exhaustiveness
    /// beats a single-pass SCC here.
    pub fn cyclic_nodes(&self) -> BTreeSet<PathBuf> {
        let mut cycles = BTreeSet::new();
        for root in self.edges.keys() {
            let mut visited = BTreeSet::new();
            let mut path = vec![root.clone()];
            self.collect_cycles(root, &mut visited, &mut path, &mut cycles);
        }
        cycles
    }

    fn collect_cycles(
        &self,
        node: &Path,
        visited: &mut BTreeSet<PathBuf>,
        path: &mut Vec<PathBuf>,
        cycles: &mut BTreeSet<PathBuf>,
    ) {
        for neighbour in self.neighbours(node) {
            if path.iter().any(|p| p == neighbour) {
                cycles.insert(neighbour.clone());
                continue;
            }
            if !visited.insert(neighbour.clone()) {
                continue;
            }
            path.push(neighbour.clone());
            self.collect_cycles(neighbour, visited, path, cycles);
            path.pop();
        }
    }
}
