//! Reference graph between named schema definitions

use std::collections::HashSet;

/// Tracks which definitions reference which, to detect cycles
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    edges: Vec<(String, String)>, // (from, to)
}

impl ReferenceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push((from.into(), to.into()));
    }

    fn targets<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |(f, _)| f == from)
            .map(|(_, t)| t.as_str())
    }

    /// Whether adding `from -> to` would close a cycle
    #[must_use]
    pub fn would_create_cycle(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut to_visit = vec![to.to_string()];
        let mut visited = HashSet::new();

        while let Some(current) = to_visit.pop() {
            if current == from {
                return true;
            }
            if visited.insert(current.clone()) {
                to_visit.extend(self.targets(&current).map(str::to_string));
            }
        }

        false
    }

    /// First cycle reachable from `start`, as the chain of names that closes it
    #[must_use]
    pub fn find_cycle(&self, start: &str) -> Option<Vec<String>> {
        // Explicit stack of (node, chain so far)
        let mut stack = vec![(start.to_string(), vec![start.to_string()])];
        let mut done: HashSet<String> = HashSet::new();

        while let Some((current, chain)) = stack.pop() {
            for target in self.targets(&current) {
                if chain.iter().any(|c| c == target) {
                    let mut cycle = chain.clone();
                    cycle.push(target.to_string());
                    return Some(cycle);
                }
                if !done.contains(target) {
                    let mut next = chain.clone();
                    next.push(target.to_string());
                    stack.push((target.to_string(), next));
                }
            }
            done.insert(current);
        }

        None
    }
}
