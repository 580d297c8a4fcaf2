//! Elementary cycle enumeration (Johnson, 1975).

use std::collections::{BTreeMap, BTreeSet};

struct Search<'g> {
    adjacency: &'g [Vec<usize>],
    start: usize,
    blocked: Vec<bool>,
    blocked_by: Vec<BTreeSet<usize>>,
    stack: Vec<usize>,
    found: Vec<Vec<usize>>,
}

impl Search<'_> {
    fn unblock(&mut self, node: usize) {
        let mut pending = vec![node];
        while let Some(u) = pending.pop() {
            if let Some(flag) = self.blocked.get_mut(u) {
                *flag = false;
            }
            if let Some(waiting) = self.blocked_by.get_mut(u) {
                for w in std::mem::take(waiting) {
                    if self.blocked.get(w).copied().unwrap_or(false) {
                        pending.push(w);
                    }
                }
            }
        }
    }

    fn circuit(&mut self, v: usize) -> bool {
        let mut closed = false;
        self.stack.push(v);
        if let Some(flag) = self.blocked.get_mut(v) {
            *flag = true;
        }

        let adjacency = self.adjacency;
        let start = self.start;
        let successors = adjacency.get(v).map_or(&[][..], Vec::as_slice);
        for &w in successors.iter().filter(|&&w| w >= start) {
            if w == start {
                let mut cycle = self.stack.clone();
                cycle.push(start);
                self.found.push(cycle);
                closed = true;
            } else if !self.blocked.get(w).copied().unwrap_or(true) && self.circuit(w) {
                closed = true;
            }
        }

        if closed {
            self.unblock(v);
        } else {
            for &w in successors.iter().filter(|&&w| w >= start) {
                if let Some(waiting) = self.blocked_by.get_mut(w) {
                    waiting.insert(v);
                }
            }
        }
        self.stack.pop();
        closed
    }
}

/// Every elementary cycle of a directed graph, as `[n0, …, nk, n0]`.
///
/// Each cycle starts at its smallest node and the result is sorted. Self
/// loops are ignored.
#[must_use]
pub fn elementary_cycles<N: Ord + Clone>(adjacency: &BTreeMap<N, BTreeSet<N>>) -> Vec<Vec<N>> {
    let nodes: Vec<&N> = adjacency
        .keys()
        .chain(adjacency.values().flatten())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<&N, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let edges: Vec<Vec<usize>> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            adjacency
                .get(*n)
                .into_iter()
                .flatten()
                .filter_map(|to| index.get(to).copied())
                .filter(|&j| j != i)
                .collect()
        })
        .collect();

    let mut found = Vec::new();
    for start in 0..nodes.len() {
        let mut search = Search {
            adjacency: &edges,
            start,
            blocked: vec![false; nodes.len()],
            blocked_by: vec![BTreeSet::new(); nodes.len()],
            stack: Vec::new(),
            found: Vec::new(),
        };
        search.circuit(start);
        found.append(&mut search.found);
    }

    let mut cycles: Vec<Vec<N>> = found
        .into_iter()
        .map(|cycle| {
            cycle
                .into_iter()
                .filter_map(|i| nodes.get(i).map(|n| (*n).clone()))
                .collect()
        })
        .collect();
    cycles.sort();
    cycles
}

/// Rotate a cycle so it starts at its smallest member and closes on it.
///
/// Accepts both open (`[a, b]`) and closed (`[a, b, a]`) forms; direction is
/// preserved.
#[must_use]
pub fn normalize_cycle<N: Ord + Clone>(cycle: &[N]) -> Vec<N> {
    let open = match cycle.split_last() {
        Some((last, rest)) if rest.first() == Some(last) => rest,
        _ => cycle,
    };
    let Some(min_pos) = open
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    let mut normalized: Vec<N> = open
        .iter()
        .cycle()
        .skip(min_pos)
        .take(open.len())
        .cloned()
        .collect();
    if let Some(first) = normalized.first().cloned() {
        normalized.push(first);
    }
    normalized
}

#[cfg(test)]
#[path = "cycles_tests.rs"]
mod tests;
