use serde::Serialize;

use super::structure::Structure;
use super::PairParams;

/// Flat helix ordering: selected-pair indices with break markers between
/// helices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HelixItem {
    Pair(usize),
    Break,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HelixOrdering {
    pub items: Vec<HelixItem>,
}

impl HelixOrdering {
    /// The pair indices alone, traversal order kept.
    pub fn pair_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter_map(|item| match item {
                HelixItem::Pair(index) => Some(*index),
                HelixItem::Break => None,
            })
            .collect()
    }

    /// Maximal helices, split at the break markers.
    pub fn helices(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut current = Vec::new();
        for item in self.items.iter() {
            match item {
                HelixItem::Pair(index) => current.push(*index),
                HelixItem::Break => {
                    if !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

fn backbone_linked(structure: &Structure, from: usize, to: usize, limit: f64) -> bool {
    let o3 = structure.residue(from).atom("O3'");
    let p = structure.residue(to).atom("P");
    match (o3, p) {
        (Some(o3), Some(p)) => o3.coord.distance(p.coord) <= limit,
        _ => false,
    }
}

/// Pair `q` continues the helix after arrangement (s1, s2) when strand 1
/// runs 5' to 3' through it and the complementary strand runs back.
fn successor_arrangement(
    structure: &Structure,
    s1: usize,
    s2: usize,
    q: (usize, usize),
    limit: f64,
) -> Option<(usize, usize)> {
    for (q1, q2) in [(q.0, q.1), (q.1, q.0)] {
        if backbone_linked(structure, s1, q1, limit) && backbone_linked(structure, q2, s2, limit) {
            return Some((q1, q2));
        }
    }
    None
}

/// Group the selected pairs (given as canonical residue index pairs) into
/// helices by backbone connectivity and emit a 5'-to-3' traversal with
/// break markers between unconnected groups.
///
/// Chains start at pairs with no 5' predecessor, taken in commit order;
/// leftover pairs (circular arrangements) start at the lowest unvisited
/// index, so the ordering is deterministic.
pub fn organize(structure: &Structure, pairs: &[(usize, usize)], params: &PairParams) -> HelixOrdering {
    let n = pairs.len();
    let limit = params.helix_break_dist;
    let mut visited = vec![false; n];
    let mut ordering = HelixOrdering::default();

    // A predecessor must feed the pair in its committed arrangement;
    // otherwise every helix end would count its own reverse reading.
    let has_predecessor = |p: usize| -> bool {
        let (p1, p2) = pairs[p];
        for q in 0..n {
            if q == p {
                continue;
            }
            for (q1, q2) in [(pairs[q].0, pairs[q].1), (pairs[q].1, pairs[q].0)] {
                if backbone_linked(structure, q1, p1, limit)
                    && backbone_linked(structure, p2, q2, limit)
                {
                    return true;
                }
            }
        }
        false
    };

    let walk = |start: usize, visited: &mut Vec<bool>, items: &mut Vec<HelixItem>| {
        // Prefer the committed arrangement; swap only when the chain can
        // not be entered that way.
        let mut arrangement = pairs[start];
        let forward_has_next = (0..n).any(|q| {
            q != start
                && !visited[q]
                && successor_arrangement(structure, arrangement.0, arrangement.1, pairs[q], limit)
                    .is_some()
        });
        if !forward_has_next {
            let swapped = (pairs[start].1, pairs[start].0);
            let swapped_has_next = (0..n).any(|q| {
                q != start
                    && !visited[q]
                    && successor_arrangement(structure, swapped.0, swapped.1, pairs[q], limit)
                        .is_some()
            });
            if swapped_has_next {
                arrangement = swapped;
            }
        }

        let mut current = start;
        loop {
            visited[current] = true;
            items.push(HelixItem::Pair(current));
            let mut next: Option<(usize, (usize, usize))> = None;
            for q in 0..n {
                if visited[q] {
                    continue;
                }
                if let Some(arr) =
                    successor_arrangement(structure, arrangement.0, arrangement.1, pairs[q], limit)
                {
                    next = Some((q, arr));
                    break;
                }
            }
            match next {
                Some((q, arr)) => {
                    current = q;
                    arrangement = arr;
                }
                None => break,
            }
        }
    };

    for start in 0..n {
        if visited[start] || has_predecessor(start) {
            continue;
        }
        if !ordering.items.is_empty() {
            ordering.items.push(HelixItem::Break);
        }
        walk(start, &mut visited, &mut ordering.items);
    }
    // Anything left sits on a closed loop of backbone links.
    for start in 0..n {
        if visited[start] {
            continue;
        }
        if !ordering.items.is_empty() {
            ordering.items.push(HelixItem::Break);
        }
        walk(start, &mut visited, &mut ordering.items);
    }

    ordering
}
