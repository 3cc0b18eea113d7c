//! Feedback loop detection and entry selection.
//!
//! Blocks that no root reaches sit on, or hang below, a feedback loop. After
//! stripping the blocks that merely hang below a loop, each weakly connected
//! group of loop members gets one entry block: the member with the smallest
//! identity. Edges into the entry from its own component are cut, so the rest
//! of the loop reads the entry's output from the previous tick.

use super::grouping::BlockArena;

/// Outcome of cycle breaking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Roots {
    /// Blocks no other block feeds, ascending.
    pub(crate) acyclic: Vec<usize>,
    /// One entry per feedback component, ascending.
    pub(crate) entries: Vec<usize>,
}

impl Roots {
    /// Acyclic roots followed by loop entries.
    pub(crate) fn all(&self) -> impl Iterator<Item = usize> + '_ {
        self.acyclic.iter().chain(self.entries.iter()).copied()
    }
}

/// Blocks that never appear as anyone's child.
fn acyclic_roots(arena: &BlockArena) -> Vec<usize> {
    let mut fed = vec![false; arena.len()];
    for idx in 0..arena.len() {
        for &child in arena.children(idx) {
            if let Some(flag) = fed.get_mut(child) {
                *flag = true;
            }
        }
    }
    (0..arena.len())
        .filter(|&idx| !fed.get(idx).copied().unwrap_or(false))
        .collect()
}

/// Marks every block reachable from `roots`.
fn reachable(arena: &BlockArena, roots: &[usize]) -> Vec<bool> {
    let mut visited = vec![false; arena.len()];
    let mut stack: Vec<usize> = roots.to_vec();
    while let Some(idx) = stack.pop() {
        match visited.get_mut(idx) {
            Some(seen) if !*seen => *seen = true,
            _ => continue,
        }
        stack.extend(arena.children(idx).iter().copied());
    }
    visited
}

/// Strips residual blocks that cannot lead back into a loop.
///
/// A block survives only while at least one of its children is itself a
/// surviving residual block. Iterates to a fixpoint.
fn prune_tails(arena: &BlockArena, mut alive: Vec<bool>) -> Vec<bool> {
    loop {
        let mut changed = false;
        for idx in 0..arena.len() {
            if !alive.get(idx).copied().unwrap_or(false) {
                continue;
            }
            let feeds_loop = arena
                .children(idx)
                .iter()
                .any(|&c| alive.get(c).copied().unwrap_or(false));
            if !feeds_loop {
                if let Some(flag) = alive.get_mut(idx) {
                    *flag = false;
                    changed = true;
                }
            }
        }
        if !changed {
            return alive;
        }
    }
}

/// Weakly connected components among `alive` blocks, each sorted ascending,
/// ordered by their smallest member.
fn components(arena: &BlockArena, alive: &[bool]) -> Vec<Vec<usize>> {
    let is_alive = |idx: usize| alive.get(idx).copied().unwrap_or(false);
    let mut undirected: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    for from in (0..arena.len()).filter(|&i| is_alive(i)) {
        for &to in arena.children(from).iter().filter(|&&c| is_alive(c)) {
            if let Some(list) = undirected.get_mut(from) {
                list.push(to);
            }
            if let Some(list) = undirected.get_mut(to) {
                list.push(from);
            }
        }
    }

    let mut assigned = vec![false; arena.len()];
    let mut out = Vec::new();
    for start in (0..arena.len()).filter(|&i| is_alive(i)) {
        if assigned.get(start).copied().unwrap_or(true) {
            continue;
        }
        let mut members = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            match assigned.get_mut(idx) {
                Some(flag) if !*flag => *flag = true,
                _ => continue,
            }
            members.push(idx);
            if let Some(next) = undirected.get(idx) {
                stack.extend(next.iter().copied());
            }
        }
        members.sort_unstable();
        out.push(members);
    }
    out
}

/// Finds the roots for layering, cutting loop edges into each entry block.
pub(crate) fn break_cycles(arena: &mut BlockArena) -> Roots {
    let acyclic = acyclic_roots(arena);
    let visited = reachable(arena, &acyclic);
    let residual: Vec<bool> = visited.iter().map(|v| !v).collect();
    let loops = prune_tails(arena, residual);

    let mut entries = Vec::new();
    for members in components(arena, &loops) {
        let Some(&entry) = members
            .iter()
            .find(|&&m| arena.children(m).iter().any(|c| members.contains(c)))
        else {
            continue;
        };
        arena.cut_edges_into(entry, |from| members.binary_search(&from).is_ok());
        entries.push(entry);
    }
    entries.sort_unstable();
    Roots { acyclic, entries }
}

/// Strongly connected components of the `pending` subgraph, each ascending,
/// ordered by their smallest member.
fn strong_components(arena: &BlockArena, pending: &[bool]) -> Vec<Vec<usize>> {
    let is_pending = |idx: usize| pending.get(idx).copied().unwrap_or(false);

    // First pass: finish order over forward edges.
    let mut finished = Vec::new();
    let mut seen = vec![false; arena.len()];
    for start in (0..arena.len()).filter(|&i| is_pending(i)) {
        if seen.get(start).copied().unwrap_or(true) {
            continue;
        }
        if let Some(flag) = seen.get_mut(start) {
            *flag = true;
        }
        let mut stack = vec![(start, 0_usize)];
        while let Some((idx, next)) = stack.pop() {
            let child = arena
                .children(idx)
                .iter()
                .skip(next)
                .position(|&c| is_pending(c) && !seen.get(c).copied().unwrap_or(true))
                .map(|offset| next + offset);
            match child {
                Some(pos) => {
                    stack.push((idx, pos + 1));
                    if let Some(&c) = arena.children(idx).get(pos) {
                        if let Some(flag) = seen.get_mut(c) {
                            *flag = true;
                        }
                        stack.push((c, 0));
                    }
                }
                None => finished.push(idx),
            }
        }
    }

    // Second pass: reverse edges in reverse finish order.
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    for from in (0..arena.len()).filter(|&i| is_pending(i)) {
        for &to in arena.children(from).iter().filter(|&&c| is_pending(c)) {
            if let Some(list) = parents.get_mut(to) {
                list.push(from);
            }
        }
    }
    let mut assigned = vec![false; arena.len()];
    let mut out = Vec::new();
    for &start in finished.iter().rev() {
        if assigned.get(start).copied().unwrap_or(true) {
            continue;
        }
        let mut members = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            match assigned.get_mut(idx) {
                Some(flag) if !*flag => *flag = true,
                _ => continue,
            }
            members.push(idx);
            if let Some(next) = parents.get(idx) {
                stack.extend(next.iter().copied());
            }
        }
        members.sort_unstable();
        out.push(members);
    }
    out.sort_unstable_by_key(|members| members.first().copied());
    out
}

/// Extra layering root chosen after the first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExtraRoot {
    pub(crate) block: usize,
    /// Whether the block was chosen to break a feedback loop.
    pub(crate) entry: bool,
}

/// Picks the next root among blocks the first walk left unlayered.
///
/// Only loops no other pending loop feeds are eligible, so every acyclic
/// parent is layered before its children. The chosen entry loses its
/// incoming edges from its own strongly connected component and nothing
/// else.
pub(crate) fn next_pending_root(arena: &mut BlockArena, pending: &[bool]) -> Option<ExtraRoot> {
    let sccs = strong_components(arena, pending);
    let mut owner = vec![None; arena.len()];
    for (comp, members) in sccs.iter().enumerate() {
        for &m in members {
            if let Some(slot) = owner.get_mut(m) {
                *slot = Some(comp);
            }
        }
    }
    let mut fed = vec![false; sccs.len()];
    for (from, from_comp) in owner.iter().enumerate() {
        let Some(from_comp) = *from_comp else { continue };
        for &to in arena.children(from) {
            if let Some(&Some(to_comp)) = owner.get(to) {
                if to_comp != from_comp {
                    if let Some(flag) = fed.get_mut(to_comp) {
                        *flag = true;
                    }
                }
            }
        }
    }

    let sources: Vec<&Vec<usize>> = sccs
        .iter()
        .enumerate()
        .filter(|(comp, _)| !fed.get(*comp).copied().unwrap_or(true))
        .map(|(_, members)| members)
        .collect();
    let members = sources
        .iter()
        .find(|members| members.len() > 1)
        .or_else(|| sources.first())?;

    if members.len() == 1 {
        return members.first().map(|&block| ExtraRoot {
            block,
            entry: false,
        });
    }
    let entry = members
        .iter()
        .copied()
        .find(|&m| arena.children(m).iter().any(|c| members.contains(c)))?;
    arena.cut_edges_into(entry, |from| members.binary_search(&from).is_ok());
    Some(ExtraRoot { block: entry, entry: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::grouping::Block;
    use crate::topology::UnitId;
    use rstest::rstest;

    fn arena(edges: &[(usize, usize)], n: usize) -> BlockArena {
        let mut blocks: Vec<Block> = (0..n)
            .map(|i| Block {
                unit: UnitId::new(i.to_string()),
                children: Vec::new(),
            })
            .collect();
        for &(from, to) in edges {
            blocks[from].children.push(to);
        }
        BlockArena { blocks }
    }

    #[rstest]
    fn dag_has_no_entries() {
        let mut a = arena(&[(0, 1), (1, 2)], 3);
        let roots = break_cycles(&mut a);
        assert_eq!(roots.acyclic, vec![0]);
        assert!(roots.entries.is_empty());
    }

    #[rstest]
    fn mutual_pair_picks_smallest_entry() {
        let mut a = arena(&[(0, 1), (1, 0)], 2);
        let roots = break_cycles(&mut a);
        assert!(roots.acyclic.is_empty());
        assert_eq!(roots.entries, vec![0]);
        assert!(a.children(1).is_empty(), "edge back into the entry is cut");
        assert_eq!(a.children(0), &[1]);
    }

    #[rstest]
    fn downstream_tail_is_not_a_loop_member() {
        // 0 <-> 1, 1 -> 2
        let mut a = arena(&[(0, 1), (1, 0), (1, 2)], 3);
        let visited = reachable(&a, &[]);
        let residual: Vec<bool> = visited.iter().map(|v| !v).collect();
        let loops = prune_tails(&a, residual);
        assert_eq!(loops, vec![true, true, false]);
        let roots = break_cycles(&mut a);
        assert_eq!(roots.entries, vec![0]);
        assert_eq!(a.children(1), &[2]);
    }

    #[rstest]
    fn loop_reached_from_a_root_needs_no_entry() {
        // 0 -> 1 <-> 2
        let mut a = arena(&[(0, 1), (1, 2), (2, 1)], 3);
        let roots = break_cycles(&mut a);
        assert_eq!(roots.acyclic, vec![0]);
        assert!(roots.entries.is_empty());
    }

    #[rstest]
    fn separate_loops_each_get_an_entry() {
        // 0 <-> 1 and 2 <-> 3, unrelated
        let mut a = arena(&[(0, 1), (1, 0), (3, 2), (2, 3)], 4);
        let roots = break_cycles(&mut a);
        assert_eq!(roots.entries, vec![0, 2]);
    }

    #[rstest]
    fn pending_loop_fed_by_another_loop_waits() {
        // 2 <-> 3 fed by 4 <-> 5 through 5 -> 2
        let mut a = arena(&[(2, 3), (3, 2), (4, 5), (5, 4), (5, 2)], 6);
        let pending = vec![false, false, true, true, true, true];
        let extra = next_pending_root(&mut a, &pending);
        assert_eq!(extra, Some(ExtraRoot { block: 4, entry: true }));
        assert!(a.children(5).contains(&2), "edge between loops is kept");
        assert!(!a.children(5).contains(&4), "edge back into the entry is cut");
    }

    #[rstest]
    fn strong_components_split_chained_loops() {
        let a = arena(&[(0, 1), (1, 0), (1, 2), (2, 3), (3, 2)], 4);
        let comps = strong_components(&a, &[true; 4]);
        assert_eq!(comps, vec![vec![0, 1], vec![2, 3]]);
    }
}
