//! Longest-path layer assignment.

use super::grouping::BlockArena;

struct Frame {
    node: usize,
    depth: usize,
    next: usize,
}

/// Walks from `root`, raising each reached block to the longest path length
/// seen so far.
///
/// Blocks already on the current path are skipped, so loop edges that were
/// not cut cannot recurse forever. A child is only revisited when the new
/// path is strictly longer than its recorded layer.
pub(crate) fn walk_from(arena: &BlockArena, root: usize, layers: &mut [Option<usize>]) {
    let Some(slot) = layers.get_mut(root) else {
        return;
    };
    if slot.is_none() {
        *slot = Some(0);
    }
    let mut on_path = vec![false; arena.len()];
    if let Some(flag) = on_path.get_mut(root) {
        *flag = true;
    }
    let mut stack = vec![Frame {
        node: root,
        depth: 0,
        next: 0,
    }];

    while let Some(top) = stack.last_mut() {
        let Some(&child) = arena.children(top.node).get(top.next) else {
            if let Some(flag) = on_path.get_mut(top.node) {
                *flag = false;
            }
            stack.pop();
            continue;
        };
        top.next += 1;
        let depth = top.depth + 1;
        if on_path.get(child).copied().unwrap_or(true) {
            continue;
        }
        let Some(slot) = layers.get_mut(child) else {
            continue;
        };
        if slot.is_some_and(|current| current >= depth) {
            continue;
        }
        *slot = Some(depth);
        if let Some(flag) = on_path.get_mut(child) {
            *flag = true;
        }
        stack.push(Frame {
            node: child,
            depth,
            next: 0,
        });
    }
}

/// Assigns a layer to every block reachable from `roots`.
pub(crate) fn assign_layers(
    arena: &BlockArena,
    roots: impl IntoIterator<Item = usize>,
) -> Vec<Option<usize>> {
    let mut layers = vec![None; arena.len()];
    for root in roots {
        walk_from(arena, root, &mut layers);
    }
    layers
}

/// Groups block indices by layer, dropping empty layers.
pub(crate) fn bucket(layers: &[Option<usize>]) -> Vec<Vec<usize>> {
    let depth = layers.iter().flatten().max().map_or(0, |m| m + 1);
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (idx, layer) in layers.iter().enumerate() {
        if let Some(bucket) = layer.and_then(|l| buckets.get_mut(l)) {
            bucket.push(idx);
        }
    }
    buckets.retain(|b| !b.is_empty());
    buckets
}
