//! Collapses the connector graph into one scheduling block per unit.

use hashbrown::HashMap;

use crate::topology::{Direction, Topology, UnitId};

use super::ScheduleError;

/// Scheduling node for one logic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) unit: UnitId,
    /// Indices of blocks fed by this block's outputs, ascending.
    pub(crate) children: Vec<usize>,
}

/// Arena of blocks, indexed in lexicographic unit order.
///
/// Because indices follow [`UnitId`] ordering, "smallest identity" and
/// "smallest index" coincide everywhere downstream.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockArena {
    pub(crate) blocks: Vec<Block>,
}

impl BlockArena {
    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn children(&self, idx: usize) -> &[usize] {
        self.blocks.get(idx).map_or(&[], |b| b.children.as_slice())
    }

    pub(crate) fn unit(&self, idx: usize) -> Option<&UnitId> {
        self.blocks.get(idx).map(|b| &b.unit)
    }

    /// Drops every edge `from -> to` where `from` satisfies `pred`.
    pub(crate) fn cut_edges_into(&mut self, to: usize, mut pred: impl FnMut(usize) -> bool) {
        for (from, block) in self.blocks.iter_mut().enumerate() {
            if pred(from) {
                block.children.retain(|&c| c != to);
            }
        }
    }
}

/// Builds one block per unit with children derived from the wires.
///
/// Wires between connectors of the same unit carry feedback and add no
/// edge.
///
/// # Errors
/// Returns [`ScheduleError`] when a wire references a missing connector or
/// runs against connector direction.
pub(crate) fn group_units(topology: &Topology) -> Result<BlockArena, ScheduleError> {
    let mut index: HashMap<&UnitId, usize> = HashMap::new();
    let mut blocks: Vec<Block> = Vec::new();
    for (idx, unit) in topology.units().enumerate() {
        index.insert(unit, idx);
        blocks.push(Block {
            unit: unit.clone(),
            children: Vec::new(),
        });
    }

    for wire in topology.wires() {
        for (end, expected) in [
            (&wire.output, Direction::Output),
            (&wire.input, Direction::Input),
        ] {
            let connector = topology.connector(end).ok_or_else(|| ScheduleError::DanglingWire {
                wire: wire.clone(),
                missing: end.clone(),
            })?;
            if connector.direction != expected {
                return Err(ScheduleError::MisdirectedWire { wire: wire.clone() });
            }
        }
        if wire.output.unit == wire.input.unit {
            continue;
        }
        let (Some(&from), Some(&to)) = (index.get(&wire.output.unit), index.get(&wire.input.unit))
        else {
            return Err(ScheduleError::DanglingWire {
                wire: wire.clone(),
                missing: wire.output.clone(),
            });
        };
        if let Some(block) = blocks.get_mut(from) {
            block.children.push(to);
        }
    }

    for block in &mut blocks {
        block.children.sort_unstable();
        block.children.dedup();
    }
    Ok(BlockArena { blocks })
}
