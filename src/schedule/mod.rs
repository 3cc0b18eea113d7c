//! Deterministic evaluation order for a circuit.
//!
//! [`rebuild_schedule`] turns the current [`Topology`] into ordered
//! [`Layer`]s in three passes:
//!
//! 1. `grouping` collapses connectors into one block per unit.
//! 2. `cycles` finds acyclic roots and one entry block per feedback loop.
//! 3. `layers` assigns every block the longest path length from a root.
//!
//! The block arena lives only for the duration of the call.

mod cycles;
mod grouping;
mod layers;

use log::{debug, error};
use serde::Serialize;
use thiserror::Error;

use crate::topology::{ConnectorId, Topology, UnitId, Wire};

/// Units that may be evaluated together once earlier layers are done.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Layer {
    units: Vec<UnitId>,
}

impl Layer {
    /// Units in this layer, in lexicographic order.
    #[must_use]
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    /// Whether `unit` is in this layer.
    #[must_use]
    pub fn contains(&self, unit: &UnitId) -> bool {
        self.units.binary_search(unit).is_ok()
    }

    /// Number of units in the layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the layer holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Layered evaluation order for every placed unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schedule {
    layers: Vec<Layer>,
    /// Blocks chosen to break feedback loops, ascending.
    entries: Vec<UnitId>,
}

impl Schedule {
    /// Layers in evaluation order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Feedback loop entry units.
    #[must_use]
    pub fn entries(&self) -> &[UnitId] {
        &self.entries
    }

    /// Index of the layer holding `unit`.
    #[must_use]
    pub fn layer_of(&self, unit: &UnitId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.contains(unit))
    }

    /// Number of scheduled units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers as plain string ids, convenient for assertions and reports.
    #[must_use]
    pub fn as_ids(&self) -> Vec<Vec<&str>> {
        self.layers
            .iter()
            .map(|layer| layer.units.iter().map(UnitId::as_str).collect())
            .collect()
    }
}

/// Malformed topology detected while scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A wire names a connector that is not registered.
    #[error("wire {} -> {} references missing connector {missing}", wire.output, wire.input)]
    DanglingWire {
        /// Offending wire.
        wire: Wire,
        /// The endpoint that could not be found.
        missing: ConnectorId,
    },
    /// A wire does not run from an output to an input.
    #[error("wire {} -> {} does not run from an output to an input", wire.output, wire.input)]
    MisdirectedWire {
        /// Offending wire.
        wire: Wire,
    },
}

/// Computes the layered schedule for `topology`.
///
/// Feedback loops never cause failure: every loop contributes an entry block
/// that is evaluated first, and the loop's other members read its previous
/// tick output.
///
/// # Errors
/// Returns [`ScheduleError`] only for malformed topology.
pub fn rebuild_schedule(topology: &Topology) -> Result<Schedule, ScheduleError> {
    let mut arena = grouping::group_units(topology).inspect_err(|e| {
        error!("cannot schedule circuit: {e}");
    })?;
    let roots = cycles::break_cycles(&mut arena);
    let mut assigned = layers::assign_layers(&arena, roots.all());
    let mut entries = roots.entries;

    // A loop fed only by another loop of the same weak component is not
    // reached from that component's entry. Walk again from the first
    // pending loop that no other pending loop feeds.
    while assigned.iter().any(Option::is_none) {
        let pending: Vec<bool> = assigned.iter().map(Option::is_none).collect();
        let Some(extra) = cycles::next_pending_root(&mut arena, &pending) else {
            break;
        };
        layers::walk_from(&arena, extra.block, &mut assigned);
        if extra.entry {
            entries.push(extra.block);
        }
    }
    entries.sort_unstable();

    let to_ids = |indices: Vec<usize>| -> Vec<UnitId> {
        indices
            .into_iter()
            .filter_map(|idx| arena.unit(idx).cloned())
            .collect()
    };
    let schedule = Schedule {
        layers: layers::bucket(&assigned)
            .into_iter()
            .map(|bucket| Layer {
                units: to_ids(bucket),
            })
            .collect(),
        entries: to_ids(entries),
    };
    debug!(
        "scheduled {} units in {} layers ({} loop entries)",
        schedule.unit_count(),
        schedule.layers.len(),
        schedule.entries.len()
    );
    Ok(schedule)
}
