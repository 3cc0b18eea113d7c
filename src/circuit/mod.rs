//! Circuit session: the owner of one independent simulation.
//!
//! A [`Circuit`] holds the topology, the unit behaviours, the last value on
//! every connector, and the cached [`Schedule`]. Every structural edit drops
//! the cached schedule; [`Circuit::evaluate_tick`] rebuilds it lazily before
//! the next pass. Units cannot reach the circuit while it is ticking them, so
//! any edit they want goes through [`TickContext::request_edit`] and is
//! applied after the pass.
//!
//! [`TickContext::request_edit`]: crate::unit::TickContext::request_edit

mod driver;
mod edit;

pub use edit::{CircuitEdit, EditError, RejectedEdit};

use std::collections::BTreeMap;
use std::mem;

use hashbrown::HashMap;
use log::{debug, warn};
use thiserror::Error;

use crate::kind::Value;
use crate::schedule::{rebuild_schedule, Schedule, ScheduleError};
use crate::topology::{ConnectError, ConnectorId, Topology, TopologyError, UnitId, Wire};
use crate::typing;
use crate::unit::{LogicUnit, UnitError};

use driver::Pass;

/// Failure of a tick pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    /// The topology could not be scheduled.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// A unit failed; units in later layers were not evaluated.
    #[error("unit {unit} failed: {source}")]
    Unit {
        /// The failing unit.
        unit: UnitId,
        /// What went wrong.
        source: UnitError,
    },
}

/// Summary of a completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Index of the tick that ran.
    pub tick: u64,
    /// Units ticked.
    pub evaluated: usize,
    /// Queued edits that could not be applied.
    pub rejected_edits: Vec<RejectedEdit>,
}

/// One independent logic simulation.
#[derive(Default)]
pub struct Circuit {
    topology: Topology,
    units: BTreeMap<UnitId, Box<dyn LogicUnit>>,
    values: HashMap<ConnectorId, Value>,
    schedule: Option<Schedule>,
    pending: Vec<CircuitEdit>,
    tick: u64,
}

impl Circuit {
    /// An empty circuit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connectors, wires, and kind state.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Behaviour of a placed unit.
    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&dyn LogicUnit> {
        self.units.get(id).map(|unit| unit.as_ref())
    }

    /// Placed units with their behaviour, in identity order.
    pub fn units(&self) -> impl Iterator<Item = (&UnitId, &dyn LogicUnit)> {
        self.units.iter().map(|(id, unit)| (id, unit.as_ref()))
    }

    /// Last value written to or received by a connector.
    #[must_use]
    pub fn value(&self, id: &ConnectorId) -> Option<&Value> {
        self.values.get(id)
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The cached schedule, if it is still valid.
    #[must_use]
    pub const fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Places a unit, registering its declared connectors.
    ///
    /// # Errors
    /// Returns [`TopologyError`] for duplicate ids or bad declarations.
    pub fn add_unit(
        &mut self,
        id: impl Into<UnitId>,
        unit: Box<dyn LogicUnit>,
    ) -> Result<(), TopologyError> {
        let id = id.into();
        self.topology.add_unit(id.clone(), &unit.connectors())?;
        self.units.insert(id, unit);
        self.invalidate();
        Ok(())
    }

    /// Removes a unit, its connectors, and every wire touching it.
    ///
    /// Inputs it used to feed keep their last received value.
    ///
    /// # Errors
    /// Returns [`TopologyError::UnknownUnit`] if the unit is not placed.
    pub fn remove_unit(&mut self, id: &UnitId) -> Result<Box<dyn LogicUnit>, TopologyError> {
        self.topology.remove_unit(id)?;
        self.values.retain(|connector, _| &connector.unit != id);
        self.invalidate();
        self.units
            .remove(id)
            .ok_or_else(|| TopologyError::UnknownUnit(id.clone()))
    }

    /// Wires `output` to `input`, narrowing kinds across the joined bus.
    ///
    /// # Errors
    /// Returns [`ConnectError`]; on error neither wiring nor kinds change.
    pub fn try_connect(&mut self, output: &ConnectorId, input: &ConnectorId) -> Result<(), ConnectError> {
        typing::connect(&mut self.topology, output, input)?;
        self.invalidate();
        Ok(())
    }

    /// Removes the wire from `output` to `input`.
    ///
    /// Kinds narrowed by the wire stay narrowed.
    ///
    /// # Errors
    /// Returns [`ConnectError::NotWired`] if no such wire exists.
    pub fn disconnect(&mut self, output: &ConnectorId, input: &ConnectorId) -> Result<(), ConnectError> {
        typing::disconnect(&mut self.topology, output, input)?;
        self.invalidate();
        Ok(())
    }

    /// Applies a single edit immediately.
    ///
    /// # Errors
    /// Returns [`EditError`] when the edit is rejected.
    pub fn apply(&mut self, edit: CircuitEdit) -> Result<(), EditError> {
        match edit {
            CircuitEdit::AddUnit { id, unit } => self.add_unit(id, unit)?,
            CircuitEdit::RemoveUnit(id) => {
                self.remove_unit(&id)?;
            }
            CircuitEdit::Connect { output, input } => self.try_connect(&output, &input)?,
            CircuitEdit::Disconnect { output, input } => self.disconnect(&output, &input)?,
        }
        Ok(())
    }

    /// Queues an edit for the next gap between ticks.
    pub fn queue_edit(&mut self, edit: CircuitEdit) {
        self.pending.push(edit);
    }

    /// Number of edits waiting to be applied.
    #[must_use]
    pub fn pending_edits(&self) -> usize {
        self.pending.len()
    }

    /// Applies queued edits in order, returning those that were rejected.
    pub fn apply_pending_edits(&mut self) -> Vec<RejectedEdit> {
        let mut rejected = Vec::new();
        for edit in mem::take(&mut self.pending) {
            let description = edit.to_string();
            if let Err(error) = self.apply(edit) {
                warn!("rejected queued edit ({description}): {error}");
                rejected.push(RejectedEdit {
                    edit: description,
                    error,
                });
            }
        }
        rejected
    }

    /// Recomputes and caches the schedule.
    ///
    /// # Errors
    /// Returns [`ScheduleError`] for malformed topology; the previous cache
    /// is discarded either way.
    pub fn rebuild_schedule(&mut self) -> Result<&Schedule, ScheduleError> {
        self.schedule = None;
        let schedule = rebuild_schedule(&self.topology)?;
        Ok(self.schedule.insert(schedule))
    }

    /// Runs one tick.
    ///
    /// Queued edits are applied first, the schedule is rebuilt if any edit
    /// invalidated it, then every layer is evaluated in order. Edits that
    /// units request during the pass are applied after it.
    ///
    /// # Errors
    /// Returns [`TickError`] if scheduling fails or a unit fails. Edits
    /// requested before the failure are still applied.
    pub fn evaluate_tick(&mut self, dt: f32) -> Result<TickReport, TickError> {
        let mut rejected_edits = self.apply_pending_edits();
        if self.schedule.is_none() {
            self.rebuild_schedule()?;
        }

        let mut requested = Vec::new();
        let outcome = match &self.schedule {
            Some(schedule) => Pass {
                topology: &self.topology,
                units: &mut self.units,
                values: &mut self.values,
                edits: &mut requested,
                dt,
                tick: self.tick,
            }
            .run(schedule),
            None => Ok(0),
        };

        self.pending.extend(requested);
        rejected_edits.extend(self.apply_pending_edits());

        let evaluated = outcome?;
        let report = TickReport {
            tick: self.tick,
            evaluated,
            rejected_edits,
        };
        self.tick += 1;
        Ok(report)
    }

    /// Wires in `(output, input)` order.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.topology.wires()
    }

    fn invalidate(&mut self) {
        if self.schedule.take().is_some() {
            debug!("topology changed; schedule invalidated");
        }
    }
}

#[cfg(test)]
mod tests;
