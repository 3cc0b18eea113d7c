//! One evaluation pass over a schedule.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use log::trace;

use crate::kind::Value;
use crate::schedule::Schedule;
use crate::topology::{ConnectorId, Direction, Topology, UnitId};
use crate::unit::{LogicUnit, TickContext, UnitError};

use super::{CircuitEdit, TickError};

/// Borrowed circuit state needed for a single tick.
pub(super) struct Pass<'c> {
    pub(super) topology: &'c Topology,
    pub(super) units: &'c mut BTreeMap<UnitId, Box<dyn LogicUnit>>,
    pub(super) values: &'c mut HashMap<ConnectorId, Value>,
    pub(super) edits: &'c mut Vec<CircuitEdit>,
    pub(super) dt: f32,
    pub(super) tick: u64,
}

impl Pass<'_> {
    /// Evaluates every layer in order and returns the number of units ticked.
    pub(super) fn run(&mut self, schedule: &Schedule) -> Result<usize, TickError> {
        let mut evaluated = 0;
        for (depth, layer) in schedule.layers().iter().enumerate() {
            trace!("tick {} layer {depth}: {} units", self.tick, layer.len());
            for unit in layer.units() {
                self.evaluate(unit)
                    .map_err(|source| TickError::Unit {
                        unit: unit.clone(),
                        source,
                    })?;
                evaluated += 1;
            }
        }
        Ok(evaluated)
    }

    /// Current input values for `unit`; unfed inputs read the zero value of
    /// their first available kind.
    fn gather_inputs(&self, unit: &UnitId) -> HashMap<String, Value> {
        self.topology
            .unit_connectors(unit)
            .filter(|c| c.direction == Direction::Input)
            .filter_map(|c| {
                let value = self
                    .values
                    .get(&c.id)
                    .cloned()
                    .or_else(|| c.available.first().map(|k| k.default_value()))?;
                Some((c.id.name.clone(), value))
            })
            .collect()
    }

    fn evaluate(&mut self, unit: &UnitId) -> Result<(), UnitError> {
        let inputs = self.gather_inputs(unit);
        let Some(behaviour) = self.units.get_mut(unit) else {
            return Ok(());
        };
        let mut ctx = TickContext::new(unit, self.dt, self.tick, inputs, self.edits);
        behaviour.tick(&mut ctx)?;
        for (name, value) in ctx.into_outputs() {
            self.write_output(unit, name, value)?;
        }
        Ok(())
    }

    /// Stores `value` on the output and pushes it along every wire.
    fn write_output(&mut self, unit: &UnitId, name: String, value: Value) -> Result<(), UnitError> {
        let id = unit.connector(name);
        let Some(connector) = self.topology.connector(&id) else {
            return Err(UnitError::UnknownOutput(id.name));
        };
        if connector.direction != Direction::Output {
            return Err(UnitError::NotAnOutput(id.name));
        }
        if !connector.available.contains(value.kind()) {
            return Err(UnitError::OutputKind {
                name: id.name,
                kind: value.kind(),
                available: connector.available,
            });
        }
        for wire in self.topology.wires_from(&id) {
            self.values.insert(wire.input.clone(), value.clone());
        }
        self.values.insert(id, value);
        Ok(())
    }
}
