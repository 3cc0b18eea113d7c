//! Contract between the tick driver and individual logic units.
//!
//! A [`LogicUnit`] declares its connectors once and is then ticked once per
//! simulation step through a [`TickContext`]. The context exposes the unit's
//! current input values, collects the outputs it writes, and queues any
//! structural edits the unit requests until the pass has finished.

use hashbrown::HashMap;
use thiserror::Error;

use crate::circuit::CircuitEdit;
use crate::kind::{KindSet, Value, ValueKind};
use crate::topology::UnitId;

pub use crate::topology::ConnectorDecl;

/// Behaviour of a placed block as seen by the circuit.
pub trait LogicUnit: Send + Sync {
    /// Registry name used when persisting the unit.
    fn kind(&self) -> &'static str;

    /// Static connector declarations. Called once when the unit is placed.
    fn connectors(&self) -> Vec<ConnectorDecl>;

    /// Evaluates the unit for one tick.
    ///
    /// # Errors
    /// Returns [`UnitError`] when inputs are unusable or the unit fails.
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError>;

    /// Parameters persisted alongside the unit.
    ///
    /// # Errors
    /// Returns the encoding failure when the unit's state cannot be
    /// represented as JSON.
    fn params(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(serde_json::Value::Null)
    }
}

/// Failures raised by or on behalf of a unit during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// The unit read an input it does not declare.
    #[error("unit has no input named {0}")]
    UnknownInput(String),
    /// An input held a value of an unexpected kind.
    #[error("input {name} carries {found}, expected {expected}")]
    WrongKind {
        /// Input name.
        name: String,
        /// Kind the unit asked for.
        expected: ValueKind,
        /// Kind actually present.
        found: ValueKind,
    },
    /// The unit wrote to a connector it does not declare.
    #[error("unit has no output named {0}")]
    UnknownOutput(String),
    /// The unit wrote to one of its inputs.
    #[error("connector {0} is an input and cannot be written")]
    NotAnOutput(String),
    /// The written value's kind is no longer available on the output.
    #[error("output {name} cannot carry {kind}; available kinds are {available}")]
    OutputKind {
        /// Output name.
        name: String,
        /// Kind of the rejected value.
        kind: ValueKind,
        /// Kinds the output currently accepts.
        available: KindSet,
    },
    /// Unit-specific failure.
    #[error("{0}")]
    Failed(String),
}

/// Per-unit view handed to [`LogicUnit::tick`].
pub struct TickContext<'a> {
    unit: &'a UnitId,
    dt: f32,
    tick: u64,
    inputs: HashMap<String, Value>,
    outputs: Vec<(String, Value)>,
    edits: &'a mut Vec<CircuitEdit>,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        unit: &'a UnitId,
        dt: f32,
        tick: u64,
        inputs: HashMap<String, Value>,
        edits: &'a mut Vec<CircuitEdit>,
    ) -> Self {
        Self {
            unit,
            dt,
            tick,
            inputs,
            outputs: Vec::new(),
            edits,
        }
    }

    /// Identity of the unit being ticked.
    #[must_use]
    pub const fn unit(&self) -> &UnitId {
        self.unit
    }

    /// Seconds elapsed since the previous tick.
    #[must_use]
    pub const fn dt(&self) -> f32 {
        self.dt
    }

    /// Zero-based index of the running tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current value of input `name`.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Reads input `name`, failing if it is absent.
    ///
    /// # Errors
    /// Returns [`UnitError::UnknownInput`] if the unit has no such input.
    pub fn require(&self, name: &str) -> Result<&Value, UnitError> {
        self.input(name)
            .ok_or_else(|| UnitError::UnknownInput(name.to_owned()))
    }

    /// Reads a boolean input.
    ///
    /// # Errors
    /// Fails when the input is missing or carries another kind.
    pub fn input_bool(&self, name: &str) -> Result<bool, UnitError> {
        let value = self.require(name)?;
        value.as_bool().ok_or_else(|| Self::wrong(name, ValueKind::Bool, value))
    }

    /// Reads a numeric input.
    ///
    /// # Errors
    /// Fails when the input is missing or carries another kind.
    pub fn input_number(&self, name: &str) -> Result<f64, UnitError> {
        let value = self.require(name)?;
        value
            .as_number()
            .ok_or_else(|| Self::wrong(name, ValueKind::Number, value))
    }

    fn wrong(name: &str, expected: ValueKind, value: &Value) -> UnitError {
        UnitError::WrongKind {
            name: name.to_owned(),
            expected,
            found: value.kind(),
        }
    }

    /// Writes `value` to output `name`.
    ///
    /// The driver validates the write once the unit returns.
    pub fn set_output(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.outputs.push((name.into(), value.into()));
    }

    /// Queues a structural edit to apply once the current pass completes.
    pub fn request_edit(&mut self, edit: CircuitEdit) {
        self.edits.push(edit);
    }

    pub(crate) fn into_outputs(self) -> Vec<(String, Value)> {
        self.outputs
    }
}
