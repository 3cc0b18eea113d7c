//! Structural edits deferred until the current tick pass has finished.

use std::fmt;

use thiserror::Error;

use crate::topology::{ConnectError, ConnectorId, TopologyError, UnitId};
use crate::unit::LogicUnit;

/// A structural change to a circuit.
pub enum CircuitEdit {
    /// Place a unit.
    AddUnit {
        /// Identity of the new unit.
        id: UnitId,
        /// Behaviour of the new unit.
        unit: Box<dyn LogicUnit>,
    },
    /// Remove a unit with all of its wires.
    RemoveUnit(UnitId),
    /// Add a wire.
    Connect {
        /// Source output.
        output: ConnectorId,
        /// Target input.
        input: ConnectorId,
    },
    /// Remove a wire.
    Disconnect {
        /// Source output.
        output: ConnectorId,
        /// Target input.
        input: ConnectorId,
    },
}

impl fmt::Debug for CircuitEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddUnit { id, unit } => f
                .debug_struct("AddUnit")
                .field("id", id)
                .field("kind", &unit.kind())
                .finish(),
            Self::RemoveUnit(id) => f.debug_tuple("RemoveUnit").field(id).finish(),
            Self::Connect { output, input } => f
                .debug_struct("Connect")
                .field("output", output)
                .field("input", input)
                .finish(),
            Self::Disconnect { output, input } => f
                .debug_struct("Disconnect")
                .field("output", output)
                .field("input", input)
                .finish(),
        }
    }
}

impl fmt::Display for CircuitEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddUnit { id, unit } => write!(f, "add {} unit {id}", unit.kind()),
            Self::RemoveUnit(id) => write!(f, "remove unit {id}"),
            Self::Connect { output, input } => write!(f, "connect {output} -> {input}"),
            Self::Disconnect { output, input } => write!(f, "disconnect {output} -> {input}"),
        }
    }
}

/// Why an edit could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Unit placement or removal failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// Wiring failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// A queued edit that was rejected when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEdit {
    /// Human-readable description of the edit.
    pub edit: String,
    /// Reason for rejection.
    pub error: EditError,
}
