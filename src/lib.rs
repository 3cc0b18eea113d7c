#![cfg_attr(docsrs, feature(doc_cfg))]
//! Circuit scheduling and wire typing for block-based logic builds.
//!
//! Units are placed into a [`Circuit`], wired output to input, and ticked in
//! a layered order derived from the wiring. Feedback loops are allowed: the
//! wire closing a loop carries the previous tick's value. Connector kinds
//! narrow as wires are added so that each joined bus carries one agreed
//! kind.
pub mod circuit;
pub mod constants;
pub mod kind;
pub mod logging;
pub mod plugin;
pub mod schedule;
pub mod snapshot;
pub mod topology;
pub mod typing;
pub mod unit;
pub mod units;
pub use constants::*;

// Re-export commonly used items
pub use circuit::{Circuit, CircuitEdit, EditError, RejectedEdit, TickError, TickReport};
pub use kind::{KindSet, Value, ValueKind};
pub use logging::init as init_logging;
pub use plugin::{
    apply_edit_inbox_system, evaluate_circuit_system, CircuitPlugin, CircuitSettings,
    CircuitState, CircuitSyncError, CircuitSyncErrorContext, EditInbox,
};
pub use schedule::{rebuild_schedule, Layer, Schedule, ScheduleError};
pub use snapshot::{CircuitSnapshot, SnapshotError, UnitRegistry};
pub use topology::{
    ConnectError, Connector, ConnectorDecl, ConnectorId, Direction, GroupId, Topology,
    TopologyError, UnitId, Wire,
};
pub use typing::TypeMismatchError;
pub use unit::{LogicUnit, TickContext, UnitError};

pub mod prelude {
    //! Prelude exports used in documentation examples.
    //!
    //! ```rust
    //! use blockwire::prelude::*;
    //!
    //! let mut circuit = Circuit::new();
    //! circuit.add_unit("a", Box::new(Not)).expect("place a");
    //! circuit.add_unit("b", Box::new(Not)).expect("place b");
    //! circuit
    //!     .try_connect(&ConnectorId::new("a", "out"), &ConnectorId::new("b", "in"))
    //!     .expect("a -> b");
    //! circuit.evaluate_tick(DEFAULT_TICK_SECONDS).expect("tick");
    //! assert_eq!(
    //!     circuit.value(&ConnectorId::new("b", "out")),
    //!     Some(&Value::Bool(false))
    //! );
    //! ```

    pub use crate::circuit::{Circuit, CircuitEdit};
    pub use crate::constants::DEFAULT_TICK_SECONDS;
    pub use crate::kind::{KindSet, Value, ValueKind};
    pub use crate::topology::{ConnectorDecl, ConnectorId, UnitId};
    pub use crate::unit::{LogicUnit, TickContext, UnitError};
    pub use crate::units::{Add, And, Constant, Not, Relay};
    pub use crate::CircuitPlugin;
}
