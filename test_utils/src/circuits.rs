//! Convenience constructors for circuits used in tests.

use blockwire::{Circuit, ConnectError, ConnectorId, Value};
use glam::Vec3;

use crate::tracer::{TraceLog, Tracer};

/// Parses `"unit.name"` into a [`ConnectorId`].
///
/// # Panics
/// Panics if `path` has no `.` separator.
///
/// # Examples
/// ```
/// use test_utils::cid;
/// assert_eq!(cid("lamp.in").to_string(), "lamp.in");
/// ```
pub fn cid(path: &str) -> ConnectorId {
    let (unit, name) = path
        .rsplit_once('.')
        .unwrap_or_else(|| panic!("connector path {path:?} must look like unit.name"));
    ConnectorId::new(unit, name)
}

/// Places one tracer per id.
///
/// # Panics
/// Panics if an id is already placed.
pub fn place_tracers(circuit: &mut Circuit, log: &TraceLog, ids: &[&str]) {
    for id in ids {
        circuit
            .add_unit(*id, Box::new(Tracer::new(log)))
            .unwrap_or_else(|e| panic!("placing tracer {id}: {e}"));
    }
}

/// Wires `(output, input)` unit pairs through their `out` and `in`
/// connectors, stopping at the first rejection.
///
/// # Errors
/// Returns the first [`ConnectError`].
pub fn connect_all(circuit: &mut Circuit, pairs: &[(&str, &str)]) -> Result<(), ConnectError> {
    for (from, to) in pairs {
        circuit.try_connect(
            &ConnectorId::new(*from, "out"),
            &ConnectorId::new(*to, "in"),
        )?;
    }
    Ok(())
}

/// Numeric value on `path`, if any.
pub fn numeric_value(circuit: &Circuit, path: &str) -> Option<f64> {
    circuit.value(&cid(path)).and_then(Value::as_number)
}

/// A [`Value::Vector3`] from components.
pub fn vector(x: f32, y: f32, z: f32) -> Value {
    Value::Vector3(Vec3::new(x, y, z))
}
