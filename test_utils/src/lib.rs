//! Utility helpers for tests.

pub mod circuits;
pub mod tracer;

pub use circuits::{cid, connect_all, numeric_value, place_tracers, vector};
pub use tracer::{TraceLog, Tracer};
