//! Reference logic units.
//!
//! These cover the primitive kinds well enough to drive the CLI and the
//! tests. Game-specific units live with the host and register themselves in
//! a [`UnitRegistry`](crate::snapshot::UnitRegistry).

mod gates;
mod relay;
mod source;

pub use gates::{Add, And, Not};
pub use relay::Relay;
pub use source::Constant;
