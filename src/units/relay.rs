//! Pass-through unit whose input and output alias one signal.

use serde::{Deserialize, Serialize};

use crate::kind::KindSet;
use crate::topology::ConnectorDecl;
use crate::unit::{LogicUnit, TickContext, UnitError};

/// Forwards `in` to `out` unchanged.
///
/// Both connectors share the `signal` group, so wiring either end narrows
/// the other to the same kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay;

impl LogicUnit for Relay {
    fn kind(&self) -> &'static str {
        "relay"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        vec![
            ConnectorDecl::input("in", KindSet::all()).grouped("signal"),
            ConnectorDecl::output("out", KindSet::all()).grouped("signal"),
        ]
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        let value = ctx.require("in")?.clone();
        ctx.set_output("out", value);
        Ok(())
    }
}
