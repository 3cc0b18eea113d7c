//! Units without inputs.

use serde::{Deserialize, Serialize};

use crate::kind::Value;
use crate::topology::ConnectorDecl;
use crate::unit::{LogicUnit, TickContext, UnitError};

/// Emits a fixed value on `out` every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// Value written to `out` every tick.
    pub value: Value,
}

impl Constant {
    /// A constant emitting `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl LogicUnit for Constant {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        vec![ConnectorDecl::output("out", self.value.kind())]
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        ctx.set_output("out", self.value.clone());
        Ok(())
    }

    fn params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
