//! Boolean and arithmetic gates.

use serde::{Deserialize, Serialize};

use crate::kind::ValueKind;
use crate::topology::ConnectorDecl;
use crate::unit::{LogicUnit, TickContext, UnitError};

/// `out = !in`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Not;

impl LogicUnit for Not {
    fn kind(&self) -> &'static str {
        "not"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        vec![
            ConnectorDecl::input("in", ValueKind::Bool),
            ConnectorDecl::output("out", ValueKind::Bool),
        ]
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        let value = ctx.input_bool("in")?;
        ctx.set_output("out", !value);
        Ok(())
    }
}

/// `out = a && b`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct And;

impl LogicUnit for And {
    fn kind(&self) -> &'static str {
        "and"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        vec![
            ConnectorDecl::input("a", ValueKind::Bool),
            ConnectorDecl::input("b", ValueKind::Bool),
            ConnectorDecl::output("out", ValueKind::Bool),
        ]
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        let out = ctx.input_bool("a")? && ctx.input_bool("b")?;
        ctx.set_output("out", out);
        Ok(())
    }
}

/// `out = a + b`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Add;

impl LogicUnit for Add {
    fn kind(&self) -> &'static str {
        "add"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        vec![
            ConnectorDecl::input("a", ValueKind::Number),
            ConnectorDecl::input("b", ValueKind::Number),
            ConnectorDecl::output("out", ValueKind::Number),
        ]
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        let sum = ctx.input_number("a")? + ctx.input_number("b")?;
        ctx.set_output("out", sum);
        Ok(())
    }
}
