//! Tick driver and edit queue tests.
use super::*;
use crate::kind::{KindSet, ValueKind};
use crate::topology::ConnectorDecl;
use crate::unit::TickContext;
use crate::units::{Add, Constant, Not, Relay};
use rstest::rstest;

fn cid(unit: &str, name: &str) -> ConnectorId {
    ConnectorId::new(unit, name)
}

fn number(circuit: &Circuit, unit: &str, name: &str) -> Option<f64> {
    circuit.value(&cid(unit, name)).and_then(Value::as_number)
}

/// Places a constant on its first tick and never again.
struct Spawner {
    spawned: bool,
}

impl LogicUnit for Spawner {
    fn kind(&self) -> &'static str {
        "spawner"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        Vec::new()
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        if !self.spawned {
            self.spawned = true;
            ctx.request_edit(CircuitEdit::AddUnit {
                id: "spawned".into(),
                unit: Box::new(Constant::new(7.0)),
            });
        }
        Ok(())
    }
}

/// Writes whatever it was configured with to `out`.
struct Writer {
    target: &'static str,
    value: Value,
}

impl LogicUnit for Writer {
    fn kind(&self) -> &'static str {
        "writer"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        vec![
            ConnectorDecl::input("in", ValueKind::Bool),
            ConnectorDecl::output("out", ValueKind::Bool),
        ]
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        ctx.set_output(self.target, self.value.clone());
        Ok(())
    }
}

#[rstest]
fn feedback_loop_reads_previous_tick() {
    let mut circuit = Circuit::new();
    circuit
        .add_unit("one", Box::new(Constant::new(1.0)))
        .expect("place constant");
    circuit.add_unit("sum", Box::new(Add)).expect("place add");
    circuit.add_unit("tap", Box::new(Relay)).expect("place relay");
    circuit
        .try_connect(&cid("one", "out"), &cid("sum", "a"))
        .expect("one -> sum.a");
    circuit
        .try_connect(&cid("sum", "out"), &cid("tap", "in"))
        .expect("sum -> tap");
    circuit
        .try_connect(&cid("tap", "out"), &cid("sum", "b"))
        .expect("tap -> sum.b");

    let mut seen = Vec::new();
    for _ in 0..4 {
        circuit.evaluate_tick(0.05).expect("tick");
        seen.push(number(&circuit, "sum", "out").expect("sum produced a number"));
    }
    assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0]);
}

#[rstest]
fn self_wired_inverter_oscillates() {
    let mut circuit = Circuit::new();
    circuit.add_unit("osc", Box::new(Not)).expect("place not");
    circuit
        .try_connect(&cid("osc", "out"), &cid("osc", "in"))
        .expect("self wire");

    let mut seen = Vec::new();
    for _ in 0..4 {
        circuit.evaluate_tick(0.05).expect("tick");
        seen.push(
            circuit
                .value(&cid("osc", "out"))
                .and_then(Value::as_bool)
                .expect("osc produced a bool"),
        );
    }
    assert_eq!(seen, vec![true, false, true, false]);
}

#[rstest]
fn schedule_is_rebuilt_lazily_after_edits() {
    let mut circuit = Circuit::new();
    circuit.add_unit("a", Box::new(Not)).expect("place a");
    circuit.add_unit("b", Box::new(Not)).expect("place b");
    assert!(circuit.schedule().is_none());

    circuit.evaluate_tick(0.0).expect("first tick");
    assert_eq!(
        circuit.schedule().map(Schedule::as_ids),
        Some(vec![vec!["a", "b"]])
    );

    circuit
        .try_connect(&cid("a", "out"), &cid("b", "in"))
        .expect("a -> b");
    assert!(circuit.schedule().is_none(), "wiring invalidates the cache");

    circuit.evaluate_tick(0.0).expect("second tick");
    assert_eq!(
        circuit.schedule().map(Schedule::as_ids),
        Some(vec![vec!["a"], vec!["b"]])
    );
}

#[rstest]
fn rejected_connection_keeps_the_cached_schedule() {
    let mut circuit = Circuit::new();
    circuit
        .add_unit("n", Box::new(Constant::new(1.0)))
        .expect("place constant");
    circuit.add_unit("g", Box::new(Not)).expect("place not");
    circuit.rebuild_schedule().expect("schedule");

    let err = circuit
        .try_connect(&cid("n", "out"), &cid("g", "in"))
        .expect_err("number cannot feed a bool input");
    assert!(matches!(err, ConnectError::TypeMismatch(_)));
    assert!(circuit.schedule().is_some());
    assert_eq!(circuit.wires().count(), 0);
}

#[rstest]
fn edits_requested_during_a_tick_apply_afterwards() {
    let mut circuit = Circuit::new();
    circuit
        .add_unit("spawner", Box::new(Spawner { spawned: false }))
        .expect("place spawner");

    let first = circuit.evaluate_tick(0.1).expect("first tick");
    assert_eq!(first.evaluated, 1);
    assert!(circuit.topology().contains_unit(&"spawned".into()));
    assert!(circuit.value(&cid("spawned", "out")).is_none());

    let second = circuit.evaluate_tick(0.1).expect("second tick");
    assert_eq!(second.evaluated, 2);
    assert_eq!(number(&circuit, "spawned", "out"), Some(7.0));
    assert_eq!(circuit.tick_count(), 2);
}

#[rstest]
fn rejected_queued_edits_are_reported() {
    let mut circuit = Circuit::new();
    circuit.queue_edit(CircuitEdit::RemoveUnit("ghost".into()));
    assert_eq!(circuit.pending_edits(), 1);

    let report = circuit.evaluate_tick(0.1).expect("tick");
    assert_eq!(circuit.pending_edits(), 0);
    assert_eq!(
        report.rejected_edits,
        vec![RejectedEdit {
            edit: "remove unit ghost".to_owned(),
            error: EditError::Topology(TopologyError::UnknownUnit("ghost".into())),
        }]
    );
}

#[rstest]
#[case::wrong_kind("out", Value::from(1.0), UnitError::OutputKind {
    name: "out".to_owned(),
    kind: ValueKind::Number,
    available: KindSet::only(ValueKind::Bool),
})]
#[case::unknown("nowhere", Value::from(true), UnitError::UnknownOutput("nowhere".to_owned()))]
#[case::input("in", Value::from(true), UnitError::NotAnOutput("in".to_owned()))]
fn invalid_writes_fail_the_tick(
    #[case] target: &'static str,
    #[case] value: Value,
    #[case] expected: UnitError,
) {
    let mut circuit = Circuit::new();
    circuit
        .add_unit("w", Box::new(Writer { target, value }))
        .expect("place writer");
    assert_eq!(
        circuit.evaluate_tick(0.1),
        Err(TickError::Unit {
            unit: "w".into(),
            source: expected,
        })
    );
    assert_eq!(circuit.tick_count(), 0);
}

#[rstest]
fn removed_source_leaves_last_value_on_input() {
    let mut circuit = Circuit::new();
    circuit
        .add_unit("src", Box::new(Constant::new(3.0)))
        .expect("place constant");
    circuit.add_unit("dst", Box::new(Relay)).expect("place relay");
    circuit
        .try_connect(&cid("src", "out"), &cid("dst", "in"))
        .expect("src -> dst");
    circuit.evaluate_tick(0.1).expect("tick");

    circuit.remove_unit(&"src".into()).expect("remove src");
    assert!(circuit.value(&cid("src", "out")).is_none());
    assert_eq!(number(&circuit, "dst", "in"), Some(3.0));

    circuit.evaluate_tick(0.1).expect("tick after removal");
    assert_eq!(number(&circuit, "dst", "out"), Some(3.0));
}

#[rstest]
fn unfed_inputs_read_zero_values() {
    let mut circuit = Circuit::new();
    circuit.add_unit("sum", Box::new(Add)).expect("place add");
    circuit.evaluate_tick(0.1).expect("tick");
    assert_eq!(number(&circuit, "sum", "out"), Some(0.0));
}
