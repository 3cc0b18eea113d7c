//! Behavioural tests for kind narrowing across relays and their groups.
//!
//! A relay's input and output share a group, so a wire on either side narrows
//! both. These scenarios wire relay chains to typed sources and check what
//! every connector on the bus may still carry.

#[path = "support/rspec_runner.rs"]
mod rspec_runner;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blockwire::units::{Constant, Not, Relay};
use blockwire::{Circuit, ConnectError, KindSet, ValueKind};
use rspec::block::Context as Scenario;
use rspec_runner::run_in_order;
use test_utils::cid;

#[derive(Clone, Default)]
struct Env {
    circuit: Arc<Mutex<Circuit>>,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").finish_non_exhaustive()
    }
}

impl Env {
    fn circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Two relays in series and two unwired sources.
    fn reset(&self) {
        let mut circuit = Circuit::new();
        circuit.add_unit("r1", Box::new(Relay)).expect("place r1");
        circuit.add_unit("r2", Box::new(Relay)).expect("place r2");
        circuit
            .add_unit("num", Box::new(Constant::new(2.5)))
            .expect("place number source");
        circuit.add_unit("inv", Box::new(Not)).expect("place inverter");
        circuit
            .try_connect(&cid("r1.out"), &cid("r2.in"))
            .expect("r1 -> r2");
        *self.circuit() = circuit;
    }

    fn available(&self, path: &str) -> KindSet {
        self.circuit()
            .topology()
            .connector(&cid(path))
            .map(|c| c.available)
            .unwrap_or_else(|| panic!("{path} is not registered"))
    }

    fn connect(&self, from: &str, to: &str) -> Result<(), ConnectError> {
        self.circuit().try_connect(&cid(from), &cid(to))
    }

    fn disconnect(&self, from: &str, to: &str) {
        self.circuit()
            .disconnect(&cid(from), &cid(to))
            .expect("wire exists");
    }
}

const BUS: [&str; 4] = ["r1.in", "r1.out", "r2.in", "r2.out"];

#[test]
fn relay_bus_narrows_as_one() {
    run_in_order(&rspec::given(
        "two relays wired in series",
        Env::default(),
        |scenario: &mut Scenario<Env>| {
            scenario.before_each(|env| env.reset());

            scenario.then("every bus connector accepts every kind", |env| {
                for path in BUS {
                    assert_eq!(env.available(path), KindSet::all(), "{path}");
                }
            });

            scenario.when("a number source feeds the first relay", |scenario| {
                scenario.before_each(|env| {
                    env.connect("num.out", "r1.in").expect("number into r1");
                });

                scenario.then("the whole bus carries numbers only", |env| {
                    for path in BUS {
                        assert_eq!(env.available(path), KindSet::only(ValueKind::Number), "{path}");
                    }
                });

                scenario.then("a boolean consumer is rejected without changes", |env| {
                    let err = env
                        .connect("r2.out", "inv.in")
                        .expect_err("number bus cannot feed a bool input");
                    match err {
                        ConnectError::TypeMismatch(mismatch) => {
                            assert_eq!(mismatch.output_kinds, KindSet::only(ValueKind::Number));
                            assert_eq!(mismatch.input_kinds, KindSet::only(ValueKind::Bool));
                        }
                        other => panic!("unexpected error {other}"),
                    }
                    assert_eq!(env.available("inv.in"), KindSet::only(ValueKind::Bool));
                    assert_eq!(env.circuit().wires().count(), 2);
                });

                scenario.then("unwiring the source keeps the narrowed kinds", |env| {
                    env.disconnect("num.out", "r1.in");
                    assert_eq!(env.available("r2.out"), KindSet::only(ValueKind::Number));
                });
            });

            scenario.when("a boolean consumer is wired first", |scenario| {
                scenario.before_each(|env| {
                    env.connect("r2.out", "inv.in").expect("r2 into inverter");
                });

                scenario.then("the bus narrows back to the first relay", |env| {
                    assert_eq!(env.available("r1.in"), KindSet::only(ValueKind::Bool));
                });

                scenario.then("the number source can no longer join", |env| {
                    assert!(matches!(
                        env.connect("num.out", "r1.in"),
                        Err(ConnectError::TypeMismatch(_))
                    ));
                });

                scenario.then("a second wire into the same input is refused", |env| {
                    assert!(matches!(
                        env.connect("r1.out", "inv.in"),
                        Err(ConnectError::InputOccupied { .. })
                    ));
                });
            });
        },
    ));
}
