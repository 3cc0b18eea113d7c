//! Persistence of placed units and wires.
//!
//! A [`CircuitSnapshot`] records each unit's kind and parameters, the group id
//! of every connector, and every wire. Loading goes through a
//! [`UnitRegistry`] owned by the caller, then replays the wires so the kind
//! narrowing is reproduced exactly.

use std::collections::BTreeMap;

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::circuit::Circuit;
use crate::topology::{ConnectError, ConnectorId, GroupId, TopologyError, UnitId};
use crate::unit::LogicUnit;
use crate::units::{Add, And, Constant, Not, Relay};

/// Persisted unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Identity of the unit.
    pub id: UnitId,
    /// Registry name of the unit's behaviour.
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Persisted connector identity and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRecord {
    /// Owning unit.
    pub unit: UnitId,
    /// Connector name within the unit.
    pub name: String,
    /// Declared alias group, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

/// Persisted wire endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Source output.
    pub output: ConnectorId,
    /// Target input.
    pub input: ConnectorId,
}

/// Serialisable description of a whole circuit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// Placed units in identity order.
    pub units: Vec<UnitRecord>,
    /// Connector groups, checked against declarations on load.
    #[serde(default)]
    pub connectors: Vec<ConnectorRecord>,
    /// Wires in replay order.
    #[serde(default)]
    pub wires: Vec<WireRecord>,
}

impl CircuitSnapshot {
    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Json`] on malformed input.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Renders the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Json`] if a parameter value cannot be encoded.
    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Failures while exporting or loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No constructor is registered for a unit kind.
    #[error("unit {unit} has unknown kind {kind:?}")]
    UnknownKind {
        /// Unit being loaded.
        unit: UnitId,
        /// Kind requested by the snapshot.
        kind: String,
    },
    /// A unit's parameters did not match its kind or could not be encoded.
    #[error("unit {unit} has invalid parameters: {source}")]
    Params {
        /// Unit being loaded.
        unit: UnitId,
        /// Encoding or decoding failure.
        source: serde_json::Error,
    },
    /// A unit could not be placed.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// A connector record names a connector the unit does not declare.
    #[error("snapshot records unknown connector {0}")]
    UnknownConnector(ConnectorId),
    /// A connector record disagrees with the unit's declared group.
    #[error("connector {connector} is recorded in group {recorded:?} but declares {declared:?}")]
    GroupMismatch {
        /// Connector being checked.
        connector: ConnectorId,
        /// Group stored in the snapshot.
        recorded: Option<GroupId>,
        /// Group declared by the unit.
        declared: Option<GroupId>,
    },
    /// A recorded wire could not be replayed.
    #[error("cannot restore wire {output} -> {input}: {source}")]
    Wire {
        /// Recorded source.
        output: ConnectorId,
        /// Recorded target.
        input: ConnectorId,
        /// Why wiring failed.
        source: ConnectError,
    },
    /// The document is not valid snapshot JSON.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

type UnitFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn LogicUnit>, serde_json::Error> + Send + Sync>;

/// Constructors for unit kinds, keyed by registry name.
#[derive(Default)]
pub struct UnitRegistry {
    factories: BTreeMap<String, UnitFactory>,
}

impl UnitRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the reference units in [`crate::units`].
    #[must_use]
    pub fn with_builtin_units() -> Self {
        let mut registry = Self::new();
        registry.register_serde::<Constant>("constant");
        registry.register_serde::<Not>("not");
        registry.register_serde::<And>("and");
        registry.register_serde::<Add>("add");
        registry.register_serde::<Relay>("relay");
        registry
    }

    /// Registers a constructor for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn LogicUnit>, serde_json::Error>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Registers a unit type that deserialises directly from its params.
    pub fn register_serde<U>(&mut self, kind: impl Into<String>)
    where
        U: LogicUnit + serde::de::DeserializeOwned + 'static,
    {
        self.register(kind, |params| {
            let unit: U = serde_json::from_value(params.clone())?;
            Ok(Box::new(unit) as Box<dyn LogicUnit>)
        });
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds the unit recorded in `record`.
    ///
    /// # Errors
    /// Fails for unknown kinds or parameters the kind rejects.
    pub fn build(&self, record: &UnitRecord) -> Result<Box<dyn LogicUnit>, SnapshotError> {
        let factory = self
            .factories
            .get(&record.kind)
            .ok_or_else(|| SnapshotError::UnknownKind {
                unit: record.id.clone(),
                kind: record.kind.clone(),
            })?;
        factory(&record.params).map_err(|source| SnapshotError::Params {
            unit: record.id.clone(),
            source,
        })
    }
}

impl Circuit {
    /// Captures units, connector groups, and wires.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Params`] when a unit cannot encode its
    /// parameters.
    pub fn snapshot(&self) -> Result<CircuitSnapshot, SnapshotError> {
        let units = self
            .units()
            .map(|(id, unit)| {
                let params = unit.params().map_err(|source| {
                    error!("cannot persist unit {id}: {source}");
                    SnapshotError::Params {
                        unit: id.clone(),
                        source,
                    }
                })?;
                Ok(UnitRecord {
                    id: id.clone(),
                    kind: unit.kind().to_owned(),
                    params,
                })
            })
            .collect::<Result<Vec<_>, SnapshotError>>()?;
        let connectors = self
            .topology()
            .units()
            .flat_map(|unit| self.topology().unit_connectors(unit))
            .map(|c| ConnectorRecord {
                unit: c.id.unit.clone(),
                name: c.id.name.clone(),
                group: c.group.clone(),
            })
            .collect();
        let wires = self
            .wires()
            .map(|w| WireRecord {
                output: w.output.clone(),
                input: w.input.clone(),
            })
            .collect();
        Ok(CircuitSnapshot {
            units,
            connectors,
            wires,
        })
    }

    /// Rebuilds a circuit from a snapshot.
    ///
    /// # Errors
    /// Returns [`SnapshotError`] for unknown kinds, inconsistent connector
    /// records, or wires that can no longer be made.
    pub fn from_snapshot(
        snapshot: &CircuitSnapshot,
        registry: &UnitRegistry,
    ) -> Result<Self, SnapshotError> {
        let mut circuit = Self::new();
        for record in &snapshot.units {
            circuit.add_unit(record.id.clone(), registry.build(record)?)?;
        }
        for record in &snapshot.connectors {
            let id = ConnectorId::new(record.unit.clone(), record.name.clone());
            let connector = circuit
                .topology()
                .connector(&id)
                .ok_or_else(|| SnapshotError::UnknownConnector(id.clone()))?;
            if connector.group != record.group {
                return Err(SnapshotError::GroupMismatch {
                    connector: id,
                    recorded: record.group.clone(),
                    declared: connector.group.clone(),
                });
            }
        }
        for wire in &snapshot.wires {
            circuit
                .try_connect(&wire.output, &wire.input)
                .map_err(|source| SnapshotError::Wire {
                    output: wire.output.clone(),
                    input: wire.input.clone(),
                    source,
                })?;
        }
        info!(
            "loaded circuit with {} units and {} wires",
            snapshot.units.len(),
            snapshot.wires.len()
        );
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{KindSet, ValueKind};
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> UnitRegistry {
        UnitRegistry::with_builtin_units()
    }

    const DOC: &str = r#"{
        "units": [
            { "id": "a", "kind": "constant", "params": { "value": { "kind": "bool", "value": true } } },
            { "id": "b", "kind": "relay" },
            { "id": "c", "kind": "not" }
        ],
        "connectors": [
            { "unit": "b", "name": "in", "group": "signal" }
        ],
        "wires": [
            { "output": { "unit": "a", "name": "out" }, "input": { "unit": "b", "name": "in" } },
            { "output": { "unit": "b", "name": "out" }, "input": { "unit": "c", "name": "in" } }
        ]
    }"#;

    #[rstest]
    fn loads_units_and_replays_wires(registry: UnitRegistry) {
        let snapshot = CircuitSnapshot::from_json(DOC).expect("parse snapshot");
        let circuit = Circuit::from_snapshot(&snapshot, &registry).expect("load snapshot");
        assert_eq!(circuit.wires().count(), 2);
        let relay_out = circuit
            .topology()
            .connector(&ConnectorId::new("b", "out"))
            .map(|c| c.available);
        assert_eq!(relay_out, Some(KindSet::only(ValueKind::Bool)));
    }

    #[rstest]
    fn snapshot_survives_a_round_trip(registry: UnitRegistry) {
        let snapshot = CircuitSnapshot::from_json(DOC).expect("parse snapshot");
        let circuit = Circuit::from_snapshot(&snapshot, &registry).expect("load snapshot");
        let exported = circuit.snapshot().expect("export snapshot");
        let reloaded = Circuit::from_snapshot(&exported, &registry).expect("reload");
        assert_eq!(reloaded.snapshot().expect("re-export"), exported);
        assert_eq!(exported.connectors.len(), 5);
    }

    #[rstest]
    fn unknown_kind_is_rejected(registry: UnitRegistry) {
        let snapshot = CircuitSnapshot {
            units: vec![UnitRecord {
                id: "x".into(),
                kind: "teleporter".to_owned(),
                params: serde_json::Value::Null,
            }],
            ..CircuitSnapshot::default()
        };
        assert!(matches!(
            Circuit::from_snapshot(&snapshot, &registry),
            Err(SnapshotError::UnknownKind { kind, .. }) if kind == "teleporter"
        ));
    }

    #[rstest]
    fn group_mismatch_is_rejected(registry: UnitRegistry) {
        let snapshot = CircuitSnapshot {
            units: vec![UnitRecord {
                id: "r".into(),
                kind: "relay".to_owned(),
                params: serde_json::Value::Null,
            }],
            connectors: vec![ConnectorRecord {
                unit: "r".into(),
                name: "out".to_owned(),
                group: None,
            }],
            wires: Vec::new(),
        };
        assert!(matches!(
            Circuit::from_snapshot(&snapshot, &registry),
            Err(SnapshotError::GroupMismatch { declared: Some(_), recorded: None, .. })
        ));
    }

    #[rstest]
    fn incompatible_wire_is_rejected(registry: UnitRegistry) {
        let snapshot = CircuitSnapshot {
            units: vec![
                UnitRecord {
                    id: "n".into(),
                    kind: "constant".to_owned(),
                    params: serde_json::json!({ "value": { "kind": "number", "value": 1.0 } }),
                },
                UnitRecord {
                    id: "g".into(),
                    kind: "not".to_owned(),
                    params: serde_json::Value::Null,
                },
            ],
            connectors: Vec::new(),
            wires: vec![WireRecord {
                output: ConnectorId::new("n", "out"),
                input: ConnectorId::new("g", "in"),
            }],
        };
        assert!(matches!(
            Circuit::from_snapshot(&snapshot, &registry),
            Err(SnapshotError::Wire {
                source: ConnectError::TypeMismatch(_),
                ..
            })
        ));
    }

    /// Holds state that has no JSON form.
    struct Opaque;

    impl LogicUnit for Opaque {
        fn kind(&self) -> &'static str {
            "opaque"
        }

        fn connectors(&self) -> Vec<crate::topology::ConnectorDecl> {
            Vec::new()
        }

        fn tick(&mut self, _ctx: &mut crate::unit::TickContext<'_>) -> Result<(), crate::unit::UnitError> {
            Ok(())
        }

        fn params(&self) -> Result<serde_json::Value, serde_json::Error> {
            Err(<serde_json::Error as serde::ser::Error>::custom("opaque state"))
        }
    }

    #[rstest]
    fn unencodable_params_fail_the_export() {
        let mut circuit = Circuit::new();
        circuit
            .add_unit("o", Box::new(Opaque))
            .expect("place opaque unit");
        assert!(matches!(
            circuit.snapshot(),
            Err(SnapshotError::Params { unit, .. }) if unit == UnitId::from("o")
        ));
    }
}
