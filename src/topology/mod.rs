//! Connector and wire bookkeeping for a circuit.
//!
//! [`Topology`] is the flat arena every other stage reads from: it owns each
//! placed unit's [`Connector`]s, the directed [`Wire`]s between them, and the
//! group index used to keep aliased connectors in step. Scheduling and type
//! propagation never hold references into it beyond a single call.

mod ids;

pub use ids::{ConnectorId, GroupId, UnitId};

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::{HashMap, HashSet};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::KindSet;
use crate::typing::{GroupKey, Groups, TypeMismatchError};

/// Whether a connector is read or written by its owning unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Read by the owning unit; fed by at most one wire.
    Input,
    /// Written by the owning unit; may fan out to many wires.
    Output,
}

/// Static declaration of a connector supplied by a logic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorDecl {
    /// Name unique within the owning unit.
    pub name: String,
    /// Whether values flow in or out.
    pub direction: Direction,
    /// Kinds the connector can ever carry.
    pub kinds: KindSet,
    /// Optional alias group shared with other connectors of the same unit.
    pub group: Option<GroupId>,
}

impl ConnectorDecl {
    /// Declares an input connector.
    pub fn input(name: impl Into<String>, kinds: impl Into<KindSet>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Input,
            kinds: kinds.into(),
            group: None,
        }
    }

    /// Declares an output connector.
    pub fn output(name: impl Into<String>, kinds: impl Into<KindSet>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Output,
            kinds: kinds.into(),
            group: None,
        }
    }

    /// Places the connector in an alias group.
    #[must_use]
    pub fn grouped(mut self, group: impl Into<GroupId>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A connector registered in the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    /// Unique connector identity.
    pub id: ConnectorId,
    /// Whether values flow in or out.
    pub direction: Direction,
    /// Kinds declared by the owning unit.
    pub declared: KindSet,
    /// Kinds still permitted after wiring; always a subset of `declared`.
    pub available: KindSet,
    /// Alias group within the owning unit.
    pub group: Option<GroupId>,
}

/// A directed connection from an output connector to an input connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Wire {
    /// Source output.
    pub output: ConnectorId,
    /// Target input.
    pub input: ConnectorId,
}

impl Wire {
    /// A wire from `output` to `input`.
    pub const fn new(output: ConnectorId, input: ConnectorId) -> Self {
        Self { output, input }
    }
}

/// Failures raised while adding or removing units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A unit with this id is already placed.
    #[error("unit {0} already exists")]
    DuplicateUnit(UnitId),
    /// No unit with this id is placed.
    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),
    /// Two connectors of one unit share a name.
    #[error("connector {0} is declared twice")]
    DuplicateConnector(ConnectorId),
    /// A connector declares no kinds at all.
    #[error("connector {0} declares no value kinds")]
    NoDeclaredKinds(ConnectorId),
    /// Members of a group have no kind in common.
    #[error("group {group} on unit {unit} has no value kind shared by all members")]
    DisjointGroup {
        /// Owning unit.
        unit: UnitId,
        /// Offending group.
        group: GroupId,
    },
}

/// Failures raised while wiring two connectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The connectors share no kind, or wiring them would empty some
    /// connector's kind set.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),
    /// An endpoint is not registered.
    #[error("connector {0} does not exist")]
    UnknownConnector(ConnectorId),
    /// The source is not an output or the target is not an input.
    #[error("wire must run from an output to an input, got {output} -> {input}")]
    DirectionMismatch {
        /// Requested source.
        output: ConnectorId,
        /// Requested target.
        input: ConnectorId,
    },
    /// The exact wire already exists.
    #[error("{output} is already wired to {input}")]
    AlreadyWired {
        /// Existing source.
        output: ConnectorId,
        /// Existing target.
        input: ConnectorId,
    },
    /// The input is already fed by another output.
    #[error("input {input} is already fed by {existing}")]
    InputOccupied {
        /// Requested target.
        input: ConnectorId,
        /// Output currently feeding the input.
        existing: ConnectorId,
    },
    /// No such wire exists.
    #[error("no wire from {output} to {input}")]
    NotWired {
        /// Requested source.
        output: ConnectorId,
        /// Requested target.
        input: ConnectorId,
    },
}

/// Arena of connectors and wires for one circuit.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    units: BTreeMap<UnitId, Vec<ConnectorId>>,
    connectors: HashMap<ConnectorId, Connector>,
    wires: BTreeSet<Wire>,
    /// Undirected view of `wires` used by propagation.
    links: HashMap<ConnectorId, BTreeSet<ConnectorId>>,
    groups: Groups,
}

impl Topology {
    /// An empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit and its connectors.
    ///
    /// Grouped connectors start with the intersection of their group's
    /// declared kinds so every member reports the same available set.
    ///
    /// # Errors
    /// Returns [`TopologyError`] when the unit already exists or its
    /// declarations are inconsistent. The topology is unchanged on error.
    pub fn add_unit(&mut self, unit: UnitId, decls: &[ConnectorDecl]) -> Result<(), TopologyError> {
        if self.units.contains_key(&unit) {
            return Err(TopologyError::DuplicateUnit(unit));
        }

        let mut seen = HashSet::new();
        let mut group_kinds: BTreeMap<&GroupId, KindSet> = BTreeMap::new();
        for decl in decls {
            let id = ConnectorId::new(unit.clone(), decl.name.clone());
            if !seen.insert(decl.name.as_str()) {
                return Err(TopologyError::DuplicateConnector(id));
            }
            if decl.kinds.is_empty() {
                return Err(TopologyError::NoDeclaredKinds(id));
            }
            if let Some(group) = &decl.group {
                let shared = group_kinds.entry(group).or_insert_with(KindSet::all);
                *shared = shared.intersect(decl.kinds);
            }
        }
        if let Some((group, _)) = group_kinds.iter().find(|(_, kinds)| kinds.is_empty()) {
            return Err(TopologyError::DisjointGroup {
                unit,
                group: (*group).clone(),
            });
        }

        let connectors: Vec<Connector> = decls
            .iter()
            .map(|decl| Connector {
                id: ConnectorId::new(unit.clone(), decl.name.clone()),
                direction: decl.direction,
                declared: decl.kinds,
                available: decl
                    .group
                    .as_ref()
                    .and_then(|g| group_kinds.get(g).copied())
                    .unwrap_or(decl.kinds),
                group: decl.group.clone(),
            })
            .collect();

        self.groups.group_markers(&connectors);
        let ids = connectors.iter().map(|c| c.id.clone()).collect();
        for connector in connectors {
            self.connectors.insert(connector.id.clone(), connector);
        }
        debug!("registered unit {unit} with {} connectors", decls.len());
        self.units.insert(unit, ids);
        Ok(())
    }

    /// Removes a unit, its connectors, and every wire touching them.
    ///
    /// Connectors on other units keep whatever kinds they were narrowed to.
    ///
    /// # Errors
    /// Returns [`TopologyError::UnknownUnit`] if the unit is not placed.
    pub fn remove_unit(&mut self, unit: &UnitId) -> Result<Vec<Wire>, TopologyError> {
        let Some(ids) = self.units.remove(unit) else {
            return Err(TopologyError::UnknownUnit(unit.clone()));
        };
        let doomed: Vec<Wire> = self
            .wires
            .iter()
            .filter(|w| &w.output.unit == unit || &w.input.unit == unit)
            .cloned()
            .collect();
        for wire in &doomed {
            self.remove_wire(wire);
        }
        for id in &ids {
            self.connectors.remove(id);
            self.links.remove(id);
        }
        self.groups.forget_unit(unit);
        debug!("removed unit {unit} and {} wires", doomed.len());
        Ok(doomed)
    }

    /// Whether `unit` is placed.
    #[must_use]
    pub fn contains_unit(&self, unit: &UnitId) -> bool {
        self.units.contains_key(unit)
    }

    /// Placed units in lexicographic order.
    pub fn units(&self) -> impl Iterator<Item = &UnitId> {
        self.units.keys()
    }

    /// Looks up a registered connector.
    #[must_use]
    pub fn connector(&self, id: &ConnectorId) -> Option<&Connector> {
        self.connectors.get(id)
    }

    /// Connectors of `unit` in declaration order.
    pub fn unit_connectors<'a>(&'a self, unit: &UnitId) -> impl Iterator<Item = &'a Connector> {
        self.units
            .get(unit)
            .into_iter()
            .flatten()
            .filter_map(|id| self.connectors.get(id))
    }

    /// Every registered connector, in no particular order.
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    /// Wires in `(output, input)` order.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter()
    }

    /// Number of wires.
    #[must_use]
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Wires leaving `output`.
    pub fn wires_from<'a>(&'a self, output: &'a ConnectorId) -> impl Iterator<Item = &'a Wire> {
        self.wires.iter().filter(move |w| &w.output == output)
    }

    /// The wire feeding `input`, if any.
    #[must_use]
    pub fn wire_into(&self, input: &ConnectorId) -> Option<&Wire> {
        self.wires.iter().find(|w| &w.input == input)
    }

    /// Whether `wire` exists.
    #[must_use]
    pub fn has_wire(&self, wire: &Wire) -> bool {
        self.wires.contains(wire)
    }

    /// Connectors sharing a wire with `id`, in either direction.
    pub fn linked<'a>(&'a self, id: &ConnectorId) -> impl Iterator<Item = &'a ConnectorId> {
        self.links.get(id).into_iter().flatten()
    }

    /// Other members of the group `id` belongs to.
    pub fn aliases<'a>(&'a self, id: &'a ConnectorId) -> impl Iterator<Item = &'a ConnectorId> {
        self.groups.aliases(id)
    }

    /// Group membership of `id`, if it is grouped.
    #[must_use]
    pub fn group_of(&self, id: &ConnectorId) -> Option<&GroupKey> {
        self.groups.group_of(id)
    }

    /// Checks the structural rules for a new wire without touching types.
    ///
    /// # Errors
    /// Returns the first rule the wire would break.
    pub fn check_wire(&self, output: &ConnectorId, input: &ConnectorId) -> Result<(), ConnectError> {
        let out = self
            .connectors
            .get(output)
            .ok_or_else(|| ConnectError::UnknownConnector(output.clone()))?;
        let inp = self
            .connectors
            .get(input)
            .ok_or_else(|| ConnectError::UnknownConnector(input.clone()))?;
        if out.direction != Direction::Output || inp.direction != Direction::Input {
            return Err(ConnectError::DirectionMismatch {
                output: output.clone(),
                input: input.clone(),
            });
        }
        if let Some(existing) = self.wire_into(input) {
            if &existing.output == output {
                return Err(ConnectError::AlreadyWired {
                    output: output.clone(),
                    input: input.clone(),
                });
            }
            return Err(ConnectError::InputOccupied {
                input: input.clone(),
                existing: existing.output.clone(),
            });
        }
        Ok(())
    }

    /// Inserts a wire without any validation.
    pub(crate) fn insert_wire(&mut self, wire: Wire) {
        self.links
            .entry(wire.output.clone())
            .or_default()
            .insert(wire.input.clone());
        self.links
            .entry(wire.input.clone())
            .or_default()
            .insert(wire.output.clone());
        self.wires.insert(wire);
    }

    /// Removes a wire, returning whether it existed.
    pub(crate) fn remove_wire(&mut self, wire: &Wire) -> bool {
        if !self.wires.remove(wire) {
            return false;
        }
        // Only one wire may join a given pair, so the link goes with it.
        if let Some(set) = self.links.get_mut(&wire.output) {
            set.remove(&wire.input);
        }
        if let Some(set) = self.links.get_mut(&wire.input) {
            set.remove(&wire.output);
        }
        true
    }

    pub(crate) fn set_available(&mut self, id: &ConnectorId, kinds: KindSet) {
        if let Some(connector) = self.connectors.get_mut(id) {
            debug_assert!(kinds.is_subset(connector.declared));
            connector.available = kinds;
        }
    }
}
