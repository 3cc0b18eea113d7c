//! Wire type narrowing.
//!
//! Every set of connectors joined by wires or by a shared group behaves like
//! one typed bus: narrowing the kinds of any member narrows every member.
//! [`connect`] validates a new wire, then propagates the narrowed kinds to a
//! fixpoint over wires and groups. The whole edit is staged first and only
//! committed when no connector would be left without a usable kind.
//!
//! Removing a wire never widens kinds back. A disconnected connector keeps
//! the kinds it was narrowed to until its unit is removed and placed again.

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashMap;
use log::debug;
use thiserror::Error;

use crate::kind::KindSet;
use crate::topology::{ConnectError, Connector, ConnectorId, GroupId, Topology, UnitId, Wire};

/// Identity of an alias group: the owning unit plus the group name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    /// Owning unit.
    pub unit: UnitId,
    /// Group name declared by the unit.
    pub group: GroupId,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.unit, self.group)
    }
}

/// Index of alias groups across all placed units.
#[derive(Debug, Clone, Default)]
pub struct Groups {
    members: HashMap<GroupKey, Vec<ConnectorId>>,
    membership: HashMap<ConnectorId, GroupKey>,
}

impl Groups {
    /// Links every connector sharing `(unit, group)` into one group.
    ///
    /// Connectors without a group id are ignored.
    pub fn group_markers(&mut self, connectors: &[Connector]) {
        for connector in connectors {
            let Some(group) = &connector.group else {
                continue;
            };
            let key = GroupKey {
                unit: connector.id.unit.clone(),
                group: group.clone(),
            };
            let members = self.members.entry(key.clone()).or_default();
            if !members.contains(&connector.id) {
                members.push(connector.id.clone());
            }
            self.membership.insert(connector.id.clone(), key);
        }
    }

    /// Other members of the group containing `id`.
    pub fn aliases<'a>(&'a self, id: &'a ConnectorId) -> impl Iterator<Item = &'a ConnectorId> {
        self.membership
            .get(id)
            .and_then(|key| self.members.get(key))
            .into_iter()
            .flatten()
            .filter(move |member| *member != id)
    }

    /// Group `id` belongs to, if any.
    #[must_use]
    pub fn group_of(&self, id: &ConnectorId) -> Option<&GroupKey> {
        self.membership.get(id)
    }

    /// Drops every group owned by `unit`.
    pub fn forget_unit(&mut self, unit: &UnitId) {
        self.members.retain(|key, _| &key.unit != unit);
        self.membership.retain(|id, _| &id.unit != unit);
    }
}

/// Wiring rejected because it would leave a connector with no kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct TypeMismatchError {
    /// Requested source.
    pub output: ConnectorId,
    /// Requested target.
    pub input: ConnectorId,
    /// Kinds available on `output` before the attempt.
    pub output_kinds: KindSet,
    /// Kinds available on `input` before the attempt.
    pub input_kinds: KindSet,
    /// Connector that propagation would have emptied, when the endpoints
    /// themselves were compatible.
    pub conflict: Option<ConnectorId>,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot wire {} {} to {} {}",
            self.output, self.output_kinds, self.input, self.input_kinds
        )?;
        if let Some(conflict) = &self.conflict {
            write!(f, ": {conflict} would be left with no value kind")?;
        }
        Ok(())
    }
}

/// Tentative kind assignments for one connect attempt.
struct Staging<'t> {
    topology: &'t Topology,
    pending: &'t Wire,
    staged: HashMap<ConnectorId, KindSet>,
    queue: VecDeque<ConnectorId>,
}

impl<'t> Staging<'t> {
    fn new(topology: &'t Topology, pending: &'t Wire) -> Self {
        Self {
            topology,
            pending,
            staged: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    fn current(&self, id: &ConnectorId) -> KindSet {
        self.staged.get(id).copied().unwrap_or_else(|| {
            self.topology
                .connector(id)
                .map_or(KindSet::EMPTY, |c| c.available)
        })
    }

    /// Narrows `id` by `kinds`; returns `Err(id)` if nothing would remain.
    fn narrow(&mut self, id: &ConnectorId, kinds: KindSet) -> Result<(), ConnectorId> {
        let current = self.current(id);
        let next = current.intersect(kinds);
        if next == current {
            return Ok(());
        }
        if next.is_empty() {
            return Err(id.clone());
        }
        self.staged.insert(id.clone(), next);
        self.queue.push_back(id.clone());
        Ok(())
    }

    /// Wire and group neighbours of `id`, counting the wire being added.
    fn neighbours(&self, id: &ConnectorId) -> Vec<ConnectorId> {
        let mut out: Vec<ConnectorId> = self
            .topology
            .aliases(id)
            .chain(self.topology.linked(id))
            .cloned()
            .collect();
        if id == &self.pending.output {
            out.push(self.pending.input.clone());
        } else if id == &self.pending.input {
            out.push(self.pending.output.clone());
        }
        out
    }

    fn run(&mut self) -> Result<(), ConnectorId> {
        while let Some(id) = self.queue.pop_front() {
            let kinds = self.current(&id);
            for neighbour in self.neighbours(&id) {
                self.narrow(&neighbour, kinds)?;
            }
        }
        Ok(())
    }
}

/// Wires `output` to `input`, narrowing kinds across the joined bus.
///
/// Returns the connectors whose available kinds changed, sorted.
///
/// # Errors
/// Returns [`ConnectError`] when the wire breaks a structural rule or when
/// the endpoints (or anything reachable from them) would be left with no
/// shared kind. Nothing changes on error.
pub fn connect(
    topology: &mut Topology,
    output: &ConnectorId,
    input: &ConnectorId,
) -> Result<Vec<ConnectorId>, ConnectError> {
    topology.check_wire(output, input)?;
    let wire = Wire::new(output.clone(), input.clone());

    let staged = {
        let mut staging = Staging::new(topology, &wire);
        let output_kinds = staging.current(output);
        let input_kinds = staging.current(input);
        let mismatch = |conflict| TypeMismatchError {
            output: output.clone(),
            input: input.clone(),
            output_kinds,
            input_kinds,
            conflict,
        };

        let shared = output_kinds.intersect(input_kinds);
        if shared.is_empty() {
            return Err(mismatch(None).into());
        }
        staging
            .narrow(output, shared)
            .and_then(|()| staging.narrow(input, shared))
            .and_then(|()| staging.run())
            .map_err(|conflict| mismatch(Some(conflict)))?;
        staging.staged
    };

    topology.insert_wire(wire);
    let mut changed: Vec<ConnectorId> = staged.keys().cloned().collect();
    changed.sort();
    for (id, kinds) in staged {
        topology.set_available(&id, kinds);
    }
    debug!(
        "wired {output} -> {input}; narrowed {} connectors",
        changed.len()
    );
    Ok(changed)
}

/// Removes the wire from `output` to `input`.
///
/// Available kinds are left as they are.
///
/// # Errors
/// Returns [`ConnectError::NotWired`] if no such wire exists.
pub fn disconnect(
    topology: &mut Topology,
    output: &ConnectorId,
    input: &ConnectorId,
) -> Result<(), ConnectError> {
    let wire = Wire::new(output.clone(), input.clone());
    if topology.remove_wire(&wire) {
        debug!("unwired {output} -> {input}");
        Ok(())
    } else {
        Err(ConnectError::NotWired {
            output: output.clone(),
            input: input.clone(),
        })
    }
}
