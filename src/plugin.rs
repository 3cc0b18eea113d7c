//! Bevy plugin ticking a [`Circuit`] once per frame.
//!
//! Systems queue edits in the [`EditInbox`]; the plugin applies them before
//! each tick and reports failures through [`CircuitSyncError`] events.

use bevy::ecs::prelude::On;
use bevy::prelude::*;
use log::error;
use thiserror::Error;

use crate::circuit::{Circuit, CircuitEdit, TickReport};
use crate::constants::DEFAULT_TICK_SECONDS;

/// Context carried by [`CircuitSyncError`] events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitSyncErrorContext {
    /// A queued edit was rejected.
    Edit,
    /// The tick pass failed.
    Tick,
}

/// Event raised when the circuit rejects an edit or fails a tick.
#[derive(Event, Debug, Clone, Error)]
#[error("{context:?}: {detail}")]
pub struct CircuitSyncError {
    /// Where the failure occurred.
    pub context: CircuitSyncErrorContext,
    /// Description of the underlying error.
    pub detail: String,
}

impl CircuitSyncError {
    /// Builds an event for `context`.
    pub fn new(context: CircuitSyncErrorContext, detail: impl Into<String>) -> Self {
        Self {
            context,
            detail: detail.into(),
        }
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value for Events V2."
)]
fn log_circuit_error(event: On<CircuitSyncError>) {
    let CircuitSyncError { context, detail } = event.event();
    error!("circuit error during {context:?}: {detail}");
}

/// The simulated circuit and the outcome of its latest tick.
#[derive(Resource, Default)]
pub struct CircuitState {
    /// The simulated circuit.
    pub circuit: Circuit,
    /// Outcome of the latest successful tick, cleared on failure.
    pub last_report: Option<TickReport>,
}

impl CircuitState {
    /// Wraps an existing circuit.
    #[must_use]
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuit,
            last_report: None,
        }
    }
}

/// Tick pacing.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub struct CircuitSettings {
    /// Seconds passed to each tick; frame time is used when `None`.
    pub fixed_dt: Option<f32>,
    /// Skip ticking while set.
    pub paused: bool,
}

/// Edits awaiting the next tick.
#[derive(Resource, Default)]
pub struct EditInbox {
    edits: Vec<CircuitEdit>,
}

impl EditInbox {
    /// Queues one edit.
    pub fn push(&mut self, edit: CircuitEdit) {
        self.edits.push(edit);
    }

    /// Queues several edits in order.
    pub fn extend<I>(&mut self, edits: I)
    where
        I: IntoIterator<Item = CircuitEdit>,
    {
        self.edits.extend(edits);
    }

    /// Removes and yields every queued edit.
    pub fn drain(&mut self) -> std::vec::Drain<'_, CircuitEdit> {
        self.edits.drain(..)
    }

    /// Number of queued edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Moves inbox edits into the circuit's queue.
pub fn apply_edit_inbox_system(mut inbox: ResMut<EditInbox>, mut state: ResMut<CircuitState>) {
    if inbox.is_empty() {
        return;
    }
    for edit in inbox.drain() {
        state.circuit.queue_edit(edit);
    }
}

/// Runs one tick and reports rejected edits or failures.
pub fn evaluate_circuit_system(
    mut state: ResMut<CircuitState>,
    settings: Res<CircuitSettings>,
    time: Option<Res<Time>>,
    mut commands: Commands,
) {
    if settings.paused {
        return;
    }
    let dt = settings
        .fixed_dt
        .or_else(|| time.map(|t| t.delta_secs()))
        .unwrap_or(DEFAULT_TICK_SECONDS);

    match state.circuit.evaluate_tick(dt) {
        Ok(report) => {
            for rejected in &report.rejected_edits {
                commands.trigger(CircuitSyncError::new(
                    CircuitSyncErrorContext::Edit,
                    format!("{}: {}", rejected.edit, rejected.error),
                ));
            }
            state.last_report = Some(report);
        }
        Err(e) => {
            commands.trigger(CircuitSyncError::new(
                CircuitSyncErrorContext::Tick,
                e.to_string(),
            ));
            state.last_report = None;
        }
    }
}

/// Installs circuit resources and the per-frame tick.
#[derive(Default)]
pub struct CircuitPlugin;

impl Plugin for CircuitPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(log_circuit_error);
        app.init_resource::<CircuitState>();
        app.init_resource::<CircuitSettings>();
        app.init_resource::<EditInbox>();
        app.add_systems(
            Update,
            (apply_edit_inbox_system, evaluate_circuit_system).chain(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Constant;
    use rstest::rstest;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(CircuitPlugin);
        app
    }

    #[rstest]
    fn plugin_initialises_resources() {
        let app = app();
        assert!(app.world().contains_resource::<CircuitState>());
        assert!(app.world().contains_resource::<CircuitSettings>());
        assert!(app.world().contains_resource::<EditInbox>());
    }

    #[rstest]
    fn inbox_edits_reach_the_circuit() {
        let mut app = app();
        app.world_mut()
            .resource_mut::<EditInbox>()
            .push(CircuitEdit::AddUnit {
                id: "k".into(),
                unit: Box::new(Constant::new(true)),
            });
        app.update();

        assert!(app.world().resource::<EditInbox>().is_empty());
        let state = app.world().resource::<CircuitState>();
        assert_eq!(state.circuit.tick_count(), 1);
        assert_eq!(state.last_report.as_ref().map(|r| r.evaluated), Some(1));
    }

    #[rstest]
    fn paused_circuit_does_not_tick() {
        let mut app = app();
        app.world_mut().resource_mut::<CircuitSettings>().paused = true;
        app.update();
        assert_eq!(app.world().resource::<CircuitState>().circuit.tick_count(), 0);
    }

    #[rstest]
    fn inbox_helpers_track_length() {
        let mut inbox = EditInbox::default();
        assert!(inbox.is_empty());
        inbox.extend([
            CircuitEdit::RemoveUnit("a".into()),
            CircuitEdit::RemoveUnit("b".into()),
        ]);
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.drain().count(), 2);
        assert!(inbox.is_empty());
    }
}
