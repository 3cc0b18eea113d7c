//! A unit that records when it is ticked.

use std::sync::{Arc, Mutex, PoisonError};

use blockwire::{ConnectorDecl, KindSet, LogicUnit, TickContext, UnitError};

/// Shared record of `unit@tick` entries in evaluation order.
#[derive(Clone, Debug, Default)]
pub struct TraceLog(Arc<Mutex<Vec<String>>>);

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Entries recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Unit names ticked during `tick`, in evaluation order.
    ///
    /// # Examples
    /// ```
    /// use test_utils::TraceLog;
    /// let log = TraceLog::new();
    /// assert!(log.order_at(0).is_empty());
    /// ```
    pub fn order_at(&self, tick: u64) -> Vec<String> {
        let suffix = format!("@{tick}");
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_suffix(&suffix).map(str::to_owned))
            .collect()
    }
}

/// Accepts any kind on `in`/`out`, writes nothing, and logs each tick.
#[derive(Debug)]
pub struct Tracer {
    log: TraceLog,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl Tracer {
    /// A tracer with one `in` and one `out` connector.
    pub fn new(log: &TraceLog) -> Self {
        Self::with_connectors(log, &["in"], &["out"])
    }

    /// A tracer with the given connector names.
    pub fn with_connectors(log: &TraceLog, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            log: log.clone(),
            inputs: inputs.iter().map(|s| (*s).to_owned()).collect(),
            outputs: outputs.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl LogicUnit for Tracer {
    fn kind(&self) -> &'static str {
        "tracer"
    }

    fn connectors(&self) -> Vec<ConnectorDecl> {
        self.inputs
            .iter()
            .map(|name| ConnectorDecl::input(name.clone(), KindSet::all()))
            .chain(
                self.outputs
                    .iter()
                    .map(|name| ConnectorDecl::output(name.clone(), KindSet::all())),
            )
            .collect()
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), UnitError> {
        self.log.push(format!("{}@{}", ctx.unit(), ctx.tick()));
        Ok(())
    }
}
