//! Shared defaults for driving a circuit.

/// Seconds per tick when neither a fixed step nor frame time is available.
pub const DEFAULT_TICK_SECONDS: f32 = 1.0 / 60.0;

/// Ticks run by the command-line driver unless `--ticks` is given.
pub const DEFAULT_TICKS: u64 = 1;
