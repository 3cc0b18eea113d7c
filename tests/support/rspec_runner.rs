//! Runs rspec suites one example at a time.

use rspec::{block::Suite, ConfigurationBuilder, Logger, Runner};
use std::sync::Arc;

/// Runs `suite` serially, so examples sharing one environment observe each
/// other's changes in declaration order. A failing example fails the test
/// binary.
pub fn run_in_order<T>(suite: &Suite<T>)
where
    T: Clone + Send + Sync + std::fmt::Debug,
{
    let config = ConfigurationBuilder::default()
        .parallel(false)
        .exit_on_failure(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid rspec configuration: {e}"));
    let logger = Arc::new(Logger::new(std::io::stdout()));
    Runner::new(config, vec![logger]).run(suite);
}
