pub mod batch;
pub mod export;
pub mod reconcile;
pub mod runner;
pub mod tracker;

pub use batch::TelemetryBatch;
pub use runner::{AggregateError, Aggregator};
