//! Batch processor: the debounced pipeline that stages inbound packets
//! into the game sandbox, runs the DOS-era binary, collects outbound
//! packets and nodelists, sweeps for sequence gaps, and closes out a
//! `ProcessingRun` row.

pub mod layout;
mod pipeline;
mod singleton;

pub use pipeline::BatchProcessor;
pub use singleton::SingletonGuard;
