/// Command-line arguments
pub mod args;
/// Errors and warnings
pub mod error;
/// Partition summaries and their rendering
pub mod report;
/// Querying of Slurm state
pub mod slurm;
/// Byte string helpers
pub mod utilities;
