/// Reading analysis utilities for the flood monitoring service.
///
/// Reduces raw environmental readings into the windowed summaries that the
/// prediction generator consumes. Anything heavier than summary statistics
/// is left to external tooling that reads the stored predictions.
///
/// Submodules:
/// - `aggregation`: per-parameter window statistics and recent-value sums.

pub mod aggregation;
