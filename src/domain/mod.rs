// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe an experiment run:
// which inputs a dataset yields, how the run's files are
// named, and how accuracy is accumulated over an epoch.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and functions

// Single vs. dual input streams
pub mod modality;

// Dataset kind and output file naming
pub mod experiment;

// Running correct/total and loss accumulation
pub mod metrics;
