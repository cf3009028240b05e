// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From preprocessed arrays on disk to device-ready batches:
//
//   *.npy arrays
//       │
//       ▼
//   ActionDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ActionBatcher      → stacks samples into a tagged `Batch`
//       │
//       ▼
//   DataLoader         → feeds batches to the epoch runners
//
// `DatasetProvider` is the seam the orchestrator consumes.

/// Samples and Burn's Dataset implementation
pub mod dataset;

/// `Batch` variants and Burn's Batcher implementation
pub mod batcher;

/// Dataset provider trait and the `.npy`-backed provider
pub mod provider;

/// Seeded train/validation split
pub mod splitter;
