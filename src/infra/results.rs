// ============================================================
// Layer 6 — Result Store
// ============================================================
// Persists the raw output logits and labels of the final
// "Testing" pass as two `.npy` arrays:
//
//   <dir>/output_experiment_NN_KEY.npy   f32 [samples, classes]
//   <dir>/labels_experiment_NN_KEY.npy   i64 [samples]
//
// KEY is the split number or the formatted final accuracy,
// depending on the `ResultNaming` the store was built with.
// Row i of the output array belongs to row i of the labels.

use anyhow::{ensure, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::experiment::{labels_file_name, output_file_name, ResultNaming};
use crate::infra::npy::NpyArray;

/// Paths of one persisted result pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFiles {
    pub outputs: PathBuf,
    pub labels:  PathBuf,
}

pub struct ResultStore {
    dir:        PathBuf,
    experiment: u32,
    naming:     ResultNaming,
}

impl ResultStore {
    pub fn new(dir: impl AsRef<Path>, experiment: u32, naming: ResultNaming) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create results dir '{}'", dir.display()))?;
        Ok(Self { dir, experiment, naming })
    }

    /// Where the pair for a run with final `accuracy` goes
    pub fn files_for(&self, accuracy: f64) -> ResultFiles {
        let key = self.naming.key(accuracy);
        ResultFiles {
            outputs: self.dir.join(output_file_name(self.experiment, &key)),
            labels:  self.dir.join(labels_file_name(self.experiment, &key)),
        }
    }

    /// Write both arrays. The leading dimensions must agree.
    pub fn save(
        &self,
        outputs:  &NpyArray<f32>,
        labels:   &NpyArray<i64>,
        accuracy: f64,
    ) -> Result<ResultFiles> {
        ensure!(
            outputs.rows() == labels.rows(),
            "{} output rows but {} labels",
            outputs.rows(),
            labels.rows()
        );
        let files = self.files_for(accuracy);
        outputs.write(&files.outputs)?;
        labels.write(&files.labels)?;
        tracing::info!(
            "Saved {} test outputs to '{}' and labels to '{}'",
            outputs.rows(),
            files.outputs.display(),
            files.labels.display()
        );
        Ok(files)
    }
}
