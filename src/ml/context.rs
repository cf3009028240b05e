// ============================================================
// Layer 5 — Compute Context
// ============================================================
// Carries the two settings an epoch runner applies on entry:
//
//   device placement — where the network and batches live
//   execution mode   — training (autodiff, dropout active) or
//                      inference (no autodiff, dropout off)
//
// In Burn the mode is also a type-level fact: a training
// context is built over an `AutodiffBackend`, and switching to
// inference yields a context over its inner backend together
// with the `valid()` copy of the network.

use burn::{
    module::AutodiffModule,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::Batch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Training,
    Inference,
}

#[derive(Debug, Clone)]
pub struct ComputeContext<B: Backend> {
    device: B::Device,
    mode:   ExecutionMode,
}

impl<B: Backend> ComputeContext<B> {
    pub fn training(device: B::Device) -> Self {
        Self { device, mode: ExecutionMode::Training }
    }

    pub fn inference(device: B::Device) -> Self {
        Self { device, mode: ExecutionMode::Inference }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Move a network onto this context's device
    pub fn place_model<M: Module<B>>(&self, model: M) -> M {
        model.fork(&self.device)
    }

    /// Move a batch onto this context's device. A no-op when the
    /// batcher already created it there.
    pub fn place_batch(&self, batch: Batch<B>) -> Batch<B> {
        batch.to_device(&self.device)
    }
}

impl<B: AutodiffBackend> ComputeContext<B> {
    /// Same device, inference mode, autodiff stripped.
    pub fn to_inference(&self) -> ComputeContext<B::InnerBackend> {
        ComputeContext::inference(self.device.clone())
    }

    /// Inference copy of a trained network (dropout disabled, no graph).
    pub fn enter_inference<M: AutodiffModule<B>>(&self, model: &M) -> M::InnerModule {
        model.valid()
    }
}
