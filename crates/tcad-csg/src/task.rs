//! Cancellable merge running on a worker thread

use std::sync::Arc;
use std::thread::JoinHandle;

use tcad_core::MeshData;

use crate::kernel::{BooleanKernel, CsgError, CsgResult};
use crate::merger::{CancelToken, MergeInput, MeshMerger};

/// Handle to a merge running off the interactive thread
///
/// Dropping the handle cancels the merge and detaches the worker.
pub struct MergeTask {
    cancel: CancelToken,
    handle: Option<JoinHandle<CsgResult<MeshData>>>,
}

impl MergeTask {
    /// Start merging `inputs` on a new worker thread
    pub fn spawn<K>(merger: Arc<MeshMerger<K>>, inputs: Vec<MergeInput>) -> CsgResult<Self>
    where
        K: BooleanKernel + 'static,
    {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name("tcad-merge".to_string())
            .spawn(move || merger.merge(&inputs, &worker_cancel))
            .map_err(|e| CsgError::Worker(e.to_string()))?;

        tracing::debug!("Spawned merge worker");
        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    /// Request cancellation; the worker stops at its next checkpoint
    pub fn cancel(&self) {
        tracing::info!("Cancelling merge");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check whether the worker has produced its result
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Block until the worker finishes and return its result
    pub fn wait(mut self) -> CsgResult<MeshData> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| CsgError::Worker("merge already collected".to_string()))?;
        let result = handle
            .join()
            .map_err(|_| CsgError::Worker("merge worker panicked".to_string()))?;
        // A cancel that lands after the last checkpoint still discards the result
        if self.cancel.is_cancelled() {
            return Err(CsgError::Cancelled);
        }
        result
    }
}

impl Drop for MergeTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}
