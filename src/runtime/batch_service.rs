use std::sync::Arc;

use crate::analysis::{
    BatchPlan, BatchReport, CancelToken, CollisionPolicy, ProgressObserver, plan_batch,
    process_all,
};
use crate::formats::{DefaultImageReader, ImageReader};
use crate::model::ThresholdConfig;
use crate::table::Dataset;

use super::Result;

#[derive(Clone)]
pub struct BatchService {
    reader: Arc<dyn ImageReader>,
}

impl std::fmt::Debug for BatchService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("BatchService").finish_non_exhaustive()
    }
}

impl Default for BatchService {
    fn default() -> Self {
        Self::new(Arc::new(DefaultImageReader))
    }
}

impl BatchService {
    pub fn new(reader: Arc<dyn ImageReader>) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> Arc<dyn ImageReader> {
        Arc::clone(&self.reader)
    }

    pub fn plan(
        &self,
        dataset: &Dataset,
        threshold: &ThresholdConfig,
        policy: Option<&CollisionPolicy>,
    ) -> Result<BatchPlan> {
        Ok(plan_batch(dataset, threshold, policy)?)
    }

    /// Runs the whole batch on the calling thread.
    pub fn run(
        &self,
        dataset: &mut Dataset,
        threshold: &ThresholdConfig,
        policy: Option<&CollisionPolicy>,
        progress: &dyn ProgressObserver,
        cancel: &CancelToken,
    ) -> Result<BatchReport> {
        Ok(process_all(
            dataset,
            threshold,
            policy,
            self.reader.as_ref(),
            progress,
            cancel,
        )?)
    }
}
