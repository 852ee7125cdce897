//! Bounded worker pool around [`TransformPipeline`].
//!
//! Each request waits for a permit, then runs the synchronous pipeline on the
//! blocking thread pool. The permit is held until the run finishes, so at most
//! `processing.parallel_workers` decodes are in memory at once. Runs are never
//! cancelled once started.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{IdPhotoError, Result};
use crate::pipeline::TransformPipeline;
use crate::types::{ProcessRequest, ProcessedPhoto};

/// Async front door to the pipeline.
pub struct PhotoService {
    pipeline: Arc<TransformPipeline>,
    workers: Arc<Semaphore>,
    parallel: usize,
    sweeper: Option<JoinHandle<()>>,
}

impl PhotoService {
    pub fn new(pipeline: TransformPipeline, parallel_workers: usize) -> Self {
        let parallel = parallel_workers.max(1);
        Self {
            pipeline: Arc::new(pipeline),
            workers: Arc::new(Semaphore::new(parallel)),
            parallel,
            sweeper: None,
        }
    }

    /// Build the pipeline and pool from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline = TransformPipeline::new(config)?;
        Ok(Self::new(pipeline, config.processing.parallel_workers))
    }

    pub fn pipeline(&self) -> &Arc<TransformPipeline> {
        &self.pipeline
    }

    pub fn parallel_workers(&self) -> usize {
        self.parallel
    }

    /// Process one request on the pool.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessedPhoto> {
        run_on_pool(self.pipeline.clone(), self.workers.clone(), request).await
    }

    /// Sweep expired cache entries every `every`, starting one interval from
    /// now. Must be called from within a Tokio runtime. Replaces any previous
    /// sweeper.
    pub fn spawn_sweeper(&mut self, every: Duration) {
        if self.pipeline.cache().is_none() {
            return;
        }
        if let Some(previous) = self.sweeper.take() {
            previous.abort();
        }

        let pipeline = self.pipeline.clone();
        self.sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pipeline = pipeline.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || pipeline.sweep_cache()).await {
                    tracing::warn!("Cache sweeper task failed: {e}");
                }
            }
        }));
        tracing::debug!("Cache sweeper running every {:?}", every);
    }
}

impl Drop for PhotoService {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

async fn run_on_pool(
    pipeline: Arc<TransformPipeline>,
    workers: Arc<Semaphore>,
    request: ProcessRequest,
) -> Result<ProcessedPhoto> {
    let permit = workers
        .acquire_owned()
        .await
        .map_err(|_| IdPhotoError::Worker("worker pool closed".to_string()))?;

    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        pipeline.process_request(&request)
    })
    .await
    .map_err(|e| IdPhotoError::Worker(format!("worker task failed: {e}")))?;

    Ok(outcome?)
}
