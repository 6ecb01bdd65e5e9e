//! Image Processor — the pipeline stage sitting between a parsed,
//! fingerprinted request and the rendered bytes: fetch source bytes
//! (via the source cache), hand them to the native image library on a
//! pinned worker, and return the encoded rendition.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::AppError;
use crate::params::Params;
use crate::queue::{WorkItem, WorkerQueue};
use crate::source_cache::SourceCache;
use crate::store::{ImageLibrary, NativeError, RenderTask, StoreError};

/// A unit of work submitted to the worker queue: source bytes already
/// resolved, ready for the native library to resize/transform/encode.
pub struct RenderJob {
    task: RenderTask,
}

impl WorkItem for RenderJob {
    type Output = Result<Vec<u8>, NativeError>;
}

pub struct ImageProcessor {
    source_cache: Arc<SourceCache>,
    queue: Arc<WorkerQueue<RenderJob>>,
}

impl ImageProcessor {
    pub fn new(
        worker_count: usize,
        source_cache: Arc<SourceCache>,
        library: Arc<dyn ImageLibrary>,
    ) -> Self {
        let queue = Arc::new(WorkerQueue::new(worker_count, move |job: RenderJob| {
            library.process(&job.task)
        }));
        Self {
            source_cache,
            queue,
        }
    }

    /// Resolve `params` to rendered bytes: fetch the source (synchronous
    /// blob-store call, cheap relative to rendering), submit a render job
    /// to the pinned worker pool, and race it against `cancel`.
    pub async fn render(
        &self,
        params: &Params,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<Bytes, AppError> {
        let source = self
            .source_cache
            .get(&params.id)
            .map_err(|e| match e {
                StoreError::NotFound(id) => {
                    AppError::Upstream(anyhow::anyhow!("source not found: {id}"))
                }
                StoreError::Io(e) => AppError::Upstream(e.into()),
            })?;

        let task = RenderTask::from_params(source, params);
        let job = RenderJob { task };

        let output = self.queue.process(job, cancel).await?;
        let bytes = output.map_err(|e| AppError::Upstream(e.into()))?;
        Ok(Bytes::from(bytes))
    }
}
