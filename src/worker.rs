//! Shared controller for async hosts
//!
//! Pointer-up (final stamps, diffusion and the history snapshot) runs on the
//! blocking pool so the caller's event loop stays responsive. The controller
//! sits behind one mutex, so a new stroke or an undo simply waits for the
//! pending diffusion to finish.

use parking_lot::{Mutex, MutexGuard};
use std::path::PathBuf;
use std::sync::Arc;

use crate::canvas::Rect;
use crate::controller::{StrokeController, StrokeOutcome};
use crate::error::{InkError, InkResult};

#[derive(Clone)]
pub struct SharedController {
    inner: Arc<Mutex<StrokeController>>,
}

impl SharedController {
    pub fn new(controller: StrokeController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Exclusive access; blocks while a diffusion pass holds the lock
    pub fn lock(&self) -> MutexGuard<'_, StrokeController> {
        self.inner.lock()
    }

    pub fn pointer_down(&self, x: f32, y: f32, timestamp_ms: u64) -> Option<Rect> {
        self.inner.lock().pointer_down(x, y, timestamp_ms)
    }

    pub fn pointer_move(&self, x: f32, y: f32, timestamp_ms: u64) -> Option<Rect> {
        self.inner.lock().pointer_move(x, y, timestamp_ms)
    }

    pub async fn pointer_up(
        &self,
        x: f32,
        y: f32,
        timestamp_ms: u64,
    ) -> InkResult<Option<StrokeOutcome>> {
        self.run_blocking(move |c| c.pointer_up(x, y, timestamp_ms)).await
    }

    pub async fn undo(&self) -> InkResult<bool> {
        self.run_blocking(|c| c.undo()).await
    }

    pub async fn redo(&self) -> InkResult<bool> {
        self.run_blocking(|c| c.redo()).await
    }

    pub async fn load_image_file(&self, path: PathBuf) -> InkResult<()> {
        self.run_blocking(move |c| c.load_image_file(&path)).await?
    }

    pub async fn save_to_path(&self, path: PathBuf) -> InkResult<()> {
        self.run_blocking(move |c| c.save_to_path(&path)).await?
    }

    async fn run_blocking<R, F>(&self, f: F) -> InkResult<R>
    where
        F: FnOnce(&mut StrokeController) -> R + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut controller = inner.lock();
            f(&mut controller)
        })
        .await
        .map_err(|e| {
            tracing::error!("Controller task failed: {}", e);
            InkError::Worker(e.to_string())
        })
    }
}
