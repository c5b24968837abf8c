//! Background prefetch thread.
//!
//! One long-lived thread receives prefetch passes over a channel. Each pass
//! carries the generation it was submitted under; the thread compares it with
//! the shared generation before every image and abandons the pass as soon as a
//! newer one has been submitted. An image already being decoded finishes and
//! is cached.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{PreloadError, Shared};
use crate::constants::PREFETCH_YIELD_MILLIS;

/// One window of images to warm.
pub(super) struct PrefetchPass {
    /// Generation this pass belongs to
    pub generation: u64,
    /// Dataset type, for logging
    pub dataset_type: String,
    /// Index the window is centered on, for logging
    pub center_index: usize,
    /// Uncached paths, in load order
    pub paths: Vec<PathBuf>,
}

/// Message sent to the prefetch thread.
enum WorkerMessage {
    /// Warm a window
    Prefetch(PrefetchPass),
    /// Stop the thread
    Shutdown,
}

/// Handle to the prefetch thread.
pub(super) struct PrefetchWorker {
    request_tx: Sender<WorkerMessage>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PrefetchWorker {
    /// Spawn the prefetch thread.
    pub fn spawn(shared: Arc<Shared>) -> Result<Self, PreloadError> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();

        let thread_handle = thread::Builder::new()
            .name("image-prefetch".to_string())
            .spawn(move || {
                log::info!("Prefetch thread started");
                thread_loop(&shared, request_rx);
                log::info!("Prefetch thread exiting");
            })
            .map_err(|source| PreloadError::Spawn { source })?;

        Ok(Self {
            request_tx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Queue a pass. Fails only if the thread has stopped.
    pub fn submit(&self, pass: PrefetchPass) -> Result<(), PreloadError> {
        if self.thread_handle.is_none() {
            return Err(PreloadError::WorkerStopped);
        }
        self.request_tx
            .send(WorkerMessage::Prefetch(pass))
            .map_err(|_| PreloadError::WorkerStopped)
    }

    /// Check if the thread is still accepting passes.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the thread and wait for it to exit. Idempotent.
    ///
    /// The caller is expected to have bumped the generation first so a pass
    /// in progress stops at the next image.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        log::debug!("Shutting down prefetch thread");
        let _ = self.request_tx.send(WorkerMessage::Shutdown);
        if let Err(e) = handle.join() {
            log::warn!("Prefetch thread panicked: {:?}", e);
        }
    }
}

impl Drop for PrefetchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn thread_loop(shared: &Shared, request_rx: Receiver<WorkerMessage>) {
    let mut total_loaded = 0;
    loop {
        match request_rx.recv() {
            Ok(WorkerMessage::Prefetch(pass)) => total_loaded += run_pass(shared, pass),
            Ok(WorkerMessage::Shutdown) => {
                log::debug!("Received shutdown signal");
                break;
            }
            Err(_) => {
                log::debug!("Request channel closed, prefetch thread exiting");
                break;
            }
        }
    }
    log::debug!("Prefetched {} images in total", total_loaded);
}

/// Load the pass's images until it is superseded. Returns the number loaded.
fn run_pass(shared: &Shared, pass: PrefetchPass) -> usize {
    let mut loaded = 0;

    for path in &pass.paths {
        if shared.generation.load(Ordering::Acquire) != pass.generation {
            log::debug!(
                "Prefetch for '{}' at {} superseded after {} loads",
                pass.dataset_type,
                pass.center_index,
                loaded
            );
            return loaded;
        }

        if shared.contains(path) {
            continue;
        }

        match shared.load_and_cache(path, shared.codec.max_dimension) {
            Ok(_) => loaded += 1,
            Err(e) => log::warn!("Prefetch skipped {:?}: {}", path, e),
        }

        thread::yield_now();
        thread::sleep(Duration::from_millis(PREFETCH_YIELD_MILLIS));
    }

    log::debug!(
        "Prefetch for '{}' at {} done: {} of {} loaded",
        pass.dataset_type,
        pass.center_index,
        loaded,
        pass.paths.len()
    );
    loaded
}
