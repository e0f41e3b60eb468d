//! # Capture tasks.
//!
//! A [`CaptureTask`] owns one [`CaptureDevice`] and polls it on a fixed
//! interval, handing every chunk it reads to the device's processing stage.
//!
//! ```text
//! start():  device.initialize() ─► device.start_capture() ─► spawn loop
//! loop:     every interval: read() ─► Some(chunk) ─► process(&chunk)
//! exit:     device.stop_capture() ─► device.shutdown()
//! ```
//!
//! Device calls are synchronous and expected to be short; the device lock
//! is never held across an await point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::mailbox::TaskIdentity;

use super::task::Task;
use super::worker::Worker;

/// Progress is logged once per this many processed chunks.
const PROGRESS_EVERY: u64 = 1000;

/// A capture source (microphone, camera sensor, ...).
pub trait CaptureDevice: Send + 'static {
    /// Opens the device; failure aborts the task start.
    fn initialize(&mut self) -> Result<(), String>;

    fn start_capture(&mut self) -> Result<(), String>;

    /// Returns the next chunk if one is ready.
    fn read(&mut self) -> Option<Vec<u8>>;

    fn process(&mut self, chunk: &[u8]);

    fn stop_capture(&mut self);

    /// Releases the device.
    fn shutdown(&mut self);
}

type SharedDevice = Arc<Mutex<Box<dyn CaptureDevice>>>;

fn lock(device: &SharedDevice) -> MutexGuard<'_, Box<dyn CaptureDevice>> {
    device.lock().unwrap_or_else(|p| p.into_inner())
}

/// Polls a [`CaptureDevice`] on its own worker.
pub struct CaptureTask {
    identity: TaskIdentity,
    device: SharedDevice,
    interval: Duration,
    worker: Worker,
}

impl CaptureTask {
    pub fn new(identity: TaskIdentity, device: impl CaptureDevice, interval: Duration) -> Self {
        let worker = Worker::new(identity.name().to_string());
        let device: Box<dyn CaptureDevice> = Box::new(device);
        Self {
            identity,
            device: Arc::new(Mutex::new(device)),
            interval,
            worker,
        }
    }
}

#[async_trait]
impl Task for CaptureTask {
    fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    async fn start(&self) -> Result<(), TaskError> {
        if self.worker.is_running() {
            return Ok(());
        }
        {
            let mut device = lock(&self.device);
            device.initialize().map_err(TaskError::start)?;
            if let Err(e) = device.start_capture() {
                device.shutdown();
                return Err(TaskError::start(e));
            }
        }

        let device = Arc::clone(&self.device);
        let interval = self.interval;
        let name = self.identity.name().to_string();
        self.worker.spawn(move |token| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut processed: u64 = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let mut dev = lock(&device);
                if let Some(chunk) = dev.read() {
                    dev.process(&chunk);
                    processed += 1;
                    if processed % PROGRESS_EVERY == 0 {
                        debug!(task = %name, processed, "capture progress");
                    }
                }
            }
            let mut dev = lock(&device);
            dev.stop_capture();
            dev.shutdown();
            info!(task = %name, processed, "capture stopped");
        });
        info!(task = %self.identity, interval = ?self.interval, "task started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), TaskError> {
        self.worker.shutdown().await.inspect_err(|e| {
            warn!(task = %self.identity, error = %e, "capture worker ended abnormally");
        })
    }
}

/// Synthetic device producing fixed-size chunks; stands in for real hardware.
pub struct SimulatedDevice {
    kind: &'static str,
    chunk_size: usize,
    fail_init: bool,
    capturing: bool,
    sequence: u8,
    processed: Arc<AtomicU64>,
}

impl SimulatedDevice {
    pub fn new(kind: &'static str, chunk_size: usize) -> Self {
        Self {
            kind,
            chunk_size,
            fail_init: false,
            capturing: false,
            sequence: 0,
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 20 ms of 8 kHz 16-bit mono samples per chunk.
    pub fn audio() -> Self {
        Self::new("audio", 320)
    }

    /// One 320x240 greyscale frame per chunk.
    pub fn video() -> Self {
        Self::new("video", 320 * 240)
    }

    /// A device whose `initialize()` always fails.
    pub fn unavailable(kind: &'static str) -> Self {
        Self {
            fail_init: true,
            ..Self::new(kind, 0)
        }
    }

    /// Counter of chunks processed so far.
    pub fn processed(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.processed)
    }
}

impl CaptureDevice for SimulatedDevice {
    fn initialize(&mut self) -> Result<(), String> {
        if self.fail_init {
            return Err(format!("{} device not available", self.kind));
        }
        debug!(device = self.kind, "device initialized");
        Ok(())
    }

    fn start_capture(&mut self) -> Result<(), String> {
        self.capturing = true;
        Ok(())
    }

    fn read(&mut self) -> Option<Vec<u8>> {
        if !self.capturing {
            return None;
        }
        self.sequence = self.sequence.wrapping_add(1);
        Some(vec![self.sequence; self.chunk_size])
    }

    fn process(&mut self, _chunk: &[u8]) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn stop_capture(&mut self) {
        self.capturing = false;
    }

    fn shutdown(&mut self) {
        debug!(device = self.kind, "device released");
    }
}
