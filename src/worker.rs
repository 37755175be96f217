use crate::backend::CaptureBackend;
use crate::flags::SharedState;
use crate::frame::FrameProducer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Log an acquisition failure on the first occurrence and then once per
/// this many failures, so a permanently dead sensor does not flood the log.
const ACQUIRE_WARN_INTERVAL: u64 = 300;

/// The capture worker runs on a dedicated thread.
///
/// It owns the background frame for the lifetime of the thread and hands
/// it back (via the thread's return value) when the loop exits, so the
/// controller regains buffer ownership after a join.
pub(crate) struct CaptureWorker<B: CaptureBackend> {
    backend: Arc<B>,
    shared: Arc<SharedState>,
    producer: FrameProducer,
    frame_counter: u64,
}

impl<B: CaptureBackend> CaptureWorker<B> {
    pub fn new(backend: Arc<B>, shared: Arc<SharedState>, producer: FrameProducer) -> Self {
        CaptureWorker {
            backend,
            shared,
            producer,
            frame_counter: 0,
        }
    }

    /// Capture loop: acquire, process into the background frame, publish.
    /// Runs until the running flag is cleared; the flag is checked once
    /// per full iteration, so a blocking acquire or reconstruct delays
    /// shutdown but never wedges it.
    pub fn run(mut self) -> FrameProducer {
        if let Err(e) = self.backend.open_pipeline() {
            log::error!("capture pipeline failed to open: {}", e);
            self.shared.running.store(false, Ordering::Relaxed);
            return self.producer;
        }
        log::info!("capture pipeline opened");

        while self.shared.running.load(Ordering::Relaxed) {
            self.iterate();
        }

        log::info!("capture loop stopped after {} frames", self.frame_counter);
        self.producer
    }

    /// One acquire-process-publish iteration.
    pub fn iterate(&mut self) {
        let sample = match self.backend.acquire_sample() {
            Ok(sample) => sample,
            Err(e) => {
                // Transient by definition; retry next iteration and keep
                // a counter so a dead sensor is at least observable.
                let failures = self.shared.acquire_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures == 1 || failures % ACQUIRE_WARN_INTERVAL == 0 {
                    log::warn!("frame acquisition failed ({} total): {}", failures, e);
                }
                return;
            }
        };

        // One consistent view of the capability flags for this frame.
        let flags = self.shared.snapshot();

        self.frame_counter += 1;
        let frame = self.producer.background_mut();
        frame.number = self.frame_counter;

        if flags.color_streaming {
            if let Some(image) = &sample.color {
                frame.color.clear();
                frame.color.extend_from_slice(&image.data);
            }
        }

        if flags.depth_streaming {
            if let Some(image) = &sample.depth {
                frame.depth.clear();
                frame.depth.extend_from_slice(&image.data);
            }
        }

        if flags.scan_enabled {
            self.apply_scan_requests();
            self.update_scan_preview();
            self.run_pending_reconstruct();
        }

        if flags.tracking_enabled {
            self.update_tracking();
        }

        drop(sample);

        self.producer.publish();
    }

    /// Apply pending start/stop requests to the scanning configuration,
    /// clearing each request flag exactly once.
    fn apply_scan_requests(&mut self) {
        if self.shared.scan_start_requested.swap(false, Ordering::Relaxed) {
            match self.set_scan_start(true) {
                Ok(()) => log::info!("scan started"),
                Err(e) => log::error!("failed to start scan: {}", e),
            }
        }

        if self.shared.scan_stop_requested.swap(false, Ordering::Relaxed) {
            match self.set_scan_start(false) {
                Ok(()) => log::info!("scan stopped"),
                Err(e) => log::error!("failed to stop scan: {}", e),
            }
        }
    }

    fn set_scan_start(&self, start: bool) -> crate::Result<()> {
        let mut config = self.backend.scan_config()?;
        config.start = start;
        self.backend.set_scan_config(config)
    }

    /// Pull the latest preview image into the background frame. The
    /// scanning module may change the preview dimensions at any time; the
    /// new size travels with the frame, so the other buffers pick it up as
    /// they rotate through the producer. This is the only resize path
    /// allowed from the capture thread.
    fn update_scan_preview(&mut self) {
        let Some(preview) = self.backend.scan_preview() else {
            return;
        };
        let frame = self.producer.background_mut();
        if frame.scan_size != (preview.width, preview.height) {
            log::info!(
                "scan preview resized to {}x{}",
                preview.width,
                preview.height
            );
            frame.scan_size = (preview.width, preview.height);
        }
        frame.scan_preview.clear();
        frame.scan_preview.extend_from_slice(&preview.data);
    }

    /// Run one queued reconstruction synchronously. Completion is
    /// signalled through the scan_completed flag; failures are recorded
    /// for the controller to pick up.
    fn run_pending_reconstruct(&mut self) {
        let Ok(request) = self.shared.scan_requests_rx.try_recv() else {
            return;
        };
        match self.backend.reconstruct(request.format, &request.path) {
            Ok(()) => {
                self.shared.scan_completed.store(true, Ordering::Relaxed);
                log::info!("scan reconstructed to {}", request.path.display());
            }
            Err(e) => self.shared.set_scan_error(e.to_string()),
        }
    }

    fn update_tracking(&mut self) {
        let Some(update) = self.backend.update_tracking() else {
            return;
        };
        let frame = self.producer.background_mut();
        frame.head_count = update.face_count;
        if update.face_count > 0 {
            // Absent pose data leaves the previous values in place.
            if let Some(pose) = update.pose {
                frame.head_position = pose.position;
                frame.head_rotation = pose.rotation;
            }
            if let Some(expression) = update.expression {
                frame.expression = expression;
            }
        }
    }
}
