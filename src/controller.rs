use crate::backend::CaptureBackend;
use crate::error::DepthCamError;
use crate::flags::SharedState;
use crate::frame::{self, Frame, FrameConsumer, FrameProducer};
use crate::types::{
    CameraInfo, CameraModel, ColorResolution, DepthResolution, Feature, FieldOfView, MeshFormat,
    ReconstructRequest, ScanConfig, ScanMode, ScanVolume,
};
use crate::worker::CaptureWorker;
use crate::Result;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Main-thread facing API over the capture pipeline.
///
/// Owns the backend, translates feature and scan requests into shared-flag
/// mutations consumed by the capture thread, and performs the
/// foreground-buffer swap each tick. All methods are called from one
/// thread; `&mut self` enforces the single-consumer discipline.
pub struct Controller<B: CaptureBackend> {
    backend: Arc<B>,
    shared: Arc<SharedState>,
    consumer: FrameConsumer,
    /// Present exactly when the capture thread is not running.
    producer: Option<FrameProducer>,
    worker: Option<JoinHandle<FrameProducer>>,
    enabled: Feature,
    info: Option<CameraInfo>,
    color_fov: FieldOfView,
    depth_fov: FieldOfView,
}

impl<B: CaptureBackend> Controller<B> {
    /// Build a controller around a backend. Device identity and fields of
    /// view are queried once here; without a device the model reports
    /// `Other` and the FOVs are zero.
    pub fn new(backend: B) -> Controller<B> {
        let backend = Arc::new(backend);

        let info = backend.descriptor();
        match &info {
            Some(info) => log::info!(
                "depth camera attached: {:?} fw {} serial {}",
                info.model,
                info.firmware_string(),
                info.serial
            ),
            None => log::warn!("no supported depth camera attached"),
        }
        let color_fov = backend.color_fov();
        let depth_fov = backend.depth_fov();

        let (producer, consumer) = frame::triple(Frame::default());

        Controller {
            backend,
            shared: Arc::new(SharedState::new()),
            consumer,
            producer: Some(producer),
            worker: None,
            enabled: Feature::empty(),
            info,
            color_fov,
            depth_fov,
        }
    }

    /// The backend this controller was constructed with.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn camera_model(&self) -> CameraModel {
        self.info
            .as_ref()
            .map(|info| info.model)
            .unwrap_or(CameraModel::Other)
    }

    pub fn camera_firmware(&self) -> String {
        self.info
            .as_ref()
            .map(|info| info.firmware_string())
            .unwrap_or_default()
    }

    pub fn color_fov(&self) -> FieldOfView {
        self.color_fov
    }

    pub fn depth_fov(&self) -> FieldOfView {
        self.depth_fov
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn enabled_features(&self) -> Feature {
        self.enabled
    }

    /// Total failed frame acquisitions so far.
    pub fn acquire_failures(&self) -> u64 {
        self.shared.acquire_failures.load(Ordering::Relaxed)
    }

    /// Start the capture thread. No-op if it is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let Some(mut producer) = self.producer.take() else {
            return Ok(());
        };

        // Frame numbering restarts with the thread.
        producer.background_mut().number = 0;
        producer.with_mid(|frame| frame.number = 0);
        self.consumer.frame_mut().number = 0;

        self.shared.running.store(true, Ordering::Relaxed);
        let worker = CaptureWorker::new(self.backend.clone(), self.shared.clone(), producer);

        match std::thread::Builder::new()
            .name("depthcam-capture".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Relaxed);
                // The producer went down with the un-spawned worker.
                self.rebuild_buffers();
                Err(DepthCamError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Stop the capture thread, blocking until it joins. No-op if it is
    /// not running.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(producer) => self.producer = Some(producer),
                Err(_) => {
                    log::error!("capture thread panicked; rebuilding frame buffers");
                    self.rebuild_buffers();
                }
            }
        }
    }

    /// Stop the worker, close the capture pipeline, and re-enable the
    /// previously enabled feature set. Does not restart the capture
    /// thread; call [`start`](Self::start) afterwards.
    pub fn restart_capture(&mut self) -> Result<()> {
        self.stop();
        let features = self.enabled;
        self.disable_features(features);
        self.backend.close_pipeline();
        self.enable_features(features)
    }

    /// Enable the given features, activating the corresponding backend
    /// modules. Re-enabling an already-active feature is a no-op.
    pub fn enable_features(&mut self, features: Feature) -> Result<()> {
        if features.contains(Feature::CAMERA_STREAMING) {
            self.enable_single(Feature::CAMERA_STREAMING)?;
        }
        if features.contains(Feature::SCAN_3D) {
            self.enable_single(Feature::SCAN_3D)?;
        }
        if features.contains(Feature::HEAD_TRACKING) {
            self.enable_single(Feature::HEAD_TRACKING)?;
        }
        Ok(())
    }

    /// Disable the given features, releasing feature-specific backend
    /// resources. Disabling an inactive feature is a no-op.
    pub fn disable_features(&mut self, features: Feature) {
        if features.contains(Feature::CAMERA_STREAMING) {
            self.disable_single(Feature::CAMERA_STREAMING);
        }
        if features.contains(Feature::SCAN_3D) {
            self.disable_single(Feature::SCAN_3D);
        }
        if features.contains(Feature::HEAD_TRACKING) {
            self.disable_single(Feature::HEAD_TRACKING);
        }
    }

    fn enable_single(&mut self, feature: Feature) -> Result<()> {
        if self.enabled.contains(feature) {
            return Ok(());
        }
        if feature == Feature::CAMERA_STREAMING {
            self.shared.color_streaming.store(true, Ordering::Relaxed);
            self.shared.depth_streaming.store(true, Ordering::Relaxed);
        }
        if feature == Feature::SCAN_3D {
            self.backend.activate_scanner()?;
            self.shared.scan_enabled.store(true, Ordering::Relaxed);
        }
        if feature == Feature::HEAD_TRACKING {
            self.backend.activate_tracker()?;
            self.shared.tracking_enabled.store(true, Ordering::Relaxed);
        }
        self.enabled |= feature;
        log::info!("enabled {:?}", feature);
        Ok(())
    }

    fn disable_single(&mut self, feature: Feature) {
        if !self.enabled.contains(feature) {
            return;
        }
        if feature == Feature::CAMERA_STREAMING {
            self.shared.color_streaming.store(false, Ordering::Relaxed);
            self.shared.depth_streaming.store(false, Ordering::Relaxed);
        }
        if feature == Feature::SCAN_3D {
            self.shared.scan_enabled.store(false, Ordering::Relaxed);
        }
        if feature == Feature::HEAD_TRACKING {
            self.backend.deactivate_tracker();
            self.shared.tracking_enabled.store(false, Ordering::Relaxed);
        }
        self.enabled.remove(feature);
        log::info!("disabled {:?}", feature);
    }

    /// Swap in the latest published frame if it is newer than the current
    /// foreground frame. Returns whether a newer frame arrived; either
    /// way, [`frame`](Self::frame) is valid until the next call.
    pub fn consume_frame(&mut self) -> bool {
        self.consumer.consume()
    }

    /// The foreground frame, stable until the next `consume_frame` call.
    pub fn frame(&self) -> &Frame {
        self.consumer.frame()
    }

    /// Reconfigure the color stream and resize all three color buffers.
    /// Fails with `CaptureRunning` while the capture thread is live, and
    /// leaves the buffers untouched if the backend rejects the resolution.
    pub fn set_color_resolution(&mut self, preset: ColorResolution) -> Result<()> {
        if self.worker.is_some() {
            return Err(DepthCamError::CaptureRunning);
        }
        let resolution = preset.value();
        self.backend.enable_color_stream(resolution).map_err(|e| {
            log::error!(
                "failed to enable color stream {}x{} @ {} fps: {}",
                resolution.width,
                resolution.height,
                resolution.fps,
                e
            );
            e
        })?;
        log::info!(
            "color stream enabled: {}x{} @ {} fps",
            resolution.width,
            resolution.height,
            resolution.fps
        );

        let bytes = (resolution.width * resolution.height * 4) as usize;
        self.for_each_frame(|frame| frame.color.resize(bytes, 0));
        Ok(())
    }

    /// Reconfigure the depth stream and resize all three depth buffers.
    pub fn set_depth_resolution(&mut self, preset: DepthResolution) -> Result<()> {
        if self.worker.is_some() {
            return Err(DepthCamError::CaptureRunning);
        }
        let resolution = preset.value();
        self.backend.enable_depth_stream(resolution).map_err(|e| {
            log::error!(
                "failed to enable depth stream {}x{} @ {} fps: {}",
                resolution.width,
                resolution.height,
                resolution.fps,
                e
            );
            e
        })?;
        log::info!(
            "depth stream enabled: {}x{} @ {} fps",
            resolution.width,
            resolution.height,
            resolution.fps
        );

        let bytes = (resolution.width * resolution.height) as usize;
        self.for_each_frame(|frame| frame.depth.resize(bytes, 0));
        Ok(())
    }

    /// Whether the two presets are supported together as a set.
    pub fn is_stream_set_valid(&self, color: ColorResolution, depth: DepthResolution) -> bool {
        self.backend.is_stream_set_valid(color.value(), depth.value())
    }

    /// Configure the scanning module without starting data collection.
    pub fn configure_scanning(
        &mut self,
        mode: ScanMode,
        solidify: bool,
        texture: bool,
    ) -> Result<()> {
        self.backend.set_scan_config(ScanConfig {
            mode,
            solidify,
            texture,
            start: false,
        })?;
        self.shared.scan_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Bounding volume and voxel resolution for scan data collection.
    pub fn set_scanning_volume(&mut self, extent: [f32; 3], voxel_resolution: i32) -> Result<()> {
        self.backend.set_scan_volume(ScanVolume {
            extent,
            voxel_resolution,
        })?;
        log::info!(
            "scanning volume = {} x {} x {}, voxel resolution = {}",
            extent[0],
            extent[1],
            extent[2],
            voxel_resolution
        );
        Ok(())
    }

    /// Request scan start. The capture thread applies it on its next
    /// iteration; fire-and-forget.
    pub fn start_scanning(&mut self) {
        self.shared.scan_start_requested.store(true, Ordering::Relaxed);
        self.shared.scan_completed.store(false, Ordering::Relaxed);
    }

    /// Request scan stop, applied on the capture thread's next iteration.
    pub fn stop_scanning(&mut self) {
        self.shared.scan_stop_requested.store(true, Ordering::Relaxed);
    }

    /// Reset the scanning process by re-applying the current
    /// configuration. Scanning is flagged off for the duration.
    pub fn reset_scanning(&mut self) -> Result<()> {
        self.shared.scan_enabled.store(false, Ordering::Relaxed);
        let result = self
            .backend
            .scan_config()
            .and_then(|config| self.backend.set_scan_config(config));
        self.shared.scan_enabled.store(true, Ordering::Relaxed);
        result
    }

    /// Queue a mesh reconstruction to the given path. The capture thread
    /// runs it synchronously on its next iteration; poll
    /// [`scan_completed`](Self::scan_completed) for the result.
    pub fn save_scan(&mut self, format: MeshFormat, path: impl Into<PathBuf>) -> Result<()> {
        self.shared
            .scan_requests_tx
            .try_send(ReconstructRequest {
                format,
                path: path.into(),
            })
            .map_err(|_| DepthCamError::ScanBacklog)
    }

    /// Whether a queued reconstruction has completed since the last scan
    /// start.
    pub fn scan_completed(&self) -> bool {
        self.shared.scan_completed.load(Ordering::Relaxed)
    }

    /// The last reconstruction failure, if any, clearing it.
    pub fn take_scan_error(&mut self) -> Option<String> {
        self.shared.take_scan_error()
    }

    /// Apply `f` to all three frames. Callable only while the capture
    /// thread is stopped; the producer is guaranteed present then.
    fn for_each_frame(&mut self, mut f: impl FnMut(&mut Frame)) {
        if let Some(producer) = self.producer.as_mut() {
            f(producer.background_mut());
            producer.with_mid(|frame| f(frame));
        }
        f(self.consumer.frame_mut());
    }

    fn rebuild_buffers(&mut self) {
        let template = self.consumer.frame().clone();
        let (producer, consumer) = frame::triple(template);
        self.producer = Some(producer);
        self.consumer = consumer;
    }
}

impl<B: CaptureBackend> Drop for Controller<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBackend;

    fn controller() -> Controller<SimBackend> {
        Controller::new(SimBackend::new())
    }

    #[test]
    fn test_camera_streaming_toggles_both_stream_flags() {
        let mut controller = controller();

        controller
            .enable_features(Feature::CAMERA_STREAMING)
            .unwrap();
        assert!(controller.shared.color_streaming.load(Ordering::Relaxed));
        assert!(controller.shared.depth_streaming.load(Ordering::Relaxed));

        controller.disable_features(Feature::CAMERA_STREAMING);
        assert!(!controller.shared.color_streaming.load(Ordering::Relaxed));
        assert!(!controller.shared.depth_streaming.load(Ordering::Relaxed));
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut controller = controller();

        controller.enable_features(Feature::SCAN_3D).unwrap();
        controller.enable_features(Feature::SCAN_3D).unwrap();
        controller
            .enable_features(Feature::SCAN_3D | Feature::HEAD_TRACKING)
            .unwrap();

        assert_eq!(controller.backend().scanner_activations(), 1);
        assert_eq!(controller.backend().tracker_activations(), 1);
    }

    #[test]
    fn test_color_resize_applies_to_all_three_buffers() {
        let mut controller = controller();
        controller
            .set_color_resolution(ColorResolution::Vga60)
            .unwrap();

        let expected = 640 * 480 * 4;
        assert_eq!(controller.frame().color.len(), expected);
        let producer = controller.producer.as_mut().unwrap();
        assert_eq!(producer.background_mut().color.len(), expected);
        producer.with_mid(|frame| assert_eq!(frame.color.len(), expected));
    }

    #[test]
    fn test_depth_resize_applies_to_all_three_buffers() {
        let mut controller = controller();
        controller
            .set_depth_resolution(DepthResolution::Qvga30)
            .unwrap();

        let expected = 320 * 240;
        assert_eq!(controller.frame().depth.len(), expected);
        let producer = controller.producer.as_mut().unwrap();
        assert_eq!(producer.background_mut().depth.len(), expected);
        producer.with_mid(|frame| assert_eq!(frame.depth.len(), expected));
    }

    #[test]
    fn test_no_device_reports_other_and_fails_gracefully() {
        let mut controller = Controller::new(SimBackend::disconnected());

        assert_eq!(controller.camera_model(), CameraModel::Other);
        assert_eq!(controller.color_fov(), FieldOfView::default());
        assert_eq!(controller.depth_fov(), FieldOfView::default());
        assert!(matches!(
            controller.set_color_resolution(ColorResolution::Vga60),
            Err(DepthCamError::DeviceNotFound)
        ));
        // Buffers untouched after the failed enable.
        assert!(controller.frame().color.is_empty());
    }

    #[test]
    fn test_resize_refused_while_running() {
        let mut controller = controller();
        controller.start().unwrap();
        assert!(matches!(
            controller.set_color_resolution(ColorResolution::Vga30),
            Err(DepthCamError::CaptureRunning)
        ));
        controller.stop();
        assert!(controller
            .set_color_resolution(ColorResolution::Vga30)
            .is_ok());
    }

    #[test]
    fn test_restart_reenables_previous_feature_set() {
        let mut controller = controller();
        controller
            .enable_features(Feature::CAMERA_STREAMING | Feature::HEAD_TRACKING)
            .unwrap();

        controller.restart_capture().unwrap();

        assert_eq!(
            controller.enabled_features(),
            Feature::CAMERA_STREAMING | Feature::HEAD_TRACKING
        );
        assert!(controller.shared.color_streaming.load(Ordering::Relaxed));
        assert!(controller.shared.tracking_enabled.load(Ordering::Relaxed));
        assert_eq!(controller.backend().pipeline_closes(), 1);
        // The tracking module was re-activated by the restart.
        assert_eq!(controller.backend().tracker_activations(), 2);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut controller = controller();
        controller.start().unwrap();
        controller.start().unwrap();
        assert!(controller.is_running());
        controller.stop();
        controller.stop();
        assert!(!controller.is_running());
        assert!(controller.producer.is_some());
    }

    #[test]
    fn test_scan_requests_set_flags() {
        let mut controller = controller();
        controller.start_scanning();
        assert!(controller
            .shared
            .scan_start_requested
            .load(Ordering::Relaxed));
        assert!(!controller.shared.scan_completed.load(Ordering::Relaxed));

        controller.stop_scanning();
        assert!(controller
            .shared
            .scan_stop_requested
            .load(Ordering::Relaxed));
    }

    #[test]
    fn test_save_scan_backlog() {
        let mut controller = controller();
        for _ in 0..4 {
            controller.save_scan(MeshFormat::Obj, "/tmp/scan.obj").unwrap();
        }
        assert!(matches!(
            controller.save_scan(MeshFormat::Obj, "/tmp/scan.obj"),
            Err(DepthCamError::ScanBacklog)
        ));
    }
}
