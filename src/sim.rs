//! Simulated capture backend for tests and demos.
//!
//! Produces deterministic synthetic frames without hardware: a flat-shaded
//! color image, a constant-gradient depth image, a scan preview, an
//! orbiting head pose, and a tiny reconstructed mesh. Transition counters
//! let tests assert how often the pipeline touched the backend.

use crate::backend::{CaptureBackend, SensorImage, SensorSample, TrackingUpdate};
use crate::error::DepthCamError;
use crate::mesh::{self, ScanMesh};
use crate::types::{
    CameraInfo, CameraModel, Expression, Feature, FieldOfView, HeadPose, MeshFormat, ScanConfig,
    ScanVolume, StreamResolution,
};
use crate::Result;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct SimState {
    samples: u64,
    color: Option<StreamResolution>,
    depth: Option<StreamResolution>,
    pipeline_open: bool,
    scanner_active: bool,
    scan_config: ScanConfig,
    scan_volume: Option<ScanVolume>,
    tracker_active: bool,
    pose_available: bool,
    preview_size: (u32, u32),
    scan_start_applications: u32,
    scan_stop_applications: u32,
    scanner_activations: u32,
    tracker_activations: u32,
    pipeline_closes: u32,
    reconstructions: u32,
}

/// Simulated depth camera.
pub struct SimBackend {
    connected: bool,
    acquire_delay: Duration,
    fail_every: Option<u64>,
    state: Mutex<SimState>,
}

impl SimBackend {
    /// A connected simulated F200 with a 1 ms acquisition delay.
    pub fn new() -> Self {
        SimBackend {
            connected: true,
            acquire_delay: Duration::from_millis(1),
            fail_every: None,
            state: Mutex::new(SimState {
                pose_available: true,
                preview_size: (320, 240),
                ..SimState::default()
            }),
        }
    }

    /// A backend with no device attached: queries report nothing and all
    /// stream/module operations fail.
    pub fn disconnected() -> Self {
        SimBackend {
            connected: false,
            ..SimBackend::new()
        }
    }

    /// Override the per-sample blocking delay.
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    /// Make every n-th acquisition fail transiently.
    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    /// Make tracking report faces without pose data (or restore it).
    pub fn set_pose_available(&self, available: bool) {
        self.lock().pose_available = available;
    }

    /// Change the scan preview dimensions mid-run.
    pub fn set_preview_size(&self, width: u32, height: u32) {
        self.lock().preview_size = (width, height);
    }

    /// How many times a scan start was applied to the configuration.
    pub fn scan_start_applications(&self) -> u32 {
        self.lock().scan_start_applications
    }

    /// How many times a scan stop was applied to the configuration.
    pub fn scan_stop_applications(&self) -> u32 {
        self.lock().scan_stop_applications
    }

    pub fn scanner_activations(&self) -> u32 {
        self.lock().scanner_activations
    }

    pub fn tracker_activations(&self) -> u32 {
        self.lock().tracker_activations
    }

    pub fn pipeline_closes(&self) -> u32 {
        self.lock().pipeline_closes
    }

    pub fn reconstructions(&self) -> u32 {
        self.lock().reconstructions
    }

    /// Last configured scan volume.
    pub fn scan_volume(&self) -> Option<ScanVolume> {
        self.lock().scan_volume
    }

    pub fn pipeline_open(&self) -> bool {
        self.lock().pipeline_open
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn require_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(DepthCamError::DeviceNotFound)
        }
    }

    fn check_resolution(resolution: StreamResolution) -> Result<()> {
        if resolution.width == 0 || resolution.height == 0 || resolution.fps <= 0.0 {
            return Err(DepthCamError::UnsupportedResolution {
                width: resolution.width,
                height: resolution.height,
                fps: resolution.fps,
            });
        }
        Ok(())
    }

    fn image(resolution: StreamResolution, bytes_per_pixel: u32, fill: u8) -> SensorImage {
        let len = (resolution.width * resolution.height * bytes_per_pixel) as usize;
        SensorImage {
            width: resolution.width,
            height: resolution.height,
            data: vec![fill; len],
        }
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        SimBackend::new()
    }
}

impl CaptureBackend for SimBackend {
    fn descriptor(&self) -> Option<CameraInfo> {
        self.connected.then(|| CameraInfo {
            model: CameraModel::F200,
            firmware: [2, 60, 0, 0],
            serial: "SIM-0001".into(),
        })
    }

    fn color_fov(&self) -> FieldOfView {
        if self.connected {
            FieldOfView {
                horizontal: 77.0,
                vertical: 43.0,
            }
        } else {
            FieldOfView::default()
        }
    }

    fn depth_fov(&self) -> FieldOfView {
        if self.connected {
            FieldOfView {
                horizontal: 90.0,
                vertical: 59.0,
            }
        } else {
            FieldOfView::default()
        }
    }

    fn enable_color_stream(&self, resolution: StreamResolution) -> Result<()> {
        self.require_connected()?;
        Self::check_resolution(resolution)?;
        self.lock().color = Some(resolution);
        Ok(())
    }

    fn enable_depth_stream(&self, resolution: StreamResolution) -> Result<()> {
        self.require_connected()?;
        Self::check_resolution(resolution)?;
        self.lock().depth = Some(resolution);
        Ok(())
    }

    fn is_stream_set_valid(&self, color: StreamResolution, depth: StreamResolution) -> bool {
        self.connected
            && Self::check_resolution(color).is_ok()
            && Self::check_resolution(depth).is_ok()
    }

    fn open_pipeline(&self) -> Result<()> {
        self.require_connected()?;
        self.lock().pipeline_open = true;
        Ok(())
    }

    fn close_pipeline(&self) {
        let mut state = self.lock();
        state.pipeline_open = false;
        state.pipeline_closes += 1;
    }

    fn acquire_sample(&self) -> Result<SensorSample> {
        self.require_connected()?;
        std::thread::sleep(self.acquire_delay);

        let mut state = self.lock();
        state.samples += 1;
        if let Some(n) = self.fail_every {
            if state.samples % n == 0 {
                return Err(DepthCamError::Backend("transient acquire failure".into()));
            }
        }

        let shade = (state.samples & 0xFF) as u8;
        Ok(SensorSample {
            color: state.color.map(|res| Self::image(res, 4, shade)),
            depth: state.depth.map(|res| Self::image(res, 1, shade)),
        })
    }

    fn activate_scanner(&self) -> Result<()> {
        self.require_connected()?;
        let mut state = self.lock();
        state.scanner_active = true;
        state.scanner_activations += 1;
        Ok(())
    }

    fn scan_config(&self) -> Result<ScanConfig> {
        let state = self.lock();
        if !state.scanner_active {
            return Err(DepthCamError::FeatureInactive(Feature::SCAN_3D));
        }
        Ok(state.scan_config)
    }

    fn set_scan_config(&self, config: ScanConfig) -> Result<()> {
        let mut state = self.lock();
        if !state.scanner_active {
            return Err(DepthCamError::FeatureInactive(Feature::SCAN_3D));
        }
        if config.start && !state.scan_config.start {
            state.scan_start_applications += 1;
        }
        if !config.start && state.scan_config.start {
            state.scan_stop_applications += 1;
        }
        state.scan_config = config;
        Ok(())
    }

    fn set_scan_volume(&self, volume: ScanVolume) -> Result<()> {
        let mut state = self.lock();
        if !state.scanner_active {
            return Err(DepthCamError::FeatureInactive(Feature::SCAN_3D));
        }
        state.scan_volume = Some(volume);
        Ok(())
    }

    fn scan_preview(&self) -> Option<SensorImage> {
        let state = self.lock();
        if !state.scanner_active {
            return None;
        }
        let (width, height) = state.preview_size;
        Some(SensorImage {
            width,
            height,
            data: vec![(state.samples & 0xFF) as u8; (width * height * 4) as usize],
        })
    }

    fn reconstruct(&self, format: MeshFormat, path: &Path) -> Result<()> {
        {
            let state = self.lock();
            if !state.scanner_active {
                return Err(DepthCamError::FeatureInactive(Feature::SCAN_3D));
            }
        }
        if format != MeshFormat::Obj {
            return Err(DepthCamError::Backend(format!(
                "synthetic scanner only reconstructs OBJ, got {:?}",
                format
            )));
        }

        // A fixed triangle offset from the origin, so loaders exercise
        // their recentering path.
        let mesh = ScanMesh {
            vertices: vec![[1.0, 1.0, 1.0], [2.0, 1.0, 1.0], [1.0, 2.0, 1.0]],
            colors: vec![[128, 128, 128]; 3],
            triangles: vec![0, 1, 2],
        };
        mesh::save_mesh(path, &mesh)?;
        self.lock().reconstructions += 1;
        Ok(())
    }

    fn activate_tracker(&self) -> Result<()> {
        self.require_connected()?;
        let mut state = self.lock();
        state.tracker_active = true;
        state.tracker_activations += 1;
        Ok(())
    }

    fn deactivate_tracker(&self) {
        self.lock().tracker_active = false;
    }

    fn update_tracking(&self) -> Option<TrackingUpdate> {
        let state = self.lock();
        if !state.tracker_active {
            return None;
        }
        let phase = (state.samples % 360) as f32;
        Some(TrackingUpdate {
            face_count: 1,
            pose: state.pose_available.then(|| HeadPose {
                position: [phase.to_radians().sin() * 5.0, 0.0, 50.0],
                rotation: [0.0, phase.to_radians().cos() * 15.0, 0.0],
            }),
            expression: Some(Expression {
                mouth_open: (state.samples % 100) as i32,
                ..Expression::default()
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorResolution;

    #[test]
    fn test_disconnected_backend_fails_gracefully() {
        let backend = SimBackend::disconnected();
        assert!(backend.descriptor().is_none());
        assert_eq!(backend.color_fov(), FieldOfView::default());
        assert!(matches!(
            backend.enable_color_stream(ColorResolution::Vga60.value()),
            Err(DepthCamError::DeviceNotFound)
        ));
        assert!(matches!(
            backend.acquire_sample(),
            Err(DepthCamError::DeviceNotFound)
        ));
    }

    #[test]
    fn test_sample_matches_enabled_streams() {
        let backend = SimBackend::new().with_acquire_delay(Duration::ZERO);

        let sample = backend.acquire_sample().unwrap();
        assert!(sample.color.is_none());
        assert!(sample.depth.is_none());

        let res = ColorResolution::Vga60.value();
        backend.enable_color_stream(res).unwrap();
        let sample = backend.acquire_sample().unwrap();
        let color = sample.color.unwrap();
        assert_eq!(color.data.len(), (res.width * res.height * 4) as usize);
        assert!(sample.depth.is_none());
    }

    #[test]
    fn test_failing_every() {
        let backend = SimBackend::new()
            .with_acquire_delay(Duration::ZERO)
            .failing_every(2);
        assert!(backend.acquire_sample().is_ok());
        assert!(backend.acquire_sample().is_err());
        assert!(backend.acquire_sample().is_ok());
    }

    #[test]
    fn test_scan_config_requires_activation() {
        let backend = SimBackend::new();
        assert!(matches!(
            backend.scan_config(),
            Err(DepthCamError::FeatureInactive(Feature::SCAN_3D))
        ));
        backend.activate_scanner().unwrap();
        assert!(!backend.scan_config().unwrap().start);
    }
}
