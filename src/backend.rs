use crate::types::{
    CameraInfo, FieldOfView, MeshFormat, ScanConfig, ScanVolume, StreamResolution,
};
use crate::types::{Expression, HeadPose};
use crate::Result;
use std::path::Path;

/// One image pulled from a sensor stream or the scan preview.
#[derive(Debug, Clone)]
pub struct SensorImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One acquired sample. Either stream may be absent depending on which
/// streams the backend has enabled. Dropping the sample releases it.
#[derive(Debug, Clone, Default)]
pub struct SensorSample {
    pub color: Option<SensorImage>,
    pub depth: Option<SensorImage>,
}

/// Tracking output for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingUpdate {
    pub face_count: u32,
    /// Pose of the first detected face. May be absent even when faces are
    /// detected; consumers keep their previous values in that case.
    pub pose: Option<HeadPose>,
    pub expression: Option<Expression>,
}

/// The capture/tracking backend seam.
///
/// The controller is constructed with a backend instead of reaching for an
/// ambient SDK singleton, so the concurrency core is testable against the
/// simulated backend in [`crate::sim`] and a vendor SDK binding slots in
/// behind the same trait. Methods take `&self`; implementations use
/// interior mutability and must be callable from both the controller
/// thread and the capture thread.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Identification of the attached device, or `None` without hardware.
    fn descriptor(&self) -> Option<CameraInfo>;

    /// Color camera field of view. Zero when no device is attached.
    fn color_fov(&self) -> FieldOfView;

    /// Depth camera field of view. Zero when no device is attached.
    fn depth_fov(&self) -> FieldOfView;

    /// Enable (or reconfigure) the color stream.
    fn enable_color_stream(&self, resolution: StreamResolution) -> Result<()>;

    /// Enable (or reconfigure) the depth stream.
    fn enable_depth_stream(&self, resolution: StreamResolution) -> Result<()>;

    /// Whether the two resolutions are supported together as a set.
    fn is_stream_set_valid(&self, color: StreamResolution, depth: StreamResolution) -> bool;

    /// Initialize the capture pipeline. Called from the capture thread
    /// before the first acquisition.
    fn open_pipeline(&self) -> Result<()>;

    /// Close the capture pipeline so streams can be reconfigured.
    fn close_pipeline(&self);

    /// Blocking acquisition of the next sample. Failures are transient;
    /// the capture loop retries on the next iteration.
    fn acquire_sample(&self) -> Result<SensorSample>;

    /// Activate the 3D scanning module.
    fn activate_scanner(&self) -> Result<()>;

    /// Current scanning configuration.
    fn scan_config(&self) -> Result<ScanConfig>;

    fn set_scan_config(&self, config: ScanConfig) -> Result<()>;

    /// Bounding volume and voxel resolution for data collection.
    fn set_scan_volume(&self, volume: ScanVolume) -> Result<()>;

    /// Latest scan preview image, if the scanner has one. The preview
    /// dimensions may change between calls.
    fn scan_preview(&self) -> Option<SensorImage>;

    /// Synchronously reconstruct the accumulated scan data into a mesh
    /// file. Blocks the caller; there is no cancellation once started.
    fn reconstruct(&self, format: MeshFormat, path: &Path) -> Result<()>;

    /// Activate and configure the head tracking module (pose + alerts).
    fn activate_tracker(&self) -> Result<()>;

    /// Release tracking module resources.
    fn deactivate_tracker(&self);

    /// Refresh tracking against the current sample.
    fn update_tracking(&self) -> Option<TrackingUpdate>;
}
