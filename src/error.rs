use crate::types::Feature;

/// Errors that can occur when configuring or driving the capture pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DepthCamError {
    #[error("no supported depth camera attached")]
    DeviceNotFound,

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("unsupported stream resolution: {width}x{height} @ {fps} fps")]
    UnsupportedResolution { width: u32, height: u32, fps: f32 },

    #[error("operation requires the capture thread to be stopped")]
    CaptureRunning,

    #[error("feature not active: {0:?}")]
    FeatureInactive(Feature),

    #[error("scan request queue is full")]
    ScanBacklog,

    #[error("failed to spawn capture thread: {0}")]
    ThreadSpawn(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
