use std::path::PathBuf;

bitflags::bitflags! {
    /// Independently enable/disable-able capture capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Feature: u32 {
        const CAMERA_STREAMING = 1 << 0;
        const SCAN_3D          = 1 << 1;
        const HEAD_TRACKING    = 1 << 2;
    }
}

/// Supported depth camera models. `Other` is reported when no device
/// (or an unrecognized one) is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModel {
    F200,
    R200,
    Other,
}

/// Identification for an attached camera, discovered once at startup.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub model: CameraModel,
    pub firmware: [u16; 4],
    pub serial: String,
}

impl CameraInfo {
    /// Firmware version as a human-readable string.
    pub fn firmware_string(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.firmware[0], self.firmware[1], self.firmware[2], self.firmware[3]
        )
    }
}

/// Camera field of view in degrees. Zero when no device is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldOfView {
    pub horizontal: f32,
    pub vertical: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel.
    Rgba32,
    /// 1 byte per pixel.
    Depth8,
}

/// A concrete stream configuration. Only changes while the stream is
/// (re)enabled, never concurrently with an in-flight buffer resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamResolution {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub format: PixelFormat,
}

/// Color stream presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorResolution {
    FullHd30,
    Hd30,
    Vga60,
    Vga30,
}

impl ColorResolution {
    pub fn value(self) -> StreamResolution {
        let (width, height, fps) = match self {
            ColorResolution::FullHd30 => (1920, 1080, 30.0),
            ColorResolution::Hd30 => (1280, 720, 30.0),
            ColorResolution::Vga60 => (640, 480, 60.0),
            ColorResolution::Vga30 => (640, 480, 30.0),
        };
        StreamResolution {
            width,
            height,
            fps,
            format: PixelFormat::Rgba32,
        }
    }
}

/// Depth stream presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthResolution {
    Vga60,
    Vga30,
    Qvga60,
    Qvga30,
}

impl DepthResolution {
    pub fn value(self) -> StreamResolution {
        let (width, height, fps) = match self {
            DepthResolution::Vga60 => (640, 480, 60.0),
            DepthResolution::Vga30 => (640, 480, 30.0),
            DepthResolution::Qvga60 => (320, 240, 60.0),
            DepthResolution::Qvga30 => (320, 240, 30.0),
        };
        StreamResolution {
            width,
            height,
            fps,
            format: PixelFormat::Depth8,
        }
    }
}

/// 3D scanning modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Variable,
    Object,
    Face,
    Head,
    Body,
}

/// Mesh export formats for scan reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Ply,
    Stl,
}

/// 3D scanning module configuration. `start` postpones or begins data
/// collection; the capture thread flips it in response to scan requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub solidify: bool,
    pub texture: bool,
    pub start: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            mode: ScanMode::Variable,
            solidify: false,
            texture: false,
            start: false,
        }
    }
}

/// Bounding volume and voxel resolution for scan data collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanVolume {
    pub extent: [f32; 3],
    pub voxel_resolution: i32,
}

/// A pending mesh reconstruction, queued by the controller and executed
/// synchronously on the capture thread.
#[derive(Debug, Clone)]
pub struct ReconstructRequest {
    pub format: MeshFormat,
    pub path: PathBuf,
}

/// Head position and orientation extracted from tracking output.
/// Rotation is [pitch, yaw, roll] in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadPose {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

/// Facial expression values from the tracking module. Scalar fields are
/// intensities in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Expression {
    pub eyes_direction: [f32; 3],
    pub eyebrow_left: i32,
    pub eyebrow_right: i32,
    pub eye_closed_left: i32,
    pub eye_closed_right: i32,
    pub mouth_open: i32,
    pub mouth_kiss: i32,
    pub mouth_smile: i32,
    pub mouth_tongue: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_preset_lookup() {
        let res = ColorResolution::Vga60.value();
        assert_eq!(res.width, 640);
        assert_eq!(res.height, 480);
        assert_eq!(res.fps, 60.0);
        assert_eq!(res.format, PixelFormat::Rgba32);
    }

    #[test]
    fn test_depth_preset_lookup() {
        let res = DepthResolution::Qvga30.value();
        assert_eq!(res.width, 320);
        assert_eq!(res.height, 240);
        assert_eq!(res.format, PixelFormat::Depth8);
    }

    #[test]
    fn test_firmware_string() {
        let info = CameraInfo {
            model: CameraModel::F200,
            firmware: [2, 60, 0, 1],
            serial: String::new(),
        };
        assert_eq!(info.firmware_string(), "2.60.0.1");
    }
}
