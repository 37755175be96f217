//! # depthcam - Depth Camera Capture Pipeline
//!
//! Color/depth streaming, 3D scanning, and head tracking on top of a
//! pluggable capture backend. Provides:
//! - A capture thread driving the backend's blocking frame acquisition
//! - A triple-buffered frame handoff to the consuming thread (no copies)
//! - Feature toggles and scan control crossing threads via atomic flags
//! - Text mesh load/save for reconstructed scans
//!
//! ## Quick Start
//! ```no_run
//! use depthcam::{Controller, Feature, ColorResolution, sim::SimBackend};
//! use std::time::Duration;
//!
//! let mut controller = Controller::new(SimBackend::new());
//! controller.set_color_resolution(ColorResolution::Vga60).unwrap();
//! controller.enable_features(Feature::CAMERA_STREAMING | Feature::HEAD_TRACKING).unwrap();
//! controller.start().unwrap();
//!
//! for _ in 0..100 {
//!     std::thread::sleep(Duration::from_millis(33));
//!     if controller.consume_frame() {
//!         let frame = controller.frame();
//!         println!("frame {} heads {}", frame.number, frame.head_count);
//!     }
//! }
//! controller.stop();
//! ```

pub mod backend;
pub mod controller;
pub mod device;
pub mod error;
pub(crate) mod flags;
pub mod frame;
pub mod mesh;
pub mod sim;
pub mod types;
pub(crate) mod worker;

pub use backend::CaptureBackend;
pub use controller::Controller;
pub use error::DepthCamError;
pub use frame::Frame;
pub use types::*;

/// Result type alias for depthcam operations.
pub type Result<T> = std::result::Result<T, DepthCamError>;
