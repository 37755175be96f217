//! Run the capture pipeline against the simulated backend and print the
//! consumed frames to stdout.
//!
//! Usage: cargo run --example stream

use depthcam::sim::SimBackend;
use depthcam::{ColorResolution, Controller, DepthResolution, Feature};
use std::time::Duration;

fn main() -> depthcam::Result<()> {
    env_logger::init();

    let mut controller = Controller::new(SimBackend::new());

    println!("Model:    {:?}", controller.camera_model());
    println!("Firmware: {}", controller.camera_firmware());
    println!(
        "Color FOV: {:.1} x {:.1} deg",
        controller.color_fov().horizontal,
        controller.color_fov().vertical
    );
    println!();

    controller.set_color_resolution(ColorResolution::Vga60)?;
    controller.set_depth_resolution(DepthResolution::Vga60)?;
    controller.enable_features(Feature::CAMERA_STREAMING | Feature::HEAD_TRACKING)?;
    controller.start()?;

    for _ in 0..60 {
        std::thread::sleep(Duration::from_millis(33));
        if !controller.consume_frame() {
            continue;
        }
        let frame = controller.frame();
        println!(
            "frame {:<6} color={}B depth={}B heads={} pos=[{:+.2}, {:+.2}, {:+.2}]",
            frame.number,
            frame.color.len(),
            frame.depth.len(),
            frame.head_count,
            frame.head_position[0],
            frame.head_position[1],
            frame.head_position[2],
        );
    }

    controller.stop();
    println!("\nDropped acquisitions: {}", controller.acquire_failures());
    Ok(())
}
