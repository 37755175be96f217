//! List the first attached depth camera found on the USB bus.

fn main() {
    env_logger::init();

    match depthcam::device::probe() {
        Ok(Some(info)) => {
            println!(
                "Found {:?} depth camera  FW={}  Serial={}",
                info.model,
                info.firmware_string(),
                info.serial
            );
        }
        Ok(None) => {
            println!("No supported depth camera attached");
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
