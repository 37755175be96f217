use crate::types::{CameraInfo, CameraModel};
use crate::Result;

// -- USB identifiers --
pub const VID_INTEL: u16 = 0x8086;
pub const PID_F200: u16 = 0x0A66;
pub const PID_R200: u16 = 0x0A80;

fn model_for_pid(pid: u16) -> Option<CameraModel> {
    match pid {
        PID_F200 => Some(CameraModel::F200),
        PID_R200 => Some(CameraModel::R200),
        _ => None,
    }
}

/// Enumerate attached USB devices and return the first supported depth
/// camera, or `None` if nothing matches. Discovery runs once at startup;
/// hot-plug is not supported.
pub fn probe() -> Result<Option<CameraInfo>> {
    let devices = rusb::devices()?;

    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                log::warn!(
                    "failed to read descriptor for bus {:03} addr {:03}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                continue;
            }
        };

        if descriptor.vendor_id() != VID_INTEL {
            continue;
        }
        let Some(model) = model_for_pid(descriptor.product_id()) else {
            continue;
        };

        let release = descriptor.device_version();
        let firmware = [
            release.major() as u16,
            release.minor() as u16,
            release.sub_minor() as u16,
            0,
        ];

        // Serial number requires opening the device; tolerate failure
        // (permissions, device busy) and report an empty serial.
        let serial = device
            .open()
            .and_then(|handle| handle.read_serial_number_string_ascii(&descriptor))
            .unwrap_or_else(|e| {
                log::warn!("failed to read serial number: {}", e);
                String::new()
            });

        log::info!(
            "found {:?} depth camera at bus {:03} addr {:03}",
            model,
            device.bus_number(),
            device.address()
        );

        return Ok(Some(CameraInfo {
            model,
            firmware,
            serial,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup() {
        assert_eq!(model_for_pid(PID_F200), Some(CameraModel::F200));
        assert_eq!(model_for_pid(PID_R200), Some(CameraModel::R200));
        assert_eq!(model_for_pid(0xFFFF), None);
    }
}
