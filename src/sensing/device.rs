use anyhow::{bail, Result};
use log::{info, warn};

use crate::classify::Frame;
use crate::error::FocusError;

/// An opened camera. Owned by exactly one monitor worker at a time.
pub trait CaptureDevice: Send {
    fn read_frame(&mut self) -> Result<Frame>;

    /// Gives the hardware back. Called at most once per opened device.
    fn release(&mut self);
}

/// Opens capture devices by identifier (`"0"`, `"/dev/video2"`, ...).
pub trait CaptureSource: Send + Sync {
    fn open(&self, device_id: &str) -> Result<Box<dyn CaptureDevice>>;
}

/// An acquired device. Release happens once, either explicitly or on drop.
pub struct DeviceLease {
    device_id: String,
    device: Option<Box<dyn CaptureDevice>>,
}

impl DeviceLease {
    fn new(device_id: String, device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device_id,
            device: Some(device),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn read_frame(&mut self) -> Result<Frame> {
        match self.device.as_mut() {
            Some(device) => device.read_frame(),
            None => bail!("capture device {} already released", self.device_id),
        }
    }

    /// Returns `true` only for the call that actually released the device.
    pub fn release(&mut self) -> bool {
        match self.device.take() {
            Some(mut device) => {
                device.release();
                info!("released capture device {}", self.device_id);
                true
            }
            None => false,
        }
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.release();
    }
}

/// Tries `device_ids` in order. The first device that opens and hands back a
/// frame wins; the others are released before moving on.
pub fn acquire(source: &dyn CaptureSource, device_ids: &[String]) -> Result<DeviceLease, FocusError> {
    let mut tried = Vec::with_capacity(device_ids.len());

    for device_id in device_ids {
        tried.push(device_id.clone());

        let mut device = match source.open(device_id) {
            Ok(device) => device,
            Err(err) => {
                warn!("capture device {device_id} failed to open: {err:#}");
                continue;
            }
        };

        match device.read_frame() {
            Ok(_) => {
                info!("capture device {device_id} acquired");
                return Ok(DeviceLease::new(device_id.clone(), device));
            }
            Err(err) => {
                warn!("capture device {device_id} opened but produced no frame: {err:#}");
                device.release();
            }
        }
    }

    Err(FocusError::DeviceUnavailable { tried })
}
