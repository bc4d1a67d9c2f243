//! The real-time session monitor: capture device, debouncing and the
//! worker loop that ties them to the bridge and the history store.

pub mod controller;
pub mod device;
pub mod distraction;
mod loop_worker;
pub mod session;
pub mod smoother;

pub use controller::{MonitorController, SessionEndHook, StartOutcome, StopOutcome};
pub use device::{CaptureDevice, CaptureSource, DeviceLease};
pub use distraction::{DistractionTimer, RepeatPolicy};
pub use session::{MonitorConfig, MonitorPhase, MonitorSnapshot};
pub use smoother::LabelSmoother;
