pub mod controller;
pub mod schedule;
pub mod state;

pub use controller::{IntervalScheduler, TimerSnapshot};
pub use schedule::TimerConfig;
pub use state::{TimerEvent, TimerMachine, TimerPhase};
