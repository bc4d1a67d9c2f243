pub mod counters;
pub mod observation;
pub mod session;

pub use counters::{Category, Emotion, SessionCounters};
pub use observation::{Observation, Region};
pub use session::{EndReason, HistoryDraft, HistoryRecord};
