use serde::{Deserialize, Serialize};

use super::TimerConfig;

/// Seconds before the end of a focus chunk at which the break warning goes out.
pub const BREAK_WARNING_SECS: u64 = 10;
/// Seconds before the end of a rest at which the back-to-work warning goes out.
pub const BREAK_END_WARNING_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimerEvent {
    TimerStarted,
    BreakStartingSoon,
    BreakStarted,
    BreakEndingSoon,
    BreakEnded,
    TimerComplete,
}

impl TimerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerEvent::TimerStarted => "timer_started",
            TimerEvent::BreakStartingSoon => "break_starting_soon",
            TimerEvent::BreakStarted => "break_started",
            TimerEvent::BreakEndingSoon => "break_ending_soon",
            TimerEvent::BreakEnded => "break_ended",
            TimerEvent::TimerComplete => "timer_complete",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Focus {
        cycle: u32,
        duration: u64,
        elapsed: u64,
    },
    Rest {
        cycle: u32,
        duration: u64,
        elapsed: u64,
    },
    Complete,
}

impl TimerPhase {
    pub fn cycle(&self) -> u32 {
        match self {
            TimerPhase::Focus { cycle, .. } | TimerPhase::Rest { cycle, .. } => *cycle,
            TimerPhase::Idle | TimerPhase::Complete => 0,
        }
    }

    pub fn duration(&self) -> u64 {
        match self {
            TimerPhase::Focus { duration, .. } | TimerPhase::Rest { duration, .. } => *duration,
            TimerPhase::Idle | TimerPhase::Complete => 0,
        }
    }

    pub fn elapsed(&self) -> u64 {
        match self {
            TimerPhase::Focus { elapsed, .. } | TimerPhase::Rest { elapsed, .. } => *elapsed,
            TimerPhase::Idle | TimerPhase::Complete => 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.duration().saturating_sub(self.elapsed())
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TimerPhase::Focus { .. } | TimerPhase::Rest { .. })
    }
}

/// The focus/rest cycle as a value. One [`TimerMachine::step`] is one second;
/// nothing here sleeps or reads a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerMachine {
    config: TimerConfig,
    phase: TimerPhase,
    /// Focus budget not yet handed to a chunk.
    unscheduled: u64,
    /// Whether the current phase has already sent its "soon" warning.
    warned: bool,
}

impl TimerMachine {
    pub fn start(config: TimerConfig) -> (Self, Vec<TimerEvent>) {
        let first = config.check_interval.min(config.focus_total);
        let mut machine = Self {
            config,
            phase: TimerPhase::Focus {
                cycle: 0,
                duration: first,
                elapsed: 0,
            },
            unscheduled: config.focus_total - first,
            warned: false,
        };

        let mut events = vec![TimerEvent::TimerStarted];
        if first == 0 {
            machine.phase = TimerPhase::Complete;
            events.push(TimerEvent::TimerComplete);
            return (machine, events);
        }
        events.extend(machine.warning());
        (machine, events)
    }

    pub fn step(self) -> (Self, Vec<TimerEvent>) {
        let mut next = self;
        let mut events = Vec::new();

        match self.phase {
            TimerPhase::Idle | TimerPhase::Complete => return (self, events),
            TimerPhase::Focus {
                cycle,
                duration,
                elapsed,
            } => {
                let elapsed = elapsed + 1;
                if elapsed < duration {
                    next.phase = TimerPhase::Focus {
                        cycle,
                        duration,
                        elapsed,
                    };
                } else if next.unscheduled > 0 {
                    next.phase = TimerPhase::Rest {
                        cycle,
                        duration: next.config.rest_duration,
                        elapsed: 0,
                    };
                    next.warned = false;
                    events.push(TimerEvent::BreakStarted);
                } else {
                    next.phase = TimerPhase::Complete;
                    events.push(TimerEvent::TimerComplete);
                    return (next, events);
                }
            }
            TimerPhase::Rest {
                cycle,
                duration,
                elapsed,
            } => {
                let elapsed = elapsed + 1;
                if elapsed < duration {
                    next.phase = TimerPhase::Rest {
                        cycle,
                        duration,
                        elapsed,
                    };
                } else {
                    let chunk = next.config.check_interval.min(next.unscheduled);
                    next.unscheduled -= chunk;
                    next.phase = TimerPhase::Focus {
                        cycle: cycle + 1,
                        duration: chunk,
                        elapsed: 0,
                    };
                    next.warned = false;
                    events.push(TimerEvent::BreakEnded);
                }
            }
        }

        events.extend(next.warning());
        (next, events)
    }

    /// Emits the phase's "soon" warning the first time its threshold is reached.
    fn warning(&mut self) -> Option<TimerEvent> {
        if self.warned {
            return None;
        }
        let event = match self.phase {
            TimerPhase::Focus { .. }
                if self.unscheduled > 0 && self.phase.remaining() <= BREAK_WARNING_SECS =>
            {
                TimerEvent::BreakStartingSoon
            }
            TimerPhase::Rest { .. } if self.phase.remaining() <= BREAK_END_WARNING_SECS => {
                TimerEvent::BreakEndingSoon
            }
            _ => return None,
        };
        self.warned = true;
        Some(event)
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn is_complete(&self) -> bool {
        self.phase == TimerPhase::Complete
    }

    /// Focus seconds still ahead, including the rest of the current chunk.
    pub fn focus_remaining(&self) -> u64 {
        match self.phase {
            TimerPhase::Focus { .. } => self.unscheduled + self.phase.remaining(),
            TimerPhase::Rest { .. } => self.unscheduled,
            TimerPhase::Idle => self.config.focus_total,
            TimerPhase::Complete => 0,
        }
    }
}
