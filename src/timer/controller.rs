use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::bridge::{EventBridge, Notification, OutboundMessage};
use crate::error::FocusError;
use crate::utils::pacing::{lock, sleep_unless_cancelled};

use super::{TimerConfig, TimerEvent, TimerMachine, TimerPhase};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub running: bool,
    pub config: Option<TimerConfig>,
    pub phase: TimerPhase,
    pub cycle: u32,
    pub phase_duration: u64,
    pub elapsed: u64,
    pub time_remaining: u64,
    pub focus_remaining: u64,
    pub total_chunks: u32,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerSnapshot {
    fn from_machine(machine: &TimerMachine, running: bool, started_at: Option<DateTime<Utc>>) -> Self {
        let phase = machine.phase();
        Self {
            running,
            config: Some(machine.config()),
            phase,
            cycle: phase.cycle(),
            phase_duration: phase.duration(),
            elapsed: phase.elapsed(),
            time_remaining: phase.remaining(),
            focus_remaining: machine.focus_remaining(),
            total_chunks: machine.config().total_chunks(),
            started_at,
        }
    }
}

struct ActiveRun {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs the focus/rest machine on its own thread, one step per `tick_interval`.
///
/// At most one run exists at a time: starting again cancels and joins the
/// previous run first.
#[derive(Clone)]
pub struct IntervalScheduler {
    run: Arc<Mutex<Option<ActiveRun>>>,
    snapshot: Arc<Mutex<TimerSnapshot>>,
    live_runs: Arc<AtomicUsize>,
    bridge: EventBridge,
    tick_interval: Duration,
}

impl IntervalScheduler {
    pub fn new(bridge: EventBridge, tick_interval: Duration) -> Self {
        Self {
            run: Arc::new(Mutex::new(None)),
            snapshot: Arc::new(Mutex::new(TimerSnapshot::default())),
            live_runs: Arc::new(AtomicUsize::new(0)),
            bridge,
            tick_interval,
        }
    }

    pub fn start(&self, config: TimerConfig) -> Result<TimerSnapshot, FocusError> {
        config.validate()?;

        let mut run = lock(&self.run);
        if let Some(previous) = run.take() {
            info!("restarting focus timer; stopping previous run");
            finish(previous);
        }

        let started_at = Utc::now();
        let (machine, events) = TimerMachine::start(config);
        let snapshot = TimerSnapshot::from_machine(&machine, !machine.is_complete(), Some(started_at));
        *lock(&self.snapshot) = snapshot.clone();
        publish_events(&self.bridge, &events, &machine);

        let token = CancellationToken::new();
        let worker = TimerWorker {
            machine,
            token: token.clone(),
            snapshot: self.snapshot.clone(),
            live_runs: self.live_runs.clone(),
            bridge: self.bridge.clone(),
            tick_interval: self.tick_interval,
            started_at,
        };

        self.live_runs.fetch_add(1, Ordering::SeqCst);
        let handle = match thread::Builder::new()
            .name("spirit-timer".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                self.live_runs.fetch_sub(1, Ordering::SeqCst);
                lock(&self.snapshot).running = false;
                return Err(FocusError::Internal(format!("failed to spawn timer thread: {err}")));
            }
        };

        info!(
            "focus timer started: {}s focus in {} chunk(s), {}s rests",
            config.focus_total,
            config.total_chunks(),
            config.rest_duration
        );
        *run = Some(ActiveRun { token, handle });
        Ok(snapshot)
    }

    /// Cancels the current run and waits for its thread. Returns `false` when
    /// nothing was running.
    pub fn stop(&self) -> bool {
        let previous = lock(&self.run).take();
        match previous {
            Some(previous) => {
                finish(previous);
                lock(&self.snapshot).running = false;
                info!("focus timer stopped");
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        lock(&self.snapshot).clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.snapshot).running
    }

    /// Number of runner threads currently alive. Never more than one.
    pub fn live_runs(&self) -> usize {
        self.live_runs.load(Ordering::SeqCst)
    }
}

fn finish(run: ActiveRun) {
    run.token.cancel();
    if run.handle.join().is_err() {
        error!("focus timer thread panicked");
    }
}

/// `machine` is the state after `events` fired.
fn publish_events(bridge: &EventBridge, events: &[TimerEvent], machine: &TimerMachine) {
    let now = Utc::now();
    let remaining = machine.phase().remaining();
    for event in events {
        info!("timer event: {}", event.as_str());
        bridge.publish(OutboundMessage::Notification(Notification::for_event(
            *event, remaining, now,
        )));
    }
}

struct TimerWorker {
    machine: TimerMachine,
    token: CancellationToken,
    snapshot: Arc<Mutex<TimerSnapshot>>,
    live_runs: Arc<AtomicUsize>,
    bridge: EventBridge,
    tick_interval: Duration,
    started_at: DateTime<Utc>,
}

impl TimerWorker {
    fn run(mut self) {
        while !self.machine.is_complete() {
            if !sleep_unless_cancelled(self.tick_interval, &self.token) {
                break;
            }

            let (next, events) = self.machine.step();
            self.machine = next;

            publish_events(&self.bridge, &events, &self.machine);
            let running = !self.machine.is_complete();
            *lock(&self.snapshot) =
                TimerSnapshot::from_machine(&self.machine, running, Some(self.started_at));
        }

        lock(&self.snapshot).running = false;
        self.live_runs.fetch_sub(1, Ordering::SeqCst);
    }
}
