//! Core types for the simulation engine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process identifier
pub type Pid = u32;

/// Virtual time, in whole units
pub type Time = u64;

/// Lifecycle state of a simulated process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    /// Blocked on I/O. Reserved: no transition reaches it.
    Waiting,
    Terminated,
}

impl ProcessState {
    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (New, Ready) | (Ready, Running) | (Running, Ready) | (Running, Terminated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Waiting => "WAITING",
            ProcessState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A simulated process
///
/// Derived metrics stay `None` until the process terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: Pid,
    pub name: String,
    pub arrival_time: Time,
    pub burst_time: Time,      // Total CPU time required
    pub initial_priority: u32, // Lower value = higher precedence
    pub priority: u32,         // Current value, lowered by aging
    pub remaining_time: Time,
    pub state: ProcessState,

    // Metrics
    pub start_time: Option<Time>, // First time on the CPU, after switch overhead
    pub completion_time: Option<Time>,
    pub waiting_time: Time,
    pub turnaround_time: Option<Time>,
    pub response_time: Option<Time>,

    /// Context switches that ended with this process on the CPU
    pub switches_in: u32,
}

impl Process {
    pub fn new(
        id: Pid,
        name: impl Into<String>,
        arrival_time: Time,
        burst_time: Time,
        priority: u32,
    ) -> Self {
        Process {
            id,
            name: name.into(),
            arrival_time,
            burst_time,
            initial_priority: priority,
            priority,
            remaining_time: burst_time,
            state: ProcessState::New,
            start_time: None,
            completion_time: None,
            waiting_time: 0,
            turnaround_time: None,
            response_time: None,
            switches_in: 0,
        }
    }

    /// Consume up to `units` of remaining work
    ///
    /// Returns the amount actually consumed, which is less than `units` when the
    /// process finishes mid-request.
    ///
    /// # Panics
    /// If the process has no work left.
    pub fn advance(&mut self, units: Time) -> Time {
        assert!(
            self.remaining_time > 0,
            "process {} asked to run with no remaining time",
            self.id
        );
        let consumed = units.min(self.remaining_time);
        self.remaining_time -= consumed;
        consumed
    }

    /// Derive turnaround and response time
    ///
    /// # Panics
    /// If start or completion time is missing, or metrics were already finalized.
    pub fn finalize_metrics(&mut self) {
        assert!(
            self.turnaround_time.is_none(),
            "metrics for process {} finalized twice",
            self.id
        );
        let start = self
            .start_time
            .expect("process finalized without ever being dispatched");
        let completion = self
            .completion_time
            .expect("process finalized without a completion time");

        self.turnaround_time = Some(completion - self.arrival_time);
        self.response_time = Some(start - self.arrival_time);
    }

    /// Move along the lifecycle graph
    ///
    /// # Panics
    /// On an illegal transition.
    pub fn transition(&mut self, next: ProcessState) {
        assert!(
            self.state.can_transition_to(next),
            "illegal transition for process {}: {} -> {}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    /// Restore the initial snapshot so the workload can be run again
    pub fn reset(&mut self) {
        self.remaining_time = self.burst_time;
        self.priority = self.initial_priority;
        self.state = ProcessState::New;
        self.start_time = None;
        self.completion_time = None;
        self.waiting_time = 0;
        self.turnaround_time = None;
        self.response_time = None;
        self.switches_in = 0;
    }

    /// Independent, freshly reset copy for another run
    pub fn snapshot(&self) -> Self {
        let mut copy = self.clone();
        copy.reset();
        copy
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_time == 0
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ProcessState::Terminated
    }
}

/// What occupied the CPU during one time unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceSlot {
    Run(Pid),
    Idle,
    /// Context switch overhead
    Switch,
}

/// Contiguous run of identical slots, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSegment {
    pub slot: TraceSlot,
    pub start: Time,
    pub end: Time,
}

impl TraceSegment {
    pub fn len(&self) -> Time {
        self.end - self.start
    }
}

/// Per-time-unit execution record, append-only during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    origin: Time,
    slots: Vec<TraceSlot>,
}

impl Trace {
    /// Empty trace whose first slot covers `[origin, origin + 1)`
    pub fn new(origin: Time) -> Self {
        Trace {
            origin,
            slots: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, slot: TraceSlot, units: Time) {
        self.slots.extend(std::iter::repeat_n(slot, units as usize));
    }

    pub fn origin(&self) -> Time {
        self.origin
    }

    /// Time just after the last recorded slot
    pub fn end(&self) -> Time {
        self.origin + self.slots.len() as Time
    }

    pub fn slots(&self) -> &[TraceSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Units spent running processes (idle and switch slots excluded)
    pub fn busy_units(&self) -> Time {
        self.slots
            .iter()
            .filter(|s| matches!(s, TraceSlot::Run(_)))
            .count() as Time
    }

    /// Slot covering `time`, if it was recorded
    pub fn at(&self, time: Time) -> Option<TraceSlot> {
        let offset = time.checked_sub(self.origin)?;
        self.slots.get(offset as usize).copied()
    }

    /// Fold the trace into contiguous segments
    pub fn segments(&self) -> Vec<TraceSegment> {
        let mut segments: Vec<TraceSegment> = Vec::new();
        for (offset, slot) in self.slots.iter().enumerate() {
            let time = self.origin + offset as Time;
            match segments.last_mut() {
                Some(last) if last.slot == *slot && last.end == time => last.end = time + 1,
                _ => segments.push(TraceSegment {
                    slot: *slot,
                    start: time,
                    end: time + 1,
                }),
            }
        }
        segments
    }
}
