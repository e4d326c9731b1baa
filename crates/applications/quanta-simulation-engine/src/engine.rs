//! Simulation clock and process set shared by every scheduling policy
//!
//! The engine owns the processes, the virtual clock, the context switch counter and the
//! execution trace for a single run. Policies hold their own ready queues and drive the
//! engine through a small set of operations:
//!
//! - `admit_arrivals`: NEW -> READY for everything that has arrived
//! - `switch_to`: put a process on the CPU, charging overhead on a real switch
//! - `execute`: run the process on the CPU for a bounded slice
//! - `complete`: finalize a finished process
//! - `idle_until_next_arrival`: skip an empty CPU forward to the next arrival
//!
//! Every clock advance goes through `accrue_waiting`, so bulk jumps charge waiting
//! time exactly as unit stepping would.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::{Result, SimError};
use crate::types::{Process, ProcessState, Time, Trace, TraceSlot};

/// Clock, process set and bookkeeping for one run
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    processes: Vec<Process>,
    current_time: Time,
    context_switch_overhead: Time,
    context_switches: u32,
    /// Process that most recently held the CPU; cleared when the CPU idles
    on_cpu: Option<usize>,
    terminated: usize,
    trace: Trace,
}

impl SimulationEngine {
    /// Build an engine over `processes`, resetting each one to its initial snapshot
    ///
    /// The clock starts at the earliest arrival.
    pub fn new(mut processes: Vec<Process>, context_switch_overhead: Time) -> Result<Self> {
        let mut seen = HashSet::with_capacity(processes.len());
        for process in &mut processes {
            if process.burst_time == 0 {
                return Err(SimError::InvalidBurst { pid: process.id });
            }
            if !seen.insert(process.id) {
                return Err(SimError::DuplicateProcess(process.id));
            }
            process.reset();
        }

        let origin = processes.iter().map(|p| p.arrival_time).min().unwrap_or(0);

        Ok(SimulationEngine {
            processes,
            current_time: origin,
            context_switch_overhead,
            context_switches: 0,
            on_cpu: None,
            terminated: 0,
            trace: Trace::new(origin),
        })
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn process(&self, index: usize) -> &Process {
        &self.processes[index]
    }

    pub(crate) fn process_mut(&mut self, index: usize) -> &mut Process {
        &mut self.processes[index]
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn context_switches(&self) -> u32 {
        self.context_switches
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn all_terminated(&self) -> bool {
        self.terminated == self.processes.len()
    }

    /// Move every arrived NEW process to READY, in process-list order
    ///
    /// Returns the indices admitted by this call.
    pub fn admit_arrivals(&mut self) -> Vec<usize> {
        let now = self.current_time;
        let mut admitted = Vec::new();

        for (index, process) in self.processes.iter_mut().enumerate() {
            if process.state == ProcessState::New && process.arrival_time <= now {
                process.transition(ProcessState::Ready);
                trace!(pid = process.id, time = now, "admitted");
                admitted.push(index);
            }
        }

        admitted
    }

    /// Earliest arrival among processes not yet admitted
    pub fn next_arrival(&self) -> Option<Time> {
        self.processes
            .iter()
            .filter(|p| p.state == ProcessState::New)
            .map(|p| p.arrival_time)
            .min()
    }

    /// Jump an empty CPU forward to the next arrival
    ///
    /// Records one idle slot per skipped unit. Returns `None` once no arrivals remain,
    /// which for a policy with empty queues means the run is over.
    pub fn idle_until_next_arrival(&mut self) -> Option<Time> {
        let next = self.next_arrival()?;

        if next > self.current_time {
            let gap = next - self.current_time;
            debug!(from = self.current_time, to = next, "cpu idle");
            self.trace.record(TraceSlot::Idle, gap);
            self.advance_clock(gap);
        }
        self.on_cpu = None;

        Some(next)
    }

    /// Put `to` on the CPU
    ///
    /// Switching away from a different process counts as a context switch and costs
    /// the configured overhead. A still-running outgoing process goes back to READY
    /// before the overhead is spent, so it waits through it like everyone else. The
    /// first dispatch of a process records its start time after the overhead.
    pub fn switch_to(&mut self, to: usize) {
        if let Some(from) = self.on_cpu.filter(|&from| from != to) {
            if self.processes[from].state == ProcessState::Running {
                self.processes[from].transition(ProcessState::Ready);
            }

            self.context_switches += 1;
            self.processes[to].switches_in += 1;

            if self.context_switch_overhead > 0 {
                self.trace.record(TraceSlot::Switch, self.context_switch_overhead);
                self.advance_clock(self.context_switch_overhead);
            }

            debug!(
                from = self.processes[from].id,
                to = self.processes[to].id,
                time = self.current_time,
                "context switch"
            );
        }

        let now = self.current_time;
        let process = &mut self.processes[to];
        if process.state != ProcessState::Running {
            process.transition(ProcessState::Running);
        }
        if process.start_time.is_none() {
            process.start_time = Some(now);
        }
        self.on_cpu = Some(to);
    }

    /// Return a running process to READY without dispatching anything else
    pub fn preempt(&mut self, index: usize) {
        let process = &mut self.processes[index];
        if process.state == ProcessState::Running {
            process.transition(ProcessState::Ready);
        }
    }

    /// Run the process on the CPU for up to `units`
    ///
    /// Returns the units consumed. The clock advances by that amount and everyone
    /// else who was eligible accrues waiting time.
    ///
    /// # Panics
    /// If the process is not RUNNING or has nothing left to run.
    pub fn execute(&mut self, index: usize, units: Time) -> Time {
        let process = &mut self.processes[index];
        assert_eq!(
            process.state,
            ProcessState::Running,
            "process {} executed while {}",
            process.id,
            process.state
        );

        let consumed = process.advance(units);
        let pid = process.id;
        self.trace.record(TraceSlot::Run(pid), consumed);
        self.advance_clock(consumed);

        trace!(pid, consumed, time = self.current_time, "slice finished");
        consumed
    }

    /// Mark a finished process TERMINATED and derive its metrics
    pub fn complete(&mut self, index: usize) {
        let now = self.current_time;
        let process = &mut self.processes[index];
        process.completion_time = Some(now);
        process.finalize_metrics();
        process.transition(ProcessState::Terminated);
        self.terminated += 1;

        debug!(
            pid = process.id,
            time = now,
            waiting = process.waiting_time,
            "process terminated"
        );
    }

    /// Charge the window `[now, now + units)` to everyone waiting for the CPU
    ///
    /// READY processes accrue the whole window. Processes still NEW whose arrival
    /// falls inside the window accrue the part after their arrival, since they are
    /// only admitted once the policy regains control.
    pub fn accrue_waiting(&mut self, units: Time) {
        let start = self.current_time;
        let end = start + units;

        for process in &mut self.processes {
            match process.state {
                ProcessState::Ready => process.waiting_time += units,
                ProcessState::New if process.arrival_time < end => {
                    process.waiting_time += end - process.arrival_time.max(start);
                }
                _ => {}
            }
        }
    }

    fn advance_clock(&mut self, units: Time) {
        self.accrue_waiting(units);
        self.current_time += units;
    }

    /// Hand back the processes, trace and switch count
    pub fn into_parts(self) -> (Vec<Process>, Trace, u32) {
        (self.processes, self.trace, self.context_switches)
    }
}
