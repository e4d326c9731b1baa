//! Fixtures shared by the policy and simulator tests

use crate::engine::SimulationEngine;
use crate::policies::SchedulingPolicy;
use crate::types::{Pid, Process, Time, Trace, TraceSlot};

/// Build a workload from `(id, arrival, burst, priority)` rows, named `P<id>`
pub(crate) fn workload(rows: &[(Pid, Time, Time, u32)]) -> Vec<Process> {
    rows.iter()
        .map(|&(id, arrival, burst, priority)| {
            Process::new(id, format!("P{id}"), arrival, burst, priority)
        })
        .collect()
}

/// Run `policy` to completion and check the post-run invariants
pub(crate) fn simulate<P: SchedulingPolicy>(
    policy: &mut P,
    processes: Vec<Process>,
    overhead: Time,
) -> SimulationEngine {
    let mut engine = SimulationEngine::new(processes, overhead).unwrap();
    policy.run(&mut engine);
    assert_run_invariants(&engine);
    engine
}

/// Invariants every finished run must satisfy, whatever the policy
pub(crate) fn assert_run_invariants(engine: &SimulationEngine) {
    assert!(engine.all_terminated(), "run ended with live processes");

    for p in engine.processes() {
        let completion = p.completion_time.unwrap();
        let start = p.start_time.unwrap();
        let turnaround = p.turnaround_time.unwrap();

        assert_eq!(p.remaining_time, 0, "P{} has work left", p.id);
        assert!(completion >= p.arrival_time + p.burst_time);
        assert!(start >= p.arrival_time);
        assert_eq!(turnaround, completion - p.arrival_time);
        assert_eq!(p.response_time, Some(start - p.arrival_time));
        assert_eq!(
            p.waiting_time,
            turnaround - p.burst_time,
            "P{} waiting time disagrees with turnaround",
            p.id
        );
    }

    let total_burst: Time = engine.processes().iter().map(|p| p.burst_time).sum();
    assert_eq!(engine.trace().busy_units(), total_burst);
}

/// Completion time of the process with id `pid`
pub(crate) fn completion(engine: &SimulationEngine, pid: Pid) -> Time {
    engine
        .processes()
        .iter()
        .find(|p| p.id == pid)
        .and_then(|p| p.completion_time)
        .unwrap()
}

/// Running pid for every slot, with idle and switch slots as `None`
pub(crate) fn run_pids(trace: &Trace) -> Vec<Option<Pid>> {
    trace
        .slots()
        .iter()
        .map(|slot| match slot {
            TraceSlot::Run(pid) => Some(*pid),
            TraceSlot::Idle | TraceSlot::Switch => None,
        })
        .collect()
}

/// Expand `(pid, units)` pairs into a per-slot pid list
pub(crate) fn expand(runs: &[(Pid, usize)]) -> Vec<Option<Pid>> {
    runs.iter()
        .flat_map(|&(pid, units)| std::iter::repeat_n(Some(pid), units))
        .collect()
}
