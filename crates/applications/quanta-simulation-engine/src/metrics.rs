//! Summary metrics for a finished run

use serde::{Deserialize, Serialize};

use crate::types::{Process, Time};

/// Averages and utilization over the terminated processes of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingMetrics {
    pub average_waiting_time: f64,
    pub average_turnaround_time: f64,
    pub average_response_time: f64,
    /// Percent of the makespan spent running processes
    pub cpu_utilization: f64,
    /// Completed processes per time unit
    pub throughput: f64,
    pub context_switches: u32,
    /// Last completion minus first arrival
    pub makespan: Time,
    pub completed: usize,
}

/// Reduce a process set to summary metrics
///
/// Only terminated processes count. An empty set yields all zeros.
pub fn compute_metrics(processes: &[Process]) -> SchedulingMetrics {
    let finished: Vec<&Process> = processes.iter().filter(|p| p.is_terminated()).collect();
    if finished.is_empty() {
        return SchedulingMetrics::default();
    }

    let count = finished.len() as f64;
    let average = |value: fn(&Process) -> Time| {
        finished.iter().map(|p| value(p)).sum::<Time>() as f64 / count
    };

    let first_arrival = finished.iter().map(|p| p.arrival_time).min().unwrap_or(0);
    let last_completion = finished
        .iter()
        .filter_map(|p| p.completion_time)
        .max()
        .unwrap_or(first_arrival);
    let makespan = last_completion - first_arrival;
    let busy: Time = finished.iter().map(|p| p.burst_time).sum();

    let (cpu_utilization, throughput) = if makespan > 0 {
        (
            busy as f64 / makespan as f64 * 100.0,
            count / makespan as f64,
        )
    } else {
        (0.0, 0.0)
    };

    SchedulingMetrics {
        average_waiting_time: average(|p| p.waiting_time),
        average_turnaround_time: average(|p| p.turnaround_time.unwrap_or(0)),
        average_response_time: average(|p| p.response_time.unwrap_or(0)),
        cpu_utilization,
        throughput,
        context_switches: finished.iter().map(|p| p.switches_in).sum(),
        makespan,
        completed: finished.len(),
    }
}
