use tracing::trace;

use super::SchedulingPolicy;
use super::queue::ReadyQueue;
use crate::engine::SimulationEngine;
use crate::types::Time;

/// Round robin over a single FIFO queue
///
/// A process whose slice ends unfinished is re-queued behind the processes that
/// arrived during that slice.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    quantum: Time,
}

impl RoundRobin {
    pub fn new(quantum: Time) -> Self {
        assert!(quantum > 0, "round robin quantum must be positive");
        RoundRobin { quantum }
    }

    pub fn quantum(&self) -> Time {
        self.quantum
    }
}

impl SchedulingPolicy for RoundRobin {
    fn name(&self) -> String {
        format!("Round Robin (Quantum={})", self.quantum)
    }

    fn run(&mut self, engine: &mut SimulationEngine) {
        let mut ready = ReadyQueue::new(engine.len());
        let mut unfinished: Option<usize> = None;

        loop {
            for index in engine.admit_arrivals() {
                ready.push(index);
            }
            if let Some(index) = unfinished.take() {
                engine.preempt(index);
                ready.push(index);
            }

            let Some(next) = ready.pop() else {
                if engine.idle_until_next_arrival().is_none() {
                    break;
                }
                continue;
            };

            engine.switch_to(next);
            engine.execute(next, self.quantum);

            if engine.process(next).is_complete() {
                engine.complete(next);
            } else {
                trace!(pid = engine.process(next).id, "quantum expired");
                unfinished = Some(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{completion, expand, run_pids, simulate, workload};

    #[test]
    fn test_two_equal_processes_alternate() {
        let mut policy = RoundRobin::new(2);
        let engine = simulate(&mut policy, workload(&[(1, 0, 4, 0), (2, 0, 4, 0)]), 0);

        assert_eq!(
            run_pids(engine.trace()),
            expand(&[(1, 2), (2, 2), (1, 2), (2, 2)])
        );
        assert_eq!(completion(&engine, 1), 6);
        assert_eq!(completion(&engine, 2), 8);

        let total_wait: Time = engine.processes().iter().map(|p| p.waiting_time).sum();
        assert_eq!(total_wait, 6);
    }

    #[test]
    fn test_single_process() {
        let mut policy = RoundRobin::new(3);
        let engine = simulate(&mut policy, workload(&[(1, 0, 10, 0)]), 0);

        let p = &engine.processes()[0];
        assert_eq!(p.waiting_time, 0);
        assert_eq!(p.turnaround_time, Some(10));
        // Re-dispatching the only process is not a switch
        assert_eq!(engine.context_switches(), 0);
    }

    #[test]
    fn test_arrivals_queue_ahead_of_preempted_process() {
        let mut policy = RoundRobin::new(3);
        let engine = simulate(&mut policy, workload(&[(1, 0, 5, 0), (2, 1, 2, 0)]), 0);

        // P2 arrives during P1's first slice and runs before P1 resumes
        assert_eq!(run_pids(engine.trace()), expand(&[(1, 3), (2, 2), (1, 2)]));
        assert_eq!(engine.processes()[1].waiting_time, 2);
    }

    #[test]
    fn test_fairness_bounds_waiting_between_slices() {
        let mut policy = RoundRobin::new(2);
        let engine = simulate(
            &mut policy,
            workload(&[(1, 0, 9, 0), (2, 0, 7, 0), (3, 0, 5, 0), (4, 0, 3, 0)]),
            0,
        );

        // With n ready processes no one waits more than (n - 1) * quantum in a row
        let slots = run_pids(engine.trace());
        for pid in 1..=4 {
            let positions: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| **slot == Some(pid))
                .map(|(i, _)| i)
                .collect();
            for pair in positions.windows(2) {
                assert!(pair[1] - pair[0] - 1 <= 3 * 2);
            }
        }
    }

    #[test]
    fn test_later_tie_break_waits_at_least_as_long() {
        let mut policy = RoundRobin::new(2);
        let engine = simulate(
            &mut policy,
            workload(&[(1, 0, 5, 0), (2, 0, 5, 0), (3, 0, 5, 0)]),
            0,
        );

        let waits: Vec<Time> = engine.processes().iter().map(|p| p.waiting_time).collect();
        assert_eq!(waits, vec![8, 9, 10]);
    }

    #[test]
    fn test_idle_gap_between_arrivals() {
        let mut policy = RoundRobin::new(4);
        let engine = simulate(&mut policy, workload(&[(1, 0, 2, 0), (2, 5, 2, 0)]), 1);

        assert_eq!(
            run_pids(engine.trace()),
            vec![Some(1), Some(1), None, None, None, Some(2), Some(2)]
        );
        // The CPU was idle in between, so no switch is charged
        assert_eq!(engine.context_switches(), 0);
        assert_eq!(completion(&engine, 2), 7);
    }

    #[test]
    fn test_overhead_lengthens_the_run() {
        let rows = [(1, 0, 4, 0), (2, 0, 4, 0), (3, 1, 3, 0)];

        let plain = simulate(&mut RoundRobin::new(2), workload(&rows), 0);
        let costly = simulate(&mut RoundRobin::new(2), workload(&rows), 1);

        assert!(costly.current_time() > plain.current_time());
        assert_eq!(
            costly.current_time() - plain.current_time(),
            Time::from(costly.context_switches())
        );
    }
}
