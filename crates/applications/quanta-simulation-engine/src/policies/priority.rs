use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::SchedulingPolicy;
use super::aging::AgingTimer;
use crate::config::AgingConfig;
use crate::engine::SimulationEngine;
use crate::types::Time;

/// Ready set ordering: lowest priority value, then earliest arrival, then list position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ReadyKey {
    priority: u32,
    arrival: Time,
    index: usize,
}

impl ReadyKey {
    fn of(engine: &SimulationEngine, index: usize) -> Self {
        let process = engine.process(index);
        ReadyKey {
            priority: process.priority,
            arrival: process.arrival_time,
            index,
        }
    }
}

/// Priority scheduling, lower value first
///
/// The non-preemptive variant runs the selected process to completion. The
/// preemptive variant re-evaluates every time unit and switches only when a ready
/// process has a strictly lower value than the running one.
#[derive(Debug, Clone)]
pub struct PriorityScheduler {
    preemptive: bool,
    aging: AgingConfig,
}

impl PriorityScheduler {
    pub fn new(preemptive: bool, aging: AgingConfig) -> Self {
        PriorityScheduler { preemptive, aging }
    }

    pub fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    /// Lower the priority value of every ready process that had arrived by `tick`
    fn age(engine: &mut SimulationEngine, ready: &mut BTreeSet<ReadyKey>, tick: Time) {
        let waiting: Vec<ReadyKey> = std::mem::take(ready).into_iter().collect();

        for key in waiting {
            let process = engine.process_mut(key.index);
            if process.arrival_time <= tick && process.priority > 0 {
                process.priority -= 1;
                trace!(pid = process.id, priority = process.priority, tick, "aged");
            }
            ready.insert(ReadyKey {
                priority: process.priority,
                ..key
            });
        }
    }
}

impl SchedulingPolicy for PriorityScheduler {
    fn name(&self) -> String {
        let kind = if self.preemptive {
            "Preemptive Priority"
        } else {
            "Non-Preemptive Priority"
        };
        if self.aging.enabled {
            format!("{kind} with Aging")
        } else {
            kind.to_string()
        }
    }

    fn run(&mut self, engine: &mut SimulationEngine) {
        let mut ready = BTreeSet::new();
        let mut running: Option<usize> = None;
        let mut aging = AgingTimer::new(&self.aging, engine.current_time());

        loop {
            for index in engine.admit_arrivals() {
                ready.insert(ReadyKey::of(engine, index));
            }
            if let Some(timer) = aging.as_mut() {
                for tick in timer.due(engine.current_time()) {
                    Self::age(engine, &mut ready, tick);
                }
            }

            if let Some(current) = running {
                let running_priority = engine.process(current).priority;
                let challenger = ready
                    .first()
                    .copied()
                    .filter(|top| top.priority < running_priority);

                if let Some(top) = challenger {
                    ready.remove(&top);
                    debug!(
                        preempted = engine.process(current).id,
                        by = engine.process(top.index).id,
                        time = engine.current_time(),
                        "preemption"
                    );
                    engine.preempt(current);
                    ready.insert(ReadyKey::of(engine, current));
                    engine.switch_to(top.index);
                    running = Some(top.index);
                }
            }

            let current = match running {
                Some(index) => index,
                None => match ready.pop_first() {
                    Some(top) => {
                        engine.switch_to(top.index);
                        top.index
                    }
                    None => {
                        if engine.idle_until_next_arrival().is_none() {
                            break;
                        }
                        continue;
                    }
                },
            };

            let slice = if self.preemptive {
                1
            } else {
                engine.process(current).remaining_time
            };
            engine.execute(current, slice);

            if engine.process(current).is_complete() {
                engine.complete(current);
                running = None;
            } else {
                running = Some(current);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgingCadence;
    use crate::test_support::{completion, expand, run_pids, simulate, workload};

    fn aging_every(interval: Time) -> AgingConfig {
        AgingConfig {
            enabled: true,
            interval,
            cadence: AgingCadence::Crossed,
        }
    }

    #[test]
    fn test_non_preemptive_runs_to_completion() {
        let rows = [(1, 0, 5, 3), (2, 1, 3, 1), (3, 2, 2, 2)];

        for aging in [AgingConfig::disabled(), AgingConfig::default()] {
            let mut policy = PriorityScheduler::new(false, aging);
            let engine = simulate(&mut policy, workload(&rows), 0);

            assert_eq!(run_pids(engine.trace()), expand(&[(1, 5), (2, 3), (3, 2)]));
            let waits: Vec<Time> = engine.processes().iter().map(|p| p.waiting_time).collect();
            assert_eq!(waits, vec![0, 4, 6]);
        }
    }

    #[test]
    fn test_preemption_on_higher_priority_arrival() {
        let mut policy = PriorityScheduler::new(true, AgingConfig::disabled());
        let engine = simulate(
            &mut policy,
            workload(&[(1, 0, 8, 3), (2, 1, 4, 1), (3, 5, 2, 2)]),
            0,
        );

        assert_eq!(
            run_pids(engine.trace()),
            expand(&[(1, 1), (2, 4), (3, 2), (1, 7)])
        );
        assert_eq!(completion(&engine, 1), 14);
        assert_eq!(engine.processes()[0].waiting_time, 6);
        assert_eq!(engine.processes()[1].response_time, Some(0));
        assert_eq!(engine.context_switches(), 3);
    }

    #[test]
    fn test_equal_priority_never_preempts() {
        let mut policy = PriorityScheduler::new(true, AgingConfig::disabled());
        let engine = simulate(&mut policy, workload(&[(1, 0, 4, 2), (2, 1, 2, 2)]), 0);

        assert_eq!(run_pids(engine.trace()), expand(&[(1, 4), (2, 2)]));
        assert_eq!(engine.context_switches(), 1);
    }

    #[test]
    fn test_ties_break_by_arrival_then_position() {
        let mut policy = PriorityScheduler::new(false, AgingConfig::disabled());
        let engine = simulate(
            &mut policy,
            workload(&[(7, 0, 1, 0), (3, 1, 1, 1), (9, 1, 1, 1), (1, 0, 1, 1)]),
            0,
        );

        assert_eq!(
            run_pids(engine.trace()),
            vec![Some(7), Some(1), Some(3), Some(9)]
        );
    }

    #[test]
    fn test_aging_reorders_waiting_processes() {
        let mut policy = PriorityScheduler::new(false, aging_every(3));
        let engine = simulate(
            &mut policy,
            workload(&[(1, 0, 10, 5), (2, 1, 2, 1), (3, 2, 2, 1)]),
            0,
        );

        assert_eq!(run_pids(engine.trace()), expand(&[(1, 10), (2, 2), (3, 2)]));
        // Three ticks passed while P1 ran; both floored at zero
        assert_eq!(engine.processes()[1].priority, 0);
        assert_eq!(engine.processes()[2].priority, 0);
        // The running process is never aged
        assert_eq!(engine.processes()[0].priority, 5);
    }

    #[test]
    fn test_aging_bounds_starvation() {
        let rows = [
            (1, 0, 4, 0),
            (2, 1, 2, 3),
            (3, 2, 4, 1),
            (4, 6, 4, 1),
            (5, 10, 4, 1),
            (6, 14, 4, 1),
        ];

        let mut starving = PriorityScheduler::new(false, AgingConfig::disabled());
        let engine = simulate(&mut starving, workload(&rows), 0);
        assert_eq!(completion(&engine, 2), 22);

        let mut aged = PriorityScheduler::new(false, aging_every(2));
        let engine = simulate(&mut aged, workload(&rows), 0);
        assert_eq!(completion(&engine, 2), 10);
    }

    #[test]
    fn test_exact_multiple_cadence_misses_jumped_ticks() {
        let rows = [(1, 0, 4, 0), (2, 1, 1, 2), (3, 1, 1, 1)];
        let exact = AgingConfig {
            enabled: true,
            interval: 3,
            cadence: AgingCadence::ExactMultiple,
        };

        // The clock jumps 0 -> 4, skipping the tick at 3
        let engine = simulate(&mut PriorityScheduler::new(false, exact), workload(&rows), 0);
        assert_eq!(engine.processes()[1].priority, 2);

        let engine = simulate(
            &mut PriorityScheduler::new(false, aging_every(3)),
            workload(&rows),
            0,
        );
        assert_eq!(engine.processes()[1].priority, 1);
    }

    #[test]
    fn test_aged_process_preempts_and_is_overtaken_back() {
        let mut policy = PriorityScheduler::new(true, aging_every(1));
        let engine = simulate(&mut policy, workload(&[(1, 0, 10, 2), (2, 1, 3, 4)]), 0);

        // P2 reaches 1 at time 3 and takes the CPU; P1 ages to 0 by time 5 and
        // takes it back. Once both sit at 0 the tie keeps P1 running.
        assert_eq!(
            run_pids(engine.trace()),
            expand(&[(1, 3), (2, 2), (1, 7), (2, 1)])
        );
        assert_eq!(completion(&engine, 1), 12);
        assert_eq!(completion(&engine, 2), 13);
        assert_eq!(engine.processes()[0].waiting_time, 2);
        assert_eq!(engine.processes()[1].waiting_time, 9);
        assert_eq!(engine.context_switches(), 3);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let rows = [(1, 0, 6, 2), (2, 2, 3, 1), (3, 3, 4, 2), (4, 5, 2, 0)];

        for preemptive in [false, true] {
            let mut policy = PriorityScheduler::new(preemptive, aging_every(2));
            let first = simulate(&mut policy, workload(&rows), 1);
            let second = simulate(&mut policy, workload(&rows), 1);

            assert_eq!(first.trace(), second.trace());
            assert_eq!(first.processes(), second.processes());
            assert_eq!(first.context_switches(), second.context_switches());
        }
    }
}
