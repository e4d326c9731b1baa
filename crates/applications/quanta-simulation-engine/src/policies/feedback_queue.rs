use tracing::debug;

use super::SchedulingPolicy;
use super::aging::AgingTimer;
use super::queue::ReadyQueue;
use crate::config::AgingConfig;
use crate::engine::SimulationEngine;
use crate::types::{ProcessState, Time};

/// Adaptive multilevel feedback queue
///
/// New processes enter level 0. A process that uses its whole quantum without
/// finishing drops one level. With aging on, every tick bumps a counter on each
/// ready process; at the threshold the process moves one level up, to the tail of
/// that queue.
#[derive(Debug, Clone)]
pub struct MultilevelFeedbackQueue {
    quanta: Vec<Time>,
    aging: AgingConfig,
    aging_threshold: u32,
}

/// Per-run queue state
struct Levels {
    queues: Vec<ReadyQueue>,
    level_of: Vec<usize>,
    time_in_level: Vec<u32>,
}

impl Levels {
    fn new(levels: usize, processes: usize) -> Self {
        Levels {
            queues: (0..levels).map(|_| ReadyQueue::new(processes)).collect(),
            level_of: vec![0; processes],
            time_in_level: vec![0; processes],
        }
    }

    fn enqueue(&mut self, index: usize) {
        self.queues[self.level_of[index]].push(index);
    }

    /// Pop from the lowest non-empty level
    fn next(&mut self) -> Option<(usize, usize)> {
        self.queues
            .iter_mut()
            .enumerate()
            .find_map(|(level, queue)| queue.pop().map(|index| (level, index)))
    }
}

impl MultilevelFeedbackQueue {
    pub fn new(quanta: Vec<Time>, aging: AgingConfig, aging_threshold: u32) -> Self {
        assert!(!quanta.is_empty(), "feedback queue needs at least one level");
        assert!(
            quanta.iter().all(|&q| q > 0),
            "feedback queue quanta must be positive"
        );
        MultilevelFeedbackQueue {
            quanta,
            aging,
            aging_threshold,
        }
    }

    pub fn quanta(&self) -> &[Time] {
        &self.quanta
    }

    /// Apply one aging tick to every queued process that had arrived by `tick`
    ///
    /// Levels are walked top-down so a process promoted during this tick is not
    /// counted again in its new level.
    fn age(&self, engine: &SimulationEngine, levels: &mut Levels, tick: Time) {
        for level in 0..levels.queues.len() {
            let mut promoted = Vec::new();

            for index in levels.queues[level].take() {
                let process = engine.process(index);
                if process.state == ProcessState::Ready && process.arrival_time <= tick {
                    levels.time_in_level[index] += 1;
                    if levels.time_in_level[index] >= self.aging_threshold {
                        levels.time_in_level[index] = 0;
                        if level > 0 {
                            promoted.push(index);
                            continue;
                        }
                    }
                }
                levels.queues[level].push(index);
            }

            for index in promoted {
                levels.level_of[index] = level - 1;
                levels.queues[level - 1].push(index);
                debug!(
                    pid = engine.process(index).id,
                    from = level,
                    to = level - 1,
                    tick,
                    "promoted"
                );
            }
        }
    }
}

impl SchedulingPolicy for MultilevelFeedbackQueue {
    fn name(&self) -> String {
        let name = format!("Multilevel Feedback Queue ({} levels)", self.quanta.len());
        if self.aging.enabled {
            format!("{name} with Aging")
        } else {
            name
        }
    }

    fn run(&mut self, engine: &mut SimulationEngine) {
        let bottom = self.quanta.len() - 1;
        let mut levels = Levels::new(self.quanta.len(), engine.len());
        let mut aging = AgingTimer::new(&self.aging, engine.current_time());
        let mut unfinished: Option<usize> = None;

        loop {
            for index in engine.admit_arrivals() {
                levels.enqueue(index);
            }
            // The slice that just ended belonged to a running process, so it is
            // excluded from these ticks
            if let Some(timer) = aging.as_mut() {
                for tick in timer.due(engine.current_time()) {
                    self.age(engine, &mut levels, tick);
                }
            }
            if let Some(index) = unfinished.take() {
                engine.preempt(index);
                levels.enqueue(index);
            }

            let Some((level, index)) = levels.next() else {
                if engine.idle_until_next_arrival().is_none() {
                    break;
                }
                continue;
            };

            let quantum = self.quanta[level];
            engine.switch_to(index);
            let consumed = engine.execute(index, quantum);

            if engine.process(index).is_complete() {
                engine.complete(index);
                continue;
            }

            if consumed == quantum {
                let lower = (level + 1).min(bottom);
                if lower != level {
                    debug!(
                        pid = engine.process(index).id,
                        from = level,
                        to = lower,
                        "demoted"
                    );
                }
                levels.level_of[index] = lower;
                levels.time_in_level[index] = 0;
            }
            unfinished = Some(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgingCadence, FeedbackQueueConfig};
    use crate::test_support::{completion, expand, run_pids, simulate, workload};

    fn feedback(quanta: Vec<Time>, aging: Option<(Time, u32)>) -> MultilevelFeedbackQueue {
        match aging {
            Some((interval, threshold)) => MultilevelFeedbackQueue::new(
                quanta,
                AgingConfig {
                    enabled: true,
                    interval,
                    cadence: AgingCadence::Crossed,
                },
                threshold,
            ),
            None => MultilevelFeedbackQueue::new(quanta, AgingConfig::disabled(), 0),
        }
    }

    #[test]
    fn test_demotion_on_full_quantum() {
        let mut policy = feedback(vec![2, 4, 8], None);
        let engine = simulate(
            &mut policy,
            workload(&[(1, 0, 10, 0), (2, 1, 3, 0), (3, 2, 6, 0)]),
            0,
        );

        assert_eq!(
            run_pids(engine.trace()),
            expand(&[(1, 2), (2, 2), (3, 2), (1, 4), (2, 1), (3, 4), (1, 4)])
        );
        assert_eq!(completion(&engine, 1), 19);
        assert_eq!(completion(&engine, 2), 11);
        assert_eq!(completion(&engine, 3), 15);
    }

    #[test]
    fn test_finishing_on_quantum_boundary_is_not_demotion() {
        let mut policy = feedback(vec![2, 4], None);
        // P1 uses exactly its level 0 quantum and leaves
        let engine = simulate(&mut policy, workload(&[(1, 0, 2, 0), (2, 0, 3, 0)]), 0);

        assert_eq!(run_pids(engine.trace()), expand(&[(1, 2), (2, 2), (2, 1)]));
        assert_eq!(completion(&engine, 1), 2);
    }

    #[test]
    fn test_bottom_level_behaves_as_round_robin() {
        let mut policy = feedback(vec![1], None);
        let engine = simulate(&mut policy, workload(&[(1, 0, 3, 0), (2, 0, 2, 0)]), 0);

        assert_eq!(
            run_pids(engine.trace()),
            expand(&[(1, 1), (2, 1), (1, 1), (2, 1), (1, 1)])
        );
    }

    #[test]
    fn test_aging_promotes_starved_process() {
        let rows = [(1, 0, 8, 0), (2, 0, 8, 0), (3, 5, 2, 0)];

        let engine = simulate(&mut feedback(vec![2, 4], None), workload(&rows), 0);
        assert_eq!(completion(&engine, 1), 16);

        let engine = simulate(&mut feedback(vec![2, 4], Some((1, 3))), workload(&rows), 0);
        assert_eq!(
            run_pids(engine.trace()),
            expand(&[(1, 2), (2, 2), (1, 4), (3, 2), (2, 2), (1, 2), (2, 4)])
        );
        assert_eq!(completion(&engine, 1), 14);
        assert_eq!(completion(&engine, 2), 18);
        assert_eq!(completion(&engine, 3), 10);
    }

    #[test]
    fn test_same_tick_promotions_keep_queue_order() {
        let policy = feedback(vec![1, 2], Some((1, 2)));
        let processes = workload(&[(1, 0, 4, 0), (2, 0, 4, 0), (3, 0, 4, 0)]);
        let mut engine = SimulationEngine::new(processes, 0).unwrap();
        engine.admit_arrivals();

        let mut levels = Levels::new(2, engine.len());
        for index in [2, 0, 1] {
            levels.level_of[index] = 1;
            levels.queues[1].push(index);
        }
        levels.time_in_level[0] = 1;
        levels.time_in_level[2] = 1;

        policy.age(&engine, &mut levels, 1);

        // P3 and P1 cross the threshold together and land in level 0 in queue order
        assert_eq!(levels.queues[0].iter().collect::<Vec<_>>(), vec![2, 0]);
        assert_eq!(levels.queues[1].iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(levels.level_of, vec![0, 1, 0]);
        assert_eq!(levels.time_in_level, vec![0, 1, 0]);
    }

    #[test]
    fn test_default_config_runs_to_completion() {
        let config = FeedbackQueueConfig::default();
        let quanta = config.quanta().unwrap();
        let mut policy = MultilevelFeedbackQueue::new(quanta, config.aging, config.aging_threshold);

        let engine = simulate(
            &mut policy,
            workload(&[
                (1, 0, 10, 2),
                (2, 1, 5, 1),
                (3, 2, 8, 3),
                (4, 3, 3, 0),
                (5, 4, 6, 1),
            ]),
            1,
        );
        assert!(engine.context_switches() > 0);
    }
}
