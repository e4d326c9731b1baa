use tracing::debug;

use super::SchedulingPolicy;
use super::queue::ReadyQueue;
use crate::config::{QueueAlgorithm, QueueDescriptor};
use crate::engine::SimulationEngine;

/// Static multilevel queue
///
/// Each process is routed once, when it first becomes ready, to the first queue
/// whose threshold covers its priority (or the last queue). The lowest non-empty
/// queue is always served; a running slice is never cut short by another queue.
#[derive(Debug, Clone)]
pub struct MultilevelQueue {
    queues: Vec<QueueDescriptor>,
    /// Queue chosen for each process in the last run
    assignments: Vec<Option<usize>>,
}

impl MultilevelQueue {
    /// Build from descriptors already sorted by ascending threshold
    pub fn new(queues: Vec<QueueDescriptor>) -> Self {
        assert!(!queues.is_empty(), "multilevel queue needs at least one queue");
        MultilevelQueue {
            queues,
            assignments: Vec::new(),
        }
    }

    pub fn queues(&self) -> &[QueueDescriptor] {
        &self.queues
    }

    /// Queue index per process, by position in the workload
    pub fn assignments(&self) -> &[Option<usize>] {
        &self.assignments
    }

    fn route(&self, priority: u32) -> usize {
        self.queues
            .iter()
            .position(|q| priority <= q.priority_threshold)
            .unwrap_or(self.queues.len() - 1)
    }
}

impl SchedulingPolicy for MultilevelQueue {
    fn name(&self) -> String {
        format!("Multilevel Queue ({} queues)", self.queues.len())
    }

    fn run(&mut self, engine: &mut SimulationEngine) {
        let mut ready: Vec<ReadyQueue> = self
            .queues
            .iter()
            .map(|_| ReadyQueue::new(engine.len()))
            .collect();
        self.assignments = vec![None; engine.len()];
        let mut unfinished: Option<(usize, usize)> = None;

        loop {
            for index in engine.admit_arrivals() {
                let level = self.route(engine.process(index).priority);
                debug!(pid = engine.process(index).id, queue = level, "routed");
                self.assignments[index] = Some(level);
                ready[level].push(index);
            }
            if let Some((level, index)) = unfinished.take() {
                engine.preempt(index);
                ready[level].push(index);
            }

            let next = ready
                .iter_mut()
                .enumerate()
                .find_map(|(level, queue)| queue.pop().map(|index| (level, index)));
            let Some((level, index)) = next else {
                if engine.idle_until_next_arrival().is_none() {
                    break;
                }
                continue;
            };

            let descriptor = self.queues[level];
            let slice = match descriptor.algorithm {
                QueueAlgorithm::Fcfs => engine.process(index).remaining_time,
                QueueAlgorithm::RoundRobin => descriptor.quantum,
            };

            engine.switch_to(index);
            engine.execute(index, slice);

            if engine.process(index).is_complete() {
                engine.complete(index);
            } else {
                unfinished = Some((level, index));
            }
        }
    }
}
