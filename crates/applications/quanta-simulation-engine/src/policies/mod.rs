//! CPU scheduling policies
//!
//! Implements the policies the simulator compares:
//! - Round Robin: single FIFO queue, fixed quantum
//! - Priority: lowest value first, optionally preemptive, with aging
//! - Multilevel Queue: static routing by priority threshold
//! - Multilevel Feedback Queue: demotion on quantum expiry, promotion by aging

mod aging;
mod feedback_queue;
mod multilevel_queue;
mod priority;
mod queue;
mod round_robin;

pub use feedback_queue::MultilevelFeedbackQueue;
pub use multilevel_queue::MultilevelQueue;
pub use priority::PriorityScheduler;
pub use round_robin::RoundRobin;

use crate::config::SchedulerConfig;
use crate::engine::SimulationEngine;
use crate::error::Result;

/// Scheduling policy trait
pub trait SchedulingPolicy {
    /// Human-readable policy name, including its parameters
    fn name(&self) -> String;

    /// Drive `engine` until every process has terminated
    fn run(&mut self, engine: &mut SimulationEngine);
}

/// The closed set of supported policies
#[derive(Debug, Clone)]
pub enum Scheduler {
    RoundRobin(RoundRobin),
    Priority(PriorityScheduler),
    MultilevelQueue(MultilevelQueue),
    MultilevelFeedbackQueue(MultilevelFeedbackQueue),
}

impl Scheduler {
    /// Validate `config` and build the policy it describes
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        config.validate()?;

        let scheduler = match config {
            SchedulerConfig::RoundRobin(c) => Scheduler::RoundRobin(RoundRobin::new(c.quantum)),
            SchedulerConfig::Priority(c) => {
                Scheduler::Priority(PriorityScheduler::new(c.preemptive, c.aging))
            }
            SchedulerConfig::MultilevelQueue(c) => {
                Scheduler::MultilevelQueue(MultilevelQueue::new(c.sorted_queues()))
            }
            SchedulerConfig::MultilevelFeedbackQueue(c) => {
                Scheduler::MultilevelFeedbackQueue(MultilevelFeedbackQueue::new(
                    c.quanta()?,
                    c.aging,
                    c.aging_threshold,
                ))
            }
        };
        Ok(scheduler)
    }
}

impl SchedulingPolicy for Scheduler {
    fn name(&self) -> String {
        match self {
            Scheduler::RoundRobin(p) => p.name(),
            Scheduler::Priority(p) => p.name(),
            Scheduler::MultilevelQueue(p) => p.name(),
            Scheduler::MultilevelFeedbackQueue(p) => p.name(),
        }
    }

    fn run(&mut self, engine: &mut SimulationEngine) {
        match self {
            Scheduler::RoundRobin(p) => p.run(engine),
            Scheduler::Priority(p) => p.run(engine),
            Scheduler::MultilevelQueue(p) => p.run(engine),
            Scheduler::MultilevelFeedbackQueue(p) => p.run(engine),
        }
    }
}
