//! Run drivers for single policies and policy comparisons
//!
//! Each run builds a fresh engine over a reset copy of the workload, so the same
//! process list can be fed to any number of policies.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SchedulerConfig;
use crate::engine::SimulationEngine;
use crate::error::Result;
use crate::metrics::{SchedulingMetrics, compute_metrics};
use crate::policies::{Scheduler, SchedulingPolicy};
use crate::types::{Process, Time, Trace};

/// Result of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub policy_name: String,
    /// Terminated processes with their derived metrics, in workload order
    pub processes: Vec<Process>,
    pub trace: Trace,
    pub context_switches: u32,
}

impl SimulationResult {
    pub fn metrics(&self) -> SchedulingMetrics {
        compute_metrics(&self.processes)
    }
}

/// A configured policy plus the workload to run it over
pub struct Simulator {
    scheduler: Scheduler,
    context_switch_overhead: Time,
    processes: Vec<Process>,
}

impl Simulator {
    /// Create a simulator for `config`, rejecting invalid configurations
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        Ok(Simulator {
            scheduler: Scheduler::from_config(config)?,
            context_switch_overhead: config.context_switch_overhead(),
            processes: Vec::new(),
        })
    }

    /// Add a process to the workload
    pub fn add_process(&mut self, process: Process) {
        self.processes.push(process);
    }

    pub fn policy_name(&self) -> String {
        self.scheduler.name()
    }

    /// Run the policy over a snapshot of the workload
    ///
    /// The simulator's own process list is left untouched, so `run` can be called
    /// again for an identical result.
    pub fn run(&mut self) -> Result<SimulationResult> {
        let workload = self.processes.iter().map(Process::snapshot).collect();
        let mut engine = SimulationEngine::new(workload, self.context_switch_overhead)?;
        let policy_name = self.scheduler.name();

        info!(
            policy = %policy_name,
            processes = engine.len(),
            overhead = self.context_switch_overhead,
            "starting simulation"
        );

        self.scheduler.run(&mut engine);
        debug_assert!(engine.all_terminated());

        let finished_at = engine.current_time();
        let (processes, trace, context_switches) = engine.into_parts();

        info!(
            policy = %policy_name,
            finished_at,
            context_switches,
            "simulation complete"
        );

        Ok(SimulationResult {
            policy_name,
            processes,
            trace,
            context_switches,
        })
    }
}

/// Run `processes` under a single policy
pub fn run(processes: &[Process], config: &SchedulerConfig) -> Result<SimulationResult> {
    let mut simulator = Simulator::new(config)?;
    for process in processes {
        simulator.add_process(process.clone());
    }
    simulator.run()
}

/// Run the same workload under every policy in `configs`
///
/// Every configuration is validated before the first run starts.
pub fn compare(
    processes: &[Process],
    configs: &[SchedulerConfig],
) -> Result<Vec<SimulationResult>> {
    for config in configs {
        config.validate()?;
    }
    configs.iter().map(|config| run(processes, config)).collect()
}
