//! Policy configuration and scenario files
//!
//! Every policy config derives serde and carries defaults matching the classic
//! textbook setup, so a scenario file only needs to name what it changes:
//!
//! ```json
//! {
//!   "processes": [
//!     { "id": 1, "arrival_time": 0, "burst_time": 5, "priority": 3 },
//!     { "id": 2, "arrival_time": 1, "burst_time": 3, "priority": 1 }
//!   ],
//!   "policies": [
//!     { "policy": "round_robin", "quantum": 2 },
//!     { "policy": "priority", "preemptive": true, "aging": { "enabled": false } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::{Pid, Process, Time};

/// Deepest feedback queue supported
pub const MAX_FEEDBACK_LEVELS: usize = 32;

/// When aging ticks fire relative to the clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingCadence {
    /// One tick for every positive multiple of the interval passed since the last
    /// check, so bulk clock jumps age exactly like unit stepping
    #[default]
    Crossed,
    /// Tick only when the clock lands exactly on a multiple of the interval.
    /// Multiples skipped by a bulk jump are lost.
    ExactMultiple,
}

/// Aging parameters shared by the priority and feedback queue policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingConfig {
    pub enabled: bool,
    /// Time units between aging ticks
    pub interval: Time,
    pub cadence: AgingCadence,
}

impl Default for AgingConfig {
    fn default() -> Self {
        AgingConfig {
            enabled: true,
            interval: 5,
            cadence: AgingCadence::Crossed,
        }
    }
}

impl AgingConfig {
    pub fn disabled() -> Self {
        AgingConfig {
            enabled: false,
            ..Self::default()
        }
    }

    fn validate(&self, context: &str) -> Result<()> {
        if self.enabled && self.interval == 0 {
            return Err(SimError::config(format!(
                "{context}: aging interval must be positive"
            )));
        }
        Ok(())
    }
}

/// Round robin with a single FIFO queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinConfig {
    pub quantum: Time,
    pub context_switch_overhead: Time,
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        RoundRobinConfig {
            quantum: 4,
            context_switch_overhead: 0,
        }
    }
}

/// Priority scheduling, lower value first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub preemptive: bool,
    pub aging: AgingConfig,
    pub context_switch_overhead: Time,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        PriorityConfig {
            preemptive: false,
            aging: AgingConfig::default(),
            context_switch_overhead: 0,
        }
    }
}

/// Algorithm used inside one multilevel queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAlgorithm {
    /// Run to completion
    Fcfs,
    RoundRobin,
}

/// One static queue of a multilevel queue scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    /// Processes with priority <= threshold land here (first match wins)
    pub priority_threshold: u32,
    pub algorithm: QueueAlgorithm,
    /// Used by round robin queues only
    #[serde(default)]
    pub quantum: Time,
}

impl QueueDescriptor {
    pub fn fcfs(priority_threshold: u32) -> Self {
        QueueDescriptor {
            priority_threshold,
            algorithm: QueueAlgorithm::Fcfs,
            quantum: 0,
        }
    }

    pub fn round_robin(priority_threshold: u32, quantum: Time) -> Self {
        QueueDescriptor {
            priority_threshold,
            algorithm: QueueAlgorithm::RoundRobin,
            quantum,
        }
    }
}

/// Static multilevel queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultilevelQueueConfig {
    pub queues: Vec<QueueDescriptor>,
    pub context_switch_overhead: Time,
}

impl Default for MultilevelQueueConfig {
    fn default() -> Self {
        MultilevelQueueConfig {
            queues: vec![
                QueueDescriptor::round_robin(0, 2),
                QueueDescriptor::round_robin(1, 4),
                QueueDescriptor::fcfs(2),
                QueueDescriptor::fcfs(3),
            ],
            context_switch_overhead: 0,
        }
    }
}

impl MultilevelQueueConfig {
    /// Descriptors ordered by ascending threshold
    pub fn sorted_queues(&self) -> Vec<QueueDescriptor> {
        let mut queues = self.queues.clone();
        queues.sort_by_key(|q| q.priority_threshold);
        queues
    }

    pub fn validate(&self) -> Result<()> {
        if self.queues.is_empty() {
            return Err(SimError::queues("at least one queue is required"));
        }

        let mut thresholds = HashSet::new();
        for queue in &self.queues {
            if !thresholds.insert(queue.priority_threshold) {
                return Err(SimError::queues(format!(
                    "threshold {} appears more than once",
                    queue.priority_threshold
                )));
            }
            if queue.algorithm == QueueAlgorithm::RoundRobin && queue.quantum == 0 {
                return Err(SimError::quantum(format!(
                    "round robin queue with threshold {}",
                    queue.priority_threshold
                )));
            }
        }
        Ok(())
    }
}

/// Quantum replacing the doubled default of one feedback level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantumOverride {
    pub level: usize,
    pub quantum: Time,
}

/// Adaptive multilevel feedback queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackQueueConfig {
    pub levels: usize,
    /// Quantum of level 0; level `n` defaults to `base_quantum << n`
    pub base_quantum: Time,
    pub quantum_overrides: Vec<QuantumOverride>,
    /// Aging ticks a READY process spends in one level before promotion
    pub aging_threshold: u32,
    pub aging: AgingConfig,
    pub context_switch_overhead: Time,
}

impl Default for FeedbackQueueConfig {
    fn default() -> Self {
        FeedbackQueueConfig {
            levels: 3,
            base_quantum: 2,
            quantum_overrides: Vec::new(),
            aging_threshold: 10,
            aging: AgingConfig {
                interval: 1,
                ..AgingConfig::default()
            },
            context_switch_overhead: 0,
        }
    }
}

impl FeedbackQueueConfig {
    /// Effective quantum of every level
    ///
    /// Fails if a doubled default does not fit in `Time`.
    pub fn quanta(&self) -> Result<Vec<Time>> {
        (0..self.levels)
            .map(|level| {
                let overridden = self
                    .quantum_overrides
                    .iter()
                    .find(|o| o.level == level)
                    .map(|o| o.quantum);
                if let Some(quantum) = overridden {
                    return Ok(quantum);
                }
                u32::try_from(level)
                    .ok()
                    .and_then(|shift| 1u64.checked_shl(shift))
                    .and_then(|factor| self.base_quantum.checked_mul(factor))
                    .ok_or_else(|| {
                        SimError::quantum(format!("feedback queue level {level} overflows"))
                    })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 || self.levels > MAX_FEEDBACK_LEVELS {
            return Err(SimError::config(format!(
                "feedback queue needs between 1 and {MAX_FEEDBACK_LEVELS} levels, got {}",
                self.levels
            )));
        }
        if self.base_quantum == 0 {
            return Err(SimError::quantum("feedback queue base quantum"));
        }
        for (i, o) in self.quantum_overrides.iter().enumerate() {
            if o.level >= self.levels {
                return Err(SimError::config(format!(
                    "quantum override for level {}, but only {} levels exist",
                    o.level, self.levels
                )));
            }
            if o.quantum == 0 {
                return Err(SimError::quantum(format!("feedback queue level {}", o.level)));
            }
            if self.quantum_overrides[..i].iter().any(|p| p.level == o.level) {
                return Err(SimError::config(format!(
                    "duplicate quantum override for level {}",
                    o.level
                )));
            }
        }
        self.quanta()?;
        self.aging.validate("feedback queue")?;
        if self.aging.enabled && self.aging_threshold == 0 {
            return Err(SimError::config(
                "feedback queue: aging threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Configuration for one of the four supported policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SchedulerConfig {
    RoundRobin(RoundRobinConfig),
    Priority(PriorityConfig),
    MultilevelQueue(MultilevelQueueConfig),
    MultilevelFeedbackQueue(FeedbackQueueConfig),
}

impl SchedulerConfig {
    /// Reject bad values before any simulation starts
    pub fn validate(&self) -> Result<()> {
        match self {
            SchedulerConfig::RoundRobin(config) => {
                if config.quantum == 0 {
                    return Err(SimError::quantum("round robin"));
                }
                Ok(())
            }
            SchedulerConfig::Priority(config) => config.aging.validate("priority"),
            SchedulerConfig::MultilevelQueue(config) => config.validate(),
            SchedulerConfig::MultilevelFeedbackQueue(config) => config.validate(),
        }
    }

    pub fn context_switch_overhead(&self) -> Time {
        match self {
            SchedulerConfig::RoundRobin(c) => c.context_switch_overhead,
            SchedulerConfig::Priority(c) => c.context_switch_overhead,
            SchedulerConfig::MultilevelQueue(c) => c.context_switch_overhead,
            SchedulerConfig::MultilevelFeedbackQueue(c) => c.context_switch_overhead,
        }
    }

    pub fn set_context_switch_overhead(&mut self, overhead: Time) {
        match self {
            SchedulerConfig::RoundRobin(c) => c.context_switch_overhead = overhead,
            SchedulerConfig::Priority(c) => c.context_switch_overhead = overhead,
            SchedulerConfig::MultilevelQueue(c) => c.context_switch_overhead = overhead,
            SchedulerConfig::MultilevelFeedbackQueue(c) => c.context_switch_overhead = overhead,
        }
    }

    /// Short label used to pick policies on the command line
    pub fn label(&self) -> &'static str {
        match self {
            SchedulerConfig::RoundRobin(_) => "rr",
            SchedulerConfig::Priority(c) if c.preemptive => "preemptive-priority",
            SchedulerConfig::Priority(_) => "priority",
            SchedulerConfig::MultilevelQueue(_) => "mlq",
            SchedulerConfig::MultilevelFeedbackQueue(_) => "mlfq",
        }
    }
}

/// The comparison set used when a scenario names no policies
pub fn default_policies() -> Vec<SchedulerConfig> {
    vec![
        SchedulerConfig::RoundRobin(RoundRobinConfig {
            quantum: 3,
            ..RoundRobinConfig::default()
        }),
        SchedulerConfig::Priority(PriorityConfig::default()),
        SchedulerConfig::Priority(PriorityConfig {
            preemptive: true,
            ..PriorityConfig::default()
        }),
        SchedulerConfig::MultilevelQueue(MultilevelQueueConfig::default()),
        SchedulerConfig::MultilevelFeedbackQueue(FeedbackQueueConfig::default()),
    ]
}

/// Process entry of a scenario file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub id: Pid,
    /// Defaults to `P<id>`
    #[serde(default)]
    pub name: Option<String>,
    pub arrival_time: Time,
    pub burst_time: Time,
    #[serde(default)]
    pub priority: u32,
}

impl ProcessEntry {
    pub fn to_process(&self) -> Process {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("P{}", self.id));
        Process::new(
            self.id,
            name,
            self.arrival_time,
            self.burst_time,
            self.priority,
        )
    }
}

/// Workload plus the policies to run it under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub processes: Vec<ProcessEntry>,
    #[serde(default)]
    pub policies: Vec<SchedulerConfig>,
}

impl ScenarioFile {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: ScenarioFile = serde_json::from_str(json)?;
        for policy in &scenario.policies {
            policy.validate()?;
        }
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn workload(&self) -> Vec<Process> {
        self.processes.iter().map(ProcessEntry::to_process).collect()
    }

    /// Configured policies, or the default comparison set if none are listed
    pub fn policies_or_default(&self) -> Vec<SchedulerConfig> {
        if self.policies.is_empty() {
            default_policies()
        } else {
            self.policies.clone()
        }
    }
}
