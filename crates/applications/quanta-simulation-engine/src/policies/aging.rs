//! Aging tick schedule shared by the priority and feedback queue policies

use crate::config::{AgingCadence, AgingConfig};
use crate::types::Time;

/// Tracks which aging ticks have already been applied
///
/// Ticks fire at positive multiples of the interval. The timer remembers how far it
/// has checked so each tick is handed out exactly once.
#[derive(Debug, Clone)]
pub(crate) struct AgingTimer {
    interval: Time,
    cadence: AgingCadence,
    checked_through: Time,
}

impl AgingTimer {
    /// Timer starting at `start`, or `None` when aging is disabled
    pub(crate) fn new(config: &AgingConfig, start: Time) -> Option<Self> {
        if !config.enabled || config.interval == 0 {
            return None;
        }
        Some(AgingTimer {
            interval: config.interval,
            cadence: config.cadence,
            checked_through: start,
        })
    }

    /// Ticks in `(checked_through, now]`, oldest first
    pub(crate) fn due(&mut self, now: Time) -> Vec<Time> {
        if now <= self.checked_through {
            return Vec::new();
        }
        let from = self.checked_through;
        self.checked_through = now;

        match self.cadence {
            AgingCadence::Crossed => {
                let first = (from / self.interval + 1) * self.interval;
                (first..=now).step_by(self.interval as usize).collect()
            }
            AgingCadence::ExactMultiple if now % self.interval == 0 => vec![now],
            AgingCadence::ExactMultiple => Vec::new(),
        }
    }
}
