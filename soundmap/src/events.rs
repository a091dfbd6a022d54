//! Event types for SoundMap

use crate::agent::AgentId;
use crate::sound::SoundCategory;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SoundMapEvent {
    SimulationStarted,
    SimulationStopped,
    SoundStarted {
        event_id: Uuid,
        producer: AgentId,
        category: SoundCategory,
    },
    SoundExpired {
        event_id: Uuid,
        producer: AgentId,
    },
    SoundReceived {
        listener: AgentId,
        producer: AgentId,
        category: SoundCategory,
    },
    SourceTracked {
        listener: AgentId,
        category: SoundCategory,
        path_len: usize,
    },
    GridRegenerated {
        resolution_x: usize,
        resolution_y: usize,
    },
}

impl SoundMapEvent {
    /// The agent the event is about, if any.
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            Self::SoundStarted { producer, .. } | Self::SoundExpired { producer, .. } => {
                Some(*producer)
            }
            Self::SoundReceived { listener, .. } | Self::SourceTracked { listener, .. } => {
                Some(*listener)
            }
            _ => None,
        }
    }

    pub fn is_sound_event(&self) -> bool {
        matches!(
            self,
            Self::SoundStarted { .. } | Self::SoundExpired { .. } | Self::SoundReceived { .. }
        )
    }

    pub fn is_lifecycle_event(&self) -> bool {
        matches!(
            self,
            Self::SimulationStarted | Self::SimulationStopped | Self::GridRegenerated { .. }
        )
    }
}

/// Wall-clock cost of each phase of the last executed tick, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickTimingEvent {
    pub reset_time_us: u64,
    pub propagate_time_us: u64,
    pub merge_time_us: u64,
    pub paint_time_us: u64,
    pub resolve_time_us: u64,
    pub total_time_us: u64,
    pub segments_traced: usize,
    pub cells_touched: usize,
}

impl TickTimingEvent {
    /// Share of the tick budget (`1 / execution_rate`) the tick consumed.
    pub fn utilization(&self, execution_rate: f32) -> f32 {
        let budget_us = 1_000_000.0 / execution_rate;
        self.total_time_us as f32 / budget_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_agent() {
        let producer = AgentId::new(3);
        let started = SoundMapEvent::SoundStarted {
            event_id: Uuid::new_v4(),
            producer,
            category: SoundCategory::Walk,
        };
        assert_eq!(started.agent(), Some(producer));
        assert!(started.is_sound_event());
        assert_eq!(SoundMapEvent::SimulationStarted.agent(), None);
        assert!(SoundMapEvent::SimulationStopped.is_lifecycle_event());
    }

    #[test]
    fn test_utilization() {
        let timing = TickTimingEvent {
            total_time_us: 5_000,
            ..Default::default()
        };
        assert!((timing.utilization(100.0) - 0.5).abs() < 1e-6);
    }
}
