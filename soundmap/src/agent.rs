//! Agent handles and the capabilities that can be attached to them.
//!
//! An agent is just a pose plus an optional [`Emitter`] (it can make sounds)
//! and an optional [`Listener`] (it can hear sounds and track them back to
//! their source). The two capabilities are independent.

use crate::config::{EmitterConfig, ListenerConfig};
use crate::math::{Pose, Vec3};
use crate::sound::{LineageId, SoundEvent, SoundSegment};
use crate::tracker::SourcePath;
use crossbeam_channel::Sender;
use std::collections::VecDeque;

/// Lightweight, type-safe handle for agents registered with a
/// [`SoundMapWorld`](crate::SoundMapWorld).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u64);

impl AgentId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AgentId({})", self.0)
    }
}

/// Lineage counters wrap here so ids stay small in long sessions.
const LINEAGE_WRAP: u32 = 10_000;

/// Sound-making capability: owns the agent's pending sound events and the
/// segments waiting to be traced.
#[derive(Debug)]
pub struct Emitter {
    pub(crate) config: EmitterConfig,
    pub(crate) sounds: VecDeque<SoundEvent>,
    /// Segments traced on the next propagation pass
    pub(crate) segments: VecDeque<SoundSegment>,
    next_lineage: u32,
}

impl Emitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            config,
            sounds: VecDeque::new(),
            segments: VecDeque::new(),
            next_lineage: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_making_sound(&self) -> bool {
        !self.sounds.is_empty()
    }

    /// Segments still in flight from earlier ticks.
    pub fn pending_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn pending_sounds(&self) -> impl Iterator<Item = &SoundEvent> {
        self.sounds.iter()
    }

    /// Drops every sound that is over at `now` and returns them.
    pub(crate) fn expire(&mut self, now: f32) -> Vec<SoundEvent> {
        let mut expired = Vec::new();
        for _ in 0..self.sounds.len() {
            let Some(sound) = self.sounds.pop_front() else {
                break;
            };
            if sound.is_over(now) {
                log::debug!(
                    "Sound {} from {} ({}) expired",
                    sound.id,
                    self.name(),
                    sound.category
                );
                expired.push(sound);
            } else {
                self.sounds.push_back(sound);
            }
        }
        expired
    }

    pub(crate) fn next_lineage(&mut self) -> LineageId {
        let id = LineageId(self.next_lineage);
        self.next_lineage = (self.next_lineage + 1) % LINEAGE_WRAP;
        id
    }

    pub(crate) fn clear(&mut self) {
        self.sounds.clear();
        self.segments.clear();
    }
}

/// Hearing capability: receives tracked paths toward the sounds it hears.
#[derive(Debug)]
pub struct Listener {
    pub(crate) config: ListenerConfig,
    pub(crate) paths: Sender<SourcePath>,
}

impl Listener {
    pub fn new(config: ListenerConfig, paths: Sender<SourcePath>) -> Self {
        Self { config, paths }
    }

    pub fn body_radius(&self) -> f32 {
        self.config.body_radius
    }

    pub fn can_track(&self) -> bool {
        self.config.can_track
    }
}

/// An entity registered with the simulation.
#[derive(Debug)]
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) pose: Pose,
    pub(crate) emitter: Option<Emitter>,
    pub(crate) listener: Option<Listener>,
}

impl Agent {
    pub(crate) fn new(id: AgentId, pose: Pose) -> Self {
        Self {
            id,
            pose,
            emitter: None,
            listener: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn emitter(&self) -> Option<&Emitter> {
        self.emitter.as_ref()
    }

    pub fn listener(&self) -> Option<&Listener> {
        self.listener.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineage_ids_wrap() {
        let mut emitter = Emitter::new(EmitterConfig::named("guard"));
        assert_eq!(emitter.next_lineage(), LineageId::new(0));
        assert_eq!(emitter.next_lineage(), LineageId::new(1));

        emitter.next_lineage = LINEAGE_WRAP - 1;
        assert_eq!(emitter.next_lineage(), LineageId::new(LINEAGE_WRAP - 1));
        assert_eq!(emitter.next_lineage(), LineageId::new(0));
    }

    #[test]
    fn test_expire_keeps_unemitted_sounds() {
        let mut emitter = Emitter::new(EmitterConfig::named("guard"));
        let mut emitted = SoundEvent::new(
            AgentId::new(1),
            Vec3::ZERO,
            10.0,
            crate::sound::SoundCategory::Hit,
            360.0,
            0.05,
            0.0,
        );
        let fresh = emitted.clone();
        emitted.emissions = 1;
        emitter.sounds.push_back(emitted.clone());
        emitter.sounds.push_back(fresh.clone());

        let expired = emitter.expire(1.0);
        assert_eq!(expired, vec![emitted]);
        assert_eq!(emitter.pending_sounds().collect::<Vec<_>>(), vec![&fresh]);
    }

    #[test]
    fn test_agent_id_display() {
        assert_eq!(AgentId::new(42).to_string(), "AgentId(42)");
    }
}
