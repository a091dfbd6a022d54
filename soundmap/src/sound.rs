//! Sound events and the ray segments they expand into.

use crate::agent::AgentId;
use crate::math::Vec3;
use uuid::Uuid;

/// Category of a sound. Listeners track one category at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SoundCategory {
    Walk,
    Run,
    Hit,
    Talk,
    /// Application-defined category
    Custom(u16),
}

impl std::fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Walk => write!(f, "walk"),
            Self::Run => write!(f, "run"),
            Self::Hit => write!(f, "hit"),
            Self::Talk => write!(f, "talk"),
            Self::Custom(id) => write!(f, "custom({})", id),
        }
    }
}

/// Identifier shared by a root ray and every reflected or diffracted
/// descendant. All rays of one emission fan share a lineage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineageId(pub(crate) u32);

impl LineageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for LineageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LineageId({})", self.0)
    }
}

/// One instance of a sound being made.
///
/// Re-emitted as a fresh ray fan every tick until `now >= start_time + duration`.
/// Every event casts at least one fan, however short its duration.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    pub id: Uuid,
    pub producer: AgentId,
    pub origin: Vec3,
    pub volume: f32,
    pub category: SoundCategory,
    /// Opening angle of the emission cone in degrees
    pub range: f32,
    /// Seconds
    pub duration: f32,
    /// Simulation time (seconds) at which the sound was made
    pub start_time: f32,
    /// Ray fans cast so far
    pub emissions: u32,
}

impl SoundEvent {
    pub fn new(
        producer: AgentId,
        origin: Vec3,
        volume: f32,
        category: SoundCategory,
        range: f32,
        duration: f32,
        start_time: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            producer,
            origin,
            volume,
            category,
            range: range.clamp(0.0, 360.0),
            duration,
            start_time,
            emissions: 0,
        }
    }

    /// True once the event has been emitted and its duration has run out.
    pub fn is_over(&self, now: f32) -> bool {
        self.emissions > 0 && now >= self.start_time + self.duration
    }
}

/// A single traced ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundSegment {
    pub lineage: LineageId,
    pub origin: Vec3,
    /// Normalized
    pub direction: Vec3,
    pub volume: f32,
    pub category: SoundCategory,
    pub reflections: u32,
}

impl SoundSegment {
    pub fn new(
        lineage: LineageId,
        origin: Vec3,
        direction: Vec3,
        volume: f32,
        category: SoundCategory,
        reflections: u32,
    ) -> Self {
        Self {
            lineage,
            origin,
            direction: direction.normalize_or_zero(),
            volume,
            category,
            reflections,
        }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}
