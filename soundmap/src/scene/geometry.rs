//! Geometry query callback trait for sound propagation.
//!
//! This module provides the interface the propagation engine uses to ask the
//! host scene (a game engine, physics library, or the bundled [`BoxScene`])
//! where a sound ray first strikes something.
//!
//! [`BoxScene`]: crate::scene::BoxScene

use crate::agent::AgentId;
use crate::error::Result;
use crate::math::Vec3;

/// Bit set of collision layers a ray is allowed to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    /// Mask containing only `layer` (0..32).
    pub fn layer(layer: u8) -> Self {
        Self(1u32.checked_shl(layer as u32).unwrap_or(0))
    }

    pub fn contains(&self, layer: u8) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }

    pub fn with(self, layer: u8) -> Self {
        Self(self.0 | Self::layer(layer).0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A corner feature that bends grazing rays around an obstacle.
///
/// The two edge vectors bound the wedge of open space around the corner. A ray
/// entering the trigger radius is fanned toward whichever edge lies on its
/// outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffractionEdge {
    /// Centre of the trigger volume
    pub position: Vec3,
    pub edge_a: Vec3,
    pub edge_b: Vec3,
    /// Radius of the trigger volume around `position`
    pub trigger_radius: f32,
}

impl DiffractionEdge {
    pub fn new(position: Vec3, edge_a: Vec3, edge_b: Vec3, trigger_radius: f32) -> Self {
        Self {
            position,
            edge_a: edge_a.normalize_or_zero(),
            edge_b: edge_b.normalize_or_zero(),
            trigger_radius,
        }
    }
}

/// Classification of whatever a ray struck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitKind {
    /// Plain geometry; rays reflect off it
    Obstacle,
    /// Collider of an agent that can hear sound
    Receiver(AgentId),
    /// Diffraction trigger around a corner
    DiffractionEdge(DiffractionEdge),
}

/// Result of a ray intersection test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point
    pub point: Vec3,

    /// Surface normal at the hit point, pointing away from the surface
    pub normal: Vec3,

    /// Distance from ray origin to hit point
    pub distance: f32,

    pub kind: HitKind,
}

impl RayHit {
    pub fn new(point: Vec3, normal: Vec3, distance: f32, kind: HitKind) -> Self {
        Self {
            point,
            normal,
            distance,
            kind,
        }
    }

    pub fn is_obstacle(&self) -> bool {
        matches!(self.kind, HitKind::Obstacle)
    }
}

/// Trait for providing ray casts against scene geometry.
///
/// Implement this trait to integrate your own collision system with SoundMap.
/// The simulation calls it synchronously from [`SoundMapWorld::tick`], once per
/// traced segment and once per neighbour examined by the source tracker.
///
/// # Example
///
/// ```
/// use soundmap::agent::AgentId;
/// use soundmap::math::Vec3;
/// use soundmap::scene::{GeometryQuery, LayerMask, RayHit};
///
/// struct OpenField;
///
/// impl GeometryQuery for OpenField {
///     fn raycast(
///         &self,
///         _origin: Vec3,
///         _direction: Vec3,
///         _max_distance: f32,
///         _layers: LayerMask,
///         _ignore: Option<AgentId>,
///     ) -> soundmap::error::Result<Option<RayHit>> {
///         Ok(None)
///     }
/// }
/// ```
///
/// [`SoundMapWorld::tick`]: crate::SoundMapWorld::tick
pub trait GeometryQuery {
    /// Returns the closest hit along the ray, if any.
    ///
    /// # Parameters
    ///
    /// * `origin` - Ray starting position in world space
    /// * `direction` - Ray direction (normalized)
    /// * `max_distance` - Maximum ray distance to test
    /// * `layers` - Only colliders on these layers may be hit
    /// * `ignore` - Agent whose own collider must be skipped
    ///
    /// # Errors
    ///
    /// Return [`SoundMapError::EnvironmentNotReady`] when the scene cannot be
    /// queried (nothing loaded, backend torn down). The error aborts the tick.
    ///
    /// [`SoundMapError::EnvironmentNotReady`]: crate::SoundMapError::EnvironmentNotReady
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
        ignore: Option<AgentId>,
    ) -> Result<Option<RayHit>>;

    /// Called once per tick before any ray casts (optional).
    fn begin_frame(&mut self) {}

    /// Called once per tick after propagation and tracking finish (optional).
    fn end_frame(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    // Simple test geometry that always returns a miss
    struct NoopGeometry;

    impl GeometryQuery for NoopGeometry {
        fn raycast(
            &self,
            _origin: Vec3,
            _direction: Vec3,
            _max_distance: f32,
            _layers: LayerMask,
            _ignore: Option<AgentId>,
        ) -> Result<Option<RayHit>> {
            Ok(None)
        }
    }

    #[test]
    fn test_noop_geometry() {
        let geometry = NoopGeometry;
        let result = geometry
            .raycast(Vec3::ZERO, Vec3::Z, 100.0, LayerMask::ALL, None)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::layer(3).with(5);
        assert!(mask.contains(3));
        assert!(mask.contains(5));
        assert!(!mask.contains(4));
        assert!(LayerMask::ALL.contains(31));
        assert!(!LayerMask::NONE.contains(0));
        assert_eq!(LayerMask::layer(40), LayerMask::NONE);
    }

    #[test]
    fn test_diffraction_edge_normalizes() {
        let edge = DiffractionEdge::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::Z * 5.0, 0.5);
        assert!((edge.edge_a.length() - 1.0).abs() < 1e-6);
        assert!((edge.edge_b.length() - 1.0).abs() < 1e-6);
    }
}
