//! Scene queries for sound propagation.
//!
//! This module provides the interface for plugging an existing collision
//! system into SoundMap. The propagation engine and the source tracker only
//! ever see the world through [`GeometryQuery`].
//!
//! # Overview
//!
//! 1. **GeometryQuery** - Trait for nearest-hit ray casts
//! 2. **RayHit / HitKind** - What was struck: an obstacle, a listening agent,
//!    or a diffraction trigger
//! 3. **BoxScene** - A small built-in implementation made of boxes and cylinders
//!
//! # Workflow
//!
//! 1. Implement `GeometryQuery` on top of your physics engine, classifying
//!    colliders into [`HitKind`]s
//! 2. Exclude the collider of the `ignore` agent from each query
//! 3. Pass the implementation to `SoundMapWorld::tick()` every frame

pub mod box_scene;
pub mod geometry;

pub use box_scene::{BoxScene, Wall};
pub use geometry::{DiffractionEdge, GeometryQuery, HitKind, LayerMask, RayHit};
