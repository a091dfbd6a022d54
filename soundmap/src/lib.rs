//! # SoundMap
//!
//! Ray-traced sound propagation for game agents.
//!
//! Agents that make noise cast fans of rays which fade with distance, reflect
//! off walls and bend around corners. Every ray writes its intensity onto a
//! grid laid over the level (the *sound map*), and agents that hear a sound
//! climb that grid's intensity gradient to find where it came from.
//!
//! ## Quick Start
//!
//! ```no_run
//! use soundmap::*;
//! use soundmap::scene::BoxScene;
//!
//! let desc = SoundMapDesc::default().area(Vec3::new(-16.0, 0.0, -16.0), 32.0, 32.0);
//! let mut world = SoundMapWorld::new(desc)?;
//!
//! // Level geometry: any type implementing GeometryQuery
//! let mut scene = BoxScene::new();
//! scene.add_wall(Vec3::new(4.0, -1.0, -8.0), Vec3::new(5.0, 1.0, 2.0));
//!
//! // A noisy agent and a guard that listens
//! let thief = world.register_agent(Pose::from_position(Vec3::ZERO));
//! world.attach_emitter(thief, EmitterConfig::named("thief"))?;
//!
//! let guard_pose = Pose::from_position(Vec3::new(8.0, 0.0, 3.0));
//! let guard = world.register_agent(guard_pose);
//! let paths = world.attach_listener(guard, ListenerConfig::new(0.5))?;
//! scene.set_agent(guard, guard_pose.position, 0.5);
//!
//! world.start()?;
//! world.make_sound(thief, Vec3::ZERO, 60.0, SoundCategory::Run, 360.0, 0.5)?;
//!
//! // Drive the simulation from your update loop
//! for frame in 0..30 {
//!     world.tick(frame as f32 / 30.0, &mut scene)?;
//! }
//!
//! // Paths lead from the guard toward the loudest point it can reach
//! for path in paths.try_iter() {
//!     if let Some(target) = path.destination() {
//!         println!("Investigate {}", target.position);
//!     }
//! }
//! # Ok::<(), SoundMapError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`SoundMapWorld`]**: Owns the grid and agents and runs the tick loop
//! - **[`SoundMapDesc`]**: Tunables for propagation, grid layout and tick rate
//! - **[`PropagationEngine`](propagation::PropagationEngine)**: Ray fans, fading,
//!   reflection and diffraction
//! - **[`SoundGrid`](grid::SoundGrid)**: Per-cell, per-category intensity accumulation
//! - **[`SourceTracker`](tracker::SourceTracker)**: Hill-climbing search toward a sound's source
//! - **[`GeometryQuery`]**: Trait for plugging in your collision system
//! - **[`SoundMapEvent`]**: Notifications drained with [`SoundMapWorld::poll_events`]
//!
//! ## Features
//!
//! - Any number of concurrent emitters and listeners
//! - Cone-shaped or omnidirectional emissions
//! - Reflection with absorption and a bounce limit
//! - Diffraction around tagged corners
//! - Visibility-checked source tracking per sound category
//! - Runtime grid regeneration at a new tile scale
//! - Performance profiling via timing events

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod math;
pub mod propagation;
pub mod scene;
pub mod sound;
pub mod tracker;
pub mod world;

pub use agent::AgentId;
pub use config::{EmitterConfig, ListenerConfig, SoundMapDesc};
pub use error::{Result, SoundMapError};
pub use events::{SoundMapEvent, TickTimingEvent};
pub use math::{Pose, Quat, Vec3};
pub use scene::{GeometryQuery, HitKind, LayerMask, RayHit};
pub use sound::{SoundCategory, SoundEvent};
pub use tracker::{PathPoint, SourcePath};
pub use world::SoundMapWorld;
