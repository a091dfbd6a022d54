//! Ray-traced sound propagation.
//!
//! Every tick each emitter expands its active [`SoundEvent`]s into a fan of
//! [`SoundSegment`]s and traces all segments queued for this pass against the
//! scene. Tracing a segment writes faded intensity samples into a
//! [`SampleSink`] and may spawn children (one reflected ray, or a fan of
//! diffracted rays). Children are always queued for the *next* pass, so the
//! work done per tick stays bounded no matter how many surfaces a ray lineage
//! bounces off.

use crate::agent::{AgentId, Emitter};
use crate::config::SoundMapDesc;
use crate::error::Result;
use crate::grid::SampleSink;
use crate::math::{Pose, Vec3, flatten, reflect, rotate_around_y, signed_angle_y};
use crate::scene::{DiffractionEdge, GeometryQuery, HitKind, RayHit};
use crate::sound::{SoundCategory, SoundEvent, SoundSegment};
use std::collections::VecDeque;
use std::ops::Range;

/// Extra intensity written at the tail of a ray that hit nothing.
const TAIL_INTENSITY_BOOST: f32 = 0.1;

/// Tolerance for floating point error when counting rays in a cone.
const ANGLE_EPSILON: f32 = 1e-4;

/// A ray from `producer` reached the collider of `listener`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reception {
    pub listener: AgentId,
    pub producer: AgentId,
    pub category: SoundCategory,
}

/// What one emitter did during a propagation pass.
#[derive(Debug, Default)]
pub struct PropagationReport {
    pub sounds_expanded: usize,
    pub segments_traced: usize,
    pub children_spawned: usize,
    pub receptions: Vec<Reception>,
    /// Events that ran out this pass and were dropped from the queue
    pub expired: Vec<SoundEvent>,
}

/// Traces sound segments for one tick.
///
/// The engine holds no state of its own: queues live in each agent's
/// [`Emitter`], tunables come from the [`SoundMapDesc`] and samples go to the
/// caller's sink.
pub struct PropagationEngine<'a> {
    desc: &'a SoundMapDesc,
    geometry: &'a dyn GeometryQuery,
}

impl<'a> PropagationEngine<'a> {
    pub fn new(desc: &'a SoundMapDesc, geometry: &'a dyn GeometryQuery) -> Self {
        Self { desc, geometry }
    }

    /// Runs one propagation pass for a single emitter.
    ///
    /// Expired events are dropped and every live one is expanded into a fresh
    /// ray fan. A newly queued event always casts its first fan here, even if
    /// its duration already ran out. Then every segment queued for this pass
    /// is traced.
    ///
    /// # Errors
    ///
    /// Propagates [`SoundMapError::EnvironmentNotReady`] from the geometry
    /// provider. The emitter's in-flight segments are discarded in that case.
    ///
    /// [`SoundMapError::EnvironmentNotReady`]: crate::SoundMapError::EnvironmentNotReady
    pub fn step(
        &self,
        agent: AgentId,
        pose: Pose,
        emitter: &mut Emitter,
        now: f32,
        sink: &mut dyn SampleSink,
    ) -> Result<PropagationReport> {
        let mut report = PropagationReport::default();
        if emitter.sounds.is_empty() && emitter.segments.is_empty() {
            return Ok(report);
        }

        report.expired = emitter.expire(now);
        let mut current = std::mem::take(&mut emitter.segments);

        for i in 0..emitter.sounds.len() {
            let lineage = emitter.next_lineage();
            let sound = &mut emitter.sounds[i];
            sound.emissions += 1;
            for direction in self.ray_fan(pose.forward(), sound.range) {
                current.push_back(SoundSegment::new(
                    lineage,
                    sound.origin,
                    direction,
                    sound.volume,
                    sound.category,
                    0,
                ));
            }
            report.sounds_expanded += 1;
        }

        let mut next = VecDeque::new();
        for segment in current {
            report.segments_traced += 1;
            self.trace_segment(agent, &segment, sink, &mut next, &mut report.receptions)?;
        }
        report.children_spawned = next.len();
        emitter.segments = next;

        log::trace!(
            "{}: traced {} segments, {} children queued, {} receptions",
            emitter.name(),
            report.segments_traced,
            report.children_spawned,
            report.receptions.len()
        );
        Ok(report)
    }

    /// Directions of the initial rays for an emission cone of `range` degrees
    /// centred on `forward`.
    ///
    /// Rays are spaced `360 / ray_frequency` degrees apart starting from the
    /// boundary at `-range / 2` and include both boundaries. A full circle
    /// yields exactly `ray_frequency` rays.
    pub fn ray_fan(&self, forward: Vec3, range: f32) -> Vec<Vec3> {
        let mut forward = flatten(forward);
        if forward == Vec3::ZERO {
            forward = -Vec3::Z;
        }
        let delta = 360.0 / self.desc.ray_frequency as f32;
        let range = range.clamp(0.0, 360.0);

        let (count, first) = if range + ANGLE_EPSILON >= 360.0 {
            (self.desc.ray_frequency as usize, -180.0)
        } else {
            ((range / delta + ANGLE_EPSILON).floor() as usize + 1, -range / 2.0)
        };

        (0..count)
            .map(|i| rotate_around_y(first + delta * i as f32, forward))
            .collect()
    }

    /// Traces one segment, writing samples and queuing any children into `next`.
    pub fn trace_segment(
        &self,
        producer: AgentId,
        segment: &SoundSegment,
        sink: &mut dyn SampleSink,
        next: &mut VecDeque<SoundSegment>,
        receptions: &mut Vec<Reception>,
    ) -> Result<()> {
        if segment.volume < self.desc.min_volume
            || segment.reflections > self.desc.reflection_limit
        {
            return Ok(());
        }

        let steps = segment.volume / self.desc.fading_speed;
        let max_distance = steps * self.desc.step_distance;

        let hit = self.geometry.raycast(
            segment.origin,
            segment.direction,
            max_distance,
            self.desc.raycast_layers,
            Some(producer),
        )?;

        let Some(hit) = hit else {
            self.sample_ray(producer, segment, steps, sink);
            let tail = segment.point_at(max_distance);
            let intensity = segment.volume - self.desc.fading_speed * steps + TAIL_INTENSITY_BOOST;
            sink.add_sample(
                tail,
                intensity,
                segment.category,
                segment.lineage,
                producer,
            );
            return Ok(());
        };

        let hit_steps = hit.distance / self.desc.step_distance;
        self.sample_ray(producer, segment, hit_steps, sink);
        let remaining = segment.volume - hit_steps * self.desc.fading_speed;

        match hit.kind {
            HitKind::Receiver(listener) => {
                if listener != producer {
                    log::trace!("{} reached {}", segment.lineage, listener);
                    receptions.push(Reception {
                        listener,
                        producer,
                        category: segment.category,
                    });
                }
            }
            HitKind::DiffractionEdge(edge) => {
                self.diffract(segment, &hit, &edge, remaining, next);
            }
            HitKind::Obstacle => {
                next.push_back(self.reflect(segment, &hit, remaining));
            }
        }
        Ok(())
    }

    /// Writes `volume - fading_speed * k` at every whole step `k` before `steps`
    /// whose point lies over the mapped area.
    fn sample_ray(
        &self,
        producer: AgentId,
        segment: &SoundSegment,
        steps: f32,
        sink: &mut dyn SampleSink,
    ) {
        for k in self.steps_over_map(segment, steps) {
            let k = k as f32;
            sink.add_sample(
                segment.point_at(k * self.desc.step_distance),
                segment.volume - self.desc.fading_speed * k,
                segment.category,
                segment.lineage,
                producer,
            );
        }
    }

    /// Whole steps in `0..steps` that land inside the mapped area, padded by
    /// one step on every side. Loud rays cost at most one grid crossing.
    fn steps_over_map(&self, segment: &SoundSegment, steps: f32) -> Range<u32> {
        let whole_steps = steps.max(0.0).floor();
        if whole_steps < 1.0 {
            return 0..0;
        }
        let step = self.desc.step_distance;
        let low = self.desc.start_point - Vec3::splat(step);
        let high = self.desc.start_point + Vec3::new(self.desc.width, 0.0, self.desc.length)
            + Vec3::splat(step);

        // slab test in the XZ plane, in units of distance along the ray
        let (mut enter, mut exit) = (0.0_f32, (whole_steps - 1.0) * step);
        for (origin, direction, low, high) in [
            (segment.origin.x, segment.direction.x, low.x, high.x),
            (segment.origin.z, segment.direction.z, low.z, high.z),
        ] {
            if direction.abs() < f32::EPSILON {
                if origin < low || origin > high {
                    return 0..0;
                }
                continue;
            }
            let (a, b) = ((low - origin) / direction, (high - origin) / direction);
            enter = enter.max(a.min(b));
            exit = exit.min(a.max(b));
        }
        if enter > exit {
            return 0..0;
        }

        let first = (enter / step).ceil() as u32;
        let last = ((exit / step).floor() + 1.0).min(whole_steps) as u32;
        first..last.max(first)
    }

    /// Mirror reflection off ordinary geometry.
    fn reflect(&self, segment: &SoundSegment, hit: &RayHit, remaining: f32) -> SoundSegment {
        SoundSegment::new(
            segment.lineage,
            hit.point,
            reflect(segment.direction, hit.normal),
            remaining * self.desc.absorption_rate,
            segment.category,
            segment.reflections + 1,
        )
    }

    /// Bends a ray around a corner, fanning it toward the edge on its outside.
    fn diffract(
        &self,
        segment: &SoundSegment,
        hit: &RayHit,
        edge: &DiffractionEdge,
        remaining: f32,
        next: &mut VecDeque<SoundSegment>,
    ) {
        let direction = segment.direction;
        let dot_a = direction.dot(edge.edge_a);
        let dot_b = direction.dot(edge.edge_b);

        if dot_a > 0.0 && dot_b > 0.0 {
            // straight into the solid face between the edges
            next.push_back(self.reflect(segment, hit, remaining));
            return;
        }
        if dot_a < 0.0 && dot_b < 0.0 {
            return;
        }
        let boundary = if dot_a > dot_b {
            edge.edge_a
        } else if dot_b > dot_a {
            edge.edge_b
        } else {
            return;
        };

        let spread = signed_angle_y(boundary, direction) * self.desc.effective_diffraction_ratio();
        let count =
            (self.desc.ray_frequency as f32 / 360.0 * spread.abs()).round() as usize;
        let volume = remaining * self.desc.diffraction_rate;
        let origin = Vec3::new(edge.position.x, segment.origin.y, edge.position.z);

        for i in 0..count {
            let angle = if count > 1 {
                spread * i as f32 / (count - 1) as f32
            } else {
                0.0
            };
            let child_direction = rotate_around_y(angle, direction);
            next.push_back(SoundSegment::new(
                segment.lineage,
                origin + child_direction * edge.trigger_radius,
                child_direction,
                volume,
                segment.category,
                segment.reflections,
            ));
        }

        log::trace!(
            "{} diffracted into {} rays spanning {:.1} degrees",
            segment.lineage,
            count,
            spread
        );
    }
}
