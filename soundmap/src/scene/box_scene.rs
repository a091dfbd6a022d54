//! A small self-contained scene built from walls, agent cylinders and
//! diffraction triggers.
//!
//! Useful for tests, demos and prototypes that have no physics backend. Walls
//! are axis-aligned boxes; agents and diffraction triggers are infinite
//! vertical cylinders, so only their XZ footprint matters.

use crate::agent::AgentId;
use crate::error::Result;
use crate::math::{Vec3, flatten};
use crate::scene::geometry::{DiffractionEdge, GeometryQuery, HitKind, LayerMask, RayHit};

const HIT_EPSILON: f32 = 1e-4;

/// Axis-aligned solid box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub min: Vec3,
    pub max: Vec3,
    pub layer: u8,
}

impl Wall {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            layer: 0,
        }
    }

    /// Ray-AABB slab test. Returns the entry distance and the face normal.
    ///
    /// Rays starting inside (or on the surface of) the box never hit it, so a
    /// reflected ray leaving a wall does not collide with that wall again.
    fn intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        let inv = |d: f32| {
            if d.abs() < f32::EPSILON {
                f32::INFINITY.copysign(d)
            } else {
                1.0 / d
            }
        };
        let inv_dir = Vec3::new(inv(direction.x), inv(direction.y), inv(direction.z));

        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let t_near = t1.min(t2);
        let t_far = t1.max(t2);

        let t_enter = t_near.max_element();
        let t_exit = t_far.min_element();

        if t_enter.is_nan() || t_exit.is_nan() {
            return None;
        }
        if t_enter > t_exit || t_enter < HIT_EPSILON || t_enter > max_distance {
            return None;
        }

        let normal = if t_enter == t_near.x {
            Vec3::new(-direction.x.signum(), 0.0, 0.0)
        } else if t_enter == t_near.y {
            Vec3::new(0.0, -direction.y.signum(), 0.0)
        } else {
            Vec3::new(0.0, 0.0, -direction.z.signum())
        };
        Some((t_enter, normal))
    }
}

#[derive(Debug, Clone, Copy)]
struct AgentCollider {
    id: AgentId,
    center: Vec3,
    radius: f32,
    layer: u8,
}

#[derive(Debug, Clone, Copy)]
struct EdgeTrigger {
    edge: DiffractionEdge,
    layer: u8,
}

/// Reference [`GeometryQuery`] implementation.
///
/// # Example
///
/// ```
/// use soundmap::math::Vec3;
/// use soundmap::scene::{BoxScene, GeometryQuery, LayerMask};
///
/// let mut scene = BoxScene::new();
/// scene.add_wall(Vec3::new(5.0, -1.0, -5.0), Vec3::new(6.0, 1.0, 5.0));
///
/// let hit = scene
///     .raycast(Vec3::ZERO, Vec3::X, 20.0, LayerMask::ALL, None)
///     .unwrap()
///     .expect("wall in front");
/// assert_eq!(hit.distance, 5.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoxScene {
    walls: Vec<Wall>,
    agents: Vec<AgentCollider>,
    edges: Vec<EdgeTrigger>,
}

impl BoxScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wall(&mut self, min: Vec3, max: Vec3) -> &mut Self {
        self.walls.push(Wall::new(min, max));
        self
    }

    pub fn add_wall_on_layer(&mut self, min: Vec3, max: Vec3, layer: u8) -> &mut Self {
        self.walls.push(Wall {
            layer,
            ..Wall::new(min, max)
        });
        self
    }

    /// Adds (or moves) the cylinder collider of a sound-receiving agent.
    pub fn set_agent(&mut self, id: AgentId, center: Vec3, radius: f32) -> &mut Self {
        match self.agents.iter_mut().find(|a| a.id == id) {
            Some(agent) => {
                agent.center = center;
                agent.radius = radius;
            }
            None => self.agents.push(AgentCollider {
                id,
                center,
                radius,
                layer: 0,
            }),
        }
        self
    }

    pub fn remove_agent(&mut self, id: AgentId) {
        self.agents.retain(|a| a.id != id);
    }

    pub fn add_diffraction_edge(&mut self, edge: DiffractionEdge) -> &mut Self {
        self.edges.push(EdgeTrigger { edge, layer: 0 });
        self
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// True when `point` lies inside any wall.
    pub fn is_solid(&self, point: Vec3) -> bool {
        self.walls
            .iter()
            .any(|w| point.cmpge(w.min).all() && point.cmple(w.max).all())
    }
}

/// Entry distance of a ray into a vertical cylinder, ignoring rays that start
/// inside it.
fn intersect_cylinder(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    radius: f32,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let oc = Vec3::new(origin.x - center.x, 0.0, origin.z - center.z);
    let d = Vec3::new(direction.x, 0.0, direction.z);

    let a = d.length_squared();
    if a < f32::EPSILON {
        return None;
    }
    let b = 2.0 * oc.dot(d);
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    if t < HIT_EPSILON || t > max_distance {
        return None;
    }

    let point = origin + direction * t;
    Some((t, flatten(point - center)))
}

impl GeometryQuery for BoxScene {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
        ignore: Option<AgentId>,
    ) -> Result<Option<RayHit>> {
        let mut best: Option<(f32, Vec3, HitKind)> = None;
        let mut consider = |t: f32, normal: Vec3, kind: HitKind| {
            if best.is_none_or(|(best_t, _, _)| t < best_t) {
                best = Some((t, normal, kind));
            }
        };

        for wall in self.walls.iter().filter(|w| layers.contains(w.layer)) {
            if let Some((t, normal)) = wall.intersect(origin, direction, max_distance) {
                consider(t, normal, HitKind::Obstacle);
            }
        }

        for agent in self
            .agents
            .iter()
            .filter(|a| layers.contains(a.layer) && Some(a.id) != ignore)
        {
            if let Some((t, normal)) =
                intersect_cylinder(origin, direction, agent.center, agent.radius, max_distance)
            {
                consider(t, normal, HitKind::Receiver(agent.id));
            }
        }

        for trigger in self.edges.iter().filter(|e| layers.contains(e.layer)) {
            let edge = trigger.edge;
            if let Some((t, normal)) = intersect_cylinder(
                origin,
                direction,
                edge.position,
                edge.trigger_radius,
                max_distance,
            ) {
                consider(t, normal, HitKind::DiffractionEdge(edge));
            }
        }

        Ok(best.map(|(t, normal, kind)| RayHit::new(origin + direction * t, normal, t, kind)))
    }
}
