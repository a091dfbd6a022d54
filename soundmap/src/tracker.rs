//! Hill-climbing over the painted sound map toward a sound's source.
//!
//! Starting from the listener's cell, the tracker repeatedly steps to the
//! visible neighbour with the highest intensity for the requested category and
//! stops once no neighbour is louder than the current cell.

use crate::agent::AgentId;
use crate::error::Result;
use crate::grid::{CellIndex, SoundGrid};
use crate::math::Vec3;
use crate::scene::{GeometryQuery, LayerMask};
use crate::sound::SoundCategory;

/// Non-obstacle hits a visibility ray may pass through before giving up.
const MAX_PASS_THROUGH: usize = 8;

/// Nudge past a pass-through hit so the next cast starts beyond it.
const PASS_THROUGH_EPSILON: f32 = 1e-3;

/// One step of a tracked path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub cell: CellIndex,
    pub position: Vec3,
    /// Merged intensity of the tracked category at this cell
    pub intensity: f32,
}

/// Ordered cells from the listener toward the loudest reachable point of one
/// sound category. Intensity never decreases along the path.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePath {
    pub listener: AgentId,
    pub category: SoundCategory,
    pub points: Vec<PathPoint>,
}

impl SourcePath {
    pub fn new(listener: AgentId, category: SoundCategory) -> Self {
        Self {
            listener,
            category,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The listener's own cell.
    pub fn start(&self) -> Option<&PathPoint> {
        self.points.first()
    }

    /// Local intensity maximum the climb ended on.
    pub fn destination(&self) -> Option<&PathPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathPoint> {
        self.points.iter()
    }
}

/// Follows the intensity gradient of a [`SoundGrid`].
pub struct SourceTracker<'a> {
    grid: &'a SoundGrid,
    geometry: &'a dyn GeometryQuery,
    layers: LayerMask,
}

impl<'a> SourceTracker<'a> {
    pub fn new(grid: &'a SoundGrid, geometry: &'a dyn GeometryQuery, layers: LayerMask) -> Self {
        Self {
            grid,
            geometry,
            layers,
        }
    }

    /// Tracks `category` from `position` for `listener`.
    ///
    /// Returns an empty path when the listener stands outside the map and a
    /// single-point path when no neighbour is louder than its own cell.
    /// Visibility rays are cast at the listener's height.
    pub fn track(
        &self,
        listener: AgentId,
        position: Vec3,
        body_radius: f32,
        category: SoundCategory,
    ) -> Result<SourcePath> {
        let mut path = SourcePath::new(listener, category);
        let Some(mut current) = self.grid.world_to_cell(position) else {
            log::debug!("{} at {} is outside the sound map", listener, position);
            return Ok(path);
        };

        let (resolution_x, resolution_y) = self.grid.resolution();
        let height = position.y;
        let mut current_intensity = self.grid.category_intensity(current, category);
        path.points.push(self.point(current, current_intensity, height));

        // strictly increasing intensity bounds the climb by the cell count
        for _ in 0..resolution_x * resolution_y {
            let from = self.point(current, current_intensity, height).position;
            let mut best: Option<(CellIndex, f32)> = None;

            for neighbor in self.grid.neighbors(current) {
                let intensity = self.grid.category_intensity(neighbor, category);
                let beats_best = best.map_or(current_intensity, |(_, i)| i);
                if intensity <= beats_best {
                    continue;
                }
                let to = self.point(neighbor, intensity, height).position;
                if self.is_visible(from, to, body_radius, listener)? {
                    best = Some((neighbor, intensity));
                }
            }

            let Some((next, intensity)) = best else {
                break;
            };
            current = next;
            current_intensity = intensity;
            path.points.push(self.point(current, current_intensity, height));
        }

        log::trace!(
            "{} tracked {} over {} cells",
            listener,
            category,
            path.len()
        );
        Ok(path)
    }

    fn point(&self, cell: CellIndex, intensity: f32, height: f32) -> PathPoint {
        let center = self.grid.cell_position(cell).unwrap_or(Vec3::ZERO);
        PathPoint {
            cell,
            position: Vec3::new(center.x, height, center.z),
            intensity,
        }
    }

    /// True when no obstacle lies between `from` and `to`, extended by the
    /// listener's body radius. Receivers and diffraction triggers do not block.
    fn is_visible(
        &self,
        from: Vec3,
        to: Vec3,
        body_radius: f32,
        listener: AgentId,
    ) -> Result<bool> {
        let offset = to - from;
        let mut remaining = offset.length() + body_radius;
        let direction = offset.normalize_or_zero();
        if direction == Vec3::ZERO {
            return Ok(true);
        }

        let mut origin = from;
        for _ in 0..MAX_PASS_THROUGH {
            let Some(hit) =
                self.geometry
                    .raycast(origin, direction, remaining, self.layers, Some(listener))?
            else {
                return Ok(true);
            };
            if hit.is_obstacle() {
                return Ok(false);
            }
            let advance = hit.distance + PASS_THROUGH_EPSILON;
            origin += direction * advance;
            remaining -= advance;
            if remaining <= 0.0 {
                return Ok(true);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BoxScene;
    use crate::sound::LineageId;

    const LISTENER: AgentId = AgentId::new(9);
    const SOURCE: AgentId = AgentId::new(1);

    /// 10x10 grid with intensity rising toward cell (9, 5).
    fn gradient_grid() -> SoundGrid {
        let mut grid = SoundGrid::new(Vec3::ZERO, 10.0, 10.0, 1.0).unwrap();
        for x in 0..10 {
            for y in 0..10 {
                let distance = (x as f32 - 9.0).abs() + (y as f32 - 5.0).abs();
                grid.add_sample_at(
                    CellIndex::new(x, y),
                    100.0 - distance * 5.0,
                    SoundCategory::Walk,
                    LineageId::new(0),
                    SOURCE,
                );
            }
        }
        grid.merge_dirty();
        grid
    }

    #[test]
    fn test_climbs_to_maximum() {
        let grid = gradient_grid();
        let scene = BoxScene::new();
        let tracker = SourceTracker::new(&grid, &scene, LayerMask::ALL);

        let path = tracker
            .track(LISTENER, Vec3::new(1.0, 0.0, 1.0), 0.5, SoundCategory::Walk)
            .unwrap();

        assert_eq!(path.start().unwrap().cell, CellIndex::new(1, 1));
        assert_eq!(path.destination().unwrap().cell, CellIndex::new(9, 5));
        for pair in path.points.windows(2) {
            assert!(pair[1].intensity > pair[0].intensity);
            let dx = pair[0].cell.x.abs_diff(pair[1].cell.x);
            let dy = pair[0].cell.y.abs_diff(pair[1].cell.y);
            assert!(dx <= 1 && dy <= 1);
        }
    }

    #[test]
    fn test_wall_blocks_ascent() {
        let grid = gradient_grid();
        let mut scene = BoxScene::new();
        // wall along column 5
        scene.add_wall(Vec3::new(4.8, -1.0, -1.0), Vec3::new(5.2, 1.0, 11.0));
        let tracker = SourceTracker::new(&grid, &scene, LayerMask::ALL);

        let path = tracker
            .track(LISTENER, Vec3::new(1.0, 0.0, 5.0), 0.5, SoundCategory::Walk)
            .unwrap();

        let end = path.destination().unwrap();
        assert_eq!(end.cell, CellIndex::new(4, 5));
        assert!(path.iter().all(|p| p.cell.x <= 4));
    }

    #[test]
    fn test_other_agents_do_not_block() {
        let grid = gradient_grid();
        let mut scene = BoxScene::new();
        scene.set_agent(AgentId::new(3), Vec3::new(5.5, 0.0, 5.0), 0.3);
        let tracker = SourceTracker::new(&grid, &scene, LayerMask::ALL);

        let path = tracker
            .track(LISTENER, Vec3::new(1.0, 0.0, 5.0), 0.5, SoundCategory::Walk)
            .unwrap();
        assert_eq!(path.destination().unwrap().cell, CellIndex::new(9, 5));
    }

    #[test]
    fn test_silent_category_gives_single_point() {
        let grid = gradient_grid();
        let scene = BoxScene::new();
        let tracker = SourceTracker::new(&grid, &scene, LayerMask::ALL);

        let path = tracker
            .track(LISTENER, Vec3::new(2.0, 0.0, 2.0), 0.5, SoundCategory::Talk)
            .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.start().unwrap().intensity, 0.0);
    }

    #[test]
    fn test_outside_map_gives_empty_path() {
        let grid = gradient_grid();
        let scene = BoxScene::new();
        let tracker = SourceTracker::new(&grid, &scene, LayerMask::ALL);

        let path = tracker
            .track(LISTENER, Vec3::new(-20.0, 0.0, 3.0), 0.5, SoundCategory::Walk)
            .unwrap();
        assert!(path.is_empty());
        assert_eq!(path.listener, LISTENER);
    }
}
