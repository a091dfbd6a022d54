//! The sound map: a 2D array of [`GridCell`]s laid over the XZ plane, with
//! sparse tracking of the cells written since the last reset.

use crate::agent::AgentId;
use crate::error::{Result, SoundMapError};
use crate::grid::cell::GridCell;
use crate::math::Vec3;
use crate::sound::{LineageId, SoundCategory};
use std::collections::HashSet;

/// Column (`x`, along world X) and row (`y`, along world Z) of a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    pub x: usize,
    pub y: usize,
}

impl CellIndex {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for CellIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Destination for the intensity samples produced while tracing rays.
pub trait SampleSink {
    fn add_sample(
        &mut self,
        position: Vec3,
        intensity: f32,
        category: SoundCategory,
        lineage: LineageId,
        source: AgentId,
    );
}

/// Grid of accumulated sound intensity.
#[derive(Debug, Clone)]
pub struct SoundGrid {
    start: Vec3,
    width: f32,
    length: f32,
    tile_scale: f32,
    resolution_x: usize,
    resolution_y: usize,
    cells: Vec<GridCell>,
    /// Flat indices (`x * resolution_y + y`) written since the last reset
    dirty: HashSet<usize>,
    highest_intensity: f32,
}

impl SoundGrid {
    /// Builds a grid covering `width × length` world units from `start`.
    pub fn new(start: Vec3, width: f32, length: f32, tile_scale: f32) -> Result<Self> {
        let mut grid = Self {
            start,
            width,
            length,
            tile_scale,
            resolution_x: 0,
            resolution_y: 0,
            cells: Vec::new(),
            dirty: HashSet::new(),
            highest_intensity: 0.0,
        };
        grid.regenerate(tile_scale)?;
        Ok(grid)
    }

    /// Destroys every cell and rebuilds the grid at a new tile scale.
    ///
    /// Dirty-cell bookkeeping and the running maximum are cleared as well so no
    /// index from the old layout survives.
    pub fn regenerate(&mut self, tile_scale: f32) -> Result<()> {
        if !(tile_scale.is_finite() && tile_scale > 0.0) {
            return Err(SoundMapError::InvalidConfiguration(format!(
                "tile_scale must be positive, got {}",
                tile_scale
            )));
        }
        let resolution_x = (self.width / tile_scale).floor() as usize;
        let resolution_y = (self.length / tile_scale).floor() as usize;
        if resolution_x == 0 || resolution_y == 0 {
            return Err(SoundMapError::InvalidConfiguration(format!(
                "tile_scale {} leaves no cells in a {}x{} area",
                tile_scale, self.width, self.length
            )));
        }

        self.tile_scale = tile_scale;
        self.resolution_x = resolution_x;
        self.resolution_y = resolution_y;
        let start = self.start;
        self.cells = (0..resolution_x)
            .flat_map(|x| (0..resolution_y).map(move |y| (x, y)))
            .map(|(x, y)| {
                GridCell::new(start + Vec3::new(tile_scale * x as f32, 0.0, tile_scale * y as f32))
            })
            .collect();
        self.dirty.clear();
        self.highest_intensity = 0.0;

        log::info!(
            "Sound map generated: {}x{} cells of {} units",
            resolution_x,
            resolution_y,
            tile_scale
        );
        Ok(())
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.resolution_x, self.resolution_y)
    }

    pub fn tile_scale(&self) -> f32 {
        self.tile_scale
    }

    pub fn start_point(&self) -> Vec3 {
        self.start
    }

    /// Highest net intensity any cell has reached since the grid was built.
    pub fn highest_intensity(&self) -> f32 {
        self.highest_intensity
    }

    fn flat(&self, index: CellIndex) -> Option<usize> {
        (index.x < self.resolution_x && index.y < self.resolution_y)
            .then(|| index.x * self.resolution_y + index.y)
    }

    fn unflat(&self, flat: usize) -> CellIndex {
        CellIndex::new(flat / self.resolution_y, flat % self.resolution_y)
    }

    /// Maps a world position to the nearest cell, or `None` outside the map.
    pub fn world_to_cell(&self, position: Vec3) -> Option<CellIndex> {
        let x = ((position.x - self.start.x) / self.tile_scale).round();
        let y = ((position.z - self.start.z) / self.tile_scale).round();
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let index = CellIndex::new(x as usize, y as usize);
        self.flat(index).map(|_| index)
    }

    pub fn cell(&self, index: CellIndex) -> Option<&GridCell> {
        self.flat(index).map(|i| &self.cells[i])
    }

    pub fn cell_position(&self, index: CellIndex) -> Option<Vec3> {
        self.cell(index).map(GridCell::position)
    }

    /// In-bounds cells of the 3x3 block around `index`, excluding `index`.
    pub fn neighbors(&self, index: CellIndex) -> impl Iterator<Item = CellIndex> + '_ {
        (-1i64..=1)
            .flat_map(|dx| (-1i64..=1).map(move |dy| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .filter_map(move |(dx, dy)| {
                let x = index.x as i64 + dx;
                let y = index.y as i64 + dy;
                (x >= 0 && y >= 0)
                    .then(|| CellIndex::new(x as usize, y as usize))
                    .filter(|n| self.flat(*n).is_some())
            })
    }

    /// Clears one cell's accumulators.
    pub fn reset(&mut self, index: CellIndex) {
        if let Some(i) = self.flat(index) {
            self.cells[i].reset();
        }
    }

    /// Resets every cell written since the last call and forgets them.
    /// Returns how many cells were reset.
    pub fn reset_dirty(&mut self) -> usize {
        let count = self.dirty.len();
        for i in self.dirty.drain() {
            self.cells[i].reset();
        }
        count
    }

    /// Folds one sample into a cell and marks it dirty.
    pub fn add_sample_at(
        &mut self,
        index: CellIndex,
        intensity: f32,
        category: SoundCategory,
        lineage: LineageId,
        source: AgentId,
    ) {
        if let Some(i) = self.flat(index) {
            self.cells[i].add_sample(intensity, category, lineage, source);
            self.dirty.insert(i);
        }
    }

    /// Merges one cell and raises the running maximum if needed.
    pub fn merge(&mut self, index: CellIndex) -> f32 {
        let Some(i) = self.flat(index) else {
            return 0.0;
        };
        let net = self.cells[i].merge();
        if net > self.highest_intensity {
            self.highest_intensity = net;
        }
        net
    }

    /// Merges every dirty cell. Returns how many were merged.
    pub fn merge_dirty(&mut self) -> usize {
        for &i in &self.dirty {
            let net = self.cells[i].merge();
            if net > self.highest_intensity {
                self.highest_intensity = net;
            }
        }
        self.dirty.len()
    }

    /// Normalizes every dirty cell against the running maximum.
    pub fn paint_dirty(&mut self) {
        let highest = self.highest_intensity;
        for &i in &self.dirty {
            self.cells[i].paint(highest);
        }
    }

    /// Merged intensity of one category at a cell; zero outside the map.
    pub fn category_intensity(&self, index: CellIndex, category: SoundCategory) -> f32 {
        self.cell(index)
            .map(|c| c.category_intensity(category))
            .unwrap_or(0.0)
    }

    /// Normalized paint value of a cell in [0, 1].
    pub fn painted_intensity(&self, index: CellIndex) -> f32 {
        self.cell(index).map(GridCell::painted).unwrap_or(0.0)
    }

    /// Paint values of every cell touched during the last tick.
    pub fn painted_cells(&self) -> Vec<(CellIndex, f32)> {
        let mut painted: Vec<_> = self
            .dirty
            .iter()
            .map(|&i| (self.unflat(i), self.cells[i].painted()))
            .collect();
        painted.sort_by_key(|(index, _)| *index);
        painted
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_dirty(&self, index: CellIndex) -> bool {
        self.flat(index).is_some_and(|i| self.dirty.contains(&i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, &GridCell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (self.unflat(i), cell))
    }
}

impl SampleSink for SoundGrid {
    /// Samples outside the mapped area are dropped.
    fn add_sample(
        &mut self,
        position: Vec3,
        intensity: f32,
        category: SoundCategory,
        lineage: LineageId,
        source: AgentId,
    ) {
        if let Some(index) = self.world_to_cell(position) {
            self.add_sample_at(index, intensity, category, lineage, source);
        }
    }
}
