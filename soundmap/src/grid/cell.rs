//! A single sound map cell and the per-source accumulators inside it.

use crate::agent::AgentId;
use crate::math::Vec3;
use crate::sound::{LineageId, SoundCategory};
use std::collections::BTreeMap;

/// Running average of every sample one (category, lineage, source) triple
/// wrote into a cell since the last reset.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAccumulator {
    pub category: SoundCategory,
    pub lineage: LineageId,
    pub source: AgentId,
    average: f32,
    total: f32,
    samples: u32,
}

impl SourceAccumulator {
    pub fn new(category: SoundCategory, lineage: LineageId, source: AgentId) -> Self {
        Self {
            category,
            lineage,
            source,
            average: 0.0,
            total: 0.0,
            samples: 0,
        }
    }

    /// Folds a sample into the incremental mean:
    /// `avg(k+1) = k/(k+1) * avg(k) + 1/(k+1) * sample`.
    pub fn add(&mut self, intensity: f32) {
        let k = self.samples as f32;
        self.average = (k / (k + 1.0)) * self.average + (1.0 / (k + 1.0)) * intensity;
        self.total += intensity;
        self.samples += 1;
    }

    pub fn intensity(&self) -> f32 {
        self.average
    }

    /// Plain sum of every sample, kept alongside the mean.
    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    fn matches(&self, lineage: LineageId, source: AgentId) -> bool {
        self.lineage == lineage && self.source == source
    }
}

/// One tile of the sound map.
#[derive(Debug, Clone)]
pub struct GridCell {
    position: Vec3,
    sources: BTreeMap<SoundCategory, Vec<SourceAccumulator>>,
    merged: BTreeMap<SoundCategory, f32>,
    net_intensity: f32,
    loudest: Option<SoundCategory>,
    painted: f32,
}

impl GridCell {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            sources: BTreeMap::new(),
            merged: BTreeMap::new(),
            net_intensity: 0.0,
            loudest: None,
            painted: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Clears every accumulator and the merged totals.
    pub fn reset(&mut self) {
        self.sources.clear();
        self.merged.clear();
        self.net_intensity = 0.0;
        self.loudest = None;
        self.painted = 0.0;
    }

    pub fn add_sample(
        &mut self,
        intensity: f32,
        category: SoundCategory,
        lineage: LineageId,
        source: AgentId,
    ) {
        let accumulators = self.sources.entry(category).or_default();
        match accumulators.iter_mut().find(|a| a.matches(lineage, source)) {
            Some(accumulator) => accumulator.add(intensity),
            None => {
                let mut accumulator = SourceAccumulator::new(category, lineage, source);
                accumulator.add(intensity);
                accumulators.push(accumulator);
            }
        }
    }

    /// Sums each category's accumulators and keeps the loudest category as the
    /// cell's net intensity. Returns the new net intensity.
    pub fn merge(&mut self) -> f32 {
        self.merged.clear();
        self.net_intensity = 0.0;
        self.loudest = None;

        for (&category, accumulators) in &self.sources {
            let total: f32 = accumulators.iter().map(SourceAccumulator::intensity).sum();
            self.merged.insert(category, total);
            if total > self.net_intensity {
                self.net_intensity = total;
                self.loudest = Some(category);
            }
        }
        self.net_intensity
    }

    /// Merged total for one category, or zero if it never reached this cell.
    pub fn category_intensity(&self, category: SoundCategory) -> f32 {
        self.merged.get(&category).copied().unwrap_or(0.0)
    }

    pub fn net_intensity(&self) -> f32 {
        self.net_intensity
    }

    pub fn loudest(&self) -> Option<SoundCategory> {
        self.loudest
    }

    /// Net intensity normalized against the map-wide maximum, as of the last paint.
    pub fn painted(&self) -> f32 {
        self.painted
    }

    pub(crate) fn paint(&mut self, highest_intensity: f32) {
        self.painted = if highest_intensity > 0.0 {
            (self.net_intensity / highest_intensity).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn accumulators(&self, category: SoundCategory) -> &[SourceAccumulator] {
        self.sources.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_silent(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: AgentId = AgentId::new(1);
    const B: AgentId = AgentId::new(2);

    #[test]
    fn test_incremental_average() {
        let mut acc = SourceAccumulator::new(SoundCategory::Walk, LineageId::new(0), A);
        for sample in [10.0, 20.0, 30.0, 40.0] {
            acc.add(sample);
        }
        assert!((acc.intensity() - 25.0).abs() < 1e-5);
        assert_eq!(acc.total(), 100.0);
        assert_eq!(acc.samples(), 4);
    }

    #[test]
    fn test_same_lineage_is_averaged() {
        let mut cell = GridCell::new(Vec3::ZERO);
        cell.add_sample(10.0, SoundCategory::Walk, LineageId::new(3), A);
        cell.add_sample(30.0, SoundCategory::Walk, LineageId::new(3), A);
        assert_eq!(cell.merge(), 20.0);
        assert_eq!(cell.accumulators(SoundCategory::Walk).len(), 1);
    }

    #[test]
    fn test_distinct_sources_are_summed() {
        let mut cell = GridCell::new(Vec3::ZERO);
        cell.add_sample(10.0, SoundCategory::Walk, LineageId::new(0), A);
        cell.add_sample(30.0, SoundCategory::Walk, LineageId::new(0), B);
        cell.add_sample(5.0, SoundCategory::Walk, LineageId::new(1), A);
        assert_eq!(cell.merge(), 45.0);
        assert_eq!(cell.category_intensity(SoundCategory::Walk), 45.0);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let samples = [
            (12.0, SoundCategory::Run, LineageId::new(0), A),
            (7.0, SoundCategory::Run, LineageId::new(1), B),
            (9.0, SoundCategory::Talk, LineageId::new(0), B),
            (3.0, SoundCategory::Run, LineageId::new(0), A),
        ];

        let mut forward = GridCell::new(Vec3::ZERO);
        for &(i, c, l, s) in &samples {
            forward.add_sample(i, c, l, s);
        }
        let mut backward = GridCell::new(Vec3::ZERO);
        for &(i, c, l, s) in samples.iter().rev() {
            backward.add_sample(i, c, l, s);
        }

        assert_eq!(forward.merge(), backward.merge());
        assert_eq!(forward.loudest(), backward.loudest());
    }

    #[test]
    fn test_loudest_category_wins() {
        let mut cell = GridCell::new(Vec3::ZERO);
        cell.add_sample(4.0, SoundCategory::Walk, LineageId::new(0), A);
        cell.add_sample(4.0, SoundCategory::Walk, LineageId::new(0), B);
        cell.add_sample(6.0, SoundCategory::Hit, LineageId::new(0), A);

        assert_eq!(cell.merge(), 8.0);
        assert_eq!(cell.loudest(), Some(SoundCategory::Walk));
        assert_eq!(cell.category_intensity(SoundCategory::Hit), 6.0);
        assert_eq!(cell.category_intensity(SoundCategory::Talk), 0.0);
    }

    #[test]
    fn test_reset_and_paint() {
        let mut cell = GridCell::new(Vec3::ZERO);
        cell.add_sample(5.0, SoundCategory::Talk, LineageId::new(0), A);
        cell.merge();
        cell.paint(10.0);
        assert_eq!(cell.painted(), 0.5);

        cell.reset();
        assert!(cell.is_silent());
        assert_eq!(cell.net_intensity(), 0.0);
        assert_eq!(cell.loudest(), None);
        assert_eq!(cell.painted(), 0.0);
    }
}
