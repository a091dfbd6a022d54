use crate::error::{Result, SoundMapError};
use crate::math::Vec3;
use crate::scene::LayerMask;
use std::time::Duration;

/// Configuration descriptor for a SoundMap world
#[derive(Debug, Clone, PartialEq)]
pub struct SoundMapDesc {
    /// World position of grid cell (0, 0)
    pub start_point: Vec3,
    /// Extent of the mapped area along X
    pub width: f32,
    /// Extent of the mapped area along Z
    pub length: f32,
    /// Side length of one grid cell. Changing it at runtime rebuilds the grid.
    pub tile_scale: f32,
    /// Number of rays a full 360° emission casts. Also sets the angular density
    /// of diffraction fans.
    pub ray_frequency: u32,
    /// Volume lost per step travelled
    pub fading_speed: f32,
    /// Distance covered by one step
    pub step_distance: f32,
    /// Maximum number of reflections a ray lineage may undergo
    pub reflection_limit: u32,
    /// Fraction of the corner angle a diffraction fan spreads over, clamped to [0.5, 1]
    pub diffraction_angle_ratio: f32,
    /// Volume multiplier applied when a ray diffracts, in (0, 1)
    pub diffraction_rate: f32,
    /// Volume multiplier applied when a ray reflects, in (0, 1]
    pub absorption_rate: f32,
    /// Simulation ticks per second
    pub execution_rate: f32,
    /// Segments quieter than this are dropped
    pub min_volume: f32,
    /// Layers propagation and visibility rays may hit
    pub raycast_layers: LayerMask,
}

impl Default for SoundMapDesc {
    fn default() -> Self {
        Self {
            start_point: Vec3::ZERO,
            width: 32.0,
            length: 32.0,
            tile_scale: 1.0,
            ray_frequency: 72,
            fading_speed: 1.0,
            step_distance: 0.5,
            reflection_limit: 3,
            diffraction_angle_ratio: 0.75,
            diffraction_rate: 0.8,
            absorption_rate: 0.8,
            execution_rate: 30.0,
            min_volume: 0.1,
            raycast_layers: LayerMask::ALL,
        }
    }
}

impl SoundMapDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn area(mut self, start_point: Vec3, width: f32, length: f32) -> Self {
        self.start_point = start_point;
        self.width = width;
        self.length = length;
        self
    }

    pub fn tile_scale(mut self, scale: f32) -> Self {
        self.tile_scale = scale;
        self
    }

    pub fn ray_frequency(mut self, rays: u32) -> Self {
        self.ray_frequency = rays;
        self
    }

    pub fn fading(mut self, fading_speed: f32, step_distance: f32) -> Self {
        self.fading_speed = fading_speed;
        self.step_distance = step_distance;
        self
    }

    pub fn reflection_limit(mut self, limit: u32) -> Self {
        self.reflection_limit = limit;
        self
    }

    pub fn absorption_rate(mut self, rate: f32) -> Self {
        self.absorption_rate = rate;
        self
    }

    pub fn diffraction(mut self, angle_ratio: f32, rate: f32) -> Self {
        self.diffraction_angle_ratio = angle_ratio;
        self.diffraction_rate = rate;
        self
    }

    pub fn execution_rate(mut self, ticks_per_second: f32) -> Self {
        self.execution_rate = ticks_per_second;
        self
    }

    pub fn raycast_layers(mut self, layers: LayerMask) -> Self {
        self.raycast_layers = layers;
        self
    }

    /// Minimum simulated time between two ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::try_from_secs_f32(1.0 / self.execution_rate).unwrap_or(Duration::MAX)
    }

    /// Diffraction angle ratio limited to the range the engine accepts
    pub fn effective_diffraction_ratio(&self) -> f32 {
        self.diffraction_angle_ratio.clamp(0.5, 1.0)
    }

    /// Checks every tunable, failing fast on values that would make
    /// propagation divide by zero or never terminate.
    pub fn validate(&self) -> Result<()> {
        fn invalid(message: String) -> Result<()> {
            Err(SoundMapError::InvalidConfiguration(message))
        }

        let finite = [
            ("width", self.width),
            ("length", self.length),
            ("tile_scale", self.tile_scale),
            ("fading_speed", self.fading_speed),
            ("step_distance", self.step_distance),
            ("diffraction_angle_ratio", self.diffraction_angle_ratio),
            ("diffraction_rate", self.diffraction_rate),
            ("absorption_rate", self.absorption_rate),
            ("execution_rate", self.execution_rate),
            ("min_volume", self.min_volume),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return invalid(format!("{} must be finite, got {}", name, value));
            }
        }
        if !self.start_point.is_finite() {
            return invalid(format!(
                "start_point must be finite, got {:?}",
                self.start_point
            ));
        }

        if self.fading_speed <= 0.0 {
            return invalid(format!(
                "fading_speed must be positive, got {}",
                self.fading_speed
            ));
        }
        if self.step_distance <= 0.0 {
            return invalid(format!(
                "step_distance must be positive, got {}",
                self.step_distance
            ));
        }
        if self.tile_scale <= 0.0 {
            return invalid(format!(
                "tile_scale must be positive, got {}",
                self.tile_scale
            ));
        }
        if self.ray_frequency == 0 {
            return invalid("ray_frequency must be at least 1".into());
        }
        if self.execution_rate <= 0.0 {
            return invalid(format!(
                "execution_rate must be positive, got {}",
                self.execution_rate
            ));
        }
        if self.min_volume <= 0.0 {
            return invalid(format!(
                "min_volume must be positive, got {}",
                self.min_volume
            ));
        }
        if !(self.absorption_rate > 0.0 && self.absorption_rate <= 1.0) {
            return invalid(format!(
                "absorption_rate must be in (0, 1], got {}",
                self.absorption_rate
            ));
        }
        if !(self.diffraction_rate > 0.0 && self.diffraction_rate < 1.0) {
            return invalid(format!(
                "diffraction_rate must be in (0, 1), got {}",
                self.diffraction_rate
            ));
        }
        if self.width < self.tile_scale || self.length < self.tile_scale {
            return invalid(format!(
                "mapped area {}x{} is smaller than one {} tile",
                self.width, self.length, self.tile_scale
            ));
        }

        Ok(())
    }
}
