/// Configuration for an agent that makes sounds
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    /// Display name used in logs and events
    pub name: String,
}

impl EmitterConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self::named("emitter")
    }
}

/// Configuration for an agent that hears sounds
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Radius of the listener's body. Visibility rays used while tracking a
    /// sound are extended by this much so the agent does not clip corners.
    pub body_radius: f32,
    /// When false the listener still registers hits but no path is traced
    pub can_track: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            body_radius: 0.5,
            can_track: true,
        }
    }
}

impl ListenerConfig {
    pub fn new(body_radius: f32) -> Self {
        Self {
            body_radius,
            ..Default::default()
        }
    }

    /// Listener that hears sounds but never traces a path
    pub fn hearing_only() -> Self {
        Self {
            can_track: false,
            ..Default::default()
        }
    }

    pub fn body_radius(mut self, radius: f32) -> Self {
        self.body_radius = radius;
        self
    }

    pub fn can_track(mut self, enable: bool) -> Self {
        self.can_track = enable;
        self
    }
}
