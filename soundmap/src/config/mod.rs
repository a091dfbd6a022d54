//! Configuration for SoundMap

pub mod agent_config;
pub mod map_desc;

pub use agent_config::{EmitterConfig, ListenerConfig};
pub use map_desc::SoundMapDesc;
