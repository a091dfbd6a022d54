use crate::agent::{Agent, AgentId, Emitter, Listener};
use crate::config::{EmitterConfig, ListenerConfig, SoundMapDesc};
use crate::error::{Result, SoundMapError};
use crate::events::{SoundMapEvent, TickTimingEvent};
use crate::grid::SoundGrid;
use crate::math::{Pose, Vec3};
use crate::propagation::{PropagationEngine, Reception};
use crate::scene::GeometryQuery;
use crate::sound::{SoundCategory, SoundEvent};
use crate::tracker::{SourcePath, SourceTracker};
use crossbeam_channel::{Receiver, Sender};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;
use uuid::Uuid;

/// Slack (seconds) allowed when comparing tick times, so callers ticking at
/// exactly `execution_rate` are not skipped by rounding.
const TICK_TOLERANCE: f32 = 1e-4;

/// Main world object that owns the sound map and every registered agent.
///
/// `SoundMapWorld` is driven from the caller's update loop: call [`tick`]
/// every frame with the current simulation time and a [`GeometryQuery`] for
/// the scene. The world decides on its own whether enough time has passed
/// for another propagation pass.
///
/// # Tick phases
///
/// 1. **Reset**: clear every cell written during the previous tick
/// 2. **Propagate**: expand and trace each emitter's sounds into the grid
/// 3. **Merge**: fold per-source accumulators into per-cell intensities
/// 4. **Paint**: normalize touched cells against the running maximum
/// 5. **Resolve**: track heard sounds back to their source for each listener
///
/// [`tick`]: SoundMapWorld::tick
pub struct SoundMapWorld {
    desc: SoundMapDesc,
    grid: SoundGrid,
    agents: BTreeMap<AgentId, Agent>,
    next_agent_id: u64,
    running: bool,
    clock: f32,
    last_tick: Option<f32>,
    track_requests: VecDeque<(AgentId, SoundCategory)>,
    event_sender: Sender<SoundMapEvent>,
    event_receiver: Receiver<SoundMapEvent>,
    last_timing: Option<TickTimingEvent>,
}

impl SoundMapWorld {
    /// Creates a world and generates its grid.
    ///
    /// # Errors
    ///
    /// Returns [`SoundMapError::InvalidConfiguration`] if `desc` fails validation.
    pub fn new(desc: SoundMapDesc) -> Result<Self> {
        desc.validate()?;
        let grid = SoundGrid::new(desc.start_point, desc.width, desc.length, desc.tile_scale)?;
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();

        log::info!(
            "SoundMap world created: {} rays per emission, {} ticks/s",
            desc.ray_frequency,
            desc.execution_rate
        );

        Ok(Self {
            desc,
            grid,
            agents: BTreeMap::new(),
            next_agent_id: 0,
            running: false,
            clock: 0.0,
            last_tick: None,
            track_requests: VecDeque::new(),
            event_sender,
            event_receiver,
            last_timing: None,
        })
    }

    pub fn desc(&self) -> &SoundMapDesc {
        &self.desc
    }

    pub fn grid(&self) -> &SoundGrid {
        &self.grid
    }

    /// Simulation time passed to the most recent [`tick`](Self::tick).
    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts the simulation. The next call to `tick` runs immediately.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        self.last_tick = None;
        log::info!("Sound simulation started");
        self.emit(SoundMapEvent::SimulationStarted)
    }

    /// Stops the simulation, cancelling every pending sound and in-flight ray.
    pub fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.last_tick = None;
        for emitter in self.agents.values_mut().filter_map(|a| a.emitter.as_mut()) {
            emitter.clear();
        }
        self.track_requests.clear();
        log::info!("Sound simulation stopped");
        self.emit(SoundMapEvent::SimulationStopped)
    }

    /// Registers a new agent with no capabilities and returns its handle.
    pub fn register_agent(&mut self, pose: Pose) -> AgentId {
        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id += 1;
        self.agents.insert(id, Agent::new(id, pose));
        log::info!("Registered {} at {}", id, pose.position);
        id
    }

    /// Removes an agent together with its queued sounds and tracking requests.
    pub fn unregister_agent(&mut self, id: AgentId) -> Result<()> {
        if self.agents.remove(&id).is_none() {
            log::warn!("Tried to unregister unknown {}", id);
            return Err(SoundMapError::UnknownAgent(id));
        }
        self.track_requests.retain(|(listener, _)| *listener != id);
        log::info!("Unregistered {}", id);
        Ok(())
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Registered agents in handle order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Gives an agent the ability to make sounds. Replaces any previous
    /// emitter, dropping its queued sounds.
    pub fn attach_emitter(&mut self, id: AgentId, config: EmitterConfig) -> Result<()> {
        let agent = self.agent_mut(id)?;
        agent.emitter = Some(Emitter::new(config));
        Ok(())
    }

    /// Gives an agent the ability to hear sounds and returns the channel its
    /// tracked [`SourcePath`]s are delivered on.
    pub fn attach_listener(
        &mut self,
        id: AgentId,
        config: ListenerConfig,
    ) -> Result<Receiver<SourcePath>> {
        if !(config.body_radius.is_finite() && config.body_radius >= 0.0) {
            return Err(SoundMapError::InvalidConfiguration(format!(
                "body_radius must be non-negative, got {}",
                config.body_radius
            )));
        }
        let agent = self.agent_mut(id)?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        agent.listener = Some(Listener::new(config, sender));
        Ok(receiver)
    }

    pub fn set_agent_pose(&mut self, id: AgentId, pose: Pose) -> Result<()> {
        self.agent_mut(id)?.pose = pose;
        Ok(())
    }

    /// Queues a sound from `id`'s emitter.
    ///
    /// The sound's start time is the time of the most recent tick. It casts a
    /// ray fan on the next tick and is re-emitted every tick after that until
    /// `duration` seconds have passed.
    ///
    /// # Returns
    ///
    /// The id of the new sound event, or `None` when the simulation is not
    /// running (the request is dropped).
    ///
    /// # Errors
    ///
    /// - [`SoundMapError::UnknownAgent`] if `id` is not registered
    /// - [`SoundMapError::CapabilityMissing`] if the agent has no emitter
    /// - [`SoundMapError::InvalidConfiguration`] for a non-positive volume or
    ///   negative duration
    pub fn make_sound(
        &mut self,
        id: AgentId,
        position: Vec3,
        volume: f32,
        category: SoundCategory,
        range: f32,
        duration: f32,
    ) -> Result<Option<Uuid>> {
        if !(volume.is_finite() && volume > 0.0) {
            return Err(SoundMapError::InvalidConfiguration(format!(
                "sound volume must be positive, got {}",
                volume
            )));
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SoundMapError::InvalidConfiguration(format!(
                "sound duration must be non-negative, got {}",
                duration
            )));
        }

        let (running, clock) = (self.running, self.clock);
        let emitter = self
            .agent_mut(id)?
            .emitter
            .as_mut()
            .ok_or(SoundMapError::CapabilityMissing {
                agent: id,
                capability: "emitter",
            })?;

        if !running {
            log::debug!("Ignoring {} sound from {}: simulation is stopped", category, id);
            return Ok(None);
        }

        let sound = SoundEvent::new(id, position, volume, category, range, duration, clock);
        let event_id = sound.id;
        emitter.sounds.push_back(sound);

        self.emit(SoundMapEvent::SoundStarted {
            event_id,
            producer: id,
            category,
        })?;
        Ok(Some(event_id))
    }

    /// True while the agent has at least one unexpired sound queued.
    pub fn is_making_sound(&self, id: AgentId) -> Result<bool> {
        let agent = self.agents.get(&id).ok_or(SoundMapError::UnknownAgent(id))?;
        Ok(agent.emitter().is_some_and(Emitter::is_making_sound))
    }

    /// Rebuilds the grid at a new tile scale.
    ///
    /// Every cell, the dirty set, the running maximum and any pending tracking
    /// request are discarded. In-flight rays keep travelling and write into
    /// the new layout on the next tick.
    pub fn set_tile_scale(&mut self, tile_scale: f32) -> Result<()> {
        let desc = self.desc.clone().tile_scale(tile_scale);
        desc.validate()?;
        self.grid.regenerate(tile_scale)?;
        self.desc = desc;
        self.track_requests.clear();

        let (resolution_x, resolution_y) = self.grid.resolution();
        self.emit(SoundMapEvent::GridRegenerated {
            resolution_x,
            resolution_y,
        })
    }

    /// Drains every event emitted since the last poll.
    pub fn poll_events(&self) -> Vec<SoundMapEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// Phase timings of the last tick that actually ran.
    pub fn last_tick_timing(&self) -> Option<TickTimingEvent> {
        self.last_timing
    }

    /// Advances the simulation to `now` (seconds).
    ///
    /// Runs a full pass only when the simulation is running and at least
    /// `1 / execution_rate` seconds have passed since the previous pass.
    ///
    /// # Returns
    ///
    /// `true` if a pass ran, `false` if it was skipped.
    ///
    /// # Errors
    ///
    /// Propagates [`SoundMapError::EnvironmentNotReady`] from `geometry`.
    pub fn tick(&mut self, now: f32, geometry: &mut dyn GeometryQuery) -> Result<bool> {
        self.clock = now;
        if !self.running {
            return Ok(false);
        }
        if let Some(last) = self.last_tick {
            let interval = self.desc.tick_interval().as_secs_f32();
            if now - last + TICK_TOLERANCE < interval {
                return Ok(false);
            }
        }
        self.last_tick = Some(now);

        let tick_start = Instant::now();
        let mut timing = TickTimingEvent::default();

        let phase = Instant::now();
        let reset = self.grid.reset_dirty();
        timing.reset_time_us = elapsed_us(phase);

        geometry.begin_frame();
        let result = self.run_frame(now, &*geometry, &mut timing);
        geometry.end_frame();
        let resolved = result?;

        timing.total_time_us = elapsed_us(tick_start);
        self.last_timing = Some(timing);

        log::debug!(
            "Tick at {:.3}s: reset {} cells, traced {} segments, touched {} cells, resolved {} tracks",
            now,
            reset,
            timing.segments_traced,
            timing.cells_touched,
            resolved
        );
        Ok(true)
    }

    fn run_frame(
        &mut self,
        now: f32,
        geometry: &dyn GeometryQuery,
        timing: &mut TickTimingEvent,
    ) -> Result<usize> {
        let phase = Instant::now();
        let receptions = self.propagate(now, geometry, timing)?;
        for reception in receptions {
            self.receive(reception)?;
        }
        timing.propagate_time_us = elapsed_us(phase);

        let phase = Instant::now();
        timing.cells_touched = self.grid.merge_dirty();
        timing.merge_time_us = elapsed_us(phase);

        let phase = Instant::now();
        self.grid.paint_dirty();
        timing.paint_time_us = elapsed_us(phase);

        let phase = Instant::now();
        let resolved = self.resolve(geometry)?;
        timing.resolve_time_us = elapsed_us(phase);

        Ok(resolved)
    }

    fn propagate(
        &mut self,
        now: f32,
        geometry: &dyn GeometryQuery,
        timing: &mut TickTimingEvent,
    ) -> Result<Vec<Reception>> {
        let mut expired = Vec::new();
        for emitter in self.agents.values_mut().filter_map(|a| a.emitter.as_mut()) {
            expired.extend(emitter.expire(now));
        }
        for sound in expired {
            self.emit(SoundMapEvent::SoundExpired {
                event_id: sound.id,
                producer: sound.producer,
            })?;
        }

        let engine = PropagationEngine::new(&self.desc, geometry);
        let mut receptions = Vec::new();
        for agent in self.agents.values_mut() {
            let Some(emitter) = agent.emitter.as_mut() else {
                continue;
            };
            let report = engine.step(agent.id, agent.pose, emitter, now, &mut self.grid)?;
            timing.segments_traced += report.segments_traced;
            receptions.extend(report.receptions);
        }
        Ok(receptions)
    }

    /// Records a reception and queues a tracking request for the listener.
    fn receive(&mut self, reception: Reception) -> Result<()> {
        let Some(listener) = self
            .agents
            .get(&reception.listener)
            .and_then(Agent::listener)
        else {
            log::trace!("{} is not listening", reception.listener);
            return Ok(());
        };

        let request = (reception.listener, reception.category);
        if listener.can_track() && !self.track_requests.contains(&request) {
            self.track_requests.push_back(request);
        }

        self.emit(SoundMapEvent::SoundReceived {
            listener: reception.listener,
            producer: reception.producer,
            category: reception.category,
        })
    }

    fn resolve(&mut self, geometry: &dyn GeometryQuery) -> Result<usize> {
        let tracker = SourceTracker::new(&self.grid, geometry, self.desc.raycast_layers);
        let mut resolved = 0;

        while let Some((id, category)) = self.track_requests.pop_front() {
            let Some((agent, listener)) = self
                .agents
                .get(&id)
                .and_then(|agent| agent.listener().map(|listener| (agent, listener)))
            else {
                log::warn!("Dropping {} track request for departed {}", category, id);
                continue;
            };

            let path = tracker.track(id, agent.position(), listener.body_radius(), category)?;
            let path_len = path.len();
            if listener.paths.send(path).is_err() {
                log::debug!("{} no longer reads its tracked paths", id);
            }

            self.emit(SoundMapEvent::SourceTracked {
                listener: id,
                category,
                path_len,
            })?;
            resolved += 1;
        }
        Ok(resolved)
    }

    fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.agents
            .get_mut(&id)
            .ok_or(SoundMapError::UnknownAgent(id))
    }

    fn emit(&self, event: SoundMapEvent) -> Result<()> {
        self.event_sender
            .send(event)
            .map_err(|e| SoundMapError::Channel(format!("Failed to send event: {}", e)))
    }
}

fn elapsed_us(since: Instant) -> u64 {
    since.elapsed().as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellIndex;
    use crate::scene::{BoxScene, LayerMask, RayHit};

    struct UnavailableGeometry;

    impl GeometryQuery for UnavailableGeometry {
        fn raycast(
            &self,
            _origin: Vec3,
            _direction: Vec3,
            _max_distance: f32,
            _layers: LayerMask,
            _ignore: Option<AgentId>,
        ) -> Result<Option<RayHit>> {
            Err(SoundMapError::EnvironmentNotReady("physics not loaded".into()))
        }
    }

    fn desc() -> SoundMapDesc {
        SoundMapDesc::default()
            .area(Vec3::new(-16.0, 0.0, -16.0), 32.0, 32.0)
            .fading(10.0, 1.0)
            .execution_rate(10.0)
    }

    fn world_with_emitter() -> (SoundMapWorld, AgentId) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut world = SoundMapWorld::new(desc()).unwrap();
        let id = world.register_agent(Pose::identity());
        world
            .attach_emitter(id, EmitterConfig::named("guard"))
            .unwrap();
        (world, id)
    }

    #[test]
    fn test_invalid_desc_rejected() {
        let result = SoundMapWorld::new(SoundMapDesc::default().fading(0.0, 1.0));
        assert!(matches!(
            result,
            Err(SoundMapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_make_sound_while_stopped_is_dropped() {
        let (mut world, id) = world_with_emitter();
        let result = world
            .make_sound(id, Vec3::ZERO, 50.0, SoundCategory::Walk, 360.0, 1.0)
            .unwrap();
        assert_eq!(result, None);
        assert!(!world.is_making_sound(id).unwrap());
    }

    #[test]
    fn test_unknown_agent_and_missing_capability() {
        let (mut world, id) = world_with_emitter();
        world.start().unwrap();
        let ghost = AgentId::new(99);

        assert_eq!(
            world.make_sound(ghost, Vec3::ZERO, 5.0, SoundCategory::Run, 90.0, 1.0),
            Err(SoundMapError::UnknownAgent(ghost))
        );
        assert_eq!(
            world.unregister_agent(ghost),
            Err(SoundMapError::UnknownAgent(ghost))
        );

        let mute = world.register_agent(Pose::identity());
        assert_eq!(
            world.make_sound(mute, Vec3::ZERO, 5.0, SoundCategory::Run, 90.0, 1.0),
            Err(SoundMapError::CapabilityMissing {
                agent: mute,
                capability: "emitter",
            })
        );
        assert!(world
            .make_sound(id, Vec3::ZERO, 0.0, SoundCategory::Run, 90.0, 1.0)
            .is_err());
    }

    #[test]
    fn test_tick_gating() {
        let (mut world, _) = world_with_emitter();
        let mut scene = BoxScene::new();

        assert!(!world.tick(0.0, &mut scene).unwrap());

        world.start().unwrap();
        assert!(world.tick(0.0, &mut scene).unwrap());
        assert!(!world.tick(0.05, &mut scene).unwrap());
        assert!(world.tick(0.15, &mut scene).unwrap());
        assert!(world.last_tick_timing().is_some());
    }

    #[test]
    fn test_full_circle_in_empty_world() {
        let (mut world, id) = world_with_emitter();
        let mut scene = BoxScene::new();
        world.start().unwrap();
        world
            .make_sound(id, Vec3::ZERO, 100.0, SoundCategory::Talk, 360.0, 1.0)
            .unwrap();

        assert!(world.tick(0.0, &mut scene).unwrap());

        let origin = world.grid().world_to_cell(Vec3::ZERO).unwrap();
        assert_eq!(origin, CellIndex::new(16, 16));
        let cell = world.grid().cell(origin).unwrap();
        let accumulators = cell.accumulators(SoundCategory::Talk);
        assert_eq!(accumulators.len(), 1);
        assert_eq!(accumulators[0].samples(), 72);
        assert_eq!(cell.net_intensity(), 100.0);
        assert_eq!(world.grid().painted_intensity(origin), 1.0);

        let timing = world.last_tick_timing().unwrap();
        assert_eq!(timing.segments_traced, 72);
        let emitter = world.agent(id).unwrap().emitter().unwrap();
        assert_eq!(emitter.pending_segments(), 0);
    }

    #[test]
    fn test_short_sound_is_traced_before_expiring() {
        let (mut world, id) = world_with_emitter();
        let mut scene = BoxScene::new();
        world.start().unwrap();
        world.tick(0.0, &mut scene).unwrap();

        // shorter than one tick interval
        let event_id = world
            .make_sound(id, Vec3::ZERO, 20.0, SoundCategory::Hit, 90.0, 0.05)
            .unwrap()
            .unwrap();
        assert!(world.is_making_sound(id).unwrap());

        assert!(world.tick(0.1, &mut scene).unwrap());
        let timing = world.last_tick_timing().unwrap();
        assert_eq!(timing.segments_traced, 19);
        assert!(timing.cells_touched > 0);

        assert!(world.tick(0.2, &mut scene).unwrap());
        assert!(!world.is_making_sound(id).unwrap());
        assert_eq!(world.last_tick_timing().unwrap().segments_traced, 0);

        let events = world.poll_events();
        assert!(events.contains(&SoundMapEvent::SimulationStarted));
        assert!(events.contains(&SoundMapEvent::SoundStarted {
            event_id,
            producer: id,
            category: SoundCategory::Hit,
        }));
        assert!(events.contains(&SoundMapEvent::SoundExpired {
            event_id,
            producer: id,
        }));
    }

    #[test]
    fn test_ticking_at_exact_rate_never_skips() {
        let (mut world, _) = world_with_emitter();
        world.desc.execution_rate = 20.0;
        let mut scene = BoxScene::new();
        world.start().unwrap();

        let interval = world.desc().tick_interval().as_secs_f32();
        let ran = (0..60)
            .filter(|frame| world.tick(*frame as f32 * interval, &mut scene).unwrap())
            .count();
        assert_eq!(ran, 60);
    }

    #[test]
    fn test_expiry_reported_when_geometry_fails() {
        let (mut world, first) = world_with_emitter();
        let second = world.register_agent(Pose::identity());
        world
            .attach_emitter(second, EmitterConfig::named("cook"))
            .unwrap();
        let mut scene = BoxScene::new();
        world.start().unwrap();

        let short_first = world
            .make_sound(first, Vec3::ZERO, 20.0, SoundCategory::Hit, 90.0, 0.05)
            .unwrap()
            .unwrap();
        let short_second = world
            .make_sound(second, Vec3::ZERO, 20.0, SoundCategory::Hit, 90.0, 0.05)
            .unwrap()
            .unwrap();
        world.tick(0.0, &mut scene).unwrap();
        world
            .make_sound(second, Vec3::ZERO, 20.0, SoundCategory::Talk, 90.0, 10.0)
            .unwrap();
        world.poll_events();

        let result = world.tick(0.2, &mut UnavailableGeometry);
        assert!(matches!(result, Err(SoundMapError::EnvironmentNotReady(_))));

        let events = world.poll_events();
        for (event_id, producer) in [(short_first, first), (short_second, second)] {
            assert!(events.contains(&SoundMapEvent::SoundExpired { event_id, producer }));
        }
    }

    #[test]
    fn test_listener_tracks_heard_sound() {
        let (mut world, emitter) = world_with_emitter();
        let listener = world.register_agent(Pose::from_position(Vec3::new(5.0, 0.0, 0.0)));
        let paths = world
            .attach_listener(listener, ListenerConfig::new(0.5))
            .unwrap();

        let mut scene = BoxScene::new();
        scene.set_agent(listener, Vec3::new(5.0, 0.0, 0.0), 0.5);

        world.start().unwrap();
        world
            .make_sound(emitter, Vec3::ZERO, 100.0, SoundCategory::Walk, 360.0, 1.0)
            .unwrap();
        world.tick(0.0, &mut scene).unwrap();

        let path = paths.try_recv().unwrap();
        assert_eq!(path.listener, listener);
        assert_eq!(path.category, SoundCategory::Walk);
        assert_eq!(path.start().unwrap().cell, CellIndex::new(21, 16));
        assert_eq!(path.destination().unwrap().cell, CellIndex::new(16, 16));
        // one path per (listener, category) per tick
        assert!(paths.try_recv().is_err());

        let events = world.poll_events();
        assert!(events.contains(&SoundMapEvent::SoundReceived {
            listener,
            producer: emitter,
            category: SoundCategory::Walk,
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, SoundMapEvent::SourceTracked { listener: l, .. } if *l == listener)));
    }

    #[test]
    fn test_hearing_only_listener_gets_no_path() {
        let (mut world, emitter) = world_with_emitter();
        let listener = world.register_agent(Pose::from_position(Vec3::new(0.0, 0.0, 4.0)));
        let paths = world
            .attach_listener(listener, ListenerConfig::hearing_only())
            .unwrap();
        let mut scene = BoxScene::new();
        scene.set_agent(listener, Vec3::new(0.0, 0.0, 4.0), 0.5);

        world.start().unwrap();
        world
            .make_sound(emitter, Vec3::ZERO, 100.0, SoundCategory::Talk, 360.0, 1.0)
            .unwrap();
        world.tick(0.0, &mut scene).unwrap();

        assert!(paths.try_recv().is_err());
        assert!(world
            .poll_events()
            .iter()
            .any(|e| matches!(e, SoundMapEvent::SoundReceived { .. })));
    }

    #[test]
    fn test_next_tick_resets_previous_cells() {
        let (mut world, id) = world_with_emitter();
        let mut scene = BoxScene::new();
        world.start().unwrap();
        world
            .make_sound(id, Vec3::ZERO, 30.0, SoundCategory::Run, 360.0, 0.05)
            .unwrap();

        world.tick(0.0, &mut scene).unwrap();
        let origin = CellIndex::new(16, 16);
        assert_eq!(world.grid().category_intensity(origin, SoundCategory::Run), 30.0);

        world.tick(0.2, &mut scene).unwrap();
        assert_eq!(world.grid().category_intensity(origin, SoundCategory::Run), 0.0);
        assert_eq!(world.grid().dirty_count(), 0);
    }

    #[test]
    fn test_set_tile_scale_regenerates() {
        let (mut world, id) = world_with_emitter();
        let mut scene = BoxScene::new();
        world.start().unwrap();
        world
            .make_sound(id, Vec3::ZERO, 30.0, SoundCategory::Run, 360.0, 1.0)
            .unwrap();
        world.tick(0.0, &mut scene).unwrap();
        assert!(world.grid().dirty_count() > 0);

        world.set_tile_scale(2.0).unwrap();
        assert_eq!(world.grid().resolution(), (16, 16));
        assert_eq!(world.grid().dirty_count(), 0);
        assert_eq!(world.grid().highest_intensity(), 0.0);
        assert_eq!(world.desc().tile_scale, 2.0);
        assert!(world.poll_events().contains(&SoundMapEvent::GridRegenerated {
            resolution_x: 16,
            resolution_y: 16,
        }));

        assert!(world.set_tile_scale(-1.0).is_err());
        assert_eq!(world.grid().resolution(), (16, 16));
    }

    #[test]
    fn test_stop_cancels_pending_sounds() {
        let (mut world, id) = world_with_emitter();
        world.start().unwrap();
        world
            .make_sound(id, Vec3::ZERO, 30.0, SoundCategory::Run, 360.0, 10.0)
            .unwrap();
        assert!(world.is_making_sound(id).unwrap());

        world.stop().unwrap();
        assert!(!world.is_running());
        assert!(!world.is_making_sound(id).unwrap());
        assert!(world.poll_events().contains(&SoundMapEvent::SimulationStopped));
    }

    #[test]
    fn test_geometry_failure_surfaces_from_tick() {
        let (mut world, id) = world_with_emitter();
        world.start().unwrap();
        world
            .make_sound(id, Vec3::ZERO, 30.0, SoundCategory::Run, 360.0, 1.0)
            .unwrap();

        let result = world.tick(0.0, &mut UnavailableGeometry);
        assert!(matches!(result, Err(SoundMapError::EnvironmentNotReady(_))));
    }
}
