use anyhow::{Context, Result, bail};
use soundmap::grid::{CellIndex, SoundGrid};
use soundmap::scene::{BoxScene, DiffractionEdge};
use soundmap::{
    EmitterConfig, ListenerConfig, Pose, SoundCategory, SoundMapDesc, SoundMapEvent,
    SoundMapWorld, SourcePath, Vec3,
};

/// Characters used for the heatmap, quietest first.
const SHADES: &[u8] = b" .:-=+*#%@";

pub struct Options {
    pub ticks: u32,
    pub tile_scale: f32,
    pub category: SoundCategory,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ticks: 60,
            tile_scale: 1.0,
            category: SoundCategory::Run,
        }
    }
}

impl Options {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.iter();
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("missing value for {}", arg))
            };
            match arg.as_str() {
                "--ticks" => options.ticks = value()?.parse().context("--ticks")?,
                "--tile" => options.tile_scale = value()?.parse().context("--tile")?,
                "--category" => {
                    options.category = match value()?.as_str() {
                        "walk" => SoundCategory::Walk,
                        "run" => SoundCategory::Run,
                        "hit" => SoundCategory::Hit,
                        "talk" => SoundCategory::Talk,
                        other => bail!("unknown category '{}'", other),
                    }
                }
                other => bail!("unknown argument '{}'", other),
            }
        }
        Ok(options)
    }
}

/// A walled room split by a partition whose open end is a diffraction corner.
fn build_scene() -> BoxScene {
    let mut scene = BoxScene::new();
    scene
        .add_wall(Vec3::new(-12.0, -1.0, -12.0), Vec3::new(12.0, 1.0, -11.0))
        .add_wall(Vec3::new(-12.0, -1.0, 11.0), Vec3::new(12.0, 1.0, 12.0))
        .add_wall(Vec3::new(-12.0, -1.0, -12.0), Vec3::new(-11.0, 1.0, 12.0))
        .add_wall(Vec3::new(11.0, -1.0, -12.0), Vec3::new(12.0, 1.0, 12.0))
        .add_wall(Vec3::new(-0.5, -1.0, -11.0), Vec3::new(0.5, 1.0, 4.0))
        .add_diffraction_edge(DiffractionEdge::new(
            Vec3::new(0.0, 0.0, 4.5),
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            0.6,
        ));
    scene
}

pub fn run(options: Options) -> Result<()> {
    let desc = SoundMapDesc::default()
        .area(Vec3::new(-12.0, 0.0, -12.0), 24.0, 24.0)
        .tile_scale(options.tile_scale)
        .fading(1.0, 0.5)
        .execution_rate(20.0);
    let mut world = SoundMapWorld::new(desc)?;
    let mut scene = build_scene();

    let thief_start = Vec3::new(-8.0, 0.0, -8.0);
    let thief = world.register_agent(Pose::facing(thief_start, Vec3::Z));
    world.attach_emitter(thief, EmitterConfig::named("thief"))?;

    let guard_pose = Pose::from_position(Vec3::new(7.0, 0.0, -6.0));
    let guard = world.register_agent(guard_pose);
    let paths = world.attach_listener(guard, ListenerConfig::new(0.5))?;
    scene.set_agent(guard, guard_pose.position, 0.5);

    world.start()?;
    log::info!(
        "Running {} ticks, thief making {} sounds",
        options.ticks,
        options.category
    );

    let frame_time = world.desc().tick_interval().as_secs_f32();
    let mut received: Vec<SourcePath> = Vec::new();

    for frame in 0..options.ticks {
        let now = frame as f32 * frame_time;

        // thief sneaks north along the west side of the partition
        let position = thief_start + Vec3::Z * (frame as f32 * 0.2).min(14.0);
        world.set_agent_pose(thief, Pose::facing(position, Vec3::Z))?;
        if frame % 10 == 0 {
            world.make_sound(thief, position, 40.0, options.category, 360.0, 0.2)?;
        }

        world.tick(now, &mut scene)?;
        received.extend(paths.try_iter());

        for event in world.poll_events() {
            match event {
                SoundMapEvent::SoundReceived { .. } => {}
                other => log::debug!("{:?}", other),
            }
        }
    }
    world.stop()?;

    println!("{}", render_heatmap(world.grid(), &scene));
    if let Some(timing) = world.last_tick_timing() {
        println!(
            "last tick: {} segments, {} cells, {} us total ({:.1}% of budget)",
            timing.segments_traced,
            timing.cells_touched,
            timing.total_time_us,
            timing.utilization(world.desc().execution_rate) * 100.0
        );
    }

    if received.is_empty() {
        println!("guard heard nothing");
    }
    for path in &received {
        let Some(target) = path.destination() else {
            continue;
        };
        println!(
            "guard heard {}: {} steps toward {} (intensity {:.1})",
            path.category,
            path.len(),
            target.position,
            target.intensity
        );
    }
    Ok(())
}

/// ASCII view of the painted grid, north at the top. Walls are drawn as `X`.
fn render_heatmap(grid: &SoundGrid, scene: &BoxScene) -> String {
    let (resolution_x, resolution_y) = grid.resolution();
    let mut out = String::with_capacity((resolution_x + 1) * resolution_y);

    for y in (0..resolution_y).rev() {
        for x in 0..resolution_x {
            let index = CellIndex::new(x, y);
            let solid = grid
                .cell_position(index)
                .is_some_and(|position| scene.is_solid(position));
            let shade = if solid {
                'X'
            } else {
                let painted = grid.painted_intensity(index);
                let level = (painted * (SHADES.len() - 1) as f32).round() as usize;
                SHADES[level.min(SHADES.len() - 1)] as char
            };
            out.push(shade);
        }
        out.push('\n');
    }
    out
}
