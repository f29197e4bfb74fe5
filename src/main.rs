mod scene;

use clap::Parser;
use physics::{PhysicsError, World, WorldConfig};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless rigid body sandbox")]
struct Args {
    /// JSON world config. Missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of rendered frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// Seed for the frame time jitter
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Log progress every this many frames
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    report_every: u32,
}

fn main() -> Result<(), PhysicsError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    let frame_secs = config.fixed_timestep;

    let mut world = World::new(config)?;
    let handles = scene::build(&mut world)?;
    info!(bodies = handles.len(), "scene built");

    // frame times wobble like a real render loop
    let mut rng = Pcg64Mcg::seed_from_u64(args.seed);
    let mut steps = 0;
    for frame in 0..args.frames {
        let jitter = rng.gen_range(-0.5..0.5) * frame_secs;
        steps += world.physics_update(frame_secs + jitter);

        if frame % args.report_every == args.report_every - 1 {
            let stats = world.last_step_stats();
            let awake = world.bodies().filter(|body| body.is_awake()).count();
            info!(
                frame,
                steps,
                awake,
                contacts = stats.contacts,
                batches = stats.batches,
                "progress"
            );
        }
    }

    for &handle in &handles {
        let body = world.body(handle)?;
        info!(
            body = handle.0,
            position = %body.position(),
            orientation = %body.orientation(),
            awake = body.is_awake(),
            "final pose"
        );
    }
    Ok(())
}
