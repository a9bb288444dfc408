//! gearsim CLI - headless gear train runner
//!
//! Loads a JSON scene, steps it for a number of frames and prints the
//! resulting angular velocities.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gearsim_ir::Scene;
use gearsim_kernel::{
    GearTrain, KinematicStepper, NullRenderer, PhysicsStepper, SimConfig, Simulation,
};
use gearsim_physics::RapierStepper;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gearsim")]
#[command(about = "Gear train kinematics simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Rapier rigid-body world
    Rapier,
    /// Spin-in-place integration without dynamics
    Kinematic,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a scene and print final gear rates
    Run {
        /// Scene file (.json)
        scene: PathBuf,
        /// Simulation settings (.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to run
        #[arg(short, long, default_value_t = 60)]
        frames: u64,
        /// Physics backend
        #[arg(short, long, value_enum, default_value_t = Backend::Rapier)]
        backend: Backend,
        /// Write the final state back out as a scene
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Display the gears and connections of a scene
    Info {
        /// Scene file (.json)
        scene: PathBuf,
    },
    /// Validate a scene without running it
    Check {
        /// Scene file (.json)
        scene: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scene,
            config,
            frames,
            backend,
            output,
        } => {
            let config = load_config(config.as_deref())?;
            let scene = load_scene(&scene)?;
            let train = match backend {
                Backend::Rapier => {
                    let physics = RapierStepper::from_config(&config);
                    run(config, physics, &scene, frames)?
                }
                Backend::Kinematic => run(config, KinematicStepper::new(), &scene, frames)?,
            };
            print_rates(&train);
            if let Some(output) = output {
                let json = train.to_scene().to_json()?;
                fs::write(&output, json)
                    .with_context(|| format!("writing {}", output.display()))?;
                println!("Wrote final scene to {}", output.display());
            }
        }
        Commands::Info { scene } => {
            show_info(&scene)?;
        }
        Commands::Check { scene } => {
            let parsed = load_scene(&scene)?;
            let train = GearTrain::from_scene(&parsed)?;
            train.graph().assert_mirrored();
            println!(
                "{}: ok ({} gears, {} connections)",
                scene.display(),
                train.len(),
                train.graph().connection_count()
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    SimConfig::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
}

fn load_scene(path: &Path) -> Result<Scene> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Scene::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

fn run<P: PhysicsStepper>(
    config: SimConfig,
    physics: P,
    scene: &Scene,
    frames: u64,
) -> Result<GearTrain> {
    let mut sim = Simulation::new(config, physics, NullRenderer)?;
    sim.load_scene(scene)?;

    let mut overwrites = 0;
    for _ in 0..frames {
        let report = sim.frame();
        overwrites += report.propagation.overwrites;
    }
    info!("ran {} frame(s), {} fan-in overwrite(s)", sim.frame_count(), overwrites);

    Ok(sim.train().clone())
}

fn print_rates(train: &GearTrain) {
    println!("{:<16} {:<6} {:<7} {:>12}", "gear", "kind", "driver", "rate (rad/s)");
    for (_, gear) in train.gears() {
        println!(
            "{:<16} {:<6} {:<7} {:>12.4}",
            gear.name().unwrap_or("unnamed"),
            gear.kind(),
            if gear.is_driver() { "yes" } else { "" },
            gear.active_rate()
        );
    }
}

fn show_info(path: &Path) -> Result<()> {
    let scene = load_scene(path)?;
    let train = GearTrain::from_scene(&scene)?;

    println!("gearsim scene: {}", path.display());
    println!("  Version: {}", scene.version);
    println!("  Gears: {}", train.len());
    println!("  Connections: {}", train.graph().connection_count());
    println!("  Drivers: {}", train.drivers().len());

    if !train.is_empty() {
        println!("\nGears:");
        for (_, gear) in train.gears() {
            let size = match (gear.teeth(), gear.length()) {
                (Some(teeth), _) => format!("{teeth} teeth"),
                (None, Some(length)) => format!("length {length}"),
                (None, None) => String::new(),
            };
            println!(
                "  {}: {} r={} {} speed={} {:?}{}",
                gear.name().unwrap_or("unnamed"),
                gear.kind(),
                gear.radius(),
                size,
                gear.speed(),
                gear.direction(),
                if gear.is_driver() { " (driver)" } else { "" }
            );
        }
    }

    if train.graph().connection_count() > 0 {
        println!("\nConnections:");
        for (id, gear) in train.gears() {
            for edge in train.connections_of(id)? {
                // Each connection is listed once, from its first endpoint
                if train.graph().endpoints(edge.id)?.0 != id {
                    continue;
                }
                let other = train.gear(edge.neighbor)?;
                println!(
                    "  {} -> {}: ratio {:.4} ({:?})",
                    gear.name().unwrap_or("unnamed"),
                    other.name().unwrap_or("unnamed"),
                    edge.ratio,
                    edge.coupling
                );
            }
        }
    }

    Ok(())
}
